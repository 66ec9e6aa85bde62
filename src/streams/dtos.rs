use crate::streams::attribute::AttributeValue;
use serde::Deserialize;
use std::collections::HashMap;

/// Inbound Lambda payload. The stream delivers records under the `Records`
/// key; a payload without it is a no-op invocation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamRecord>,
}

/// One raw stream record, as delivered by DynamoDB Streams.
#[derive(Clone, Debug, Deserialize)]
pub struct StreamRecord {
    #[serde(rename = "eventName")]
    pub event_name: StreamEventName,

    #[serde(rename = "eventID", default)]
    pub event_id: Option<String>,

    #[serde(rename = "eventVersion", default)]
    pub event_version: Option<String>,

    #[serde(rename = "eventSource", default)]
    pub event_source: Option<String>,

    #[serde(rename = "awsRegion", default)]
    pub aws_region: Option<String>,

    #[serde(rename = "eventSourceARN", default)]
    pub event_source_arn: Option<String>,

    pub dynamodb: StreamPayload,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamEventName {
    Insert,
    Modify,
    Remove,
}

impl StreamEventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEventName::Insert => "INSERT",
            StreamEventName::Modify => "MODIFY",
            StreamEventName::Remove => "REMOVE",
        }
    }
}

/// The `dynamodb` section of a raw record. Everything is optional; a
/// `KEYS_ONLY` stream view carries neither image.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StreamPayload {
    #[serde(rename = "ApproximateCreationDateTime", default)]
    pub approximate_creation_date_time: Option<i64>,

    #[serde(rename = "Keys", default)]
    pub keys: Option<HashMap<String, AttributeValue>>,

    #[serde(rename = "NewImage", default)]
    pub new_image: Option<HashMap<String, AttributeValue>>,

    #[serde(rename = "OldImage", default)]
    pub old_image: Option<HashMap<String, AttributeValue>>,

    #[serde(rename = "SequenceNumber", default)]
    pub sequence_number: Option<String>,

    #[serde(rename = "SizeBytes", default)]
    pub size_bytes: Option<u64>,

    #[serde(rename = "StreamViewType", default)]
    pub stream_view_type: Option<String>,
}
