//! Conversion of raw DynamoDB Streams records into canonical records.
//!
//! A canonical record is the raw record with attribute values decoded to
//! native types, the creation time lifted to an absolute UTC timestamp, the
//! table ARN parsed out of `eventSourceARN`, and a per-field change summary
//! computed between the old and new images.

pub mod arn;
pub mod attribute;
pub mod dtos;

use crate::result::error::StreamForwardError;
use crate::streams::attribute::{AttributeError, AttributeValue, Value};
use crate::streams::dtos::StreamRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Clone, Debug)]
pub struct CanonicalRecord {
    pub event_name: dtos::StreamEventName,
    pub event_id: Option<String>,
    pub event_version: Option<String>,
    pub event_source: Option<String>,
    pub aws_region: Option<String>,
    pub event_source_arn: Option<String>,
    /// Present only when `eventSourceARN` matches the table ARN grammar.
    pub table_arn: Option<String>,
    pub dynamodb: CanonicalPayload,
}

/// The canonical `dynamodb` section. Its serialized form is the event
/// detail, so field names keep the wire spelling.
#[derive(Clone, Debug, Serialize)]
pub struct CanonicalPayload {
    #[serde(
        rename = "ApproximateCreationDateTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub approximate_creation_date_time: Option<DateTime<Utc>>,

    #[serde(rename = "Keys", skip_serializing_if = "Option::is_none")]
    pub keys: Option<Value>,

    #[serde(rename = "NewImage", skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Value>,

    #[serde(rename = "OldImage", skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Value>,

    #[serde(rename = "SequenceNumber", skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,

    #[serde(rename = "SizeBytes", skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    #[serde(rename = "StreamViewType", skip_serializing_if = "Option::is_none")]
    pub stream_view_type: Option<String>,

    #[serde(rename = "TableName", skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    #[serde(rename = "ChangedFields", skip_serializing_if = "Option::is_none")]
    pub changed_fields: Option<BTreeSet<String>>,

    #[serde(rename = "HasChanged", skip_serializing_if = "Option::is_none")]
    pub has_changed: Option<BTreeMap<String, bool>>,
}

impl CanonicalRecord {
    /// Scalar top-level fields, keyed by their wire names. This is what
    /// detail-type templates can interpolate.
    pub fn top_level_fields(&self) -> HashMap<&'static str, String> {
        let mut fields = HashMap::from([("eventName", self.event_name.as_str().to_owned())]);
        for (name, value) in [
            ("eventID", &self.event_id),
            ("eventVersion", &self.event_version),
            ("eventSource", &self.event_source),
            ("awsRegion", &self.aws_region),
            ("eventSourceARN", &self.event_source_arn),
            ("tableARN", &self.table_arn),
        ] {
            if let Some(value) = value {
                fields.insert(name, value.clone());
            }
        }
        fields
    }
}

/// Lazily converts raw records into canonical ones, preserving order and
/// length. Each record is processed independently from a copy of its data;
/// the input is never mutated.
pub fn generate_records(
    records: &[StreamRecord],
) -> impl Iterator<Item = Result<CanonicalRecord, StreamForwardError>> + '_ {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| normalize_record(idx, record))
}

fn normalize_record(idx: usize, record: &StreamRecord) -> Result<CanonicalRecord, StreamForwardError> {
    let payload = &record.dynamodb;

    let approximate_creation_date_time = payload
        .approximate_creation_date_time
        .map(|secs| {
            DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                StreamForwardError::Validation(format!(
                    "record #{idx}: creation time {secs} is out of range"
                ))
            })
        })
        .transpose()?;

    let keys = decode_image(idx, "Keys", payload.keys.as_ref())?;
    let new_image = decode_image(idx, "NewImage", payload.new_image.as_ref())?;
    let old_image = decode_image(idx, "OldImage", payload.old_image.as_ref())?;

    let (table_arn, table_name) = match record.event_source_arn.as_deref() {
        Some(raw) => match arn::parse_table_arn(raw) {
            Some(parsed) => {
                tracing::debug!(
                    record = idx,
                    table_arn = %parsed.table_arn,
                    table_name = %parsed.table_name,
                    "parsed source table ARN"
                );
                (Some(parsed.table_arn), Some(parsed.table_name))
            }
            None => {
                tracing::warn!(record = idx, arn = %raw, "unable to parse eventSourceARN");
                (None, None)
            }
        },
        None => (None, None),
    };

    let summary = diff_images(old_image.as_ref(), new_image.as_ref());
    let (changed_fields, has_changed) = match summary {
        Some(summary) => {
            tracing::debug!(
                record = idx,
                changed_fields = ?summary.changed_fields,
                "computed change summary"
            );
            (Some(summary.changed_fields), Some(summary.has_changed))
        }
        None => (None, None),
    };

    Ok(CanonicalRecord {
        event_name: record.event_name,
        event_id: record.event_id.clone(),
        event_version: record.event_version.clone(),
        event_source: record.event_source.clone(),
        aws_region: record.aws_region.clone(),
        event_source_arn: record.event_source_arn.clone(),
        table_arn,
        dynamodb: CanonicalPayload {
            approximate_creation_date_time,
            keys,
            new_image,
            old_image,
            sequence_number: payload.sequence_number.clone(),
            size_bytes: payload.size_bytes,
            stream_view_type: payload.stream_view_type.clone(),
            table_name,
            changed_fields,
            has_changed,
        },
    })
}

fn decode_image(
    idx: usize,
    field: &str,
    image: Option<&HashMap<String, AttributeValue>>,
) -> Result<Option<Value>, StreamForwardError> {
    image
        .map(|attrs| {
            attrs
                .iter()
                .map(|(name, attr)| Ok((name.clone(), attr.clone().into_value()?)))
                .collect::<Result<HashMap<_, _>, AttributeError>>()
                .map(Value::Map)
        })
        .transpose()
        .map_err(|e| StreamForwardError::Validation(format!("record #{idx}: {field}: {e}")))
}

/// Per-field differences between the old and new images.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Attribute names added, removed, or value-changed.
    pub changed_fields: BTreeSet<String>,
    /// Every key in either image, flagged changed or unchanged.
    pub has_changed: BTreeMap<String, bool>,
}

/// Computes the change summary, or `None` when a present image is not an
/// attribute map. That shape never comes out of the typed decoder, but the
/// contract is to skip the diff rather than fail on it.
pub fn diff_images(old_image: Option<&Value>, new_image: Option<&Value>) -> Option<ChangeSummary> {
    let old = match old_image {
        None => None,
        Some(Value::Map(entries)) => Some(entries),
        Some(_) => return None,
    };
    let new = match new_image {
        None => None,
        Some(Value::Map(entries)) => Some(entries),
        Some(_) => return None,
    };

    let empty = HashMap::new();
    let old = old.unwrap_or(&empty);
    let new = new.unwrap_or(&empty);

    let mut summary = ChangeSummary::default();
    for key in new.keys().filter(|key| !old.contains_key(*key)) {
        summary.changed_fields.insert(key.clone());
        summary.has_changed.insert(key.clone(), true);
    }
    for key in old.keys().filter(|key| !new.contains_key(*key)) {
        summary.changed_fields.insert(key.clone());
        summary.has_changed.insert(key.clone(), true);
    }
    for (key, new_value) in new {
        if let Some(old_value) = old.get(key) {
            let differs = new_value != old_value;
            if differs {
                summary.changed_fields.insert(key.clone());
            }
            summary.has_changed.insert(key.clone(), differs);
        }
    }

    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::*;
    use serde_json::json;

    const BARK_STREAM_ARN: &str =
        "arn:aws:dynamodb:region:123456789012:table/BarkTable/stream/2016-11-16T20:42:48.104";

    fn record(value: serde_json::Value) -> StreamRecord {
        serde_json::from_value(value).unwrap()
    }

    fn normalize_one(value: serde_json::Value) -> CanonicalRecord {
        let records = vec![record(value)];
        let mut canonical: Vec<_> = generate_records(&records)
            .collect::<Result<_, _>>()
            .unwrap();
        canonical.pop().unwrap()
    }

    fn bark_modify_record() -> serde_json::Value {
        json!({
            "eventID": "7de3041dd709b024af6f29e4fa13d34c",
            "eventName": "MODIFY",
            "eventVersion": "1.1",
            "eventSource": "aws:dynamodb",
            "awsRegion": "region",
            "eventSourceARN": BARK_STREAM_ARN,
            "dynamodb": {
                "ApproximateCreationDateTime": 1479499740,
                "Keys": {"Username": {"S": "John Doe"}},
                "OldImage": {
                    "Username": {"S": "John Doe"},
                    "Foo": {"N": "123"}
                },
                "NewImage": {
                    "Username": {"S": "John Doe"},
                    "Foo": {"N": "456"},
                    "Bar": {"NS": ["1", "2", "3"]}
                },
                "SequenceNumber": "13021600000000001596893679",
                "SizeBytes": 112,
                "StreamViewType": "NEW_AND_OLD_IMAGES"
            }
        })
    }

    #[test]
    fn minimal_record_gets_empty_change_summary() {
        let canonical = normalize_one(json!({"eventName": "INSERT", "dynamodb": {}}));

        assert_eq!(canonical.dynamodb.changed_fields, Some(BTreeSet::new()));
        assert_eq!(canonical.dynamodb.has_changed, Some(BTreeMap::new()));
        assert_eq!(canonical.table_arn, None);
        assert_eq!(canonical.dynamodb.table_name, None);
    }

    #[test]
    fn converts_creation_time_to_utc() {
        let canonical = normalize_one(bark_modify_record());
        assert_eq!(
            canonical.dynamodb.approximate_creation_date_time,
            Some(Utc.with_ymd_and_hms(2016, 11, 18, 20, 9, 0).unwrap())
        );
    }

    #[test]
    fn parses_table_arn_despite_stream_suffix() {
        let canonical = normalize_one(bark_modify_record());
        assert_eq!(
            canonical.table_arn.as_deref(),
            Some("arn:aws:dynamodb:region:123456789012:table/BarkTable")
        );
        assert_eq!(canonical.dynamodb.table_name.as_deref(), Some("BarkTable"));
    }

    #[test]
    fn unparseable_arn_degrades_to_plain_record() {
        let mut raw = bark_modify_record();
        raw["eventSourceARN"] = json!("arn:aws:dynamodb:region:123456789012:no-table-here");
        let canonical = normalize_one(raw);

        assert_eq!(canonical.table_arn, None);
        assert_eq!(canonical.dynamodb.table_name, None);
        // The rest of the record is still processed.
        assert!(canonical.dynamodb.changed_fields.is_some());
    }

    #[test]
    fn change_summary_covers_added_and_modified_fields() {
        let canonical = normalize_one(bark_modify_record());

        assert_eq!(
            canonical.dynamodb.changed_fields,
            Some(["Bar", "Foo"].map(str::to_owned).into())
        );
        assert_eq!(
            canonical.dynamodb.has_changed,
            Some(BTreeMap::from([
                ("Bar".to_owned(), true),
                ("Foo".to_owned(), true),
                ("Username".to_owned(), false),
            ]))
        );
    }

    #[test]
    fn change_summary_covers_removed_fields() {
        let mut raw = bark_modify_record();
        raw["dynamodb"]["NewImage"] = json!({"Username": {"S": "John Doe"}});
        let canonical = normalize_one(raw);

        assert_eq!(
            canonical.dynamodb.changed_fields,
            Some(["Foo"].map(str::to_owned).into())
        );
    }

    #[test]
    fn single_image_marks_every_field_changed() {
        let mut raw = bark_modify_record();
        raw["dynamodb"]
            .as_object_mut()
            .unwrap()
            .remove("OldImage");
        let canonical = normalize_one(raw);

        assert_eq!(
            canonical.dynamodb.changed_fields,
            Some(["Bar", "Foo", "Username"].map(str::to_owned).into())
        );
    }

    #[rstest]
    #[case::both_absent(None, None)]
    #[case::old_only(Some(json!({"Foo": {"N": "1"}})), None)]
    #[case::both_present(
        Some(json!({"Foo": {"N": "1"}})),
        Some(json!({"Foo": {"N": "2"}, "Bar": {"S": "x"}}))
    )]
    fn diff_is_idempotent_and_symmetric_on_changed_fields(
        #[case] old: Option<serde_json::Value>,
        #[case] new: Option<serde_json::Value>,
    ) {
        let decode = |wire: Option<serde_json::Value>| {
            wire.map(|w| {
                serde_json::from_value::<AttributeValue>(json!({ "M": w }))
                    .unwrap()
                    .into_value()
                    .unwrap()
            })
        };
        let old = decode(old);
        let new = decode(new);

        let forward = diff_images(old.as_ref(), new.as_ref()).unwrap();
        let again = diff_images(old.as_ref(), new.as_ref()).unwrap();
        let reverse = diff_images(new.as_ref(), old.as_ref()).unwrap();

        assert_eq!(forward, again);
        assert_eq!(forward.changed_fields, reverse.changed_fields);
    }

    #[test]
    fn diff_skips_non_map_image_shapes() {
        let not_a_map = Value::String("oops".to_owned());
        assert_eq!(diff_images(Some(&not_a_map), None), None);
        assert_eq!(diff_images(None, Some(&not_a_map)), None);
    }

    #[test]
    fn value_equality_is_structural_not_textual() {
        let decode = |wire: serde_json::Value| {
            serde_json::from_value::<AttributeValue>(json!({ "M": wire }))
                .unwrap()
                .into_value()
                .unwrap()
        };
        // Same number, different spellings; same set, different order.
        let old = decode(json!({"Foo": {"N": "1.50"}, "Bar": {"NS": ["1", "2"]}}));
        let new = decode(json!({"Foo": {"N": "1.5"}, "Bar": {"NS": ["2", "1"]}}));

        let summary = diff_images(Some(&old), Some(&new)).unwrap();
        assert_eq!(summary.changed_fields, BTreeSet::new());
    }

    #[test]
    fn records_are_processed_independently_and_in_order() {
        let records = vec![
            record(json!({"eventName": "INSERT", "dynamodb": {}})),
            record(json!({
                "eventName": "MODIFY",
                "dynamodb": {"NewImage": {"Blob": {"B": "not base64!!"}}}
            })),
            record(bark_modify_record()),
        ];

        let results: Vec<_> = generate_records(&records).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(
            results[2].as_ref().unwrap().event_name,
            dtos::StreamEventName::Modify
        );
    }

    #[test]
    fn detail_serialization_of_canonical_payload() {
        let canonical = normalize_one(bark_modify_record());
        let detail = serde_json::to_value(&canonical.dynamodb).unwrap();

        assert_eq!(
            detail,
            json!({
                "ApproximateCreationDateTime": "2016-11-18T20:09:00Z",
                "Keys": {"Username": "John Doe"},
                "OldImage": {"Username": "John Doe", "Foo": 123},
                "NewImage": {"Username": "John Doe", "Foo": 456, "Bar": [1, 2, 3]},
                "SequenceNumber": "13021600000000001596893679",
                "SizeBytes": 112,
                "StreamViewType": "NEW_AND_OLD_IMAGES",
                "TableName": "BarkTable",
                "ChangedFields": ["Bar", "Foo"],
                "HasChanged": {"Bar": true, "Foo": true, "Username": false}
            })
        );
    }

    #[test]
    fn template_fields_expose_wire_names() {
        let canonical = normalize_one(bark_modify_record());
        let fields = canonical.top_level_fields();

        assert_eq!(fields["eventName"], "MODIFY");
        assert_eq!(fields["awsRegion"], "region");
        assert_eq!(
            fields["tableARN"],
            "arn:aws:dynamodb:region:123456789012:table/BarkTable"
        );
        assert!(!fields.contains_key("dynamodb"));
    }
}
