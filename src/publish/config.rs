use serde::{self, Deserialize};

#[derive(Clone, Debug, Deserialize)]
pub struct EbConfig {
    /// Name of the event bus where stream records are republished.
    #[serde(default = "default_event_bus_name")]
    pub event_bus_name: String,

    /// Source namespace stamped on every outbound event.
    #[serde(default = "default_event_source")]
    pub event_source: String,

    /// Detail-type template; `{field}` placeholders name top-level record
    /// fields, e.g. `{eventName}`.
    #[serde(default = "default_detail_type_template")]
    pub detail_type_template: String,
}

impl Default for EbConfig {
    fn default() -> Self {
        Self {
            event_bus_name: default_event_bus_name(),
            event_source: default_event_source(),
            detail_type_template: default_detail_type_template(),
        }
    }
}

fn default_event_bus_name() -> String {
    "default".to_owned()
}

fn default_event_source() -> String {
    "dynamodb-streams".to_owned()
}

fn default_detail_type_template() -> String {
    "DynamoDB Streams Record {eventName}".to_owned()
}
