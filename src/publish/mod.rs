pub mod config;
pub mod event_bridge;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use event_bridge::StreamEventPublisher;

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("{0:#}")]
    Unknown(#[source] anyhow::Error),
}

/// One outbound event, ready for a put-events batch.
#[derive(Clone, Debug, PartialEq)]
pub struct EventEntry {
    pub source: String,
    pub detail_type: String,
    pub detail: String,
    /// Zero or one table ARN.
    pub resources: Vec<String>,
    /// Omitted entries default to submission time on the bus side.
    pub time: Option<DateTime<Utc>>,
    pub event_bus_name: String,
}

/// Per-entry outcome reported by the bus, in submission order.
#[derive(Clone, Debug, Default)]
pub struct EntryOutcome {
    pub event_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl EntryOutcome {
    pub fn is_failure(&self) -> bool {
        self.error_code.as_deref().is_some_and(|code| !code.is_empty())
            || self
                .error_message
                .as_deref()
                .is_some_and(|message| !message.is_empty())
    }
}

/// The outbound side of the pipeline: submit one batch, get one outcome per
/// entry in the same order.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn put_events(&self, entries: Vec<EventEntry>) -> Result<Vec<EntryOutcome>, EventBusError>;
}
