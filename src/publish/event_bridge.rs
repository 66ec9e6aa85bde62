use crate::publish::config::EbConfig;
use crate::publish::{EntryOutcome, EventBus, EventBusError, EventEntry};
use crate::result::error::StreamForwardError;
use crate::streams::{self, CanonicalRecord};
use anyhow::anyhow;
use async_trait::async_trait;
use rusoto_events::{
    EventBridge as RusotoEventBridge, EventBridgeClient, PutEventsRequest, PutEventsRequestEntry,
};
use std::sync::Arc;

#[async_trait]
impl EventBus for EventBridgeClient {
    async fn put_events(&self, entries: Vec<EventEntry>) -> Result<Vec<EntryOutcome>, EventBusError> {
        let request = PutEventsRequest {
            entries: entries
                .into_iter()
                .map(|entry| PutEventsRequestEntry {
                    source: Some(entry.source),
                    detail_type: Some(entry.detail_type),
                    detail: Some(entry.detail),
                    event_bus_name: Some(entry.event_bus_name),
                    resources: if entry.resources.is_empty() {
                        None
                    } else {
                        Some(entry.resources)
                    },
                    time: entry.time.map(|t| t.timestamp() as f64),
                    trace_header: None,
                })
                .collect(),
        };

        let response = RusotoEventBridge::put_events(self, request)
            .await
            .map_err(|e| EventBusError::Unknown(anyhow!(e)))?;

        Ok(response
            .entries
            .unwrap_or_default()
            .into_iter()
            .map(|entry| EntryOutcome {
                event_id: entry.event_id,
                error_code: entry.error_code,
                error_message: entry.error_message,
            })
            .collect())
    }
}

/// Republishes a batch of stream records as events on the configured bus.
pub struct StreamEventPublisher {
    event_bus_client: Arc<dyn EventBus>,
    config: EbConfig,
}

impl StreamEventPublisher {
    pub fn new(config: EbConfig, event_bus_client: Arc<dyn EventBus>) -> Self {
        Self {
            event_bus_client,
            config,
        }
    }

    /// Converts every raw record to canonical form, submits the whole batch
    /// in one put-events call, then reconciles the per-entry response by
    /// position. Per-entry delivery failures are logged with the original
    /// raw record and never fail the invocation; a failed call does.
    pub async fn put_records(
        &self,
        records: &[streams::dtos::StreamRecord],
    ) -> Result<(), StreamForwardError> {
        let mut entries = Vec::with_capacity(records.len());
        for canonical in streams::generate_records(records) {
            entries.push(self.build_entry(&canonical?)?);
        }

        let outcomes = self
            .event_bus_client
            .put_events(entries)
            .await
            .map_err(|e| {
                StreamForwardError::from(
                    anyhow!(e).context("unable to submit stream records to the event bus"),
                )
            })?;

        for (idx, outcome) in outcomes.iter().enumerate() {
            if outcome.is_failure() {
                tracing::error!(
                    record = idx,
                    error_code = outcome.error_code.as_deref().unwrap_or_default(),
                    error_message = outcome.error_message.as_deref().unwrap_or_default(),
                    raw_record = ?records.get(idx),
                    "event bus rejected entry"
                );
            } else if let Some(event_id) = outcome.event_id.as_deref() {
                tracing::debug!(record = idx, event_id, "event accepted");
            }
        }

        Ok(())
    }

    fn build_entry(&self, record: &CanonicalRecord) -> Result<EventEntry, StreamForwardError> {
        let detail = serde_json::to_string(&record.dynamodb).map_err(|e| {
            StreamForwardError::from(anyhow!(e).context("unable to serialize record payload"))
        })?;

        Ok(EventEntry {
            source: self.config.event_source.clone(),
            detail_type: render_detail_type(&self.config.detail_type_template, record)?,
            detail,
            resources: record.table_arn.clone().into_iter().collect(),
            time: record.dynamodb.approximate_creation_date_time,
            event_bus_name: self.config.event_bus_name.clone(),
        })
    }
}

/// Expands `{field}` placeholders against the record's top-level fields.
/// A placeholder naming an absent field is a configuration defect, not a
/// data error.
fn render_detail_type(
    template: &str,
    record: &CanonicalRecord,
) -> Result<String, StreamForwardError> {
    let fields = record.top_level_fields();
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            StreamForwardError::Configuration(format!(
                "unterminated placeholder in detail-type template {template:?}"
            ))
        })?;
        let name = &after[..end];
        let value = fields.get(name).ok_or_else(|| {
            StreamForwardError::Configuration(format!(
                "detail-type template references unknown record field \"{name}\""
            ))
        })?;
        rendered.push_str(value);
        rest = &after[end + 1..];
    }
    rendered.push_str(rest);

    Ok(rendered)
}
