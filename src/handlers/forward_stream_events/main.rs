use async_trait::async_trait;
use dynamodb_stream_events::aws_clients::event_bridge::get_event_bridge_client;
use dynamodb_stream_events::lambda_main;
use dynamodb_stream_events::lambda_structure::lambda_trait::Lambda;
use dynamodb_stream_events::publish::config::EbConfig;
use dynamodb_stream_events::publish::StreamEventPublisher;
use dynamodb_stream_events::result::error::StreamForwardError;
use dynamodb_stream_events::streams::dtos::StreamEvent;
use std::sync::Arc;

pub struct Persisted {
    pub publisher: StreamEventPublisher,
}

pub struct ForwardStreamEvents;

#[async_trait]
impl Lambda for ForwardStreamEvents {
    type PersistedMemory = Persisted;
    type InputBody = StreamEvent;
    type Output = ();
    type Error = StreamForwardError;

    async fn bootstrap() -> Result<Self::PersistedMemory, Self::Error> {
        dotenv::dotenv().ok();
        let config = envy::from_env::<EbConfig>().map_err(|e| {
            StreamForwardError::Configuration(format!("unable to load configuration: {e}"))
        })?;
        let publisher = StreamEventPublisher::new(config, Arc::new(get_event_bridge_client()));

        Ok(Persisted { publisher })
    }

    async fn run(
        request: Self::InputBody,
        state: &Self::PersistedMemory,
    ) -> Result<Self::Output, Self::Error> {
        state.publisher.put_records(&request.records).await
    }
}

lambda_main!(ForwardStreamEvents);
