use crate::publish::{EntryOutcome, EventBus, EventBusError, EventEntry};
use async_trait::async_trait;
use mockall::mock;

mock! {
    pub EventBus {}

    #[async_trait]
    impl EventBus for EventBus {
        async fn put_events(
            &self,
            entries: Vec<EventEntry>,
        ) -> Result<Vec<EntryOutcome>, EventBusError>;
    }
}
