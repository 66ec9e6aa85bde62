use rusoto_core::Region;
use rusoto_events::EventBridgeClient;

/// The region comes from the standard AWS environment (AWS_REGION), which
/// the Lambda runtime always provides.
pub fn get_event_bridge_client() -> EventBridgeClient {
    EventBridgeClient::new(Region::default())
}
