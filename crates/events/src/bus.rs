//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` in the API state. Publishing
//! never blocks and never fails; with no subscribers the event is dropped.

use atelier_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const COMPONENT_PUBLISHED: &str = "component.published";
pub const COMPONENT_ARCHIVED: &str = "component.archived";
pub const VERSION_DEFAULT_CHANGED: &str = "component_version.default_changed";
pub const LICENSE_ACTIVATED: &str = "license.activated";
pub const LICENSE_FAILED: &str = "license.failed";
pub const LICENSE_EXPIRED: &str = "license.expired";
pub const LICENSE_REVOKED: &str = "license.revoked";
pub const ASSET_UPLOADED: &str = "asset.uploaded";
pub const ASSET_DELETED: &str = "asset.deleted";
pub const USER_SIGNED_UP: &str = "user.signed_up";

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// Something that happened in the catalog, billing or auth domains.
///
/// Built with [`DomainEvent::new`] and the `with_*` builder methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"license.activated"`.
    pub event_type: String,
    /// Kind of entity the event is about (`"component"`, `"license"`, ...).
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    /// User that caused the event, when there is one.
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            entity_type: None,
            entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    /// Attach an actor only if one is known.
    pub fn with_optional_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Slow receivers that fall more than `capacity` events behind observe
    /// `RecvError::Lagged` and skip ahead.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        // A send error only means there are no receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_built_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            DomainEvent::new(LICENSE_ACTIVATED)
                .with_entity("license", 12)
                .with_actor(3)
                .with_payload(serde_json::json!({"tier": "pro"})),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, "license.activated");
        assert_eq!(received.entity_type.as_deref(), Some("license"));
        assert_eq!(received.entity_id, Some(12));
        assert_eq!(received.actor_user_id, Some(3));
        assert_eq!(received.payload["tier"], "pro");
    }

    #[tokio::test]
    async fn every_subscriber_sees_each_event() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(DomainEvent::new(COMPONENT_PUBLISHED));

        assert_eq!(a.recv().await.unwrap().event_type, COMPONENT_PUBLISHED);
        assert_eq!(b.recv().await.unwrap().event_type, COMPONENT_PUBLISHED);
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::default();
        bus.publish(DomainEvent::new(ASSET_UPLOADED));
    }

    #[test]
    fn optional_actor_clears_or_sets() {
        let event = DomainEvent::new(LICENSE_FAILED).with_optional_actor(None);
        assert!(event.actor_user_id.is_none());
        assert!(event.payload.is_object());
        let event = DomainEvent::new(LICENSE_FAILED).with_optional_actor(Some(9));
        assert_eq!(event.actor_user_id, Some(9));
    }
}
