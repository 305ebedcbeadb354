//! Background subscriber that writes every domain event to the trace log.

use tokio::sync::broadcast;

use crate::bus::DomainEvent;

pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &DomainEvent) {
        tracing::info!(
            event_type = %event.event_type,
            entity_type = event.entity_type.as_deref().unwrap_or("-"),
            entity_id = ?event.entity_id,
            actor_user_id = ?event.actor_user_id,
            payload = %event.payload,
            "Domain event"
        );
    }
}
