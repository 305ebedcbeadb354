//! Log of received Stripe webhook events, used for idempotency.

use atelier_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

pub const EVENT_PROCESSED: &str = "processed";
pub const EVENT_IGNORED: &str = "ignored";
pub const EVENT_FAILED: &str = "failed";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StripeEvent {
    pub id: DbId,
    pub stripe_event_id: String,
    pub event_type: String,
    pub status: String,
    pub error: Option<String>,
    pub received_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
