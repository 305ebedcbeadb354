//! Issued magic-link tokens, tracked so each can be used once.

use atelier_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct MagicLinkToken {
    pub id: DbId,
    pub jti: String,
    pub email: String,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
