//! Auth provider bindings for a user.

use atelier_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Email + password sign-in.
pub const PROVIDER_CREDENTIAL: &str = "credential";
/// Passwordless email sign-in.
pub const PROVIDER_MAGIC_LINK: &str = "magic_link";

/// A row from the `accounts` table. Never serialized: carries the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub password_hash: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
