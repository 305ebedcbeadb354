//! Repository for the `accounts` table.

use atelier_core::types::DbId;
use sqlx::PgPool;

use crate::models::account::{Account, PROVIDER_CREDENTIAL};

const COLUMNS: &str = "id, user_id, provider, password_hash, created_at, updated_at";

pub struct AccountRepo;

impl AccountRepo {
    /// Attach an email + password credential to a user.
    pub async fn create_credential(
        pool: &PgPool,
        user_id: DbId,
        password_hash: &str,
    ) -> Result<Account, sqlx::Error> {
        let query = format!(
            "INSERT INTO accounts (user_id, provider, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(user_id)
            .bind(PROVIDER_CREDENTIAL)
            .bind(password_hash)
            .fetch_one(pool)
            .await
    }

    /// Record that a user has signed in through `provider`. No-op if already linked.
    pub async fn link_provider(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO accounts (user_id, provider) VALUES ($1, $2)
             ON CONFLICT (user_id, provider) DO NOTHING",
        )
        .bind(user_id)
        .bind(provider)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM accounts WHERE user_id = $1 AND provider = $2");
        sqlx::query_as::<_, Account>(&query)
            .bind(user_id)
            .bind(provider)
            .fetch_optional(pool)
            .await
    }
}
