//! Repository for the `magic_link_tokens` table.

use atelier_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::magic_link::MagicLinkToken;

const COLUMNS: &str = "id, jti, email, expires_at, consumed_at, created_at, updated_at";

pub struct MagicLinkRepo;

impl MagicLinkRepo {
    /// Record an issued token so it can later be consumed once.
    pub async fn create(
        pool: &PgPool,
        jti: &str,
        email: &str,
        expires_at: Timestamp,
    ) -> Result<MagicLinkToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO magic_link_tokens (jti, email, expires_at)
             VALUES ($1, LOWER($2), $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MagicLinkToken>(&query)
            .bind(jti)
            .bind(email.trim())
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Atomically consume a token.
    ///
    /// Returns the row only for the first caller while the token is unexpired;
    /// every later call (or a call after expiry) returns `None`.
    pub async fn consume(pool: &PgPool, jti: &str) -> Result<Option<MagicLinkToken>, sqlx::Error> {
        let query = format!(
            "UPDATE magic_link_tokens SET consumed_at = NOW()
             WHERE jti = $1 AND consumed_at IS NULL AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MagicLinkToken>(&query)
            .bind(jti)
            .fetch_optional(pool)
            .await
    }

    /// Delete tokens that are consumed or past expiry.
    pub async fn cleanup(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM magic_link_tokens WHERE consumed_at IS NOT NULL OR expires_at < NOW()",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
