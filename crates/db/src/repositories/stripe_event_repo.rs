//! Repository for the `stripe_events` idempotency log.

use sqlx::PgPool;

use crate::models::stripe_event::StripeEvent;

const COLUMNS: &str =
    "id, stripe_event_id, event_type, status, error, received_at, created_at, updated_at";

pub struct StripeEventRepo;

impl StripeEventRepo {
    pub async fn find_by_event_id(
        pool: &PgPool,
        stripe_event_id: &str,
    ) -> Result<Option<StripeEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stripe_events WHERE stripe_event_id = $1");
        sqlx::query_as::<_, StripeEvent>(&query)
            .bind(stripe_event_id)
            .fetch_optional(pool)
            .await
    }

    /// Record the outcome of handling an event.
    ///
    /// A redelivery of an event that previously failed overwrites the old
    /// outcome; `received_at` keeps the first delivery time.
    pub async fn record(
        pool: &PgPool,
        stripe_event_id: &str,
        event_type: &str,
        status: &str,
        error: Option<&str>,
    ) -> Result<StripeEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO stripe_events (stripe_event_id, event_type, status, error)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT uq_stripe_events_event_id DO UPDATE SET
                status = EXCLUDED.status,
                error = EXCLUDED.error
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StripeEvent>(&query)
            .bind(stripe_event_id)
            .bind(event_type)
            .bind(status)
            .bind(error)
            .fetch_one(pool)
            .await
    }
}
