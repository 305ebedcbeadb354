//! Repository for the `licenses` table.
//!
//! Status changes are conditional updates (`WHERE status = ANY($from)`), so a
//! racing webhook delivery can never move a license out of a terminal state.
//! Activation additionally supersedes the user's previous active license in
//! the same transaction; the `uq_licenses_active_user` partial index backs
//! this up.

use atelier_core::license::{LICENSE_ACTIVE, LICENSE_PENDING, LICENSE_SUPERSEDED};
use atelier_core::types::DbId;
use sqlx::PgPool;

use crate::models::license::{CreateLicense, License, LicenseFilter, PaymentDetails};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, tier, status, seats, amount_cents, currency, \
    stripe_checkout_session_id, stripe_payment_intent_id, stripe_customer_id, \
    failure_reason, activated_at, expires_at, created_at, updated_at";

/// Result of [`LicenseRepo::activate`].
#[derive(Debug, Clone)]
pub enum ActivateOutcome {
    /// The license moved from `pending` to `active`.
    Activated {
        license: License,
        /// Ids of the user's previously active licenses, now `superseded`.
        superseded: Vec<DbId>,
    },
    /// The license was already active; nothing changed.
    AlreadyActive(License),
    /// The license is in a state that cannot be activated.
    NotPending(License),
}

/// Provides CRUD and status-transition operations for licenses.
pub struct LicenseRepo;

impl LicenseRepo {
    /// Insert a `pending` license for a checkout that is about to start.
    pub async fn create_pending(
        pool: &PgPool,
        input: &CreateLicense,
    ) -> Result<License, sqlx::Error> {
        let query = format!(
            "INSERT INTO licenses (user_id, tier, status, seats, amount_cents, currency)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, License>(&query)
            .bind(input.user_id)
            .bind(&input.tier)
            .bind(LICENSE_PENDING)
            .bind(input.seats)
            .bind(input.amount_cents)
            .bind(&input.currency)
            .fetch_one(pool)
            .await
    }

    /// Store the Stripe Checkout Session id once the session exists.
    pub async fn attach_checkout_session(
        pool: &PgPool,
        id: DbId,
        session_id: &str,
    ) -> Result<Option<License>, sqlx::Error> {
        let query = format!(
            "UPDATE licenses SET stripe_checkout_session_id = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, License>(&query)
            .bind(id)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<License>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM licenses WHERE id = $1");
        sqlx::query_as::<_, License>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_checkout_session(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<License>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM licenses WHERE stripe_checkout_session_id = $1");
        sqlx::query_as::<_, License>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_payment_intent(
        pool: &PgPool,
        payment_intent_id: &str,
    ) -> Result<Option<License>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM licenses
             WHERE stripe_payment_intent_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, License>(&query)
            .bind(payment_intent_id)
            .fetch_optional(pool)
            .await
    }

    /// The user's current license: `active` and not past its expiry.
    pub async fn find_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<License>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM licenses
             WHERE user_id = $1
               AND status = $2
               AND (expires_at IS NULL OR expires_at > NOW())"
        );
        sqlx::query_as::<_, License>(&query)
            .bind(user_id)
            .bind(LICENSE_ACTIVE)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<License>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM licenses WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, License>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &LicenseFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<License>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM licenses
             WHERE ($1::text IS NULL OR status = $1)
               AND ($2::bigint IS NULL OR user_id = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, License>(&query)
            .bind(&filter.status)
            .bind(filter.user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, filter: &LicenseFilter) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM licenses
             WHERE ($1::text IS NULL OR status = $1)
               AND ($2::bigint IS NULL OR user_id = $2)",
        )
        .bind(&filter.status)
        .bind(filter.user_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Activate a pending license after a completed payment.
    ///
    /// Runs in one transaction: locks the license, supersedes every other
    /// active license of the same user, then marks this one active with the
    /// payment details. Returns `None` if the license does not exist.
    pub async fn activate(
        pool: &PgPool,
        id: DbId,
        payment: &PaymentDetails,
    ) -> Result<Option<ActivateOutcome>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM licenses WHERE id = $1 FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, License>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if current.status == LICENSE_ACTIVE {
            return Ok(Some(ActivateOutcome::AlreadyActive(current)));
        }
        if current.status != LICENSE_PENDING {
            return Ok(Some(ActivateOutcome::NotPending(current)));
        }

        let superseded: Vec<(DbId,)> = sqlx::query_as(
            "UPDATE licenses SET status = $3
             WHERE user_id = $1 AND id <> $2 AND status = $4
             RETURNING id",
        )
        .bind(current.user_id)
        .bind(id)
        .bind(LICENSE_SUPERSEDED)
        .bind(LICENSE_ACTIVE)
        .fetch_all(&mut *tx)
        .await?;

        let query = format!(
            "UPDATE licenses SET
                status = $2,
                activated_at = NOW(),
                failure_reason = NULL,
                stripe_payment_intent_id = COALESCE($3, stripe_payment_intent_id),
                stripe_customer_id = COALESCE($4, stripe_customer_id),
                amount_cents = COALESCE($5, amount_cents),
                currency = COALESCE($6, currency)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let license = sqlx::query_as::<_, License>(&query)
            .bind(id)
            .bind(LICENSE_ACTIVE)
            .bind(&payment.payment_intent_id)
            .bind(&payment.customer_id)
            .bind(payment.amount_cents)
            .bind(&payment.currency)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(ActivateOutcome::Activated {
            license,
            superseded: superseded.into_iter().map(|r| r.0).collect(),
        }))
    }

    /// Move a license to `to` if its current status is one of `from`.
    ///
    /// Returns `None` when the license does not exist or is not in an
    /// allowed source state.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        from: &[&str],
        to: &str,
        reason: Option<&str>,
    ) -> Result<Option<License>, sqlx::Error> {
        let query = format!(
            "UPDATE licenses SET
                status = $3,
                failure_reason = COALESCE($4, failure_reason)
             WHERE id = $1 AND status = ANY($2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, License>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(reason)
            .fetch_optional(pool)
            .await
    }

    /// Record the payment intent on a license before its outcome is known.
    pub async fn set_payment_intent(
        pool: &PgPool,
        id: DbId,
        payment_intent_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE licenses SET stripe_payment_intent_id = $2 WHERE id = $1")
            .bind(id)
            .bind(payment_intent_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
