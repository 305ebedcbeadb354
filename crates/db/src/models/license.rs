//! License entity model and DTOs.

use atelier_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `licenses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct License {
    pub id: DbId,
    pub user_id: DbId,
    pub tier: String,
    pub status: String,
    pub seats: i32,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub stripe_checkout_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub failure_reason: Option<String>,
    pub activated_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for opening a pending license at checkout time.
#[derive(Debug, Clone)]
pub struct CreateLicense {
    pub user_id: DbId,
    pub tier: String,
    pub seats: i32,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

/// Payment details reported by Stripe when a checkout completes.
#[derive(Debug, Clone, Default)]
pub struct PaymentDetails {
    pub payment_intent_id: Option<String>,
    pub customer_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

/// Filter for the admin license list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseFilter {
    pub status: Option<String>,
    pub user_id: Option<DbId>,
}
