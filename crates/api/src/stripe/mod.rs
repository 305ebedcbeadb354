//! Stripe integration: configuration, the checkout seam, and webhook payloads.
//!
//! Only one-time Checkout Sessions are used. Webhook signatures are checked
//! with [`atelier_core::stripe_signature`].

use async_trait::async_trait;
use atelier_core::stripe_signature::DEFAULT_TOLERANCE_SECS;
use atelier_core::tier::Tier;

use crate::config::{parse_or, var, ConfigError};

pub mod client;
pub mod events;

pub use client::StripeClient;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    /// Signing secret of the webhook endpoint (`whsec_...`).
    pub webhook_secret: Option<String>,
    pub price_pro: Option<String>,
    pub price_team: Option<String>,
    pub price_enterprise: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub api_base: String,
    /// Maximum age of a signed webhook timestamp.
    pub webhook_tolerance_secs: i64,
}

impl StripeConfig {
    /// | Env Var                         | Default                                   |
    /// |---------------------------------|-------------------------------------------|
    /// | `STRIPE_SECRET_KEY`             | none (checkout disabled)                  |
    /// | `STRIPE_WEBHOOK_SECRET`         | none (webhook answers 503)                |
    /// | `STRIPE_PRICE_PRO`              | -                                         |
    /// | `STRIPE_PRICE_TEAM`             | -                                         |
    /// | `STRIPE_PRICE_ENTERPRISE`       | -                                         |
    /// | `STRIPE_SUCCESS_URL`            | `{APP_URL}/checkout/success?session_id=…` |
    /// | `STRIPE_CANCEL_URL`             | `{APP_URL}/pricing`                       |
    /// | `STRIPE_API_BASE`               | `https://api.stripe.com`                  |
    /// | `STRIPE_WEBHOOK_TOLERANCE_SECS` | `300`                                     |
    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let app_url = var(get, "APP_URL")
            .unwrap_or_else(|| "http://localhost:3001".into())
            .trim_end_matches('/')
            .to_string();

        let secret_key = var(get, "STRIPE_SECRET_KEY");
        if let Some(key) = &secret_key {
            if !key.starts_with("sk_") && !key.starts_with("rk_") {
                return Err(ConfigError::Invalid {
                    var: "STRIPE_SECRET_KEY",
                    reason: "expected an sk_ or rk_ key".into(),
                });
            }
        }

        Ok(Self {
            secret_key,
            webhook_secret: var(get, "STRIPE_WEBHOOK_SECRET"),
            price_pro: var(get, "STRIPE_PRICE_PRO"),
            price_team: var(get, "STRIPE_PRICE_TEAM"),
            price_enterprise: var(get, "STRIPE_PRICE_ENTERPRISE"),
            success_url: var(get, "STRIPE_SUCCESS_URL").unwrap_or_else(|| {
                format!("{app_url}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}")
            }),
            cancel_url: var(get, "STRIPE_CANCEL_URL")
                .unwrap_or_else(|| format!("{app_url}/pricing")),
            api_base: var(get, "STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            webhook_tolerance_secs: parse_or(
                get,
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                DEFAULT_TOLERANCE_SECS,
            )?,
        })
    }

    /// Configured Stripe price for a purchasable tier.
    pub fn price_for(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Free => None,
            Tier::Pro => self.price_pro.as_deref(),
            Tier::Team => self.price_team.as_deref(),
            Tier::Enterprise => self.price_enterprise.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Checkout seam
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected Stripe response: {0}")]
    Decode(String),
}

/// What the API asks Stripe for when a user starts checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub quantity: i32,
    pub customer_email: String,
    /// Our license id; echoed back on the completed session.
    pub client_reference_id: String,
    pub metadata: Vec<(String, String)>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Creates hosted checkout sessions. [`StripeClient`] talks to Stripe;
/// tests substitute a fake.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError>;
}
