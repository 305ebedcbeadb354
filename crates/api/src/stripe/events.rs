//! Webhook payloads. Only the fields the API acts on are decoded.

use std::collections::HashMap;

use atelier_core::types::DbId;
use serde::Deserialize;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_SESSION_EXPIRED: &str = "checkout.session.expired";
pub const CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED: &str =
    "checkout.session.async_payment_succeeded";
pub const CHECKOUT_SESSION_ASYNC_PAYMENT_FAILED: &str = "checkout.session.async_payment_failed";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub client_reference_id: Option<String>,
    pub payment_intent: Option<String>,
    pub customer: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub last_payment_error: Option<PaymentError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentError {
    pub message: Option<String>,
    pub code: Option<String>,
}

/// Our license id, from `metadata.license_id` or `client_reference_id`.
pub fn license_id_from(
    metadata: &HashMap<String, String>,
    client_reference_id: Option<&str>,
) -> Option<DbId> {
    metadata
        .get("license_id")
        .map(String::as_str)
        .or(client_reference_id)
        .and_then(|raw| raw.parse().ok())
}

impl PaymentIntentObject {
    /// Human-readable failure reason for the license row.
    pub fn failure_reason(&self) -> String {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.clone().or_else(|| e.code.clone()))
            .unwrap_or_else(|| "payment failed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_completed_checkout() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_1",
                "client_reference_id": "7",
                "payment_intent": "pi_1",
                "customer": null,
                "amount_total": 14900,
                "currency": "usd",
                "metadata": {"license_id": "7", "tier": "pro"}
            }}
        }))
        .unwrap();
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);

        let session: CheckoutSessionObject = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(session.payment_intent.as_deref(), Some("pi_1"));
        assert_eq!(
            license_id_from(&session.metadata, session.client_reference_id.as_deref()),
            Some(7)
        );
    }

    #[test]
    fn license_id_falls_back_to_reference() {
        assert_eq!(license_id_from(&HashMap::new(), Some("12")), Some(12));
        assert_eq!(license_id_from(&HashMap::new(), Some("abc")), None);
        assert_eq!(license_id_from(&HashMap::new(), None), None);
    }

    #[test]
    fn failure_reason_prefers_message() {
        let intent: PaymentIntentObject = serde_json::from_value(json!({
            "id": "pi_1",
            "last_payment_error": {"message": "Your card was declined.", "code": "card_declined"}
        }))
        .unwrap();
        assert_eq!(intent.failure_reason(), "Your card was declined.");

        let intent: PaymentIntentObject =
            serde_json::from_value(json!({"id": "pi_2", "last_payment_error": null})).unwrap();
        assert_eq!(intent.failure_reason(), "payment failed");
    }
}
