//! Minimal Stripe REST client (form-encoded requests, JSON responses).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutProvider, CheckoutRequest, CheckoutSession, StripeError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: &str, api_base: &str) -> Result<Self, StripeError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

/// Flatten a checkout request into Stripe's bracketed form encoding.
pub(crate) fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("line_items[0][price]".to_string(), request.price_id.clone()),
        ("line_items[0][quantity]".to_string(), request.quantity.to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), request.client_reference_id.clone()),
        ("customer_email".to_string(), request.customer_email.clone()),
    ];
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
    }
    form
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| "no error message".to_string());
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response.json().await?;
        let url = session
            .url
            .ok_or_else(|| StripeError::Decode("checkout session has no url".into()))?;
        tracing::info!(session_id = %session.id, "Stripe checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_includes_metadata_on_session_and_intent() {
        let request = CheckoutRequest {
            price_id: "price_123".into(),
            quantity: 1,
            customer_email: "a@example.com".into(),
            client_reference_id: "42".into(),
            metadata: vec![("license_id".into(), "42".into())],
            success_url: "https://x/s".into(),
            cancel_url: "https://x/c".into(),
        };
        let form = checkout_form(&request);
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price]"), Some("price_123"));
        assert_eq!(get("client_reference_id"), Some("42"));
        assert_eq!(get("metadata[license_id]"), Some("42"));
        assert_eq!(get("payment_intent_data[metadata][license_id]"), Some("42"));
    }

    #[test]
    fn api_base_trailing_slash_trimmed() {
        let client = StripeClient::new("sk_test_1", "http://localhost:12111/").unwrap();
        assert_eq!(client.api_base, "http://localhost:12111");
    }
}
