//! Stripe webhook receiver.
//!
//! Every delivery is verified against `STRIPE_WEBHOOK_SECRET`, then logged in
//! `stripe_events` so redeliveries are answered without reprocessing. Only a
//! delivery that previously failed is handled again.
//!
//! A known event whose `data.object` does not decode is answered 400 and
//! recorded as `ignored`, so later redeliveries are acknowledged as
//! duplicates. Handler errors, such as a database failure, are recorded as
//! `failed` and answered 500 so Stripe retries them.
//!
//! Delayed payment methods complete the checkout session with
//! `payment_status = "unpaid"`; the license stays `pending` until
//! `checkout.session.async_payment_succeeded` or `..._failed` arrives.

use atelier_core::license::{LICENSE_EXPIRED, LICENSE_FAILED, LICENSE_PENDING};
use atelier_core::stripe_signature;
use atelier_db::models::license::{License, PaymentDetails};
use atelier_db::models::stripe_event::{EVENT_FAILED, EVENT_IGNORED, EVENT_PROCESSED};
use atelier_db::repositories::{ActivateOutcome, LicenseRepo, StripeEventRepo, UserRepo};
use atelier_events::bus;
use atelier_events::mail::templates;
use atelier_events::DomainEvent;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::stripe::events::{
    license_id_from, CheckoutSessionObject, PaymentIntentObject, WebhookEvent,
    CHECKOUT_SESSION_ASYNC_PAYMENT_FAILED, CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED,
    CHECKOUT_SESSION_COMPLETED, CHECKOUT_SESSION_EXPIRED, PAYMENT_INTENT_FAILED,
};

/// Failure reason stored when a delayed payment method is declined.
const ASYNC_PAYMENT_FAILED_REASON: &str = "delayed payment failed";

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Acknowledgement body. Stripe only looks at the status code.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub duplicate: bool,
    pub outcome: &'static str,
}

/// POST /api/webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let stripe = &state.config.stripe;
    let Some(secret) = stripe.webhook_secret.as_deref() else {
        return Err(AppError::ServiceUnavailable(
            "Stripe webhooks are not configured".into(),
        ));
    };

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("Missing Stripe-Signature header".into()))?;
    stripe_signature::verify(
        &body,
        header,
        secret,
        stripe.webhook_tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| AppError::InvalidSignature(e.to_string()))?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed event payload: {e}")))?;

    if let Some(previous) = StripeEventRepo::find_by_event_id(&state.pool, &event.id).await? {
        if previous.status != EVENT_FAILED {
            tracing::debug!(event_id = %event.id, status = %previous.status, "Duplicate webhook delivery");
            return Ok(Json(WebhookAck {
                received: true,
                duplicate: true,
                outcome: if previous.status == EVENT_PROCESSED {
                    EVENT_PROCESSED
                } else {
                    EVENT_IGNORED
                },
            }));
        }
        tracing::info!(event_id = %event.id, "Reprocessing previously failed webhook");
    }

    let payload = match EventPayload::decode(&event) {
        Ok(payload) => payload,
        Err(e) => {
            let message = format!("Unexpected {} object: {e}", event.event_type);
            tracing::warn!(event_id = %event.id, error = %message, "Undecodable webhook object");
            StripeEventRepo::record(
                &state.pool,
                &event.id,
                &event.event_type,
                EVENT_IGNORED,
                Some(message.as_str()),
            )
            .await?;
            return Err(AppError::BadRequest(message));
        }
    };

    match dispatch(&state, payload).await {
        Ok(outcome) => {
            StripeEventRepo::record(&state.pool, &event.id, &event.event_type, outcome, None)
                .await?;
            tracing::info!(event_id = %event.id, event_type = %event.event_type, outcome, "Webhook handled");
            Ok(Json(WebhookAck {
                received: true,
                duplicate: false,
                outcome,
            }))
        }
        Err(err) => {
            let message = err.to_string();
            tracing::error!(event_id = %event.id, event_type = %event.event_type, error = %message, "Webhook handling failed");
            if let Err(e) = StripeEventRepo::record(
                &state.pool,
                &event.id,
                &event.event_type,
                EVENT_FAILED,
                Some(message.as_str()),
            )
            .await
            {
                tracing::error!(event_id = %event.id, error = %e, "Failed to record webhook failure");
            }
            Err(AppError::InternalError(format!(
                "Webhook {} could not be processed",
                event.id
            )))
        }
    }
}

/// The typed `data.object` of the event types this API acts on.
enum EventPayload {
    CheckoutCompleted(CheckoutSessionObject),
    CheckoutExpired(CheckoutSessionObject),
    AsyncPaymentSucceeded(CheckoutSessionObject),
    AsyncPaymentFailed(CheckoutSessionObject),
    PaymentFailed(PaymentIntentObject),
    Unhandled(String),
}

impl EventPayload {
    fn decode(event: &WebhookEvent) -> Result<Self, serde_json::Error> {
        let object = || event.data.object.clone();
        Ok(match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => Self::CheckoutCompleted(serde_json::from_value(object())?),
            CHECKOUT_SESSION_EXPIRED => Self::CheckoutExpired(serde_json::from_value(object())?),
            CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED => {
                Self::AsyncPaymentSucceeded(serde_json::from_value(object())?)
            }
            CHECKOUT_SESSION_ASYNC_PAYMENT_FAILED => {
                Self::AsyncPaymentFailed(serde_json::from_value(object())?)
            }
            PAYMENT_INTENT_FAILED => Self::PaymentFailed(serde_json::from_value(object())?),
            other => Self::Unhandled(other.to_string()),
        })
    }
}

/// Route a decoded event to its handler. Returns the outcome to record.
async fn dispatch(state: &AppState, payload: EventPayload) -> AppResult<&'static str> {
    match payload {
        EventPayload::CheckoutCompleted(session) => checkout_completed(state, session).await,
        EventPayload::CheckoutExpired(session) => checkout_expired(state, session).await,
        EventPayload::AsyncPaymentSucceeded(session) => {
            let Some(license) = license_for_session(state, &session).await? else {
                tracing::warn!(session_id = %session.id, "Delayed payment matches no license");
                return Ok(EVENT_IGNORED);
            };
            activate_license(state, license, &session).await
        }
        EventPayload::AsyncPaymentFailed(session) => {
            let Some(license) = license_for_session(state, &session).await? else {
                return Ok(EVENT_IGNORED);
            };
            fail_license(state, license, ASYNC_PAYMENT_FAILED_REASON).await
        }
        EventPayload::PaymentFailed(intent) => payment_failed(state, intent).await,
        EventPayload::Unhandled(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring unhandled webhook type");
            Ok(EVENT_IGNORED)
        }
    }
}

async fn license_for_session(
    state: &AppState,
    session: &CheckoutSessionObject,
) -> AppResult<Option<License>> {
    if let Some(license) = LicenseRepo::find_by_checkout_session(&state.pool, &session.id).await? {
        return Ok(Some(license));
    }
    match license_id_from(&session.metadata, session.client_reference_id.as_deref()) {
        Some(id) => Ok(LicenseRepo::find_by_id(&state.pool, id).await?),
        None => Ok(None),
    }
}

async fn checkout_completed(
    state: &AppState,
    session: CheckoutSessionObject,
) -> AppResult<&'static str> {
    let Some(license) = license_for_session(state, &session).await? else {
        tracing::warn!(session_id = %session.id, "Completed checkout matches no license");
        return Ok(EVENT_IGNORED);
    };

    // Delayed payment methods complete the session before the money arrives.
    if session.payment_status.as_deref() == Some("unpaid") {
        if let Some(intent) = session.payment_intent.as_deref() {
            LicenseRepo::set_payment_intent(&state.pool, license.id, intent).await?;
        }
        tracing::info!(license_id = license.id, "Checkout completed without payment, waiting");
        return Ok(EVENT_PROCESSED);
    }

    activate_license(state, license, &session).await
}

async fn activate_license(
    state: &AppState,
    license: License,
    session: &CheckoutSessionObject,
) -> AppResult<&'static str> {
    let payment = PaymentDetails {
        payment_intent_id: session.payment_intent.clone(),
        customer_id: session.customer.clone(),
        amount_cents: session.amount_total,
        currency: session.currency.clone(),
    };
    let outcome = LicenseRepo::activate(&state.pool, license.id, &payment).await?;

    let (license, superseded) = match outcome {
        Some(ActivateOutcome::Activated {
            license,
            superseded,
        }) => (license, superseded),
        Some(ActivateOutcome::AlreadyActive(license)) => {
            tracing::debug!(license_id = license.id, "License already active");
            return Ok(EVENT_PROCESSED);
        }
        Some(ActivateOutcome::NotPending(license)) => {
            tracing::warn!(
                license_id = license.id,
                status = %license.status,
                "Completed checkout for a license that is no longer pending"
            );
            return Ok(EVENT_IGNORED);
        }
        None => return Ok(EVENT_IGNORED),
    };

    tracing::info!(
        license_id = license.id,
        user_id = license.user_id,
        tier = %license.tier,
        superseded = ?superseded,
        "License activated"
    );
    state.event_bus.publish(
        DomainEvent::new(bus::LICENSE_ACTIVATED)
            .with_entity("license", license.id)
            .with_actor(license.user_id)
            .with_payload(json!({
                "tier": license.tier,
                "seats": license.seats,
                "superseded": superseded,
            })),
    );

    if let Some(user) = UserRepo::find_by_id(&state.pool, license.user_id).await? {
        let receipt = templates::license_receipt(
            &user.email,
            &license.tier,
            license.seats,
            license.amount_cents,
            license.currency.as_deref(),
        );
        if let Err(e) = state.mailer.send(receipt).await {
            tracing::error!(license_id = license.id, mailer = state.mailer.name(), error = %e, "Receipt email failed");
        }
    }

    Ok(EVENT_PROCESSED)
}

async fn checkout_expired(
    state: &AppState,
    session: CheckoutSessionObject,
) -> AppResult<&'static str> {
    let Some(license) = license_for_session(state, &session).await? else {
        return Ok(EVENT_IGNORED);
    };

    let Some(license) =
        LicenseRepo::set_status(&state.pool, license.id, &[LICENSE_PENDING], LICENSE_EXPIRED, None)
            .await?
    else {
        tracing::debug!(license_id = license.id, status = %license.status, "Expired checkout left license unchanged");
        return Ok(EVENT_IGNORED);
    };

    tracing::info!(license_id = license.id, "License checkout expired");
    state.event_bus.publish(
        DomainEvent::new(bus::LICENSE_EXPIRED)
            .with_entity("license", license.id)
            .with_actor(license.user_id),
    );
    Ok(EVENT_PROCESSED)
}

async fn payment_failed(
    state: &AppState,
    intent: PaymentIntentObject,
) -> AppResult<&'static str> {
    let license = match LicenseRepo::find_by_payment_intent(&state.pool, &intent.id).await? {
        Some(license) => Some(license),
        None => match license_id_from(&intent.metadata, None) {
            Some(id) => LicenseRepo::find_by_id(&state.pool, id).await?,
            None => None,
        },
    };
    let Some(license) = license else {
        tracing::warn!(payment_intent = %intent.id, "Failed payment matches no license");
        return Ok(EVENT_IGNORED);
    };

    fail_license(state, license, &intent.failure_reason()).await
}

/// Move a pending license to `failed`, keeping `reason` on the row.
async fn fail_license(
    state: &AppState,
    license: License,
    reason: &str,
) -> AppResult<&'static str> {
    let Some(license) = LicenseRepo::set_status(
        &state.pool,
        license.id,
        &[LICENSE_PENDING],
        LICENSE_FAILED,
        Some(reason),
    )
    .await?
    else {
        return Ok(EVENT_IGNORED);
    };

    tracing::info!(license_id = license.id, reason = %reason, "License payment failed");
    state.event_bus.publish(
        DomainEvent::new(bus::LICENSE_FAILED)
            .with_entity("license", license.id)
            .with_actor(license.user_id)
            .with_payload(json!({ "reason": reason })),
    );
    Ok(EVENT_PROCESSED)
}
