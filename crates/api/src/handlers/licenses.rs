//! Checkout and license handlers.
//!
//! - `POST /public/checkout` opens a pending license and a Stripe Checkout Session.
//! - `GET /public/licenses` lists the caller's licenses.
//! - `/admin/licenses` lists and revokes licenses.
//!
//! Activation happens in the Stripe webhook, never here.

use atelier_core::error::CoreError;
use atelier_core::license::{LicenseStatus, LICENSE_PENDING};
use atelier_core::tier::Tier;
use atelier_core::types::DbId;
use atelier_db::models::license::{CreateLicense, LicenseFilter};
use atelier_db::repositories::LicenseRepo;
use atelier_events::bus::LICENSE_REVOKED;
use atelier_events::DomainEvent;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;
use crate::stripe::CheckoutRequest;
use crate::tiers::effective_tier;

#[derive(Debug, Deserialize)]
pub struct StartCheckout {
    pub tier: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutStarted {
    pub checkout_url: String,
    pub session_id: String,
    pub license_id: DbId,
}

/// `?status=&user_id=&limit=&offset=`
#[derive(Debug, Deserialize)]
pub struct LicenseListParams {
    pub status: Option<String>,
    pub user_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// POST /api/public/checkout
///
/// 400 for the free tier, 409 when the caller already holds this tier or a
/// higher one, 503 when Stripe is not configured for it.
pub async fn start_checkout(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StartCheckout>,
) -> AppResult<impl IntoResponse> {
    let tier = Tier::parse(&input.tier)?;
    if !tier.is_purchasable() {
        return Err(AppError::BadRequest(format!(
            "The {tier} tier cannot be purchased"
        )));
    }

    let current = effective_tier(&state.pool, user.user_id).await?;
    if current >= tier {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "You already have {current} access"
        ))));
    }

    let provider = state
        .checkout
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Checkout is not configured".into()))?;
    let stripe = &state.config.stripe;
    let price_id = stripe.price_for(tier).ok_or_else(|| {
        AppError::ServiceUnavailable(format!("No price is configured for the {tier} tier"))
    })?;

    let license = LicenseRepo::create_pending(
        &state.pool,
        &CreateLicense {
            user_id: user.user_id,
            tier: tier.as_str().to_string(),
            seats: tier.default_seats(),
            amount_cents: None,
            currency: None,
        },
    )
    .await?;

    let request = CheckoutRequest {
        price_id: price_id.to_string(),
        quantity: 1,
        customer_email: user.email.clone(),
        client_reference_id: license.id.to_string(),
        metadata: vec![
            ("license_id".to_string(), license.id.to_string()),
            ("user_id".to_string(), user.user_id.to_string()),
            ("tier".to_string(), tier.as_str().to_string()),
        ],
        success_url: stripe.success_url.clone(),
        cancel_url: stripe.cancel_url.clone(),
    };

    let session = match provider.create_checkout_session(&request).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(license_id = license.id, error = %e, "Checkout session creation failed");
            LicenseRepo::set_status(
                &state.pool,
                license.id,
                &[LICENSE_PENDING],
                LicenseStatus::Failed.as_str(),
                Some("checkout session could not be created"),
            )
            .await?;
            return Err(AppError::ServiceUnavailable(
                "The payment provider is unavailable, try again later".into(),
            ));
        }
    };

    LicenseRepo::attach_checkout_session(&state.pool, license.id, &session.id).await?;
    tracing::info!(
        license_id = license.id,
        user_id = user.user_id,
        tier = %tier,
        session_id = %session.id,
        "Checkout started",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(CheckoutStarted {
            checkout_url: session.url,
            session_id: session.id,
            license_id: license.id,
        })),
    ))
}

/// GET /api/public/licenses
pub async fn my_licenses(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let licenses = LicenseRepo::list_for_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse::new(licenses)))
}

/// GET /api/admin/licenses
pub async fn list_licenses(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<LicenseListParams>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(|s| LicenseStatus::parse(s).map(|s| s.as_str().to_string()))
        .transpose()?;
    let filter = LicenseFilter {
        status,
        user_id: params.user_id,
    };
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let items = LicenseRepo::list(&state.pool, &filter, limit, offset).await?;
    let total = LicenseRepo::count(&state.pool, &filter).await?;

    Ok(Json(PaginatedResponse::new(items, total, limit, offset)))
}

/// POST /api/admin/licenses/{id}/revoke
///
/// Only `pending` and `active` licenses can be revoked; anything else is 409.
pub async fn revoke_license(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let license = LicenseRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "License",
            id,
        }))?;

    let current = LicenseStatus::parse(&license.status)?;
    current.ensure_transition(LicenseStatus::Revoked)?;

    let reason = format!("revoked by administrator {}", admin.user_id);
    let revoked = LicenseRepo::set_status(
        &state.pool,
        id,
        &[current.as_str()],
        LicenseStatus::Revoked.as_str(),
        Some(reason.as_str()),
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "License changed state while being revoked".into(),
        ))
    })?;

    tracing::info!(license_id = id, user_id = admin.user_id, from = %current.as_str(), "License revoked");
    state.event_bus.publish(
        DomainEvent::new(LICENSE_REVOKED)
            .with_entity("license", id)
            .with_actor(admin.user_id)
            .with_payload(json!({ "user_id": revoked.user_id, "tier": revoked.tier })),
    );

    Ok(Json(DataResponse::new(revoked)))
}
