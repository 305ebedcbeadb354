//! Handlers for `/auth`: password sign-up/sign-in, magic links, sessions.

use atelier_core::error::CoreError;
use atelier_core::tier::Tier;
use atelier_core::types::Timestamp;
use atelier_db::models::account::{PROVIDER_CREDENTIAL, PROVIDER_MAGIC_LINK};
use atelier_db::models::session::CreateSession;
use atelier_db::models::user::{CreateUser, User};
use atelier_db::repositories::{AccountRepo, MagicLinkRepo, SessionRepo, UserRepo};
use atelier_events::bus::USER_SIGNED_UP;
use atelier_events::mail::templates;
use atelier_events::DomainEvent;
use axum::extract::State;
use axum::http::header::{SET_COOKIE, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::auth::magic_link::{issue_token, validate_token, verify_url};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::auth::session::{clear_session_cookie, generate_session_token, session_cookie};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::tiers::effective_tier;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MagicLinkRequest {
    #[validate(email)]
    pub email: String,
    /// Same-site path to land on after verification.
    #[validate(length(max = 500))]
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: Timestamp,
}

/// Body of every successful sign-in.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub tier: Tier,
    pub session: SessionToken,
}

#[derive(Debug, Serialize)]
pub struct CurrentSession {
    pub user: User,
    pub tier: Tier,
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized("Invalid email or password".into()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/sign-up
///
/// Create a user with a password credential and sign them in.
pub async fn sign_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SignUpRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let email = normalize_email(&input.email);
    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "An account with this email already exists".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            name: input.name,
            role: None,
            email_verified: false,
        },
    )
    .await?;
    AccountRepo::create_credential(&state.pool, user.id, &password_hash).await?;

    tracing::info!(user_id = user.id, "User signed up");
    state.event_bus.publish(
        DomainEvent::new(USER_SIGNED_UP)
            .with_entity("user", user.id)
            .with_actor(user.id)
            .with_payload(json!({ "provider": PROVIDER_CREDENTIAL })),
    );

    let (body, cookie) = open_session(&state, user, &headers).await?;
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(DataResponse::new(body)),
    ))
}

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SignInRequest>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let account = AccountRepo::find(&state.pool, user.id, PROVIDER_CREDENTIAL)
        .await?
        .ok_or_else(invalid_credentials)?;
    let hash = account.password_hash.as_deref().ok_or_else(invalid_credentials)?;

    let valid = verify_password(&input.password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        tracing::info!(user_id = user.id, "Sign-in rejected: wrong password");
        return Err(invalid_credentials());
    }

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let (body, cookie) = open_session(&state, user, &headers).await?;
    Ok(([(SET_COOKIE, cookie)], Json(DataResponse::new(body))))
}

/// POST /api/auth/magic-link
///
/// Always 202, whether or not the address belongs to a user.
pub async fn request_magic_link(
    State(state): State<AppState>,
    Json(input): Json<MagicLinkRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let email = normalize_email(&input.email);
    let auth = &state.config.auth;

    let (token, claims) = issue_token(&email, &auth.secret, auth.magic_link_ttl_mins)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let expires_at = claims.expires_at();
    MagicLinkRepo::create(&state.pool, &claims.jti, &email, expires_at).await?;

    let link = verify_url(&auth.app_url, &token, input.callback_url.as_deref());
    if let Err(e) = state
        .mailer
        .send(templates::magic_link(&email, &link, expires_at))
        .await
    {
        // The response must not reveal delivery problems for a given address.
        tracing::error!(mailer = state.mailer.name(), error = %e, "Magic link email failed");
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse::new(json!({ "sent": true }))),
    ))
}

/// POST /api/auth/magic-link/verify
///
/// Consume a magic-link token and sign in, creating the user on first use.
pub async fn verify_magic_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<VerifyRequest>,
) -> AppResult<impl IntoResponse> {
    let claims = validate_token(&input.token, &state.config.auth.secret).map_err(|_| {
        AppError::Core(CoreError::Unauthorized("Invalid or expired sign-in link".into()))
    })?;

    let consumed = MagicLinkRepo::consume(&state.pool, &claims.jti)
        .await?
        .filter(|row| row.email == claims.sub)
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Sign-in link was already used or has expired".into(),
            ))
        })?;

    let user = match UserRepo::find_by_email(&state.pool, &consumed.email).await? {
        Some(user) => {
            if !user.is_active {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Account is deactivated".into(),
                )));
            }
            if user.email_verified_at.is_none() {
                UserRepo::mark_email_verified(&state.pool, user.id).await?;
            }
            user
        }
        None => {
            let name = consumed
                .email
                .split('@')
                .next()
                .unwrap_or(&consumed.email)
                .to_string();
            let user = UserRepo::create(
                &state.pool,
                &CreateUser {
                    email: consumed.email.clone(),
                    name,
                    role: None,
                    email_verified: true,
                },
            )
            .await?;
            tracing::info!(user_id = user.id, "User created from magic link");
            state.event_bus.publish(
                DomainEvent::new(USER_SIGNED_UP)
                    .with_entity("user", user.id)
                    .with_actor(user.id)
                    .with_payload(json!({ "provider": PROVIDER_MAGIC_LINK })),
            );
            user
        }
    };
    AccountRepo::link_provider(&state.pool, user.id, PROVIDER_MAGIC_LINK).await?;

    let (body, cookie) = open_session(&state, user, &headers).await?;
    Ok(([(SET_COOKIE, cookie)], Json(DataResponse::new(body))))
}

/// GET /api/auth/session
pub async fn current_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))?;
    let tier = effective_tier(&state.pool, user.id).await?;

    Ok(Json(DataResponse::new(CurrentSession { user, tier })))
}

/// POST /api/auth/sign-out
///
/// Revoke the current session and clear the cookie. Returns 204.
pub async fn sign_out(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    SessionRepo::revoke(&state.pool, auth_user.session_id).await?;
    tracing::info!(user_id = auth_user.user_id, "User signed out");

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_session_cookie(state.config.auth.cookie_secure))],
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Persist a new session for `user` and build the response body and cookie.
async fn open_session(
    state: &AppState,
    user: User,
    headers: &HeaderMap,
) -> AppResult<(AuthResponse, String)> {
    let auth = &state.config.auth;
    let (token, token_hash) = generate_session_token();
    let expires_at = Utc::now() + Duration::days(auth.session_ttl_days);

    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            token_hash,
            expires_at,
            user_agent: header_string(headers, USER_AGENT.as_str(), 500),
            ip_address: client_ip(headers),
        },
    )
    .await?;
    UserRepo::record_login(&state.pool, user.id).await?;

    let tier = effective_tier(&state.pool, user.id).await?;
    let cookie = session_cookie(&token, auth.session_ttl_days * 86_400, auth.cookie_secure);

    tracing::info!(user_id = user.id, "Session opened");
    Ok((
        AuthResponse {
            user,
            tier,
            session: SessionToken { token, expires_at },
        },
        cookie,
    ))
}

fn header_string(headers: &HeaderMap, name: &str, max_len: usize) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.chars().take(max_len).collect())
}

/// First hop of `X-Forwarded-For`, as set by the reverse proxy.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_string(headers, "x-forwarded-for", 200)
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
}
