//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /sign-up            -> sign_up
/// POST /sign-in            -> sign_in
/// POST /magic-link         -> request_magic_link
/// POST /magic-link/verify  -> verify_magic_link
/// GET  /session            -> current_session (requires auth)
/// POST /sign-out           -> sign_out (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-in", post(auth::sign_in))
        .route("/magic-link", post(auth::request_magic_link))
        .route("/magic-link/verify", post(auth::verify_magic_link))
        .route("/session", get(auth::current_session))
        .route("/sign-out", post(auth::sign_out))
}
