//! Route definitions for `/webhooks`.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// ```text
/// POST /stripe  -> stripe_webhook (signature verified, no session)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(webhooks::stripe_webhook))
}
