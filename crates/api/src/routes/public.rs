//! Route definitions for the `/public` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{catalog, licenses};
use crate::state::AppState;

/// Routes mounted at `/public`.
///
/// Catalog reads accept anonymous callers; checkout and licenses need a session.
///
/// ```text
/// GET  /categories               -> list_categories
/// GET  /categories/{slug}        -> get_category
/// GET  /components               -> list_components
/// GET  /components/{slug}        -> get_component
/// GET  /components/{slug}/code   -> get_component_code
/// POST /checkout                 -> start_checkout (requires auth)
/// GET  /licenses                 -> my_licenses (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::list_categories))
        .route("/categories/{slug}", get(catalog::get_category))
        .route("/components", get(catalog::list_components))
        .route("/components/{slug}", get(catalog::get_component))
        .route("/components/{slug}/code", get(catalog::get_component_code))
        .route("/checkout", post(licenses::start_checkout))
        .route("/licenses", get(licenses::my_licenses))
}
