pub mod admin;
pub mod auth;
pub mod health;
pub mod public;
pub mod webhooks;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/sign-up                                    password sign-up
/// /auth/sign-in                                    password sign-in
/// /auth/magic-link                                 request a sign-in link
/// /auth/magic-link/verify                          exchange a link for a session
/// /auth/session                                    current session
/// /auth/sign-out                                   revoke the current session
///
/// /admin/categories                                list, create
/// /admin/categories/{id}                           get, update, delete
/// /admin/subcategories                             list, create
/// /admin/subcategories/{id}                        get, update, delete
/// /admin/components                                list, create
/// /admin/components/{id}                           get, update, delete
/// /admin/components/{id}/publish                   publish (POST)
/// /admin/components/{id}/archive                   archive (POST)
/// /admin/components/{component_id}/versions        list, create
/// /admin/components/{component_id}/versions/{id}   get, update, delete
/// /admin/components/{component_id}/versions/{id}/set-default
/// /admin/licenses                                  list
/// /admin/licenses/{id}/revoke                      revoke (POST)
/// /admin/users                                     list
/// /admin/users/{id}                                get, update
/// /admin/files                                     list, batch upload
/// /admin/files/{id}                                get, delete
/// /admin/files/{id}/exists                         disk lookup
///
/// /public/categories                               published tree
/// /public/categories/{slug}                        category with components
/// /public/components                               published components
/// /public/components/{slug}                        component detail
/// /public/components/{slug}/code                   version code (tier gated)
/// /public/checkout                                 start a Stripe checkout
/// /public/licenses                                 caller's licenses
///
/// /webhooks/stripe                                 Stripe event receiver
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router(config.upload.max_batch_bytes))
        .nest("/public", public::router())
        .nest("/webhooks", webhooks::router())
}
