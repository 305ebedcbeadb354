//! Shared application router builder.
//!
//! Provides [`build_app_router`] so both the production binary (`main.rs`)
//! and integration tests (`tests/common/mod.rs`) use the exact same middleware
//! stack.

use std::time::Duration;

use atelier_storage::{DiskKind, StorageConfig};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Build the full application [`Router`] with all middleware layers.
///
/// When the local disk is configured with a path-only public URL
/// (`/uploads`), its files are served from that path as well.
///
/// The middleware stack is applied bottom-up:
///
/// 1. CORS
/// 2. Set request ID on incoming requests
/// 3. Structured request/response tracing
/// 4. Propagate request ID to response
/// 5. Request timeout
/// 6. Panic recovery (catch panics, return 500)
pub fn build_app_router(state: AppState, config: &ServerConfig, storage: &StorageConfig) -> Router {
    let cors = build_cors_layer(config);
    let request_id_header = HeaderName::from_static("x-request-id");

    let mut router = Router::new()
        // Health check at root level (not under /api).
        .merge(routes::health::router())
        .nest("/api", routes::api_routes(config));

    if let Some(mount) = local_files_mount(storage) {
        tracing::info!(path = %mount, root = %storage.local_root.display(), "Serving local uploads");
        router = router.nest_service(&mount, ServeDir::new(&storage.local_root));
    }

    router
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500 JSON.
        .layer(CatchPanicLayer::new())
        // Request timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        // CORS.
        .layer(cors)
        // Shared state.
        .with_state(state)
}

/// Path under which the local disk is served, if any.
///
/// Absolute public URLs (a CDN in front of the disk) are not mounted.
pub fn local_files_mount(storage: &StorageConfig) -> Option<String> {
    if storage.disk != DiskKind::Local {
        return None;
    }
    let path = storage.public_url.trim_end_matches('/');
    if !path.starts_with('/') || path.len() < 2 || path.starts_with("/api") || path == "/health" {
        return None;
    }
    Some(path.to_string())
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid, which is the
/// desired behaviour -- we want misconfiguration to fail fast.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(vars: &[(&str, &str)]) -> StorageConfig {
        StorageConfig::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn local_disk_is_mounted_at_its_public_path() {
        assert_eq!(
            local_files_mount(&storage(&[("STORAGE_PUBLIC_URL", "/uploads/")])).as_deref(),
            Some("/uploads")
        );
        assert_eq!(local_files_mount(&storage(&[])).as_deref(), Some("/uploads"));
    }

    #[test]
    fn absolute_or_reserved_public_urls_are_not_mounted() {
        assert_eq!(
            local_files_mount(&storage(&[("STORAGE_PUBLIC_URL", "https://cdn.example.com")])),
            None
        );
        assert_eq!(
            local_files_mount(&storage(&[("STORAGE_PUBLIC_URL", "/api/files")])),
            None
        );
        assert_eq!(local_files_mount(&storage(&[("STORAGE_PUBLIC_URL", "/")])), None);
    }

    #[test]
    fn remote_disks_are_never_mounted() {
        let config = storage(&[("STORAGE_DISK", "s3"), ("S3_BUCKET", "atelier")]);
        assert_eq!(local_files_mount(&config), None);
    }
}
