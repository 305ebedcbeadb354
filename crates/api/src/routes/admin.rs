//! Route definitions for the `/admin` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{categories, components, files, licenses, subcategories, users, versions};
use crate::state::AppState;

/// Headroom on top of the batch limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /categories                                  -> list_categories
/// POST   /categories                                  -> create_category
/// GET    /categories/{id}                             -> get_category
/// PUT    /categories/{id}                             -> update_category
/// DELETE /categories/{id}                             -> delete_category
///
/// GET    /subcategories                               -> list_subcategories
/// POST   /subcategories                               -> create_subcategory
/// GET    /subcategories/{id}                          -> get_subcategory
/// PUT    /subcategories/{id}                          -> update_subcategory
/// DELETE /subcategories/{id}                          -> delete_subcategory
///
/// GET    /components                                  -> list_components
/// POST   /components                                  -> create_component
/// GET    /components/{id}                             -> get_component
/// PUT    /components/{id}                             -> update_component
/// DELETE /components/{id}                             -> delete_component
/// POST   /components/{id}/publish                     -> publish_component
/// POST   /components/{id}/archive                     -> archive_component
///
/// GET    /components/{component_id}/versions          -> list_versions
/// POST   /components/{component_id}/versions          -> create_version
/// GET    /components/{component_id}/versions/{id}     -> get_version
/// PUT    /components/{component_id}/versions/{id}     -> update_version
/// DELETE /components/{component_id}/versions/{id}     -> delete_version
/// PUT    /components/{component_id}/versions/{id}/set-default -> set_default_version
///
/// GET    /licenses                                    -> list_licenses
/// POST   /licenses/{id}/revoke                        -> revoke_license
///
/// GET    /users                                       -> list_users
/// GET    /users/{id}                                  -> get_user
/// PUT    /users/{id}                                  -> update_user
///
/// GET    /files                                       -> list_files
/// POST   /files                                       -> upload_files (multipart)
/// GET    /files/{id}                                  -> get_file
/// DELETE /files/{id}                                  -> delete_file
/// GET    /files/{id}/exists                           -> file_exists
/// ```
///
/// `max_batch_bytes` bounds the multipart upload body.
pub fn router(max_batch_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/subcategories",
            get(subcategories::list_subcategories).post(subcategories::create_subcategory),
        )
        .route(
            "/subcategories/{id}",
            get(subcategories::get_subcategory)
                .put(subcategories::update_subcategory)
                .delete(subcategories::delete_subcategory),
        )
        .route(
            "/components",
            get(components::list_components).post(components::create_component),
        )
        .route(
            "/components/{id}",
            get(components::get_component)
                .put(components::update_component)
                .delete(components::delete_component),
        )
        .route("/components/{id}/publish", post(components::publish_component))
        .route("/components/{id}/archive", post(components::archive_component))
        .route(
            "/components/{component_id}/versions",
            get(versions::list_versions).post(versions::create_version),
        )
        .route(
            "/components/{component_id}/versions/{id}",
            get(versions::get_version)
                .put(versions::update_version)
                .delete(versions::delete_version),
        )
        .route(
            "/components/{component_id}/versions/{id}/set-default",
            put(versions::set_default_version),
        )
        .route("/licenses", get(licenses::list_licenses))
        .route("/licenses/{id}/revoke", post(licenses::revoke_license))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user).put(users::update_user))
        .route(
            "/files",
            get(files::list_files).post(files::upload_files).layer((
                DefaultBodyLimit::disable(),
                RequestBodyLimitLayer::new(max_batch_bytes + MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route(
            "/files/{id}",
            get(files::get_file).delete(files::delete_file),
        )
        .route("/files/{id}/exists", get(files::file_exists))
}
