//! Admin handlers for `/admin/components/{component_id}/versions`.
//!
//! The default-version invariant lives in [`ComponentVersionRepo`]; these
//! handlers validate input, map missing rows to 404 and announce default
//! changes on the event bus.

use atelier_core::catalog::{validate_css_framework, validate_framework};
use atelier_core::error::CoreError;
use atelier_core::types::DbId;
use atelier_db::models::component_version::{CreateComponentVersion, UpdateComponentVersion};
use atelier_db::repositories::{ComponentRepo, ComponentVersionRepo};
use atelier_events::bus::VERSION_DEFAULT_CHANGED;
use atelier_events::DomainEvent;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

fn version_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "ComponentVersion",
        id,
    })
}

fn validate_dependencies(dependencies: Option<&serde_json::Value>) -> Result<(), CoreError> {
    match dependencies {
        None | Some(serde_json::Value::Object(_)) => Ok(()),
        Some(_) => Err(CoreError::Validation(
            "dependencies must be an object of package name to version".into(),
        )),
    }
}

fn announce_default(state: &AppState, component_id: DbId, version_id: DbId, actor: DbId) {
    state.event_bus.publish(
        DomainEvent::new(VERSION_DEFAULT_CHANGED)
            .with_entity("component", component_id)
            .with_actor(actor)
            .with_payload(json!({ "version_id": version_id })),
    );
}

/// GET /api/admin/components/{component_id}/versions
pub async fn list_versions(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(component_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ComponentRepo::find_by_id(&state.pool, component_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Component",
            id: component_id,
        }))?;
    let versions = ComponentVersionRepo::list_by_component(&state.pool, component_id).await?;

    Ok(Json(DataResponse::new(versions)))
}

/// POST /api/admin/components/{component_id}/versions
///
/// The first version becomes the default whatever `is_default` says.
pub async fn create_version(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(component_id): Path<DbId>,
    Json(input): Json<CreateComponentVersion>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_framework(&input.framework)?;
    validate_css_framework(&input.css_framework)?;
    validate_dependencies(input.dependencies.as_ref())?;

    let version = ComponentVersionRepo::create(&state.pool, component_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Component",
            id: component_id,
        }))?;

    tracing::info!(
        component_id,
        version_id = version.id,
        framework = %version.framework,
        css_framework = %version.css_framework,
        is_default = version.is_default,
        user_id = admin.user_id,
        "Component version created",
    );
    if version.is_default {
        announce_default(&state, component_id, version.id, admin.user_id);
    }

    Ok((StatusCode::CREATED, Json(DataResponse::new(version))))
}

/// GET /api/admin/components/{component_id}/versions/{id}
pub async fn get_version(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((component_id, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let version = ComponentVersionRepo::find_for_component(&state.pool, component_id, id)
        .await?
        .ok_or_else(|| version_not_found(id))?;

    Ok(Json(DataResponse::new(version)))
}

/// PUT /api/admin/components/{component_id}/versions/{id}
pub async fn update_version(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((component_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateComponentVersion>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(framework) = &input.framework {
        validate_framework(framework)?;
    }
    if let Some(css_framework) = &input.css_framework {
        validate_css_framework(css_framework)?;
    }
    validate_dependencies(input.dependencies.as_ref())?;

    let version = ComponentVersionRepo::update(&state.pool, component_id, id, &input)
        .await?
        .ok_or_else(|| version_not_found(id))?;

    tracing::info!(component_id, version_id = id, user_id = admin.user_id, "Component version updated");
    Ok(Json(DataResponse::new(version)))
}

/// DELETE /api/admin/components/{component_id}/versions/{id}
///
/// Deleting the default promotes the newest remaining version.
pub async fn delete_version(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((component_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let deletion = ComponentVersionRepo::delete(&state.pool, component_id, id)
        .await?
        .ok_or_else(|| version_not_found(id))?;

    tracing::info!(
        component_id,
        version_id = id,
        was_default = deletion.was_default,
        promoted_id = ?deletion.promoted_id,
        user_id = admin.user_id,
        "Component version deleted",
    );
    if let Some(promoted) = deletion.promoted_id {
        announce_default(&state, component_id, promoted, admin.user_id);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/components/{component_id}/versions/{id}/set-default
pub async fn set_default_version(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((component_id, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let version = ComponentVersionRepo::set_default(&state.pool, component_id, id)
        .await?
        .ok_or_else(|| version_not_found(id))?;

    tracing::info!(component_id, version_id = id, user_id = admin.user_id, "Default version set");
    announce_default(&state, component_id, id, admin.user_id);

    Ok(Json(DataResponse::new(version)))
}
