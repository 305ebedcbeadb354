//! Admin handlers for `/admin/files`: batch upload and asset management.

use atelier_core::error::CoreError;
use atelier_core::types::DbId;
use atelier_core::upload::{validate_prefix, DEFAULT_PREFIX};
use atelier_db::models::asset::{Asset, AssetFilter};
use atelier_db::repositories::{AssetRepo, ComponentRepo};
use atelier_events::bus::ASSET_DELETED;
use atelier_events::DomainEvent;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;
use crate::upload::{upload_batch, AssetView, BatchTarget, IncomingFile};

#[derive(Debug, Deserialize)]
pub struct FileListParams {
    pub component_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub id: DbId,
    pub disk: String,
    pub exists: bool,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}

async fn find_asset(state: &AppState, id: DbId) -> AppResult<Asset> {
    AssetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Asset", id }))
}

/// Objects are only addressable through the disk they were written to.
fn ensure_on_active_disk(state: &AppState, asset: &Asset) -> AppResult<()> {
    if asset.disk != state.storage.name() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Asset is stored on the '{}' disk, but '{}' is configured",
            asset.disk,
            state.storage.name()
        ))));
    }
    Ok(())
}

/// POST /api/admin/files
///
/// Multipart fields: one or more `files`, optional `prefix` and `component_id`.
/// Responds 201, 207 or 422 depending on how many files landed.
pub async fn upload_files(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let max_batch = state.config.upload.max_batch_bytes;
    let mut files = Vec::new();
    let mut received: usize = 0;
    let mut prefix: Option<String> = None;
    let mut component_id: Option<DbId> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("file-{}", files.len() + 1));
                let declared_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                received += data.len();
                if received > max_batch {
                    return Err(AppError::PayloadTooLarge(format!(
                        "Batch exceeds {max_batch} bytes"
                    )));
                }
                files.push(IncomingFile {
                    name: file_name,
                    declared_type,
                    data: data.to_vec(),
                });
            }
            "prefix" => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = value.trim().trim_matches('/').to_string();
                validate_prefix(&value)?;
                prefix = Some(value);
            }
            "component_id" => {
                let value = field.text().await.map_err(multipart_error)?;
                let id = value.trim().parse::<DbId>().map_err(|_| {
                    AppError::Core(CoreError::Validation(format!(
                        "component_id '{value}' is not a valid id"
                    )))
                })?;
                component_id = Some(id);
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    if files.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "The request contains no files".into(),
        )));
    }
    if let Some(id) = component_id {
        ComponentRepo::find_by_id(&state.pool, id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Component",
                id,
            }))?;
    }

    let target = BatchTarget {
        prefix: prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        component_id,
        uploaded_by: Some(admin.user_id),
    };
    let report = upload_batch(&state, files, &target).await;

    let status = report.status();
    Ok((
        status,
        Json(DataResponse {
            success: report.uploaded > 0,
            data: report,
        }),
    ))
}

/// GET /api/admin/files
pub async fn list_files(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<FileListParams>,
) -> AppResult<impl IntoResponse> {
    let filter = AssetFilter {
        component_id: params.component_id,
    };
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let assets = AssetRepo::list(&state.pool, &filter, limit, offset).await?;
    let total = AssetRepo::count(&state.pool, &filter).await?;
    let items = assets
        .into_iter()
        .map(|a| AssetView::new(a, state.storage.as_ref()))
        .collect();

    Ok(Json(PaginatedResponse::new(items, total, limit, offset)))
}

/// GET /api/admin/files/{id}
pub async fn get_file(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let asset = find_asset(&state, id).await?;
    Ok(Json(DataResponse::new(AssetView::new(
        asset,
        state.storage.as_ref(),
    ))))
}

/// DELETE /api/admin/files/{id}
///
/// Removes the object, then the row. An object that is already gone is fine.
/// Assets recorded on another disk are refused with 409 and left untouched.
pub async fn delete_file(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let asset = find_asset(&state, id).await?;
    ensure_on_active_disk(&state, &asset)?;

    let removed = state.storage.delete(&asset.object_key).await?;
    if !removed {
        tracing::warn!(asset_id = id, key = %asset.object_key, "Object was already missing");
    }
    AssetRepo::delete(&state.pool, id).await?;

    tracing::info!(asset_id = id, user_id = admin.user_id, "Asset deleted");
    state.event_bus.publish(
        DomainEvent::new(ASSET_DELETED)
            .with_entity("asset", id)
            .with_actor(admin.user_id)
            .with_payload(json!({ "object_key": asset.object_key, "object_removed": removed })),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/files/{id}/exists
///
/// Asks the disk whether the object is still there.
pub async fn file_exists(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let asset = find_asset(&state, id).await?;
    ensure_on_active_disk(&state, &asset)?;

    let exists = state.storage.exists(&asset.object_key).await?;
    Ok(Json(DataResponse::new(ExistsResponse {
        id,
        disk: asset.disk,
        exists,
    })))
}
