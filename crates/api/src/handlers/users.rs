//! Admin handlers for `/admin/users`.

use atelier_core::error::CoreError;
use atelier_core::roles::{validate_role, ROLE_ADMIN};
use atelier_core::search::ilike_pattern;
use atelier_core::types::DbId;
use atelier_db::models::user::UpdateUser;
use atelier_db::repositories::{SessionRepo, UserRepo};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::SearchParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

/// GET /api/admin/users
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = params.page();
    let pattern = ilike_pattern(params.search.as_deref());

    let users = UserRepo::list(&state.pool, pattern.as_deref(), limit, offset).await?;
    let total = UserRepo::count(&state.pool, pattern.as_deref()).await?;

    Ok(Json(PaginatedResponse::new(users, total, limit, offset)))
}

/// GET /api/admin/users/{id}
pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    Ok(Json(DataResponse::new(user)))
}

/// PUT /api/admin/users/{id}
///
/// Deactivating a user revokes all of their sessions. Admins cannot
/// deactivate or demote themselves.
pub async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUser>,
) -> AppResult<impl IntoResponse> {
    if let Some(role) = &input.role {
        validate_role(role)?;
    }
    if let Some(name) = &input.name {
        if name.trim().is_empty() || name.chars().count() > 200 {
            return Err(AppError::Core(CoreError::Validation(
                "Name must be between 1 and 200 characters".into(),
            )));
        }
    }
    if id == admin.user_id
        && (input.is_active == Some(false)
            || input.role.as_deref().is_some_and(|r| r != ROLE_ADMIN))
    {
        return Err(AppError::BadRequest(
            "Administrators cannot deactivate or demote themselves".into(),
        ));
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    if input.is_active == Some(false) {
        let revoked = SessionRepo::revoke_all_for_user(&state.pool, id).await?;
        tracing::info!(user_id = id, revoked, "Sessions revoked for deactivated user");
    }

    tracing::info!(user_id = id, admin_id = admin.user_id, "User updated");
    Ok(Json(DataResponse::new(user)))
}
