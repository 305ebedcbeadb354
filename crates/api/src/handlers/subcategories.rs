//! Admin handlers for `/admin/subcategories`.

use atelier_core::catalog::{resolve_slug, validate_slug};
use atelier_core::error::CoreError;
use atelier_core::types::DbId;
use atelier_db::models::subcategory::{CreateSubcategory, UpdateSubcategory};
use atelier_db::repositories::{CategoryRepo, ComponentRepo, NewSubcategory, SubcategoryRepo};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubcategoryListParams {
    pub category_id: Option<DbId>,
}

async fn ensure_category(state: &AppState, id: DbId) -> AppResult<()> {
    CategoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id,
        }))?;
    Ok(())
}

/// GET /api/admin/subcategories
pub async fn list_subcategories(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<SubcategoryListParams>,
) -> AppResult<impl IntoResponse> {
    let items = SubcategoryRepo::list(&state.pool, params.category_id).await?;
    Ok(Json(DataResponse::new(items)))
}

/// POST /api/admin/subcategories
pub async fn create_subcategory(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateSubcategory>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    ensure_category(&state, input.category_id).await?;
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;

    let subcategory = SubcategoryRepo::create(
        &state.pool,
        &NewSubcategory {
            category_id: input.category_id,
            name: input.name.trim(),
            slug: &slug,
            description: input.description.as_deref(),
            sort_order: input.sort_order.unwrap_or(0),
            is_published: input.is_published.unwrap_or(false),
        },
    )
    .await?;

    tracing::info!(
        subcategory_id = subcategory.id,
        category_id = subcategory.category_id,
        user_id = admin.user_id,
        "Subcategory created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse::new(subcategory))))
}

/// GET /api/admin/subcategories/{id}
pub async fn get_subcategory(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let subcategory = SubcategoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Subcategory",
            id,
        }))?;

    Ok(Json(DataResponse::new(subcategory)))
}

/// PUT /api/admin/subcategories/{id}
pub async fn update_subcategory(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSubcategory>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(slug) = &input.slug {
        validate_slug(slug)?;
    }
    if let Some(category_id) = input.category_id {
        ensure_category(&state, category_id).await?;
    }

    let subcategory = SubcategoryRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Subcategory",
            id,
        }))?;

    tracing::info!(subcategory_id = id, user_id = admin.user_id, "Subcategory updated");
    Ok(Json(DataResponse::new(subcategory)))
}

/// DELETE /api/admin/subcategories/{id}
///
/// Refused with 409 while components reference the subcategory.
pub async fn delete_subcategory(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let components = ComponentRepo::count_by_subcategory(&state.pool, id).await?;
    if components > 0 {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Subcategory still has {components} components"
        ))));
    }

    if !SubcategoryRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Subcategory",
            id,
        }));
    }

    tracing::info!(subcategory_id = id, user_id = admin.user_id, "Subcategory deleted");
    Ok(StatusCode::NO_CONTENT)
}
