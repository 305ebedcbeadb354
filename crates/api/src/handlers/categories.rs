//! Admin handlers for `/admin/categories`.

use atelier_core::catalog::{resolve_slug, validate_slug};
use atelier_core::error::CoreError;
use atelier_core::search::ilike_pattern;
use atelier_core::types::DbId;
use atelier_db::models::category::{CreateCategory, UpdateCategory};
use atelier_db::repositories::{CategoryRepo, NewCategory, SubcategoryRepo};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

/// `?search=&published=&limit=&offset=`
#[derive(Debug, Deserialize)]
pub struct CategoryListParams {
    pub search: Option<String>,
    pub published: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/categories
pub async fn list_categories(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<CategoryListParams>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let pattern = ilike_pattern(params.search.as_deref());

    let items =
        CategoryRepo::list(&state.pool, pattern.as_deref(), params.published, limit, offset)
            .await?;
    let total = CategoryRepo::count(&state.pool, pattern.as_deref(), params.published).await?;

    Ok(Json(PaginatedResponse::new(items, total, limit, offset)))
}

/// POST /api/admin/categories
pub async fn create_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateCategory>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;

    let category = CategoryRepo::create(
        &state.pool,
        &NewCategory {
            name: input.name.trim(),
            slug: &slug,
            description: input.description.as_deref(),
            icon: input.icon.as_deref(),
            sort_order: input.sort_order.unwrap_or(0),
            is_published: input.is_published.unwrap_or(false),
        },
    )
    .await?;

    tracing::info!(category_id = category.id, slug = %category.slug, user_id = admin.user_id, "Category created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(category))))
}

/// GET /api/admin/categories/{id}
pub async fn get_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let category = CategoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id,
        }))?;

    Ok(Json(DataResponse::new(category)))
}

/// PUT /api/admin/categories/{id}
pub async fn update_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(slug) = &input.slug {
        validate_slug(slug)?;
    }

    let category = CategoryRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id,
        }))?;

    tracing::info!(category_id = id, user_id = admin.user_id, "Category updated");
    Ok(Json(DataResponse::new(category)))
}

/// DELETE /api/admin/categories/{id}
///
/// Refused with 409 while subcategories still belong to the category.
pub async fn delete_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let children = SubcategoryRepo::count_by_category(&state.pool, id).await?;
    if children > 0 {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Category still has {children} subcategories"
        ))));
    }

    if !CategoryRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id,
        }));
    }

    tracing::info!(category_id = id, user_id = admin.user_id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
