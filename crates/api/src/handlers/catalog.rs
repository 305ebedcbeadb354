//! Public catalog handlers under `/public`.
//!
//! Only published content is visible. Listings never carry code; the code
//! endpoint enforces the caller's tier (admins bypass gating).

use atelier_core::catalog::{validate_css_framework, validate_framework, STATUS_PUBLISHED};
use atelier_core::error::CoreError;
use atelier_core::search::ilike_pattern;
use atelier_core::tier::Tier;
use atelier_core::types::DbId;
use atelier_db::models::category::{Category, CategorySummary};
use atelier_db::models::component::Component;
use atelier_db::models::component_version::ComponentVersionSummary;
use atelier_db::models::subcategory::SubcategorySummary;
use atelier_db::repositories::{
    CategoryRepo, ComponentRepo, ComponentVersionRepo, SubcategoryRepo,
};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::components::ComponentListParams;
use crate::middleware::auth::OptionalUser;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;
use crate::tiers::Viewer;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CategoryTree {
    #[serde(flatten)]
    pub category: CategorySummary,
    pub subcategories: Vec<SubcategorySummary>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<SubcategorySummary>,
}

/// A published component as seen by one caller.
#[derive(Debug, Serialize)]
pub struct PublicComponent {
    #[serde(flatten)]
    pub component: Component,
    /// `true` when the caller's tier cannot read the code.
    pub locked: bool,
}

#[derive(Debug, Serialize)]
pub struct PublicComponentDetail {
    #[serde(flatten)]
    pub component: PublicComponent,
    pub versions: Vec<ComponentVersionSummary>,
}

/// `?framework=&css_framework=&version_id=`
#[derive(Debug, Deserialize)]
pub struct CodeParams {
    pub framework: Option<String>,
    pub css_framework: Option<String>,
    pub version_id: Option<DbId>,
}

fn component_by_slug_not_found(slug: &str) -> AppError {
    AppError::Core(CoreError::NotFoundBySlug {
        entity: "Component",
        slug: slug.to_string(),
    })
}

fn present(component: Component, viewer: &Viewer) -> AppResult<PublicComponent> {
    let required = Tier::parse(&component.tier)?;
    Ok(PublicComponent {
        locked: !viewer.can_read(required),
        component,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/public/categories
///
/// Published categories with their published subcategories and component counts.
pub async fn list_categories(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let categories = CategoryRepo::list_published_summaries(&state.pool).await?;

    let mut tree = Vec::with_capacity(categories.len());
    for category in categories {
        let subcategories =
            SubcategoryRepo::list_published_summaries(&state.pool, category.id).await?;
        tree.push(CategoryTree {
            category,
            subcategories,
        });
    }

    Ok(Json(DataResponse::new(tree)))
}

/// GET /api/public/categories/{slug}
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let category = CategoryRepo::find_by_slug(&state.pool, &slug)
        .await?
        .filter(|c| c.is_published)
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundBySlug {
                entity: "Category",
                slug: slug.clone(),
            })
        })?;
    let subcategories = SubcategoryRepo::list_published_summaries(&state.pool, category.id).await?;

    Ok(Json(DataResponse::new(CategoryDetail {
        category,
        subcategories,
    })))
}

/// GET /api/public/components
///
/// Published components under published categories, each flagged `locked`
/// for the caller. A `status` parameter is ignored.
pub async fn list_components(
    OptionalUser(user): OptionalUser,
    State(state): State<AppState>,
    Query(params): Query<ComponentListParams>,
) -> AppResult<impl IntoResponse> {
    let (mut filter, limit, offset) = ComponentListParams {
        status: None,
        ..params
    }
    .into_filter()?;
    filter.status = Some(STATUS_PUBLISHED.to_string());
    let pattern = ilike_pattern(filter.search.as_deref());
    let viewer = Viewer::resolve(&state.pool, user.as_ref()).await?;

    let components =
        ComponentRepo::list(&state.pool, &filter, pattern.as_deref(), true, limit, offset).await?;
    let total = ComponentRepo::count(&state.pool, &filter, pattern.as_deref(), true).await?;

    let items = components
        .into_iter()
        .map(|c| present(c, &viewer))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(PaginatedResponse::new(items, total, limit, offset)))
}

/// GET /api/public/components/{slug}
///
/// Component plus version summaries; code is served by the `/code` endpoint.
pub async fn get_component(
    OptionalUser(user): OptionalUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let component = ComponentRepo::find_published_by_slug(&state.pool, &slug)
        .await?
        .ok_or_else(|| component_by_slug_not_found(&slug))?;
    let viewer = Viewer::resolve(&state.pool, user.as_ref()).await?;
    let versions =
        ComponentVersionRepo::list_summaries_by_component(&state.pool, component.id).await?;

    Ok(Json(DataResponse::new(PublicComponentDetail {
        component: present(component, &viewer)?,
        versions,
    })))
}

/// GET /api/public/components/{slug}/code
///
/// An explicit `version_id` wins; otherwise the default version, narrowed by
/// `framework` / `css_framework` when given. 403 below the component's tier,
/// 404 when nothing matches.
pub async fn get_component_code(
    OptionalUser(user): OptionalUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<CodeParams>,
) -> AppResult<impl IntoResponse> {
    if let Some(framework) = &params.framework {
        validate_framework(framework)?;
    }
    if let Some(css_framework) = &params.css_framework {
        validate_css_framework(css_framework)?;
    }

    let component = ComponentRepo::find_published_by_slug(&state.pool, &slug)
        .await?
        .ok_or_else(|| component_by_slug_not_found(&slug))?;

    let required = Tier::parse(&component.tier)?;
    let viewer = Viewer::resolve(&state.pool, user.as_ref()).await?;
    if !viewer.can_read(required) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "The {required} tier is required to view this component's code"
        ))));
    }

    let version = match params.version_id {
        Some(version_id) => {
            ComponentVersionRepo::find_for_component(&state.pool, component.id, version_id)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "ComponentVersion",
                    id: version_id,
                }))?
        }
        None => ComponentVersionRepo::resolve(
            &state.pool,
            component.id,
            params.framework.as_deref(),
            params.css_framework.as_deref(),
        )
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundBySlug {
                entity: "ComponentVersion",
                slug: slug.clone(),
            })
        })?,
    };

    tracing::debug!(component_id = component.id, version_id = version.id, "Serving component code");
    Ok(Json(DataResponse::new(version)))
}
