//! Admin handlers for `/admin/components`.

use atelier_core::catalog::{resolve_slug, validate_slug, ComponentStatus};
use atelier_core::error::CoreError;
use atelier_core::search::ilike_pattern;
use atelier_core::tier::Tier;
use atelier_core::types::DbId;
use atelier_db::models::component::{
    Component, ComponentFilter, CreateComponent, UpdateComponent,
};
use atelier_db::models::component_version::ComponentVersion;
use atelier_db::repositories::{
    AssetRepo, ComponentRepo, ComponentVersionRepo, NewComponent, SubcategoryRepo,
};
use atelier_events::bus::{COMPONENT_ARCHIVED, COMPONENT_PUBLISHED};
use atelier_events::DomainEvent;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

const MAX_TAG_LENGTH: usize = 50;

/// Query parameters shared by the admin and public component lists.
#[derive(Debug, Default, Deserialize)]
pub struct ComponentListParams {
    pub subcategory_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub tier: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ComponentListParams {
    /// Validated filter plus clamped `(limit, offset)`.
    pub fn into_filter(self) -> AppResult<(ComponentFilter, i64, i64)> {
        let tier = self
            .tier
            .as_deref()
            .map(|t| Tier::parse(t).map(|t| t.as_str().to_string()))
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|s| ComponentStatus::parse(s).map(|s| s.as_str().to_string()))
            .transpose()?;
        let (limit, offset) = PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
        .resolve();
        Ok((
            ComponentFilter {
                subcategory_id: self.subcategory_id,
                category_id: self.category_id,
                tier,
                status,
                search: self.search,
            },
            limit,
            offset,
        ))
    }
}

/// A component with every version, code included.
#[derive(Debug, Serialize)]
pub struct ComponentDetail {
    #[serde(flatten)]
    pub component: Component,
    pub versions: Vec<ComponentVersion>,
}

/// Trim, lower-case and de-duplicate tags, keeping first-seen order.
pub(crate) fn normalize_tags(tags: &[String]) -> Result<Vec<String>, CoreError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(CoreError::Validation(format!(
                "Tag '{tag}' is longer than {MAX_TAG_LENGTH} characters"
            )));
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    Ok(out)
}

async fn ensure_subcategory(state: &AppState, id: DbId) -> AppResult<()> {
    SubcategoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Subcategory",
            id,
        }))?;
    Ok(())
}

async fn ensure_asset(state: &AppState, id: DbId) -> AppResult<()> {
    AssetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Asset", id }))?;
    Ok(())
}

/// GET /api/admin/components
pub async fn list_components(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ComponentListParams>,
) -> AppResult<impl IntoResponse> {
    let (filter, limit, offset) = params.into_filter()?;
    let pattern = ilike_pattern(filter.search.as_deref());

    let items =
        ComponentRepo::list(&state.pool, &filter, pattern.as_deref(), false, limit, offset).await?;
    let total = ComponentRepo::count(&state.pool, &filter, pattern.as_deref(), false).await?;

    Ok(Json(PaginatedResponse::new(items, total, limit, offset)))
}

/// POST /api/admin/components
///
/// New components start as `draft`; the slug is derived from the name when absent.
pub async fn create_component(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateComponent>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    ensure_subcategory(&state, input.subcategory_id).await?;
    if let Some(asset_id) = input.preview_asset_id {
        ensure_asset(&state, asset_id).await?;
    }

    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let tier = match input.tier.as_deref() {
        Some(t) => Tier::parse(t)?,
        None => Tier::Free,
    };
    let tags = normalize_tags(input.tags.as_deref().unwrap_or_default())?;

    let component = ComponentRepo::create(
        &state.pool,
        &NewComponent {
            subcategory_id: input.subcategory_id,
            name: input.name.trim(),
            slug: &slug,
            description: input.description.as_deref(),
            tier: tier.as_str(),
            preview_asset_id: input.preview_asset_id,
            tags: &tags,
            sort_order: input.sort_order.unwrap_or(0),
        },
    )
    .await?;

    tracing::info!(
        component_id = component.id,
        slug = %component.slug,
        tier = %component.tier,
        user_id = admin.user_id,
        "Component created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse::new(component))))
}

/// GET /api/admin/components/{id}
pub async fn get_component(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let component = ComponentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Component",
            id,
        }))?;
    let versions = ComponentVersionRepo::list_by_component(&state.pool, id).await?;

    Ok(Json(DataResponse::new(ComponentDetail {
        component,
        versions,
    })))
}

/// PUT /api/admin/components/{id}
pub async fn update_component(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateComponent>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(slug) = &input.slug {
        validate_slug(slug)?;
    }
    if let Some(tier) = &input.tier {
        input.tier = Some(Tier::parse(tier)?.as_str().to_string());
    }
    if let Some(tags) = &input.tags {
        input.tags = Some(normalize_tags(tags)?);
    }
    if let Some(subcategory_id) = input.subcategory_id {
        ensure_subcategory(&state, subcategory_id).await?;
    }
    if let Some(asset_id) = input.preview_asset_id {
        ensure_asset(&state, asset_id).await?;
    }

    let component = ComponentRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Component",
            id,
        }))?;

    tracing::info!(component_id = id, user_id = admin.user_id, "Component updated");
    Ok(Json(DataResponse::new(component)))
}

/// DELETE /api/admin/components/{id}
///
/// Versions go with the component; assets are detached, not deleted.
pub async fn delete_component(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ComponentRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Component",
            id,
        }));
    }

    tracing::info!(component_id = id, user_id = admin.user_id, "Component deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/components/{id}/publish
///
/// 409 when the component has no version to show.
pub async fn publish_component(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let existing = ComponentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Component",
            id,
        }))?;

    if ComponentVersionRepo::count_by_component(&state.pool, id).await? == 0 {
        return Err(AppError::Core(CoreError::Conflict(
            "A component needs at least one version before it can be published".into(),
        )));
    }

    let component = ComponentRepo::set_status(&state.pool, id, ComponentStatus::Published.as_str())
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Component",
            id,
        }))?;

    if existing.status != component.status {
        tracing::info!(component_id = id, user_id = admin.user_id, "Component published");
        state.event_bus.publish(
            DomainEvent::new(COMPONENT_PUBLISHED)
                .with_entity("component", id)
                .with_actor(admin.user_id)
                .with_payload(json!({ "slug": component.slug, "tier": component.tier })),
        );
    }

    Ok(Json(DataResponse::new(component)))
}

/// POST /api/admin/components/{id}/archive
pub async fn archive_component(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let component = ComponentRepo::set_status(&state.pool, id, ComponentStatus::Archived.as_str())
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Component",
            id,
        }))?;

    tracing::info!(component_id = id, user_id = admin.user_id, "Component archived");
    state.event_bus.publish(
        DomainEvent::new(COMPONENT_ARCHIVED)
            .with_entity("component", id)
            .with_actor(admin.user_id),
    );

    Ok(Json(DataResponse::new(component)))
}
