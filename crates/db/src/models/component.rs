//! Component entity model and DTOs.

use atelier_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `components` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Component {
    pub id: DbId,
    pub subcategory_id: DbId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub tier: String,
    pub status: String,
    pub preview_asset_id: Option<DbId>,
    pub tags: Vec<String>,
    pub sort_order: i32,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateComponent {
    pub subcategory_id: DbId,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub slug: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub tier: Option<String>,
    pub preview_asset_id: Option<DbId>,
    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,
    pub sort_order: Option<i32>,
}

/// DTO for updating a component. Status changes go through publish/archive.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateComponent {
    pub subcategory_id: Option<DbId>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub slug: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub tier: Option<String>,
    pub preview_asset_id: Option<DbId>,
    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,
    pub sort_order: Option<i32>,
}

/// Filters shared by the admin and public component lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentFilter {
    pub subcategory_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub tier: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}
