//! Component version entity model and DTOs.
//!
//! A version is one framework / CSS-framework rendition of a component.
//! Exactly one version per component is the default.

use atelier_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `component_versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ComponentVersion {
    pub id: DbId,
    pub component_id: DbId,
    pub framework: String,
    pub css_framework: String,
    pub label: String,
    pub code: String,
    pub dependencies: serde_json::Value,
    pub is_default: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A version without its code, for listings that must not leak gated content.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ComponentVersionSummary {
    pub id: DbId,
    pub component_id: DbId,
    pub framework: String,
    pub css_framework: String,
    pub label: String,
    pub is_default: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateComponentVersion {
    pub framework: String,
    pub css_framework: String,
    #[validate(length(min = 1, max = 50))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 500000))]
    pub code: String,
    pub dependencies: Option<serde_json::Value>,
    pub is_default: Option<bool>,
}

/// DTO for updating a version. The default flag changes only via `set_default`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateComponentVersion {
    pub framework: Option<String>,
    pub css_framework: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 500000))]
    pub code: Option<String>,
    pub dependencies: Option<serde_json::Value>,
}
