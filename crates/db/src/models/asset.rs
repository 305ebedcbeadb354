//! Uploaded file (asset) model.

use atelier_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    pub id: DbId,
    pub disk: String,
    pub object_key: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub uploaded_by: Option<DbId>,
    pub component_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateAsset {
    pub disk: String,
    pub object_key: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub uploaded_by: Option<DbId>,
    pub component_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetFilter {
    pub component_id: Option<DbId>,
}
