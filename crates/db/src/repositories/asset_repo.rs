//! Repository for the `assets` table.

use atelier_core::types::DbId;
use sqlx::PgPool;

use crate::models::asset::{Asset, AssetFilter, CreateAsset};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, disk, object_key, original_name, content_type, size_bytes, \
    checksum_sha256, uploaded_by, component_id, created_at, updated_at";

/// Provides CRUD operations for uploaded assets.
pub struct AssetRepo;

impl AssetRepo {
    /// Record an object that has been written to a storage disk.
    pub async fn create(pool: &PgPool, input: &CreateAsset) -> Result<Asset, sqlx::Error> {
        let query = format!(
            "INSERT INTO assets
                (disk, object_key, original_name, content_type, size_bytes,
                 checksum_sha256, uploaded_by, component_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(&input.disk)
            .bind(&input.object_key)
            .bind(&input.original_name)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(&input.checksum_sha256)
            .bind(input.uploaded_by)
            .bind(input.component_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List assets, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &AssetFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Asset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assets
             WHERE ($1::bigint IS NULL OR component_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(filter.component_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, filter: &AssetFilter) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM assets WHERE ($1::bigint IS NULL OR component_id = $1)",
        )
        .bind(filter.component_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Delete an asset row. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
