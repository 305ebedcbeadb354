//! Repository for the `components` table.

use atelier_core::catalog::STATUS_PUBLISHED;
use atelier_core::types::DbId;
use sqlx::PgPool;

use crate::models::component::{Component, ComponentFilter, UpdateComponent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "c.id, c.subcategory_id, c.name, c.slug, c.description, c.tier, \
    c.status, c.preview_asset_id, c.tags, c.sort_order, c.published_at, c.created_at, c.updated_at";

/// Filter clause shared by `list` and `count`.
///
/// Binds: `$1` subcategory id, `$2` category id, `$3` tier, `$4` status,
/// `$5` ILIKE pattern, `$6` raw search term (tag match), `$7` restrict to a
/// fully published category tree.
const FILTER: &str = "FROM components c
     JOIN subcategories s ON s.id = c.subcategory_id
     JOIN categories cat ON cat.id = s.category_id
     WHERE ($1::bigint IS NULL OR c.subcategory_id = $1)
       AND ($2::bigint IS NULL OR s.category_id = $2)
       AND ($3::text IS NULL OR c.tier = $3)
       AND ($4::text IS NULL OR c.status = $4)
       AND ($5::text IS NULL OR c.name ILIKE $5 OR c.description ILIKE $5
            OR LOWER($6::text) = ANY(c.tags))
       AND (NOT $7 OR (s.is_published AND cat.is_published))";

/// Values for a new component after slug and tier resolution.
pub struct NewComponent<'a> {
    pub subcategory_id: DbId,
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub tier: &'a str,
    pub preview_asset_id: Option<DbId>,
    pub tags: &'a [String],
    pub sort_order: i32,
}

/// Provides CRUD and publication operations for components.
pub struct ComponentRepo;

impl ComponentRepo {
    /// Insert a new component in `draft` status.
    pub async fn create(
        pool: &PgPool,
        input: &NewComponent<'_>,
    ) -> Result<Component, sqlx::Error> {
        let query = format!(
            "INSERT INTO components AS c
                (subcategory_id, name, slug, description, tier, preview_asset_id, tags, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Component>(&query)
            .bind(input.subcategory_id)
            .bind(input.name)
            .bind(input.slug)
            .bind(input.description)
            .bind(input.tier)
            .bind(input.preview_asset_id)
            .bind(input.tags)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Component>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM components c WHERE c.id = $1");
        sqlx::query_as::<_, Component>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Component>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM components c WHERE c.slug = $1");
        sqlx::query_as::<_, Component>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Find a published component whose subcategory and category are published too.
    pub async fn find_published_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<Component>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM components c
             JOIN subcategories s ON s.id = c.subcategory_id
             JOIN categories cat ON cat.id = s.category_id
             WHERE c.slug = $1 AND c.status = $2 AND s.is_published AND cat.is_published"
        );
        sqlx::query_as::<_, Component>(&query)
            .bind(slug)
            .bind(STATUS_PUBLISHED)
            .fetch_optional(pool)
            .await
    }

    /// List components matching `filter`, ordered by `sort_order`, then name.
    ///
    /// With `published_tree_only`, components under an unpublished
    /// subcategory or category are hidden.
    pub async fn list(
        pool: &PgPool,
        filter: &ComponentFilter,
        pattern: Option<&str>,
        published_tree_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Component>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} {FILTER}
             ORDER BY c.sort_order, c.name, c.id
             LIMIT $8 OFFSET $9"
        );
        sqlx::query_as::<_, Component>(&query)
            .bind(filter.subcategory_id)
            .bind(filter.category_id)
            .bind(&filter.tier)
            .bind(&filter.status)
            .bind(pattern)
            .bind(filter.search.as_deref().map(str::trim))
            .bind(published_tree_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        filter: &ComponentFilter,
        pattern: Option<&str>,
        published_tree_only: bool,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) {FILTER}");
        let row: (i64,) = sqlx::query_as(&query)
            .bind(filter.subcategory_id)
            .bind(filter.category_id)
            .bind(&filter.tier)
            .bind(&filter.status)
            .bind(pattern)
            .bind(filter.search.as_deref().map(str::trim))
            .bind(published_tree_only)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Update a component. Only non-`None` fields in `input` are applied.
    /// `slug` and `tier` must already be validated by the caller.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateComponent,
    ) -> Result<Option<Component>, sqlx::Error> {
        let query = format!(
            "UPDATE components AS c SET
                subcategory_id = COALESCE($2, subcategory_id),
                name = COALESCE($3, name),
                slug = COALESCE($4, slug),
                description = COALESCE($5, description),
                tier = COALESCE($6, tier),
                preview_asset_id = COALESCE($7, preview_asset_id),
                tags = COALESCE($8, tags),
                sort_order = COALESCE($9, sort_order)
             WHERE c.id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Component>(&query)
            .bind(id)
            .bind(input.subcategory_id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(&input.tier)
            .bind(input.preview_asset_id)
            .bind(&input.tags)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Move a component to `status`. Publishing stamps `published_at` the first time.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
    ) -> Result<Option<Component>, sqlx::Error> {
        let query = format!(
            "UPDATE components AS c SET
                status = $2,
                published_at = CASE
                    WHEN $2 = 'published' THEN COALESCE(published_at, NOW())
                    ELSE published_at
                END
             WHERE c.id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Component>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a component and, by cascade, its versions.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM components WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_subcategory(
        pool: &PgPool,
        subcategory_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM components WHERE subcategory_id = $1")
                .bind(subcategory_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}
