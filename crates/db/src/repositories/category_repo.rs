//! Repository for the `categories` table.

use atelier_core::types::DbId;
use sqlx::PgPool;

use crate::models::category::{Category, CategorySummary, UpdateCategory};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, slug, description, icon, sort_order, is_published, \
                       created_at, updated_at";

/// Values for a new category after slug resolution.
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub icon: Option<&'a str>,
    pub sort_order: i32,
    pub is_published: bool,
}

/// Provides CRUD operations for categories.
pub struct CategoryRepo;

impl CategoryRepo {
    pub async fn create(pool: &PgPool, input: &NewCategory<'_>) -> Result<Category, sqlx::Error> {
        let query = format!(
            "INSERT INTO categories (name, slug, description, icon, sort_order, is_published)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(input.name)
            .bind(input.slug)
            .bind(input.description)
            .bind(input.icon)
            .bind(input.sort_order)
            .bind(input.is_published)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE slug = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// List categories ordered by `sort_order`, then name.
    ///
    /// `pattern` is an `ILIKE` pattern over name and slug; `published`
    /// restricts to one publication state.
    pub async fn list(
        pool: &PgPool,
        pattern: Option<&str>,
        published: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM categories
             WHERE ($1::text IS NULL OR name ILIKE $1 OR slug ILIKE $1)
               AND ($2::boolean IS NULL OR is_published = $2)
             ORDER BY sort_order, name
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(pattern)
            .bind(published)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        pattern: Option<&str>,
        published: Option<bool>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM categories
             WHERE ($1::text IS NULL OR name ILIKE $1 OR slug ILIKE $1)
               AND ($2::boolean IS NULL OR is_published = $2)",
        )
        .bind(pattern)
        .bind(published)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Update a category. Only non-`None` fields in `input` are applied.
    /// `slug` must already be validated by the caller.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCategory,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!(
            "UPDATE categories SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                icon = COALESCE($5, icon),
                sort_order = COALESCE($6, sort_order),
                is_published = COALESCE($7, is_published)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(&input.icon)
            .bind(input.sort_order)
            .bind(input.is_published)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a category. Returns `true` if a row was removed.
    ///
    /// Fails with a foreign-key violation while subcategories still reference it.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Published categories with the number of published components beneath
    /// their published subcategories.
    pub async fn list_published_summaries(
        pool: &PgPool,
    ) -> Result<Vec<CategorySummary>, sqlx::Error> {
        sqlx::query_as::<_, CategorySummary>(
            "SELECT c.id, c.name, c.slug, c.description, c.icon, c.sort_order,
                    COUNT(comp.id) AS component_count
             FROM categories c
             LEFT JOIN subcategories s
                    ON s.category_id = c.id AND s.is_published
             LEFT JOIN components comp
                    ON comp.subcategory_id = s.id AND comp.status = 'published'
             WHERE c.is_published
             GROUP BY c.id
             ORDER BY c.sort_order, c.name",
        )
        .fetch_all(pool)
        .await
    }
}
