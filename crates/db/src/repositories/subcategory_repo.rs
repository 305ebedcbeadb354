//! Repository for the `subcategories` table.

use atelier_core::types::DbId;
use sqlx::PgPool;

use crate::models::subcategory::{Subcategory, SubcategorySummary, UpdateSubcategory};

const COLUMNS: &str = "id, category_id, name, slug, description, sort_order, is_published, \
                       created_at, updated_at";

/// Values for a new subcategory after slug resolution.
pub struct NewSubcategory<'a> {
    pub category_id: DbId,
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub sort_order: i32,
    pub is_published: bool,
}

pub struct SubcategoryRepo;

impl SubcategoryRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewSubcategory<'_>,
    ) -> Result<Subcategory, sqlx::Error> {
        let query = format!(
            "INSERT INTO subcategories (category_id, name, slug, description, sort_order, is_published)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subcategory>(&query)
            .bind(input.category_id)
            .bind(input.name)
            .bind(input.slug)
            .bind(input.description)
            .bind(input.sort_order)
            .bind(input.is_published)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Subcategory>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subcategories WHERE id = $1");
        sqlx::query_as::<_, Subcategory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List subcategories, optionally restricted to one category.
    pub async fn list(
        pool: &PgPool,
        category_id: Option<DbId>,
    ) -> Result<Vec<Subcategory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subcategories
             WHERE ($1::bigint IS NULL OR category_id = $1)
             ORDER BY category_id, sort_order, name"
        );
        sqlx::query_as::<_, Subcategory>(&query)
            .bind(category_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSubcategory,
    ) -> Result<Option<Subcategory>, sqlx::Error> {
        let query = format!(
            "UPDATE subcategories SET
                category_id = COALESCE($2, category_id),
                name = COALESCE($3, name),
                slug = COALESCE($4, slug),
                description = COALESCE($5, description),
                sort_order = COALESCE($6, sort_order),
                is_published = COALESCE($7, is_published)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subcategory>(&query)
            .bind(id)
            .bind(input.category_id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(input.sort_order)
            .bind(input.is_published)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a subcategory. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subcategories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_category(pool: &PgPool, category_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM subcategories WHERE category_id = $1")
                .bind(category_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Published subcategories of a category with their published component counts.
    pub async fn list_published_summaries(
        pool: &PgPool,
        category_id: DbId,
    ) -> Result<Vec<SubcategorySummary>, sqlx::Error> {
        sqlx::query_as::<_, SubcategorySummary>(
            "SELECT s.id, s.category_id, s.name, s.slug, s.description, s.sort_order,
                    COUNT(comp.id) AS component_count
             FROM subcategories s
             LEFT JOIN components comp
                    ON comp.subcategory_id = s.id AND comp.status = 'published'
             WHERE s.category_id = $1 AND s.is_published
             GROUP BY s.id
             ORDER BY s.sort_order, s.name",
        )
        .bind(category_id)
        .fetch_all(pool)
        .await
    }
}
