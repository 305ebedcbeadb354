//! Repository for the `component_versions` table.
//!
//! Every operation that can change which version is the default runs in one
//! transaction that first locks the parent component row, so concurrent
//! writers on the same component are serialized and the "exactly one default
//! per component with versions" rule holds after each commit.

use atelier_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::component_version::{
    ComponentVersion, ComponentVersionSummary, CreateComponentVersion, UpdateComponentVersion,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, component_id, framework, css_framework, label, code, \
    dependencies, is_default, created_at, updated_at";

const SUMMARY_COLUMNS: &str =
    "id, component_id, framework, css_framework, label, is_default, created_at";

/// Label given to versions created without one.
pub const DEFAULT_LABEL: &str = "1.0.0";

/// Result of deleting a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDeletion {
    /// Whether the deleted version was the component's default.
    pub was_default: bool,
    /// The version promoted to default in its place, if any remained.
    pub promoted_id: Option<DbId>,
}

/// Provides CRUD and default-management operations for component versions.
pub struct ComponentVersionRepo;

impl ComponentVersionRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert a new version for `component_id`.
    ///
    /// The first version of a component always becomes the default. A later
    /// version with `is_default = Some(true)` takes the default over from the
    /// previous one in the same transaction.
    ///
    /// Returns `None` if the component does not exist.
    pub async fn create(
        pool: &PgPool,
        component_id: DbId,
        input: &CreateComponentVersion,
    ) -> Result<Option<ComponentVersion>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_component(&mut tx, component_id).await? {
            return Ok(None);
        }

        let existing: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM component_versions WHERE component_id = $1")
                .bind(component_id)
                .fetch_one(&mut *tx)
                .await?;

        let make_default = existing.0 == 0 || input.is_default.unwrap_or(false);
        if make_default {
            clear_default(&mut tx, component_id).await?;
        }

        let query = format!(
            "INSERT INTO component_versions
                (component_id, framework, css_framework, label, code, dependencies, is_default)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, '{{}}'::jsonb), $7)
             RETURNING {COLUMNS}"
        );
        let version = sqlx::query_as::<_, ComponentVersion>(&query)
            .bind(component_id)
            .bind(&input.framework)
            .bind(&input.css_framework)
            .bind(input.label.as_deref().unwrap_or(DEFAULT_LABEL))
            .bind(&input.code)
            .bind(&input.dependencies)
            .bind(make_default)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(version))
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ComponentVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM component_versions WHERE id = $1");
        sqlx::query_as::<_, ComponentVersion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a version, but only if it belongs to `component_id`.
    pub async fn find_for_component(
        pool: &PgPool,
        component_id: DbId,
        id: DbId,
    ) -> Result<Option<ComponentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM component_versions WHERE id = $1 AND component_id = $2"
        );
        sqlx::query_as::<_, ComponentVersion>(&query)
            .bind(id)
            .bind(component_id)
            .fetch_optional(pool)
            .await
    }

    /// List all versions of a component, default first, then newest first.
    pub async fn list_by_component(
        pool: &PgPool,
        component_id: DbId,
    ) -> Result<Vec<ComponentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM component_versions
             WHERE component_id = $1
             ORDER BY is_default DESC, created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ComponentVersion>(&query)
            .bind(component_id)
            .fetch_all(pool)
            .await
    }

    /// Same ordering as [`list_by_component`](Self::list_by_component), without code.
    pub async fn list_summaries_by_component(
        pool: &PgPool,
        component_id: DbId,
    ) -> Result<Vec<ComponentVersionSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM component_versions
             WHERE component_id = $1
             ORDER BY is_default DESC, created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ComponentVersionSummary>(&query)
            .bind(component_id)
            .fetch_all(pool)
            .await
    }

    /// Update a version's content. Returns `None` if the version does not
    /// belong to `component_id`.
    pub async fn update(
        pool: &PgPool,
        component_id: DbId,
        id: DbId,
        input: &UpdateComponentVersion,
    ) -> Result<Option<ComponentVersion>, sqlx::Error> {
        let query = format!(
            "UPDATE component_versions SET
                framework = COALESCE($3, framework),
                css_framework = COALESCE($4, css_framework),
                label = COALESCE($5, label),
                code = COALESCE($6, code),
                dependencies = COALESCE($7, dependencies)
             WHERE id = $1 AND component_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ComponentVersion>(&query)
            .bind(id)
            .bind(component_id)
            .bind(&input.framework)
            .bind(&input.css_framework)
            .bind(&input.label)
            .bind(&input.code)
            .bind(&input.dependencies)
            .fetch_optional(pool)
            .await
    }

    /// Delete a version. If it was the default, the most recently created
    /// remaining version is promoted in the same transaction.
    ///
    /// Returns `None` if the version does not belong to `component_id`.
    pub async fn delete(
        pool: &PgPool,
        component_id: DbId,
        id: DbId,
    ) -> Result<Option<VersionDeletion>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_component(&mut tx, component_id).await? {
            return Ok(None);
        }

        let deleted: Option<(bool,)> = sqlx::query_as(
            "DELETE FROM component_versions WHERE id = $1 AND component_id = $2 \
             RETURNING is_default",
        )
        .bind(id)
        .bind(component_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((was_default,)) = deleted else {
            return Ok(None);
        };

        let promoted_id = if was_default {
            let promoted: Option<(DbId,)> = sqlx::query_as(
                "UPDATE component_versions SET is_default = true
                 WHERE id = (
                     SELECT id FROM component_versions
                     WHERE component_id = $1
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1
                 )
                 RETURNING id",
            )
            .bind(component_id)
            .fetch_optional(&mut *tx)
            .await?;
            promoted.map(|p| p.0)
        } else {
            None
        };

        tx.commit().await?;
        Ok(Some(VersionDeletion {
            was_default,
            promoted_id,
        }))
    }

    // ── Default-version operations ───────────────────────────────────

    /// Make `version_id` the default for `component_id`, clearing the previous
    /// default in the same transaction.
    ///
    /// Returns `None` if `version_id` does not exist for the given component.
    pub async fn set_default(
        pool: &PgPool,
        component_id: DbId,
        version_id: DbId,
    ) -> Result<Option<ComponentVersion>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_component(&mut tx, component_id).await? {
            return Ok(None);
        }

        let belongs: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM component_versions WHERE id = $1 AND component_id = $2",
        )
        .bind(version_id)
        .bind(component_id)
        .fetch_optional(&mut *tx)
        .await?;
        if belongs.is_none() {
            return Ok(None);
        }

        clear_default(&mut tx, component_id).await?;

        let query = format!(
            "UPDATE component_versions SET is_default = true
             WHERE id = $1 AND component_id = $2
             RETURNING {COLUMNS}"
        );
        let version = sqlx::query_as::<_, ComponentVersion>(&query)
            .bind(version_id)
            .bind(component_id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(version)
    }

    /// The current default version of a component (if it has any versions).
    pub async fn find_default(
        pool: &PgPool,
        component_id: DbId,
    ) -> Result<Option<ComponentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM component_versions WHERE component_id = $1 AND is_default"
        );
        sqlx::query_as::<_, ComponentVersion>(&query)
            .bind(component_id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve the version to serve for a framework / CSS-framework request.
    ///
    /// With neither filter this is the default version. With filters, the
    /// default wins if it matches, otherwise the newest matching version.
    pub async fn resolve(
        pool: &PgPool,
        component_id: DbId,
        framework: Option<&str>,
        css_framework: Option<&str>,
    ) -> Result<Option<ComponentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM component_versions
             WHERE component_id = $1
               AND ($2::text IS NULL OR framework = $2)
               AND ($3::text IS NULL OR css_framework = $3)
             ORDER BY is_default DESC, created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ComponentVersion>(&query)
            .bind(component_id)
            .bind(framework)
            .bind(css_framework)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_by_component(pool: &PgPool, component_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM component_versions WHERE component_id = $1")
                .bind(component_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Number of default versions of a component. Always 0 or 1.
    pub async fn count_defaults(pool: &PgPool, component_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM component_versions WHERE component_id = $1 AND is_default",
        )
        .bind(component_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}

/// Lock the component row for the rest of the transaction.
/// Returns `false` if the component does not exist.
async fn lock_component(
    tx: &mut Transaction<'_, Postgres>,
    component_id: DbId,
) -> Result<bool, sqlx::Error> {
    let row: Option<(DbId,)> = sqlx::query_as("SELECT id FROM components WHERE id = $1 FOR UPDATE")
        .bind(component_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

async fn clear_default(
    tx: &mut Transaction<'_, Postgres>,
    component_id: DbId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE component_versions SET is_default = false \
         WHERE component_id = $1 AND is_default",
    )
    .bind(component_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
