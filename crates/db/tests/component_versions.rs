//! Integration tests for the one-default-version-per-component invariant.
//!
//! Exercises `ComponentVersionRepo` against a real database:
//! - the first version becomes default regardless of input
//! - creating with `is_default` moves the default
//! - `set_default` swaps the marker and rejects foreign versions
//! - deleting the default promotes the newest remaining version
//! - `resolve` prefers the default, then the newest matching variant

use atelier_core::types::DbId;
use atelier_db::models::component_version::{CreateComponentVersion, UpdateComponentVersion};
use atelier_db::repositories::{
    CategoryRepo, ComponentRepo, ComponentVersionRepo, NewCategory, NewComponent, NewSubcategory,
    SubcategoryRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn setup_component(pool: &PgPool, slug: &str) -> DbId {
    let category = CategoryRepo::create(
        pool,
        &NewCategory {
            name: "Marketing",
            slug: &format!("{slug}-cat"),
            description: None,
            icon: None,
            sort_order: 0,
            is_published: true,
        },
    )
    .await
    .unwrap();
    let subcategory = SubcategoryRepo::create(
        pool,
        &NewSubcategory {
            category_id: category.id,
            name: "Heroes",
            slug: "heroes",
            description: None,
            sort_order: 0,
            is_published: true,
        },
    )
    .await
    .unwrap();
    let component = ComponentRepo::create(
        pool,
        &NewComponent {
            subcategory_id: subcategory.id,
            name: "Split Hero",
            slug,
            description: None,
            tier: "free",
            preview_asset_id: None,
            tags: &[],
            sort_order: 0,
        },
    )
    .await
    .unwrap();
    component.id
}

fn new_version(framework: &str, css: &str, is_default: Option<bool>) -> CreateComponentVersion {
    CreateComponentVersion {
        framework: framework.to_string(),
        css_framework: css.to_string(),
        label: None,
        code: format!("// {framework} + {css}"),
        dependencies: None,
        is_default,
    }
}

async fn assert_single_default(pool: &PgPool, component_id: DbId) {
    let defaults = ComponentVersionRepo::count_defaults(pool, component_id)
        .await
        .unwrap();
    let total = ComponentVersionRepo::count_by_component(pool, component_id)
        .await
        .unwrap();
    let expected = if total > 0 { 1 } else { 0 };
    assert_eq!(defaults, expected, "{total} versions, {defaults} defaults");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_version_becomes_default(pool: PgPool) {
    let component_id = setup_component(&pool, "first").await;

    let v1 = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "tailwind", Some(false)))
        .await
        .unwrap()
        .unwrap();
    assert!(v1.is_default);
    assert_eq!(v1.label, "1.0.0");
    assert_eq!(v1.dependencies, serde_json::json!({}));

    let v2 = ComponentVersionRepo::create(&pool, component_id, &new_version("vue", "tailwind", None))
        .await
        .unwrap()
        .unwrap();
    assert!(!v2.is_default);
    assert_single_default(&pool, component_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_as_default_moves_marker(pool: PgPool) {
    let component_id = setup_component(&pool, "moves").await;

    let v1 = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "tailwind", None))
        .await
        .unwrap()
        .unwrap();
    let v2 = ComponentVersionRepo::create(&pool, component_id, &new_version("svelte", "css", Some(true)))
        .await
        .unwrap()
        .unwrap();
    assert!(v2.is_default);

    let v1 = ComponentVersionRepo::find_by_id(&pool, v1.id).await.unwrap().unwrap();
    assert!(!v1.is_default);
    assert_single_default(&pool, component_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_for_missing_component_returns_none(pool: PgPool) {
    let result = ComponentVersionRepo::create(&pool, 9999, &new_version("react", "css", None))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_default_swaps(pool: PgPool) {
    let component_id = setup_component(&pool, "swap").await;
    let v1 = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "tailwind", None))
        .await
        .unwrap()
        .unwrap();
    let v2 = ComponentVersionRepo::create(&pool, component_id, &new_version("vue", "css", None))
        .await
        .unwrap()
        .unwrap();

    let updated = ComponentVersionRepo::set_default(&pool, component_id, v2.id)
        .await
        .unwrap()
        .unwrap();
    assert!(updated.is_default);
    let default = ComponentVersionRepo::find_default(&pool, component_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(default.id, v2.id);

    // Toggling back and forth keeps a single default.
    for id in [v1.id, v2.id, v1.id, v1.id] {
        ComponentVersionRepo::set_default(&pool, component_id, id)
            .await
            .unwrap()
            .unwrap();
        assert_single_default(&pool, component_id).await;
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_default_rejects_foreign_version(pool: PgPool) {
    let a = setup_component(&pool, "comp-a").await;
    let b = setup_component(&pool, "comp-b").await;
    let va = ComponentVersionRepo::create(&pool, a, &new_version("react", "css", None))
        .await
        .unwrap()
        .unwrap();
    ComponentVersionRepo::create(&pool, b, &new_version("react", "css", None))
        .await
        .unwrap()
        .unwrap();

    let result = ComponentVersionRepo::set_default(&pool, b, va.id).await.unwrap();
    assert!(result.is_none());
    assert_single_default(&pool, a).await;
    assert_single_default(&pool, b).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_default_promotes_newest(pool: PgPool) {
    let component_id = setup_component(&pool, "promote").await;
    let v1 = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "tailwind", None))
        .await
        .unwrap()
        .unwrap();
    let _v2 = ComponentVersionRepo::create(&pool, component_id, &new_version("vue", "tailwind", None))
        .await
        .unwrap()
        .unwrap();
    let v3 = ComponentVersionRepo::create(&pool, component_id, &new_version("html", "css", None))
        .await
        .unwrap()
        .unwrap();

    let deletion = ComponentVersionRepo::delete(&pool, component_id, v1.id)
        .await
        .unwrap()
        .unwrap();
    assert!(deletion.was_default);
    assert_eq!(deletion.promoted_id, Some(v3.id));
    assert_single_default(&pool, component_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_non_default_and_last(pool: PgPool) {
    let component_id = setup_component(&pool, "last").await;
    let v1 = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "css", None))
        .await
        .unwrap()
        .unwrap();
    let v2 = ComponentVersionRepo::create(&pool, component_id, &new_version("vue", "css", None))
        .await
        .unwrap()
        .unwrap();

    let deletion = ComponentVersionRepo::delete(&pool, component_id, v2.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!deletion.was_default);
    assert_eq!(deletion.promoted_id, None);

    let deletion = ComponentVersionRepo::delete(&pool, component_id, v1.id)
        .await
        .unwrap()
        .unwrap();
    assert!(deletion.was_default);
    assert_eq!(deletion.promoted_id, None);
    assert_single_default(&pool, component_id).await;

    // Deleting again finds nothing.
    let again = ComponentVersionRepo::delete(&pool, component_id, v1.id).await.unwrap();
    assert!(again.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_variant_rejected(pool: PgPool) {
    let component_id = setup_component(&pool, "dupe").await;
    ComponentVersionRepo::create(&pool, component_id, &new_version("react", "css", None))
        .await
        .unwrap();
    let err = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "css", None))
        .await
        .unwrap_err();

    let constraint = err
        .as_database_error()
        .and_then(|e| e.constraint())
        .map(str::to_string);
    assert_eq!(constraint.as_deref(), Some("uq_component_versions_variant"));
    assert_single_default(&pool, component_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_keeps_default_flag(pool: PgPool) {
    let component_id = setup_component(&pool, "update").await;
    let v1 = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "css", None))
        .await
        .unwrap()
        .unwrap();

    let updated = ComponentVersionRepo::update(
        &pool,
        component_id,
        v1.id,
        &UpdateComponentVersion {
            code: Some("export const Hero = () => null;".to_string()),
            label: Some("1.1.0".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.label, "1.1.0");
    assert_eq!(updated.framework, "react");
    assert!(updated.is_default);

    let wrong_component = ComponentVersionRepo::update(
        &pool,
        component_id + 1,
        v1.id,
        &UpdateComponentVersion::default(),
    )
    .await
    .unwrap();
    assert!(wrong_component.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_resolve_prefers_default_then_newest(pool: PgPool) {
    let component_id = setup_component(&pool, "resolve").await;
    let react_tw = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "tailwind", None))
        .await
        .unwrap()
        .unwrap();
    let react_css = ComponentVersionRepo::create(&pool, component_id, &new_version("react", "css", None))
        .await
        .unwrap()
        .unwrap();
    let vue_tw = ComponentVersionRepo::create(&pool, component_id, &new_version("vue", "tailwind", None))
        .await
        .unwrap()
        .unwrap();

    let resolved = ComponentVersionRepo::resolve(&pool, component_id, None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id, react_tw.id);

    let resolved = ComponentVersionRepo::resolve(&pool, component_id, Some("react"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id, react_tw.id, "default wins when it matches");

    let resolved = ComponentVersionRepo::resolve(&pool, component_id, None, Some("css"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id, react_css.id);

    let resolved = ComponentVersionRepo::resolve(&pool, component_id, Some("vue"), Some("tailwind"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id, vue_tw.id);

    let none = ComponentVersionRepo::resolve(&pool, component_id, Some("angular"), None)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleting_component_cascades_versions(pool: PgPool) {
    let component_id = setup_component(&pool, "cascade").await;
    ComponentVersionRepo::create(&pool, component_id, &new_version("react", "css", None))
        .await
        .unwrap();

    assert!(ComponentRepo::delete(&pool, component_id).await.unwrap());
    let remaining = ComponentVersionRepo::count_by_component(&pool, component_id)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
