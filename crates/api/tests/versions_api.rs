//! HTTP-level tests for component versions and the single-default rule.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, build_test_app, delete_auth, get_auth, post_json_auth, put_json_auth,
    TestApp,
};
use serde_json::{json, Value};
use sqlx::PgPool;

use atelier_events::bus::VERSION_DEFAULT_CHANGED;

async fn draft_component(test: &TestApp, token: &str) -> i64 {
    let category = post_json_auth(
        test.app(),
        "/api/admin/categories",
        json!({ "name": "Navigation" }),
        token,
    )
    .await;
    let category_id = body_json(category).await["data"]["id"].clone();
    let subcategory = post_json_auth(
        test.app(),
        "/api/admin/subcategories",
        json!({ "category_id": category_id, "name": "Menus" }),
        token,
    )
    .await;
    let subcategory_id = body_json(subcategory).await["data"]["id"].clone();
    let component = post_json_auth(
        test.app(),
        "/api/admin/components",
        json!({ "subcategory_id": subcategory_id, "name": "Dropdown" }),
        token,
    )
    .await;
    body_json(component).await["data"]["id"].as_i64().unwrap()
}

async fn add_version(test: &TestApp, token: &str, component_id: i64, body: Value) -> Value {
    let response = post_json_auth(
        test.app(),
        &format!("/api/admin/components/{component_id}/versions"),
        body,
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

async fn defaults(test: &TestApp, token: &str, component_id: i64) -> Vec<i64> {
    let response = get_auth(
        test.app(),
        &format!("/api/admin/components/{component_id}/versions"),
        token,
    )
    .await;
    let json = body_json(response).await;
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|v| v["is_default"] == true)
        .map(|v| v["id"].as_i64().unwrap())
        .collect()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn exactly_one_default_through_create_set_and_delete(pool: PgPool) {
    let test = build_test_app(pool);
    let token = admin_token(&test).await;
    let component_id = draft_component(&test, &token).await;
    let mut events = test.event_bus.subscribe();

    let react = add_version(
        &test,
        &token,
        component_id,
        json!({ "framework": "react", "css_framework": "tailwind", "code": "<nav />", "is_default": false }),
    )
    .await;
    assert_eq!(react["is_default"], true, "first version is always the default");
    assert_eq!(react["label"], "1.0.0");
    assert_eq!(react["dependencies"], json!({}));
    let react_id = react["id"].as_i64().unwrap();

    let vue = add_version(
        &test,
        &token,
        component_id,
        json!({ "framework": "vue", "css_framework": "css", "code": "<template />", "dependencies": { "vue": "^3.4" } }),
    )
    .await;
    let vue_id = vue["id"].as_i64().unwrap();
    assert_eq!(vue["is_default"], false);
    assert_eq!(defaults(&test, &token, component_id).await, vec![react_id]);

    let svelte = add_version(
        &test,
        &token,
        component_id,
        json!({ "framework": "svelte", "css_framework": "scss", "code": "<nav></nav>", "is_default": true }),
    )
    .await;
    let svelte_id = svelte["id"].as_i64().unwrap();
    assert_eq!(defaults(&test, &token, component_id).await, vec![svelte_id]);

    let response = put_json_auth(
        test.app(),
        &format!("/api/admin/components/{component_id}/versions/{vue_id}/set-default"),
        json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(defaults(&test, &token, component_id).await, vec![vue_id]);

    // Deleting the default promotes the newest remaining version.
    let response = delete_auth(
        test.app(),
        &format!("/api/admin/components/{component_id}/versions/{vue_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(defaults(&test, &token, component_id).await, vec![svelte_id]);

    let mut announced = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.event_type == VERSION_DEFAULT_CHANGED {
            announced.push(event.payload["version_id"].as_i64().unwrap());
        }
    }
    assert_eq!(announced, vec![react_id, svelte_id, vue_id, svelte_id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn version_input_is_validated(pool: PgPool) {
    let test = build_test_app(pool);
    let token = admin_token(&test).await;
    let component_id = draft_component(&test, &token).await;
    let uri = format!("/api/admin/components/{component_id}/versions");

    let bad_framework = post_json_auth(
        test.app(),
        &uri,
        json!({ "framework": "jquery", "css_framework": "css", "code": "x" }),
        &token,
    )
    .await;
    assert_eq!(bad_framework.status(), StatusCode::BAD_REQUEST);

    let bad_dependencies = post_json_auth(
        test.app(),
        &uri,
        json!({ "framework": "react", "css_framework": "css", "code": "x", "dependencies": ["react"] }),
        &token,
    )
    .await;
    assert_eq!(bad_dependencies.status(), StatusCode::BAD_REQUEST);

    let empty_code = post_json_auth(
        test.app(),
        &uri,
        json!({ "framework": "react", "css_framework": "css", "code": "" }),
        &token,
    )
    .await;
    assert_eq!(empty_code.status(), StatusCode::BAD_REQUEST);

    add_version(
        &test,
        &token,
        component_id,
        json!({ "framework": "react", "css_framework": "css", "code": "x" }),
    )
    .await;
    let duplicate = post_json_auth(
        test.app(),
        &uri,
        json!({ "framework": "react", "css_framework": "css", "code": "y" }),
        &token,
    )
    .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(duplicate).await["error"]["code"], "CONFLICT");

    let missing_component = post_json_auth(
        test.app(),
        "/api/admin/components/999999/versions",
        json!({ "framework": "react", "css_framework": "css", "code": "x" }),
        &token,
    )
    .await;
    assert_eq!(missing_component.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn versions_are_scoped_to_their_component(pool: PgPool) {
    let test = build_test_app(pool);
    let token = admin_token(&test).await;
    let component_id = draft_component(&test, &token).await;
    let version = add_version(
        &test,
        &token,
        component_id,
        json!({ "framework": "html", "css_framework": "css", "code": "<ul></ul>" }),
    )
    .await;
    let version_id = version["id"].as_i64().unwrap();

    let other_component = component_id + 1000;
    let response = get_auth(
        test.app(),
        &format!("/api/admin/components/{other_component}/versions/{version_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = put_json_auth(
        test.app(),
        &format!("/api/admin/components/{component_id}/versions/{version_id}"),
        json!({ "code": "<ol></ol>", "label": "ordered" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["code"], "<ol></ol>");
    assert_eq!(json["data"]["label"], "ordered");
    assert_eq!(json["data"]["is_default"], true);
}
