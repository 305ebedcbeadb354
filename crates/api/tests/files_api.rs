//! Batch upload and asset management over a temporary local disk.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, build_test_app, delete_auth, get, get_auth, post_json_auth,
    post_multipart_auth, Part,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn mixed_batch_reports_per_file_outcomes(pool: PgPool) {
    let test = build_test_app(pool);
    let token = admin_token(&test).await;

    let response = post_multipart_auth(
        test.app(),
        "/api/admin/files",
        &[
            Part::File {
                filename: "notes.txt",
                content_type: Some("text/plain"),
                data: b"hello atelier",
            },
            Part::File {
                filename: "setup.exe",
                content_type: None,
                data: b"MZ",
            },
            Part::File {
                filename: "empty.png",
                content_type: Some("image/png"),
                data: b"",
            },
            Part::File {
                filename: "huge.txt",
                content_type: Some("text/plain"),
                data: &[b'x'; 2048],
            },
        ],
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let json = body_json(response).await;
    let report = &json["data"];
    assert_eq!(report["total"], 4);
    assert_eq!(report["uploaded"], 1);
    assert_eq!(report["failed"], 3);

    let items = report["items"].as_array().unwrap();
    let names: Vec<&str> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["notes.txt", "setup.exe", "empty.png", "huge.txt"]);
    assert_eq!(items[0]["ok"], true);
    assert_eq!(items[0]["asset"]["content_type"], "text/plain");
    assert_eq!(items[0]["asset"]["size_bytes"], 13);
    assert_eq!(items[0]["asset"]["disk"], "local");
    for failed in &items[1..] {
        assert_eq!(failed["ok"], false);
        assert!(failed["error"].is_string());
        assert!(failed.get("asset").is_none());
    }

    let key = items[0]["asset"]["object_key"].as_str().unwrap();
    assert!(key.starts_with("uploads/"));
    assert!(key.ends_with("-notes.txt"));
    let on_disk = std::fs::read(test.storage_dir.path().join(key)).unwrap();
    assert_eq!(on_disk, b"hello atelier");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_status_reflects_success_and_failure(pool: PgPool) {
    let test = build_test_app(pool);
    let token = admin_token(&test).await;

    let all_ok = post_multipart_auth(
        test.app(),
        "/api/admin/files",
        &[
            Part::Text {
                name: "prefix",
                value: "previews/buttons",
            },
            Part::File {
                filename: "a.json",
                content_type: None,
                data: b"{}",
            },
            Part::File {
                filename: "b.svg",
                content_type: Some("application/octet-stream"),
                data: b"<svg/>",
            },
        ],
        &token,
    )
    .await;
    assert_eq!(all_ok.status(), StatusCode::CREATED);
    let json = body_json(all_ok).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["items"][1]["asset"]["content_type"], "image/svg+xml");
    assert!(json["data"]["items"][0]["asset"]["object_key"]
        .as_str()
        .unwrap()
        .starts_with("previews/buttons/"));

    let all_failed = post_multipart_auth(
        test.app(),
        "/api/admin/files",
        &[Part::File {
            filename: "virus.bat",
            content_type: Some("application/x-msdownload"),
            data: b"@echo off",
        }],
        &token,
    )
    .await;
    assert_eq!(all_failed.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(all_failed).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["failed"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_input_is_validated(pool: PgPool) {
    let test = build_test_app(pool);
    let token = admin_token(&test).await;

    let empty = post_multipart_auth(
        test.app(),
        "/api/admin/files",
        &[Part::Text {
            name: "prefix",
            value: "uploads",
        }],
        &token,
    )
    .await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(empty).await["error"]["code"], "VALIDATION_ERROR");

    let bad_prefix = post_multipart_auth(
        test.app(),
        "/api/admin/files",
        &[
            Part::Text {
                name: "prefix",
                value: "../etc",
            },
            Part::File {
                filename: "a.txt",
                content_type: None,
                data: b"a",
            },
        ],
        &token,
    )
    .await;
    assert_eq!(bad_prefix.status(), StatusCode::BAD_REQUEST);

    let missing_component = post_multipart_auth(
        test.app(),
        "/api/admin/files",
        &[
            Part::Text {
                name: "component_id",
                value: "424242",
            },
            Part::File {
                filename: "a.txt",
                content_type: None,
                data: b"a",
            },
        ],
        &token,
    )
    .await;
    assert_eq!(missing_component.status(), StatusCode::NOT_FOUND);

    // Nine 1000-byte files exceed the 8192-byte batch limit.
    let chunk = [b'y'; 1000];
    let names: Vec<String> = (0..9).map(|i| format!("part-{i}.txt")).collect();
    let parts: Vec<Part<'_>> = names
        .iter()
        .map(|name| Part::File {
            filename: name,
            content_type: Some("text/plain"),
            data: &chunk,
        })
        .collect();
    let too_large = post_multipart_auth(test.app(), "/api/admin/files", &parts, &token).await;
    assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(too_large).await["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assets_can_be_listed_served_and_deleted(pool: PgPool) {
    let test = build_test_app(pool);
    let token = admin_token(&test).await;

    let category = post_json_auth(
        test.app(),
        "/api/admin/categories",
        json!({ "name": "Media" }),
        &token,
    )
    .await;
    let category_id = body_json(category).await["data"]["id"].clone();
    let subcategory = post_json_auth(
        test.app(),
        "/api/admin/subcategories",
        json!({ "category_id": category_id, "name": "Images" }),
        &token,
    )
    .await;
    let subcategory_id = body_json(subcategory).await["data"]["id"].clone();
    let component = post_json_auth(
        test.app(),
        "/api/admin/components",
        json!({ "subcategory_id": subcategory_id, "name": "Gallery" }),
        &token,
    )
    .await;
    let component_id = body_json(component).await["data"]["id"].as_i64().unwrap();

    let upload = post_multipart_auth(
        test.app(),
        "/api/admin/files",
        &[
            Part::Text {
                name: "component_id",
                value: &component_id.to_string(),
            },
            Part::File {
                filename: "Cover Photo.txt",
                content_type: None,
                data: b"pixels",
            },
        ],
        &token,
    )
    .await;
    assert_eq!(upload.status(), StatusCode::CREATED);
    let json = body_json(upload).await;
    let asset = &json["data"]["items"][0]["asset"];
    let asset_id = asset["id"].as_i64().unwrap();
    assert_eq!(asset["component_id"], component_id);
    assert_eq!(asset["original_name"], "Cover Photo.txt");
    let url = asset["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));

    let served = get(test.app(), &url).await;
    assert_eq!(served.status(), StatusCode::OK);

    let list = get_auth(
        test.app(),
        &format!("/api/admin/files?component_id={component_id}"),
        &token,
    )
    .await;
    let json = body_json(list).await;
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["data"][0]["url"], url.as_str());

    let exists = get_auth(test.app(), &format!("/api/admin/files/{asset_id}/exists"), &token).await;
    assert_eq!(body_json(exists).await["data"]["exists"], true);

    let deleted = delete_auth(test.app(), &format!("/api/admin/files/{asset_id}"), &token).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = get_auth(test.app(), &format!("/api/admin/files/{asset_id}"), &token).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    let served = get(test.app(), &url).await;
    assert_eq!(served.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_an_asset_tolerates_a_missing_object(pool: PgPool) {
    let test = build_test_app(pool);
    let token = admin_token(&test).await;

    let upload = post_multipart_auth(
        test.app(),
        "/api/admin/files",
        &[Part::File {
            filename: "orphan.txt",
            content_type: None,
            data: b"soon gone",
        }],
        &token,
    )
    .await;
    let json = body_json(upload).await;
    let asset = &json["data"]["items"][0]["asset"];
    let asset_id = asset["id"].as_i64().unwrap();
    let key = asset["object_key"].as_str().unwrap();
    std::fs::remove_file(test.storage_dir.path().join(key)).unwrap();

    let exists = get_auth(test.app(), &format!("/api/admin/files/{asset_id}/exists"), &token).await;
    assert_eq!(body_json(exists).await["data"]["exists"], false);

    let deleted = delete_auth(test.app(), &format!("/api/admin/files/{asset_id}"), &token).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assets_on_another_disk_are_listed_but_not_deleted(pool: PgPool) {
    let asset_id: i64 = sqlx::query_scalar(
        "INSERT INTO assets (disk, object_key, original_name, content_type, size_bytes, checksum_sha256) \
         VALUES ('s3', 'uploads/remote.png', 'remote.png', 'image/png', 4, 'abcd') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let test = build_test_app(pool.clone());
    let token = admin_token(&test).await;

    let list = get_auth(test.app(), "/api/admin/files", &token).await;
    let json = body_json(list).await;
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["data"][0]["disk"], "s3");
    assert!(json["data"][0]["url"].is_null());

    let deleted = delete_auth(test.app(), &format!("/api/admin/files/{asset_id}"), &token).await;
    assert_eq!(deleted.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(deleted).await["error"]["code"], "CONFLICT");

    let still_there = get_auth(test.app(), &format!("/api/admin/files/{asset_id}"), &token).await;
    assert_eq!(still_there.status(), StatusCode::OK);
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE id = $1")
        .bind(asset_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}
