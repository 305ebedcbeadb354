#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use atelier_api::auth::password::hash_password;
use atelier_api::config::ServerConfig;
use atelier_api::router::build_app_router;
use atelier_api::state::AppState;
use atelier_api::stripe::{CheckoutProvider, CheckoutRequest, CheckoutSession, StripeError};
use atelier_db::models::user::{CreateUser, User};
use atelier_db::repositories::{AccountRepo, UserRepo};
use atelier_events::{EventBus, LogMailer};
use atelier_storage::{LocalDisk, StorageConfig};

pub const AUTH_SECRET: &str = "test-secret-test-secret-test-secret-0001";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const PASSWORD: &str = "correct-horse-battery";

/// Checkout provider that never leaves the process.
#[derive(Default)]
pub struct FakeCheckout {
    pub requests: Mutex<Vec<CheckoutRequest>>,
    pub fail: AtomicBool,
    counter: AtomicUsize,
}

impl FakeCheckout {
    pub fn last_request(&self) -> Option<CheckoutRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CheckoutProvider for FakeCheckout {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StripeError::Api {
                status: 500,
                message: "stripe is down".into(),
            });
        }
        self.requests.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n}");
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/pay/{id}"),
            id,
        })
    }
}

/// Everything a test needs to drive the app and inspect side effects.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub mailer: Arc<LogMailer>,
    pub checkout: Arc<FakeCheckout>,
    pub event_bus: Arc<EventBus>,
    pub storage_dir: TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build a test `ServerConfig` from a fixed variable set.
pub fn test_config() -> ServerConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("HOST", "127.0.0.1"),
        ("PORT", "0"),
        ("CORS_ORIGINS", "http://localhost:3000"),
        ("AUTH_SECRET", AUTH_SECRET),
        ("APP_URL", "http://localhost:3001"),
        ("MAX_UPLOAD_BYTES", "1024"),
        ("MAX_BATCH_BYTES", "8192"),
        ("UPLOAD_CONCURRENCY", "2"),
        ("UPLOAD_MAX_RETRIES", "1"),
        ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
        ("STRIPE_PRICE_PRO", "price_pro"),
        ("STRIPE_PRICE_TEAM", "price_team"),
    ]);
    let mut config = ServerConfig::from_lookup(&|name| vars.get(name).map(|v| v.to_string()))
        .expect("test config must be valid");
    config.upload.retry_base_delay_ms = 1;
    config
}

/// Build the full application router with all middleware layers, using the
/// given database pool, a temporary local disk, a log-only mailer and a fake
/// checkout provider.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let storage_dir = TempDir::new().expect("temp dir");
    let root = storage_dir.path().to_string_lossy().to_string();
    let storage_config = StorageConfig::from_lookup(|name| match name {
        "STORAGE_LOCAL_ROOT" => Some(root.clone()),
        _ => None,
    })
    .expect("storage config");

    let mailer = Arc::new(LogMailer::new());
    let checkout = Arc::new(FakeCheckout::default());
    let event_bus = Arc::new(EventBus::default());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        storage: Arc::new(LocalDisk::new(storage_dir.path(), &storage_config.public_url)),
        mailer: mailer.clone(),
        checkout: Some(checkout.clone()),
    };

    TestApp {
        router: build_app_router(state, &config, &storage_config),
        pool,
        mailer,
        checkout,
        event_bus,
        storage_dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

fn json_request(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Request<Body> {
    builder(method, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, builder(Method::GET, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, builder(Method::GET, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, body, None)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, json_request(Method::POST, uri, body, Some(token))).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, builder(Method::POST, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, body, Some(token))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, builder(Method::DELETE, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

pub const BOUNDARY: &str = "atelier-test-boundary";

pub enum Part<'a> {
    File {
        filename: &'a str,
        content_type: Option<&'a str>,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                if let Some(ct) = content_type {
                    body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart_auth(
    app: Router,
    uri: &str,
    parts: &[Part<'_>],
    token: &str,
) -> Response<Body> {
    let request = builder(Method::POST, uri, Some(token))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user with a password credential (`PASSWORD`).
pub async fn create_user(pool: &PgPool, email: &str, role: &str) -> User {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: email.split('@').next().unwrap_or("user").to_string(),
            role: Some(role.to_string()),
            email_verified: true,
        },
    )
    .await
    .expect("user creation should succeed");
    let hash = hash_password(PASSWORD).expect("hashing should succeed");
    AccountRepo::create_credential(pool, user.id, &hash)
        .await
        .expect("credential creation should succeed");
    user
}

/// Sign in through the API and return the session token.
pub async fn sign_in(app: Router, email: &str) -> String {
    let response = post_json(
        app,
        "/api/auth/sign-in",
        serde_json::json!({ "email": email, "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = body_json(response).await;
    json["data"]["session"]["token"]
        .as_str()
        .expect("session token")
        .to_string()
}

/// Create an admin and return its session token.
pub async fn admin_token(test: &TestApp) -> String {
    create_user(&test.pool, "admin@atelier.test", "admin").await;
    sign_in(test.app(), "admin@atelier.test").await
}

/// Create a regular user and return it with its session token.
pub async fn user_token(test: &TestApp, email: &str) -> (User, String) {
    let user = create_user(&test.pool, email, "user").await;
    let token = sign_in(test.app(), email).await;
    (user, token)
}
