//! Integration tests for users, accounts, sessions and magic-link tokens.

use atelier_db::models::account::{PROVIDER_CREDENTIAL, PROVIDER_MAGIC_LINK};
use atelier_db::models::session::CreateSession;
use atelier_db::models::user::{CreateUser, UpdateUser};
use atelier_db::repositories::{AccountRepo, MagicLinkRepo, SessionRepo, UserRepo};
use chrono::{Duration, Utc};
use sqlx::PgPool;

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        name: "Ada".to_string(),
        role: None,
        email_verified: false,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_email_case_insensitive(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("Ada@Example.com")).await.unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.role, "user");
    assert!(user.is_active);

    let found = UserRepo::find_by_email(&pool, "ADA@example.COM").await.unwrap().unwrap();
    assert_eq!(found.id, user.id);

    let err = UserRepo::create(&pool, &new_user("ada@example.com")).await.unwrap_err();
    let constraint = err.as_database_error().and_then(|e| e.constraint()).map(str::to_string);
    assert_eq!(constraint.as_deref(), Some("uq_users_email"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_update_and_listing(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("grace@example.com")).await.unwrap();
    UserRepo::create(&pool, &new_user("linus@example.com")).await.unwrap();

    let updated = UserRepo::update(
        &pool,
        user.id,
        &UpdateUser {
            name: None,
            role: Some("admin".to_string()),
            is_active: Some(false),
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.role, "admin");
    assert!(!updated.is_active);
    assert_eq!(updated.name, "Ada");

    let pattern = atelier_core::search::ilike_pattern(Some("grace"));
    let hits = UserRepo::list(&pool, pattern.as_deref(), 20, 0).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(UserRepo::count(&pool, None).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_accounts_link_once(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("acct@example.com")).await.unwrap();
    AccountRepo::create_credential(&pool, user.id, "$argon2id$stub").await.unwrap();
    AccountRepo::link_provider(&pool, user.id, PROVIDER_MAGIC_LINK).await.unwrap();
    AccountRepo::link_provider(&pool, user.id, PROVIDER_MAGIC_LINK).await.unwrap();

    let credential = AccountRepo::find(&pool, user.id, PROVIDER_CREDENTIAL).await.unwrap().unwrap();
    assert_eq!(credential.password_hash.as_deref(), Some("$argon2id$stub"));
    let magic = AccountRepo::find(&pool, user.id, PROVIDER_MAGIC_LINK).await.unwrap().unwrap();
    assert!(magic.password_hash.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_lifecycle(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("sess@example.com")).await.unwrap();
    let session = SessionRepo::create(
        &pool,
        &CreateSession {
            user_id: user.id,
            token_hash: "hash-live".to_string(),
            expires_at: Utc::now() + Duration::days(30),
            user_agent: Some("test".to_string()),
            ip_address: None,
        },
    )
    .await
    .unwrap();
    SessionRepo::create(
        &pool,
        &CreateSession {
            user_id: user.id,
            token_hash: "hash-expired".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
            user_agent: None,
            ip_address: None,
        },
    )
    .await
    .unwrap();

    assert!(SessionRepo::find_active_by_token_hash(&pool, "hash-live").await.unwrap().is_some());
    assert!(SessionRepo::find_active_by_token_hash(&pool, "hash-expired").await.unwrap().is_none());

    assert!(SessionRepo::revoke(&pool, session.id).await.unwrap());
    assert!(!SessionRepo::revoke(&pool, session.id).await.unwrap());
    assert!(SessionRepo::find_active_by_token_hash(&pool, "hash-live").await.unwrap().is_none());

    assert_eq!(SessionRepo::cleanup_expired(&pool).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_magic_link_consumed_once(pool: PgPool) {
    MagicLinkRepo::create(&pool, "jti-1", " New@Example.com ", Utc::now() + Duration::minutes(15))
        .await
        .unwrap();

    let first = MagicLinkRepo::consume(&pool, "jti-1").await.unwrap().unwrap();
    assert_eq!(first.email, "new@example.com");
    assert!(first.consumed_at.is_some());

    assert!(MagicLinkRepo::consume(&pool, "jti-1").await.unwrap().is_none());
    assert!(MagicLinkRepo::consume(&pool, "unknown").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_magic_link_expired_not_consumable(pool: PgPool) {
    MagicLinkRepo::create(&pool, "jti-old", "late@example.com", Utc::now() - Duration::seconds(1))
        .await
        .unwrap();
    assert!(MagicLinkRepo::consume(&pool, "jti-old").await.unwrap().is_none());
    assert_eq!(MagicLinkRepo::cleanup(&pool).await.unwrap(), 1);
}
