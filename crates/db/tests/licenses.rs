//! Integration tests for license activation and status transitions.

use assert_matches::assert_matches;
use atelier_core::types::DbId;
use atelier_db::models::license::{CreateLicense, LicenseFilter, PaymentDetails};
use atelier_db::models::user::CreateUser;
use atelier_db::repositories::{ActivateOutcome, LicenseRepo, StripeEventRepo, UserRepo};
use sqlx::PgPool;

async fn user(pool: &PgPool, email: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: "Buyer".to_string(),
            role: None,
            email_verified: false,
        },
    )
    .await
    .unwrap()
    .id
}

async fn pending(pool: &PgPool, user_id: DbId, tier: &str) -> DbId {
    LicenseRepo::create_pending(
        pool,
        &CreateLicense {
            user_id,
            tier: tier.to_string(),
            seats: 1,
            amount_cents: Some(14900),
            currency: Some("usd".to_string()),
        },
    )
    .await
    .unwrap()
    .id
}

fn payment(intent: &str) -> PaymentDetails {
    PaymentDetails {
        payment_intent_id: Some(intent.to_string()),
        customer_id: Some("cus_123".to_string()),
        amount_cents: Some(14900),
        currency: Some("usd".to_string()),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_activate_pending_license(pool: PgPool) {
    let user_id = user(&pool, "a@example.com").await;
    let id = pending(&pool, user_id, "pro").await;
    LicenseRepo::attach_checkout_session(&pool, id, "cs_test_1").await.unwrap();

    let outcome = LicenseRepo::activate(&pool, id, &payment("pi_1")).await.unwrap().unwrap();
    assert_matches!(outcome, ActivateOutcome::Activated { ref license, ref superseded } => {
        assert_eq!(license.status, "active");
        assert!(license.activated_at.is_some());
        assert_eq!(license.stripe_payment_intent_id.as_deref(), Some("pi_1"));
        assert!(superseded.is_empty());
    });

    let by_session = LicenseRepo::find_by_checkout_session(&pool, "cs_test_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_session.id, id);
    let by_intent = LicenseRepo::find_by_payment_intent(&pool, "pi_1").await.unwrap().unwrap();
    assert_eq!(by_intent.id, id);

    let active = LicenseRepo::find_active_for_user(&pool, user_id).await.unwrap().unwrap();
    assert_eq!(active.tier, "pro");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_activate_supersedes_previous_active(pool: PgPool) {
    let user_id = user(&pool, "b@example.com").await;
    let first = pending(&pool, user_id, "pro").await;
    LicenseRepo::activate(&pool, first, &payment("pi_a")).await.unwrap();

    let second = pending(&pool, user_id, "team").await;
    let outcome = LicenseRepo::activate(&pool, second, &payment("pi_b")).await.unwrap().unwrap();
    assert_matches!(outcome, ActivateOutcome::Activated { superseded, .. } => {
        assert_eq!(superseded, vec![first]);
    });

    let old = LicenseRepo::find_by_id(&pool, first).await.unwrap().unwrap();
    assert_eq!(old.status, "superseded");
    let active = LicenseRepo::find_active_for_user(&pool, user_id).await.unwrap().unwrap();
    assert_eq!(active.id, second);
    assert_eq!(active.tier, "team");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_activate_is_idempotent_and_rejects_terminal(pool: PgPool) {
    let user_id = user(&pool, "c@example.com").await;
    let id = pending(&pool, user_id, "pro").await;

    LicenseRepo::activate(&pool, id, &payment("pi_c")).await.unwrap();
    let again = LicenseRepo::activate(&pool, id, &payment("pi_c")).await.unwrap().unwrap();
    assert_matches!(again, ActivateOutcome::AlreadyActive(_));

    let expired = pending(&pool, user_id, "pro").await;
    LicenseRepo::set_status(&pool, expired, &["pending"], "expired", None)
        .await
        .unwrap()
        .unwrap();
    let outcome = LicenseRepo::activate(&pool, expired, &payment("pi_d")).await.unwrap().unwrap();
    assert_matches!(outcome, ActivateOutcome::NotPending(license) => {
        assert_eq!(license.status, "expired");
    });

    assert!(LicenseRepo::activate(&pool, 424242, &PaymentDetails::default())
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_status_is_conditional(pool: PgPool) {
    let user_id = user(&pool, "d@example.com").await;
    let id = pending(&pool, user_id, "enterprise").await;

    let failed = LicenseRepo::set_status(&pool, id, &["pending"], "failed", Some("card_declined"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, "failed");
    assert_eq!(failed.failure_reason.as_deref(), Some("card_declined"));

    // Already failed: a late "expired" event does not apply.
    let late = LicenseRepo::set_status(&pool, id, &["pending"], "expired", None)
        .await
        .unwrap();
    assert!(late.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_active_index_enforced(pool: PgPool) {
    let user_id = user(&pool, "e@example.com").await;
    let a = pending(&pool, user_id, "pro").await;
    let b = pending(&pool, user_id, "pro").await;
    LicenseRepo::activate(&pool, a, &payment("pi_e")).await.unwrap();

    // Bypassing `activate` must hit the partial unique index.
    let err = LicenseRepo::set_status(&pool, b, &["pending"], "active", None)
        .await
        .unwrap_err();
    let constraint = err.as_database_error().and_then(|e| e.constraint()).map(str::to_string);
    assert_eq!(constraint.as_deref(), Some("uq_licenses_active_user"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_and_count_with_filter(pool: PgPool) {
    let u1 = user(&pool, "f@example.com").await;
    let u2 = user(&pool, "g@example.com").await;
    let l1 = pending(&pool, u1, "pro").await;
    pending(&pool, u1, "team").await;
    pending(&pool, u2, "pro").await;
    LicenseRepo::activate(&pool, l1, &payment("pi_f")).await.unwrap();

    let for_u1 = LicenseFilter {
        user_id: Some(u1),
        ..Default::default()
    };
    assert_eq!(LicenseRepo::count(&pool, &for_u1).await.unwrap(), 2);

    let pending_only = LicenseFilter {
        status: Some("pending".to_string()),
        ..Default::default()
    };
    let rows = LicenseRepo::list(&pool, &pending_only, 20, 0).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|l| l.status == "pending"));

    assert_eq!(LicenseRepo::list_for_user(&pool, u2).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stripe_event_record_upserts(pool: PgPool) {
    assert!(StripeEventRepo::find_by_event_id(&pool, "evt_1").await.unwrap().is_none());

    let first = StripeEventRepo::record(&pool, "evt_1", "checkout.session.completed", "failed", Some("db down"))
        .await
        .unwrap();
    assert_eq!(first.status, "failed");

    let second = StripeEventRepo::record(&pool, "evt_1", "checkout.session.completed", "processed", None)
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.status, "processed");
    assert!(second.error.is_none());
    assert_eq!(second.received_at, first.received_at);
}
