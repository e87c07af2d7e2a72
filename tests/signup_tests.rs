// SPDX-License-Identifier: MIT

//! Signup: profile row creation, role policy, partial-failure handling.

mod common;

use careportal::config::OrphanAccountPolicy;
use careportal::error::Error;
use careportal::models::Role;
use careportal::services::SignupPolicy;

#[tokio::test]
async fn test_signup_creates_profile_row() {
    let h = common::start().await;

    h.auth
        .signup("Jane Doe", "jane@example.com", "secret123", Some(34))
        .await
        .expect("signup should succeed");

    let snapshot = common::wait_for(&h.auth, |s| {
        s.user.as_ref().is_some_and(|u| u.name == "Jane Doe")
    })
    .await;
    assert!(snapshot.is_authenticated());

    let user_id = snapshot.user.unwrap().id;
    let row = h.store.profile_row(&user_id).expect("row must exist");
    assert_eq!(row.name, "Jane Doe");
    assert_eq!(row.email, "jane@example.com");
    assert_eq!(row.role, Role::Patient);
    assert_eq!(row.age, Some(34));
    assert!(row.diseases.is_empty());
    assert!(row.disorders.is_empty());
}

#[tokio::test]
async fn test_signup_admin_email_policy() {
    let policy = SignupPolicy {
        admin_emails: vec!["admin@hospital.com".to_string()],
        orphan_accounts: OrphanAccountPolicy::Keep,
    };
    let h = common::start_with_policy(policy).await;

    h.auth
        .signup("Site Admin", "admin@hospital.com", "secret123", None)
        .await
        .unwrap();

    let snapshot = common::wait_for(&h.auth, |s| s.user.is_some()).await;
    let row = h.store.profile_row(&snapshot.user.unwrap().id).unwrap();
    assert_eq!(row.role, Role::Admin);
}

#[tokio::test]
async fn test_signup_rejects_invalid_input() {
    let h = common::start().await;

    let err = h
        .auth
        .signup("Jane", "not-an-email", "secret123", None)
        .await
        .expect_err("bad email must be rejected");
    assert!(err.is_validation());

    let err = h
        .auth
        .signup("", "jane@example.com", "secret123", None)
        .await
        .expect_err("empty name must be rejected");
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", None);

    let err = h
        .auth
        .signup("Jane Again", "jane@example.com", "other-pass", None)
        .await
        .expect_err("duplicate signup must fail");
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_profile_insert_failure_is_reported_distinctly() {
    let h = common::start().await;
    h.store.fail_profile_inserts(true);

    let err = h
        .auth
        .signup("Jane Doe", "jane@example.com", "secret123", None)
        .await
        .expect_err("profile insert fails");
    assert!(matches!(err, Error::ProfileSetupIncomplete(_)));

    // Default policy keeps the identity account
    assert!(h.identity.account_exists("jane@example.com"));
    assert_eq!(h.identity.delete_calls(), 0);
}

#[tokio::test]
async fn test_orphan_delete_policy_cleans_up_account() {
    let policy = SignupPolicy {
        admin_emails: Vec::new(),
        orphan_accounts: OrphanAccountPolicy::Delete,
    };
    let h = common::start_with_policy(policy).await;
    h.store.fail_profile_inserts(true);

    let err = h
        .auth
        .signup("Jane Doe", "jane@example.com", "secret123", None)
        .await
        .expect_err("profile insert fails");
    assert!(matches!(err, Error::ProfileSetupIncomplete(_)));

    assert_eq!(h.identity.delete_calls(), 1);
    assert!(!h.identity.account_exists("jane@example.com"));
}
