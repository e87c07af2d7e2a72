// SPDX-License-Identifier: MIT

//! Fetch-and-map fallbacks: missing rows and unreachable stores must
//! never leave a session without a user.

mod common;

use careportal::models::{Role, UserMetadata};

#[tokio::test]
async fn test_missing_row_synthesizes_fallback_user() {
    let h = common::start().await;
    // Account exists but no profile row was ever created
    h.identity
        .seed_account("jane@example.com", "secret123", UserMetadata::default());

    h.auth.login("jane@example.com", "secret123").await.unwrap();

    let snapshot = common::wait_for(&h.auth, |s| s.user.is_some()).await;
    let user = snapshot.user.unwrap();
    assert_eq!(user.name, "jane"); // email local-part
    assert_eq!(user.role, Role::Patient);
    assert!(user.diseases.is_empty());
    assert!(user.disorders.is_empty());
}

#[tokio::test]
async fn test_store_error_falls_back_to_identity_fields() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", Some(34));
    h.store.fail_profile_fetches(true);

    h.auth.login("jane@example.com", "secret123").await.unwrap();

    // Session present and user present: no session-without-profile
    // deadlock even though the store is down
    let snapshot = common::wait_for(&h.auth, |s| s.user.is_some()).await;
    assert!(snapshot.is_authenticated());
    let user = snapshot.user.unwrap();
    assert_eq!(user.name, "jane");
    assert_eq!(user.role, Role::Patient);
}

#[tokio::test]
async fn test_store_recovery_restores_profile_on_next_fetch() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", Some(34));
    h.store.fail_profile_fetches(true);

    h.auth.login("jane@example.com", "secret123").await.unwrap();
    common::wait_for(&h.auth, |s| s.user.is_some()).await;

    // Store comes back; the next lifecycle event re-resolves the user
    h.store.fail_profile_fetches(false);
    h.identity.announce_user_updated().await;

    let snapshot = common::wait_for(&h.auth, |s| {
        s.user.as_ref().is_some_and(|u| u.name == "Jane Doe")
    })
    .await;
    assert_eq!(snapshot.user.unwrap().age, Some(34));
}
