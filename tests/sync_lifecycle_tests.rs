// SPDX-License-Identifier: MIT

//! Session lifecycle: bootstrap, login, logout, external revocation.

mod common;

use careportal::models::{Role, UserProfile};

#[tokio::test]
async fn test_bootstrap_anonymous() {
    let h = common::start().await;

    let snapshot = h.auth.snapshot();
    assert!(!snapshot.is_authenticated());
    assert!(snapshot.user.is_none());
    assert!(snapshot.session.is_none());
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_bootstrap_restores_existing_session() {
    let identity = std::sync::Arc::new(careportal::providers::MemoryIdentity::new());
    let store = std::sync::Arc::new(careportal::providers::MemoryStore::new());
    let id = identity.seed_account("jane@example.com", "secret123", Default::default());
    store.seed_profile(UserProfile {
        user_id: id.id.clone(),
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        role: Role::Patient,
        age: Some(34),
        diseases: Vec::new(),
        disorders: Vec::new(),
    });
    identity.seed_session("jane@example.com").await;

    let auth = careportal::services::Synchronizer::start(
        identity,
        store,
        careportal::services::SignupPolicy::default(),
    )
    .await;

    // Bootstrap resolves the session before start() returns
    let snapshot = auth.snapshot();
    assert!(snapshot.is_authenticated());
    assert!(!snapshot.is_loading);
    let user = snapshot.user.expect("user should be resolved");
    assert_eq!(user.name, "Jane Doe");
    assert_eq!(user.age, Some(34));
}

#[tokio::test]
async fn test_login_reaches_authenticated() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", Some(34));

    h.auth
        .login("jane@example.com", "secret123")
        .await
        .expect("login should succeed");

    let snapshot = common::wait_for(&h.auth, |s| s.user.is_some()).await;
    assert!(snapshot.is_authenticated());
    let user = snapshot.user.unwrap();
    assert_eq!(user.name, "Jane Doe");
    assert_eq!(user.role, Role::Patient);
    assert_eq!(user.email, "jane@example.com");
}

#[tokio::test]
async fn test_login_invalid_credentials_leaves_state_unchanged() {
    let h = common::start().await;
    common::seed_patient(&h, "admin@hospital.com", "rightpass", "Admin", None);

    let err = h
        .auth
        .login("admin@hospital.com", "wrongpass")
        .await
        .expect_err("wrong password must fail");
    assert!(err.is_auth());

    let snapshot = h.auth.snapshot();
    assert!(!snapshot.is_authenticated());
    assert!(snapshot.user.is_none());
    assert!(snapshot.session.is_none());
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let h = common::start().await;

    let err = h.auth.login("", "").await.expect_err("must be rejected");
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_logout_returns_to_anonymous() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", None);

    h.auth.login("jane@example.com", "secret123").await.unwrap();
    common::wait_for(&h.auth, |s| s.user.is_some()).await;

    h.auth.logout().await.expect("logout should succeed");

    let snapshot = common::wait_for(&h.auth, |s| !s.is_authenticated()).await;
    assert!(snapshot.user.is_none());
    assert!(snapshot.session.is_none());
}

#[tokio::test]
async fn test_logout_failure_keeps_local_state() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", None);

    h.auth.login("jane@example.com", "secret123").await.unwrap();
    common::wait_for(&h.auth, |s| s.user.is_some()).await;

    h.identity.set_unreachable(true);
    let err = h.auth.logout().await.expect_err("provider is down");
    assert!(err.is_auth());

    // Not cleared optimistically; the UI can retry
    let snapshot = h.auth.snapshot();
    assert!(snapshot.is_authenticated());
    assert!(snapshot.user.is_some());

    h.identity.set_unreachable(false);
    h.auth.logout().await.expect("retry should succeed");
    common::wait_for(&h.auth, |s| !s.is_authenticated()).await;
}

#[tokio::test]
async fn test_external_revocation_clears_state() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", None);

    h.auth.login("jane@example.com", "secret123").await.unwrap();
    common::wait_for(&h.auth, |s| s.user.is_some()).await;

    // Token revoked server-side: the provider announces the sign-out
    h.identity.revoke_session().await;

    let snapshot = common::wait_for(&h.auth, |s| !s.is_authenticated()).await;
    assert!(snapshot.user.is_none());
}

#[tokio::test]
async fn test_user_updated_event_refetches_profile() {
    let h = common::start().await;
    let id = common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", None);

    h.auth.login("jane@example.com", "secret123").await.unwrap();
    common::wait_for(&h.auth, |s| s.user.is_some()).await;

    // The row changes out of band, then the provider announces an
    // identity update; the synchronizer must re-fetch
    h.store.seed_profile(UserProfile {
        user_id: id.id.clone(),
        name: "Jane Renamed".to_string(),
        email: "jane@example.com".to_string(),
        role: Role::Patient,
        age: None,
        diseases: Vec::new(),
        disorders: Vec::new(),
    });
    h.identity.announce_user_updated().await;

    let snapshot = common::wait_for(&h.auth, |s| {
        s.user.as_ref().is_some_and(|u| u.name == "Jane Renamed")
    })
    .await;
    assert!(snapshot.is_authenticated());
}
