// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use careportal::models::{Identity, Role, UserMetadata, UserProfile};
use careportal::providers::{MemoryIdentity, MemoryStore};
use careportal::services::{AuthSnapshot, SignupPolicy, Synchronizer};

/// In-memory harness: identity provider, table store and a started
/// synchronizer.
pub struct Harness {
    pub identity: Arc<MemoryIdentity>,
    pub store: Arc<MemoryStore>,
    pub auth: Arc<Synchronizer>,
}

/// Enable log output for a test run via RUST_LOG.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Start a synchronizer over fresh in-memory providers.
#[allow(dead_code)]
pub async fn start() -> Harness {
    start_with_policy(SignupPolicy::default()).await
}

/// Start with a specific signup policy.
#[allow(dead_code)]
pub async fn start_with_policy(policy: SignupPolicy) -> Harness {
    init_logging();
    let identity = Arc::new(MemoryIdentity::new());
    let store = Arc::new(MemoryStore::new());
    let auth = Synchronizer::start(identity.clone(), store.clone(), policy).await;
    Harness {
        identity,
        store,
        auth,
    }
}

/// Seed an account with a matching patient profile row.
#[allow(dead_code)]
pub fn seed_patient(
    harness: &Harness,
    email: &str,
    password: &str,
    name: &str,
    age: Option<u32>,
) -> Identity {
    let identity = harness.identity.seed_account(
        email,
        password,
        UserMetadata {
            name: Some(name.to_string()),
            age,
        },
    );
    harness.store.seed_profile(UserProfile {
        user_id: identity.id.clone(),
        name: name.to_string(),
        email: email.to_string(),
        role: Role::Patient,
        age,
        diseases: Vec::new(),
        disorders: Vec::new(),
    });
    identity
}

/// Wait until the auth state satisfies the predicate, observing every
/// published snapshot. Panics after two seconds.
#[allow(dead_code)]
pub async fn wait_for<F>(auth: &Synchronizer, mut predicate: F) -> AuthSnapshot
where
    F: FnMut(&AuthSnapshot) -> bool,
{
    let mut rx = auth.subscribe();
    tokio::time::timeout(Duration::from_secs(2), async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if predicate(&snapshot) {
                return snapshot;
            }
            rx.changed().await.expect("synchronizer dropped");
        }
    })
    .await
    .expect("timed out waiting for auth state")
}
