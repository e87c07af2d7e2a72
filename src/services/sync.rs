// SPDX-License-Identifier: MIT

//! Session/profile synchronizer.
//!
//! Owns the in-memory `{user, session}` pair, listens to identity
//! lifecycle events, and keeps the composite user in sync with the
//! profile store. State is fanned out through a watch channel:
//! consumers read `snapshot()` or hold a `subscribe()` receiver;
//! dropping the receiver unsubscribes.
//!
//! States: bootstrapping (loading, nothing resolved yet) → anonymous or
//! authenticated; operations move between them via provider events. The
//! four operations delegate to the providers and never patch the user
//! optimistically; the composite user is always rebuilt from a
//! store-confirmed fetch.

use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use validator::ValidateEmail;

use crate::config::{Config, OrphanAccountPolicy};
use crate::error::{Error, Result};
use crate::models::{CompositeUser, ProfileUpdate, Role, Session, UserMetadata, UserProfile};
use crate::providers::{AuthEvent, IdentityProvider, ProfileStore};

/// Snapshot of the synchronizer state, published on every change.
#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    pub user: Option<CompositeUser>,
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Signup-time policy: which addresses get the admin role, and what to
/// do with an identity account whose profile insert failed.
#[derive(Debug, Clone, Default)]
pub struct SignupPolicy {
    pub admin_emails: Vec<String>,
    pub orphan_accounts: OrphanAccountPolicy,
}

impl SignupPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            admin_emails: config.admin_emails.clone(),
            orphan_accounts: config.orphan_accounts,
        }
    }

    fn role_for(&self, email: &str) -> Role {
        if self
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
        {
            Role::Admin
        } else {
            Role::Patient
        }
    }
}

/// Bridges identity provider events to profile store state and exposes
/// the auth operations.
pub struct Synchronizer {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    policy: SignupPolicy,
    state: watch::Sender<AuthSnapshot>,
}

impl Synchronizer {
    /// Resolve the current session (if any), then start the lifecycle
    /// event loop. The returned synchronizer is past bootstrapping:
    /// either anonymous or authenticated.
    pub async fn start(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        policy: SignupPolicy,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(AuthSnapshot {
            user: None,
            session: None,
            is_loading: true,
        });
        let sync = Arc::new(Self {
            identity,
            profiles,
            policy,
            state,
        });

        // Subscribe before bootstrapping so no event is missed between
        // the initial session fetch and the loop starting
        let events = sync.identity.subscribe();
        sync.bootstrap().await;

        let weak = Arc::downgrade(&sync);
        tokio::spawn(run_event_loop(weak, events));

        sync
    }

    /// Initial session resolution on startup.
    async fn bootstrap(&self) {
        match self.identity.get_session().await {
            Ok(Some(session)) => {
                let user = self.resolve_user(&session).await;
                self.state.send_modify(|st| {
                    st.session = Some(session);
                    st.user = Some(user);
                    st.is_loading = false;
                });
                tracing::info!("Restored existing session");
            }
            Ok(None) => {
                self.state.send_modify(|st| st.is_loading = false);
                tracing::debug!("No existing session");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session restore failed, starting anonymous");
                self.state.send_modify(|st| st.is_loading = false);
            }
        }
    }

    // ─── Exposed operations ──────────────────────────────────────

    /// Password sign-in. On success the provider's signed-in event
    /// drives the profile fetch; callers must not assume `user` is set
    /// when this resolves.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "email and password are required".to_string(),
            ));
        }

        self.set_loading(true);
        let result = self.identity.sign_in_with_password(email, password).await;
        self.set_loading(false);

        match result {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "Login successful");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                Err(e)
            }
        }
    }

    /// Create an identity account and its profile row. A failed profile
    /// insert after the account was created surfaces as
    /// `ProfileSetupIncomplete`; the account itself is handled per the
    /// orphan-account policy.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        age: Option<u32>,
    ) -> Result<()> {
        if name.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "name and password are required".to_string(),
            ));
        }
        if !email.validate_email() {
            return Err(Error::Validation(
                "a valid email address is required".to_string(),
            ));
        }

        self.set_loading(true);
        let result = self.do_signup(name, email, password, age).await;
        self.set_loading(false);
        result
    }

    async fn do_signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        age: Option<u32>,
    ) -> Result<()> {
        let metadata = UserMetadata {
            name: Some(name.trim().to_string()),
            age,
        };
        let identity = match self.identity.sign_up(email, password, metadata).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "Signup failed");
                return Err(e);
            }
        };

        let role = self.policy.role_for(email);
        let profile = UserProfile {
            user_id: identity.id.clone(),
            name: name.trim().to_string(),
            email: email.to_string(),
            role,
            age,
            diseases: Vec::new(),
            disorders: Vec::new(),
        };

        if let Err(e) = self.profiles.insert_profile(&profile).await {
            tracing::error!(user_id = %identity.id, error = %e, "Profile insert failed after signup");
            if self.policy.orphan_accounts == OrphanAccountPolicy::Delete {
                if let Err(cleanup) = self.identity.delete_user(&identity.id).await {
                    tracing::error!(user_id = %identity.id, error = %cleanup, "Orphan account cleanup failed");
                } else {
                    tracing::info!(user_id = %identity.id, "Orphaned identity account deleted");
                }
            }
            return Err(Error::ProfileSetupIncomplete(e.to_string()));
        }

        tracing::info!(user_id = %identity.id, role = ?role, "Signup complete");

        // The signed-in event may have resolved the user before the row
        // existed; re-fetch now that it does
        if let Ok(Some(session)) = self.identity.get_session().await {
            if session.user.id == identity.id {
                self.refresh_user(&session).await;
            }
        }
        Ok(())
    }

    /// Invalidate the session with the provider. Local state is only
    /// cleared by the resulting signed-out event, never optimistically,
    /// so a failed call leaves the session usable for a retry.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.identity.sign_out().await {
            tracing::warn!(error = %e, "Logout failed, keeping local session");
            return Err(e);
        }
        tracing::info!("Logout successful");
        Ok(())
    }

    /// Write the supplied fields to the profile store, then rebuild the
    /// composite user from a fresh fetch. An empty update touches
    /// nothing.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<()> {
        let session = self
            .state
            .borrow()
            .session
            .clone()
            .ok_or_else(|| Error::Validation("you must be logged in".to_string()))?;

        if update.is_empty() {
            return Ok(());
        }

        if let Err(e) = self
            .profiles
            .update_profile(&session.user.id, &update)
            .await
        {
            tracing::warn!(user_id = %session.user.id, error = %e, "Profile update rejected");
            return Err(e);
        }

        // Store-confirmed overwrite, not an optimistic merge
        self.refresh_user(&session).await;
        tracing::info!(user_id = %session.user.id, "Profile updated");
        Ok(())
    }

    // ─── Read access ─────────────────────────────────────────────

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<CompositeUser> {
        self.state.borrow().user.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    // ─── Internals ───────────────────────────────────────────────

    fn set_loading(&self, loading: bool) {
        self.state.send_modify(|st| st.is_loading = loading);
    }

    async fn handle_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) | AuthEvent::UserUpdated(session) => {
                self.state
                    .send_modify(|st| st.session = Some(session.clone()));
                self.refresh_user(&session).await;
            }
            AuthEvent::TokenRefreshed(session) => {
                // Token rotation does not change profile data
                self.state.send_modify(|st| st.session = Some(session));
            }
            AuthEvent::SignedOut => {
                self.state.send_modify(|st| {
                    st.user = None;
                    st.session = None;
                    st.is_loading = false;
                });
                tracing::debug!("Session cleared");
            }
        }
    }

    /// Fetch-and-map, guarded against staleness: the result is applied
    /// only if the current session still belongs to the same identity.
    async fn refresh_user(&self, session: &Session) {
        let user = self.resolve_user(session).await;
        let applied = self.state.send_if_modified(|st| {
            let current = st.session.as_ref().map(|s| s.user.id.as_str());
            if current == Some(session.user.id.as_str()) {
                st.user = Some(user.clone());
                true
            } else {
                false
            }
        });
        if !applied {
            tracing::debug!(user_id = %session.user.id, "Dropped stale profile fetch result");
        }
    }

    /// Resolve the composite user for a session. Never fails: a missing
    /// row or an unreachable store falls back to a view derived from the
    /// identity fields, so `user` is never left null while a session is
    /// present.
    async fn resolve_user(&self, session: &Session) -> CompositeUser {
        let identity = &session.user;
        match self.profiles.fetch_profile(&identity.id).await {
            Ok(Some(profile)) => CompositeUser::from_profile(identity, profile),
            Ok(None) => {
                tracing::warn!(user_id = %identity.id, "No profile row, synthesizing fallback user");
                CompositeUser::from_identity(identity)
            }
            Err(e) => {
                tracing::error!(user_id = %identity.id, error = %e, "Profile fetch failed, falling back to identity fields");
                CompositeUser::from_identity(identity)
            }
        }
    }
}

/// Single sequential consumer of identity lifecycle events. Holding
/// only a weak reference lets the synchronizer drop when its last
/// consumer does.
async fn run_event_loop(sync: Weak<Synchronizer>, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let Some(sync) = sync.upgrade() else { break };
                sync.handle_event(event).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Auth event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_policy() {
        let policy = SignupPolicy {
            admin_emails: vec!["admin@hospital.com".to_string()],
            orphan_accounts: OrphanAccountPolicy::Keep,
        };
        assert_eq!(policy.role_for("admin@hospital.com"), Role::Admin);
        assert_eq!(policy.role_for("Admin@Hospital.com"), Role::Admin);
        assert_eq!(policy.role_for("jane@example.com"), Role::Patient);
        assert_eq!(SignupPolicy::default().role_for("admin@hospital.com"), Role::Patient);
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot = AuthSnapshot::default();
        assert!(!snapshot.is_authenticated());
        assert!(snapshot.user.is_none());
    }
}
