//! User, session and profile models.
//!
//! The identity provider owns the session and the identity fields; the
//! profile store owns the `user_profiles` row. `CompositeUser` is the
//! application-visible merge of the two, rebuilt wholesale on every
//! fetch rather than patched in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application role, assigned at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Patient,
    Doctor,
}

/// Row in the `user_profiles` table.
///
/// `user_id` equals the identity provider's user id and is set once at
/// signup; it is never part of an update payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    /// Mirrors the identity provider's email; read-mostly.
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub diseases: Vec<String>,
    #[serde(default)]
    pub disorders: Vec<String>,
}

/// Partial update for a profile row. Only the supplied fields are
/// written; `user_id` and `email` are structurally excluded (the former
/// is the key, the latter is governed by the identity provider).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diseases: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disorders: Option<Vec<String>>,
}

impl ProfileUpdate {
    /// An empty update carries no fields and must not touch the store.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.role.is_none()
            && self.age.is_none()
            && self.diseases.is_none()
            && self.disorders.is_none()
    }
}

/// Auxiliary metadata attached to the identity account at signup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// Identity fields owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque provider-issued user id
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub metadata: UserMetadata,
}

/// Session issued by the identity provider. The synchronizer holds a
/// read-only cached copy; the provider replaces it on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Identity,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Application-visible user: identity fields merged with the profile
/// row. Always rebuilt from a fresh fetch, never partially patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub age: Option<u32>,
    pub diseases: Vec<String>,
    pub disorders: Vec<String>,
}

impl CompositeUser {
    /// Merge an identity with its store-confirmed profile row.
    pub fn from_profile(identity: &Identity, profile: UserProfile) -> Self {
        Self {
            id: identity.id.clone(),
            email: profile.email,
            name: profile.name,
            role: profile.role,
            age: profile.age,
            diseases: profile.diseases,
            disorders: profile.disorders,
        }
    }

    /// Fallback view for an identity with no profile row (or an
    /// unreachable store): patient role, name derived from the email
    /// local-part, empty condition lists.
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            name: display_name_from_email(&identity.email),
            role: Role::Patient,
            age: identity.metadata.age,
            diseases: Vec::new(),
            disorders: Vec::new(),
        }
    }
}

/// Derive a display name from the local part of an email address.
pub fn display_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    if local.is_empty() {
        "User".to_string()
    } else {
        local.to_string()
    }
}
