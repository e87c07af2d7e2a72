// SPDX-License-Identifier: MIT

//! Crate error type covering the auth/profile boundary.
//!
//! Every external call is attempted exactly once; failures are terminal
//! for that invocation and reported through this enum. A failed profile
//! insert after a successful identity signup is reported distinctly
//! (`ProfileSetupIncomplete`) rather than masked as a full failure.

use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad credentials or the identity provider is unreachable.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Profile fetch failed against the store.
    #[error("Profile error: {0}")]
    Profile(String),

    /// Missing/invalid input, or the operation requires authentication.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The profile store rejected a write.
    #[error("Store error: {0}")]
    Store(String),

    /// The identity account was created but the profile row insert
    /// failed. The account is left in place unless the orphan-account
    /// policy says otherwise.
    #[error("Account created, but profile setup failed: {0}")]
    ProfileSetupIncomplete(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Marker used when the remote service could not be reached at all,
    /// as opposed to rejecting the request.
    pub const UNREACHABLE: &'static str = "service unreachable";

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True for any store-side write rejection.
    pub fn is_store(&self) -> bool {
        matches!(self, Error::Store(_))
    }

    /// Stable machine-readable code, suitable for a notification layer.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Auth(_) => "auth_error",
            Error::Profile(_) => "profile_error",
            Error::Validation(_) => "validation_error",
            Error::Store(_) => "store_error",
            Error::ProfileSetupIncomplete(_) => "profile_setup_incomplete",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convert into a serializable report for a UI notification layer.
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            error: self.code().to_string(),
            details: self.to_string(),
        }
    }
}

/// Serializable error report body.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub details: String,
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        assert!(Error::Auth("bad credentials".to_string()).is_auth());
        assert!(Error::Validation("missing email".to_string()).is_validation());
        assert!(Error::Store("constraint violation".to_string()).is_store());
        assert!(!Error::Profile("fetch failed".to_string()).is_auth());
    }

    #[test]
    fn test_partial_signup_failure_is_distinct() {
        let err = Error::ProfileSetupIncomplete("insert rejected".to_string());
        assert_eq!(err.code(), "profile_setup_incomplete");
        assert!(!err.is_auth());
        assert!(!err.is_store());

        let report = err.to_report();
        assert_eq!(report.error, "profile_setup_incomplete");
        assert!(report.details.contains("profile setup failed"));
    }
}
