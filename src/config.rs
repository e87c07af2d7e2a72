//! Client configuration loaded from environment variables.
//!
//! The anon key is the publishable API key for the hosted backend; the
//! service-role key is only needed for admin operations (orphan-account
//! cleanup) and is optional.

use std::env;

/// What to do with the identity account when the profile row insert
/// fails during signup. There is no transactional link between the two
/// services, so this is a policy decision, not a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanAccountPolicy {
    /// Leave the identity account in place (default).
    #[default]
    Keep,
    /// Best-effort delete of the identity account. Requires the
    /// service-role key on the real provider.
    Delete,
}

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend, e.g. `https://xyz.example.co`
    pub api_url: String,
    /// Publishable (anon) API key
    pub anon_key: String,
    /// Service-role key for admin operations (optional)
    pub service_key: Option<String>,
    /// Emails that sign up with the admin role
    pub admin_emails: Vec<String>,
    /// Orphaned identity account handling after a failed profile insert
    pub orphan_accounts: OrphanAccountPolicy,
    /// Request timeout for provider calls, in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:54321".to_string(),
            anon_key: "test_anon_key".to_string(),
            service_key: None,
            admin_emails: Vec::new(),
            orphan_accounts: OrphanAccountPolicy::Keep,
            timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file if present, for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let orphan_accounts = match env::var("CAREPORTAL_ORPHAN_ACCOUNTS") {
            Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
                "keep" | "" => OrphanAccountPolicy::Keep,
                "delete" => OrphanAccountPolicy::Delete,
                other => return Err(ConfigError::Invalid("CAREPORTAL_ORPHAN_ACCOUNTS", other.to_string())),
            },
            Err(_) => OrphanAccountPolicy::Keep,
        };

        Ok(Self {
            api_url: env::var("CAREPORTAL_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("CAREPORTAL_API_URL"))?,
            anon_key: env::var("CAREPORTAL_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CAREPORTAL_ANON_KEY"))?,
            service_key: env::var("CAREPORTAL_SERVICE_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            admin_emails: env::var("CAREPORTAL_ADMIN_EMAILS")
                .map(|v| {
                    v.split(',')
                        .map(|e| e.trim().to_ascii_lowercase())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            orphan_accounts,
            timeout_secs: env::var("CAREPORTAL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
