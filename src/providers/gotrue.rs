// SPDX-License-Identifier: MIT

//! Identity provider client for a GoTrue-compatible auth API.
//!
//! Handles:
//! - Password-grant sign in and signup with attached metadata
//! - Sign out (server-side session invalidation)
//! - Refresh-token grant when the cached session expires
//! - Session restore from persisted tokens
//! - Lifecycle event fan-out (signed-in, signed-out, token-refreshed)

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::{broadcast, RwLock};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Identity, Session, UserMetadata};
use crate::providers::{AuthEvent, IdentityProvider};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// GoTrue-compatible auth API client.
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: Option<String>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

/// Claims carried by the provider's access tokens. The signature is
/// checked server-side; the client only reads the payload.
#[derive(Debug, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

impl WireUser {
    fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.unwrap_or_default(),
            metadata: self.user_metadata.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: WireUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            user: self.user.into_identity(),
        }
    }
}

/// Signup response: a full token response when the provider
/// auto-confirms, or a bare user object when confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    WithSession(TokenResponse),
    UserOnly(WireUser),
}

/// Error body returned by the auth API.
#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GoTrueClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http,
            base_url: format!("{}/auth/v1", config.api_url),
            anon_key: config.anon_key.clone(),
            service_key: config.service_key.clone(),
            session: RwLock::new(None),
            events,
        }
    }

    /// Restore a session from persisted tokens (e.g. the consuming
    /// app's keychain). Emits `SignedIn` so the synchronizer picks the
    /// session up like a fresh login. An expired access token is
    /// refreshed first.
    pub async fn restore_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session> {
        let claims = decode_access_claims(access_token)?;

        let session = if claims.exp <= Utc::now().timestamp() {
            self.refresh(refresh_token).await?
        } else {
            Session {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                expires_at: chrono::DateTime::from_timestamp(claims.exp, 0)
                    .ok_or_else(|| Error::Auth("invalid token expiry".to_string()))?,
                user: Identity {
                    id: claims.sub,
                    email: claims.email.unwrap_or_default(),
                    metadata: claims.user_metadata.unwrap_or_default(),
                },
            }
        };

        *self.session.write().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Exchange a refresh token for a fresh session.
    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let url = format!("{}/token?grant_type=refresh_token", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("{}: {}", Error::UNREACHABLE, e)))?;

        let response = check_response(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("malformed token response: {}", e)))?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>> {
        let cached = self.session.read().await.clone();
        let Some(session) = cached else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        // Expired: try the refresh grant once. A rejected refresh token
        // means the session was revoked server-side.
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                *self.session.write().await = Some(fresh.clone());
                let _ = self.events.send(AuthEvent::TokenRefreshed(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, signing out");
                *self.session.write().await = None;
                let _ = self.events.send(AuthEvent::SignedOut);
                Ok(None)
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/token?grant_type=password", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("{}: {}", Error::UNREACHABLE, e)))?;

        let response = check_response(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("malformed token response: {}", e)))?;

        let session = token.into_session();
        *self.session.write().await = Some(session.clone());
        tracing::info!(user_id = %session.user.id, "Password sign-in successful");
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<Identity> {
        let url = format!("{}/signup", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("{}: {}", Error::UNREACHABLE, e)))?;

        let response = check_response(response).await?;
        let body: SignupResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("malformed signup response: {}", e)))?;

        match body {
            SignupResponse::WithSession(token) => {
                let session = token.into_session();
                let identity = session.user.clone();
                *self.session.write().await = Some(session.clone());
                tracing::info!(user_id = %identity.id, "Signup successful (auto-confirmed)");
                let _ = self.events.send(AuthEvent::SignedIn(session));
                Ok(identity)
            }
            SignupResponse::UserOnly(user) => {
                let identity = user.into_identity();
                tracing::info!(user_id = %identity.id, "Signup successful (confirmation pending)");
                Ok(identity)
            }
        }
    }

    async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.session.read().await.clone() else {
            // Nothing to invalidate
            return Ok(());
        };

        let url = format!("{}/logout", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("{}: {}", Error::UNREACHABLE, e)))?;

        check_response(response).await?;
        *self.session.write().await = None;
        tracing::info!("Sign-out successful");
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let Some(service_key) = &self.service_key else {
            return Err(Error::Auth(
                "service-role key required for account deletion".to_string(),
            ));
        };

        let url = format!("{}/admin/users/{}", self.base_url, user_id);
        let response = self
            .http
            .delete(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(service_key)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("{}: {}", Error::UNREACHABLE, e)))?;

        check_response(response).await?;
        tracing::info!(user_id, "Identity account deleted");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// Decode the payload of an access token without verifying the
/// signature; the backend signs and verifies, the client only needs the
/// claims.
pub fn decode_access_claims(access_token: &str) -> Result<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<AccessClaims>(access_token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| Error::Auth(format!("invalid access token: {}", e)))?;
    Ok(data.claims)
}

/// Map a non-success auth API response to an error, extracting the
/// provider's message when the body carries one.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message))
        .unwrap_or(body);

    tracing::warn!(status = %status, message = %message, "Auth API request rejected");
    Err(Error::Auth(format!("{} ({})", message, status)))
}
