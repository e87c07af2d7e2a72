// SPDX-License-Identifier: MIT

//! CarePortal client SDK.
//!
//! This crate keeps a client's session and profile in sync with the
//! hosted backend (a GoTrue-compatible auth API and a PostgREST-
//! compatible table API) and exposes the auth operations plus the
//! appointment and catalog services consumed by the application views.

pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod services;

use std::sync::Arc;

use config::Config;
use providers::{AuthEvent, GoTrueClient, IdentityProvider, PostgrestClient};
use services::{AppointmentService, CatalogService, RecordsService, SignupPolicy, Synchronizer};

/// Wired-up client: providers, synchronizer and services.
pub struct PortalClient {
    pub config: Config,
    /// The identity provider, kept concrete for session restore
    pub identity: Arc<GoTrueClient>,
    pub auth: Arc<Synchronizer>,
    pub appointments: AppointmentService,
    pub records: RecordsService,
    pub catalog: CatalogService,
}

impl PortalClient {
    /// Connect to the hosted backend described by `config`.
    pub async fn connect(config: Config) -> Self {
        let identity = Arc::new(GoTrueClient::new(&config));
        let tables = Arc::new(PostgrestClient::new(&config));

        // Keep the table client's bearer in lockstep with the session
        // so row-level security sees the signed-in user
        tokio::spawn(sync_bearer(identity.clone(), tables.clone()));

        let auth = Synchronizer::start(
            identity.clone(),
            tables.clone(),
            SignupPolicy::from_config(&config),
        )
        .await;

        let appointments = AppointmentService::new(tables.clone(), auth.clone());
        let records = RecordsService::new(tables.clone(), auth.clone());
        let catalog = CatalogService::new(tables);

        Self {
            config,
            identity,
            auth,
            appointments,
            records,
            catalog,
        }
    }
}

/// Mirror session access tokens into the table client.
async fn sync_bearer(identity: Arc<GoTrueClient>, tables: Arc<PostgrestClient>) {
    let mut events = identity.subscribe();
    loop {
        match events.recv().await {
            Ok(AuthEvent::SignedIn(session))
            | Ok(AuthEvent::UserUpdated(session))
            | Ok(AuthEvent::TokenRefreshed(session)) => {
                tables.set_bearer(Some(session.access_token));
            }
            Ok(AuthEvent::SignedOut) => tables.set_bearer(None),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Bearer sync lagged behind auth events");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}
