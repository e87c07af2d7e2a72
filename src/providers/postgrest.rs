// SPDX-License-Identifier: MIT

//! Table API client for a PostgREST-compatible backend.
//!
//! One typed wrapper per table, in the style of a store facade: the
//! `user_profiles` row operations for the synchronizer, plus the
//! appointments and catalog tables. Row-level security applies on the
//! server; the client sends the current session's access token as the
//! bearer when one is attached, falling back to the anon key.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::RwLock;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    Appointment, AppointmentStatus, Diagnosis, Doctor, Medicine, NewAppointment, Prescription,
    ProfileUpdate, Speciality, UserProfile,
};
use crate::providers::{AppointmentStore, CatalogStore, ProfileStore, RecordStore};

mod tables {
    pub const USER_PROFILES: &str = "user_profiles";
    pub const APPOINTMENTS: &str = "appointments";
    pub const DIAGNOSES: &str = "diagnoses";
    pub const PRESCRIPTIONS: &str = "prescriptions";
    pub const MEDICINES: &str = "medicines";
    pub const DOCTORS: &str = "doctors";
    pub const SPECIALITIES: &str = "specialities";
}

/// PostgREST-compatible table API client.
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    /// Access token of the current session, when signed in.
    bearer: RwLock<Option<String>>,
}

/// Error body returned by the table API.
#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl PostgrestClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: format!("{}/rest/v1", config.api_url),
            anon_key: config.anon_key.clone(),
            bearer: RwLock::new(None),
        }
    }

    /// Attach (or clear) the session access token used for row-level
    /// security. The composition root keeps this in sync with identity
    /// lifecycle events.
    pub fn set_bearer(&self, token: Option<String>) {
        if let Ok(mut bearer) = self.bearer.write() {
            *bearer = token;
        }
    }

    fn bearer_token(&self) -> String {
        self.bearer
            .read()
            .ok()
            .and_then(|b| b.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    /// Filter expression for an exact key match. The value stays raw
    /// here; the query serializer percent-encodes it exactly once.
    fn eq_filter(column: &str, value: &str) -> (String, String) {
        (column.to_string(), format!("eq.{}", value))
    }

    async fn select<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>> {
        let response = self
            .http
            .get(self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer_token())
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Store(format!("{}: {}", Error::UNREACHABLE, e)))?;

        let response = check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Store(format!("malformed response from {}: {}", table, e)))
    }

    async fn write(
        &self,
        request: reqwest::RequestBuilder,
        table: &str,
    ) -> Result<reqwest::Response> {
        let response = request
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer_token())
            .send()
            .await
            .map_err(|e| Error::Store(format!("{}: {}", Error::UNREACHABLE, e)))?;

        check_response(response).await.map_err(|e| {
            tracing::warn!(table, error = %e, "Store write rejected");
            e
        })
    }
}

#[async_trait]
impl ProfileStore for PostgrestClient {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let query = vec![
            Self::eq_filter("user_id", user_id),
            ("select".to_string(), "*".to_string()),
        ];
        // Expect 0 or 1 rows; user_id is the primary key
        let rows: Vec<UserProfile> =
            self.select(tables::USER_PROFILES, &query)
                .await
                .map_err(|e| match e {
                    // Fetch failures belong to the profile class
                    Error::Store(message) => Error::Profile(message),
                    other => other,
                })?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<()> {
        let request = self
            .http
            .post(self.table_url(tables::USER_PROFILES))
            .header("Prefer", "return=minimal")
            .json(profile);
        self.write(request, tables::USER_PROFILES).await?;
        tracing::debug!(user_id = %profile.user_id, "Profile row inserted");
        Ok(())
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let request = self
            .http
            .patch(self.table_url(tables::USER_PROFILES))
            .query(&[Self::eq_filter("user_id", user_id)])
            .header("Prefer", "return=minimal")
            .json(update);
        self.write(request, tables::USER_PROFILES).await?;
        tracing::debug!(user_id, "Profile row updated");
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for PostgrestClient {
    async fn insert_appointment(
        &self,
        patient_id: &str,
        booking: &NewAppointment,
    ) -> Result<Appointment> {
        let body = serde_json::json!({
            "patient_id": patient_id,
            "doctor_id": booking.doctor_id,
            "date": booking.date,
            "time_slot": booking.time_slot,
            "reason": booking.reason,
            "status": AppointmentStatus::Scheduled,
            "created_at": Utc::now(),
        });
        let request = self
            .http
            .post(self.table_url(tables::APPOINTMENTS))
            // The store assigns the id; ask for the row back
            .header("Prefer", "return=representation")
            .json(&body);
        let response = self.write(request, tables::APPOINTMENTS).await?;

        let mut rows: Vec<Appointment> = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("malformed appointment response: {}", e)))?;
        rows.pop()
            .ok_or_else(|| Error::Store("insert returned no row".to_string()))
    }

    async fn appointments_for_patient(&self, patient_id: &str) -> Result<Vec<Appointment>> {
        let query = vec![
            Self::eq_filter("patient_id", patient_id),
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "date.desc".to_string()),
        ];
        self.select(tables::APPOINTMENTS, &query).await
    }

    async fn cancel_appointment(&self, patient_id: &str, appointment_id: &str) -> Result<()> {
        let request = self
            .http
            .patch(self.table_url(tables::APPOINTMENTS))
            .query(&[
                Self::eq_filter("id", appointment_id),
                Self::eq_filter("patient_id", patient_id),
            ])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "status": AppointmentStatus::Cancelled }));
        let response = self.write(request, tables::APPOINTMENTS).await?;

        let rows: Vec<Appointment> = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("malformed appointment response: {}", e)))?;
        if rows.is_empty() {
            return Err(Error::Store("appointment not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PostgrestClient {
    async fn diagnoses_for_patient(&self, patient_id: &str) -> Result<Vec<Diagnosis>> {
        let query = vec![
            Self::eq_filter("patient_id", patient_id),
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        self.select(tables::DIAGNOSES, &query).await
    }

    async fn prescriptions_for_patient(&self, patient_id: &str) -> Result<Vec<Prescription>> {
        let query = vec![
            Self::eq_filter("patient_id", patient_id),
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        self.select(tables::PRESCRIPTIONS, &query).await
    }
}

#[async_trait]
impl CatalogStore for PostgrestClient {
    async fn medicines(&self) -> Result<Vec<Medicine>> {
        let query = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "name.asc".to_string()),
        ];
        self.select(tables::MEDICINES, &query).await
    }

    async fn doctors(&self) -> Result<Vec<Doctor>> {
        let query = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "name.asc".to_string()),
        ];
        self.select(tables::DOCTORS, &query).await
    }

    async fn doctors_by_speciality(&self, speciality_id: &str) -> Result<Vec<Doctor>> {
        let query = vec![
            Self::eq_filter("speciality_id", speciality_id),
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "name.asc".to_string()),
        ];
        self.select(tables::DOCTORS, &query).await
    }

    async fn specialities(&self) -> Result<Vec<Speciality>> {
        let query = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "name.asc".to_string()),
        ];
        self.select(tables::SPECIALITIES, &query).await
    }
}

/// Map a non-success table API response to an error.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<StoreErrorBody>(&body)
        .ok()
        .and_then(|b| match (b.message, b.details) {
            (Some(m), Some(d)) => Some(format!("{} ({})", m, d)),
            (Some(m), None) => Some(m),
            (None, d) => d,
        })
        .unwrap_or(body);

    Err(Error::Store(format!("{} ({})", message, status)))
}
