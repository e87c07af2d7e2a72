// SPDX-License-Identifier: MIT

//! Port traits for the external collaborators.
//!
//! The identity provider owns sessions and emits lifecycle events; the
//! stores own the relational tables. The synchronizer and services are
//! written against these traits so the hosted backend can be swapped
//! for the in-memory providers in tests and offline development.

pub mod gotrue;
pub mod memory;
pub mod postgrest;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::models::{
    Appointment, Diagnosis, Doctor, Identity, Medicine, NewAppointment, Prescription,
    ProfileUpdate, Session, Speciality, UserMetadata, UserProfile,
};

pub use gotrue::GoTrueClient;
pub use memory::{MemoryIdentity, MemoryStore};
pub use postgrest::PostgrestClient;

/// Identity lifecycle event, fanned out to subscribers after the
/// corresponding provider call succeeds.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    UserUpdated(Session),
    TokenRefreshed(Session),
}

/// Hosted authentication service: issues sessions and emits lifecycle
/// events. All calls are attempted exactly once; there are no retries.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if any. Implementations may transparently
    /// refresh an expired session (emitting `TokenRefreshed`).
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Password-grant sign in. Emits `SignedIn` on success.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Create an account with auxiliary metadata attached. Emits
    /// `SignedIn` when the provider also issues a session.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<Identity>;

    /// Invalidate the current session. Emits `SignedOut` on success.
    async fn sign_out(&self) -> Result<()>;

    /// Admin operation: delete an account outright. Used only by the
    /// orphan-account cleanup policy.
    async fn delete_user(&self, user_id: &str) -> Result<()>;

    /// Subscribe to lifecycle events. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// The `user_profiles` table. Keyed by the identity provider's user id;
/// a fetch yields zero or one rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    async fn insert_profile(&self, profile: &UserProfile) -> Result<()>;

    /// Write only the fields present in `update`. Callers guard against
    /// empty updates; implementations may treat one as a no-op.
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<()>;
}

/// The `appointments` table.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Insert a booking for a patient; the store assigns the id.
    async fn insert_appointment(
        &self,
        patient_id: &str,
        booking: &NewAppointment,
    ) -> Result<Appointment>;

    /// All appointments for a patient, most recent date first.
    async fn appointments_for_patient(&self, patient_id: &str) -> Result<Vec<Appointment>>;

    /// Flip an appointment to cancelled. The row is kept.
    async fn cancel_appointment(&self, patient_id: &str, appointment_id: &str) -> Result<()>;
}

/// Read-only medical record tables. Rows are written by clinicians
/// through other channels; this client never writes them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All diagnoses for a patient, most recent first.
    async fn diagnoses_for_patient(&self, patient_id: &str) -> Result<Vec<Diagnosis>>;

    /// All prescriptions for a patient, most recent first.
    async fn prescriptions_for_patient(&self, patient_id: &str) -> Result<Vec<Prescription>>;
}

/// Read-only catalog tables.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn medicines(&self) -> Result<Vec<Medicine>>;

    async fn doctors(&self) -> Result<Vec<Doctor>>;

    async fn doctors_by_speciality(&self, speciality_id: &str) -> Result<Vec<Doctor>>;

    async fn specialities(&self) -> Result<Vec<Speciality>>;
}
