// SPDX-License-Identifier: MIT

//! In-memory providers for tests and offline development.
//!
//! `MemoryIdentity` mints real HS256-signed sessions and fans out the
//! same lifecycle events as the hosted provider; `MemoryStore` keeps
//! rows in concurrent maps and can be scripted to fail or delay calls
//! so failure paths and races are testable without a backend.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{broadcast, RwLock};

use crate::error::{Error, Result};
use crate::models::{
    Appointment, AppointmentStatus, Diagnosis, Doctor, Identity, Medicine, NewAppointment,
    Prescription, ProfileUpdate, Session, Speciality, UserMetadata, UserProfile,
};
use crate::providers::{
    AppointmentStore, AuthEvent, CatalogStore, IdentityProvider, ProfileStore, RecordStore,
};

const EVENT_CHANNEL_CAPACITY: usize = 32;
const SIGNING_SECRET: &[u8] = b"memory-identity-signing-secret";
const SESSION_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    password: String,
    metadata: UserMetadata,
}

/// In-memory identity provider.
pub struct MemoryIdentity {
    /// Accounts keyed by lowercased email
    accounts: DashMap<String, Account>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    next_id: AtomicU64,
    next_token: AtomicU64,
    /// When set, every call fails as if the provider were down
    unreachable: AtomicBool,
    delete_calls: AtomicUsize,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            accounts: DashMap::new(),
            session: RwLock::new(None),
            events,
            next_id: AtomicU64::new(1),
            next_token: AtomicU64::new(1),
            unreachable: AtomicBool::new(false),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Register an account without emitting any events, as if it had
    /// signed up in an earlier run.
    pub fn seed_account(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Identity {
        let account = Account {
            id: format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            email: email.to_string(),
            password: password.to_string(),
            metadata,
        };
        let identity = Identity {
            id: account.id.clone(),
            email: account.email.clone(),
            metadata: account.metadata.clone(),
        };
        self.accounts.insert(email.to_ascii_lowercase(), account);
        identity
    }

    /// Install a live session for a seeded account without emitting
    /// events, as if restored from persisted tokens before the
    /// synchronizer boots.
    pub async fn seed_session(&self, email: &str) -> Session {
        let account = self
            .accounts
            .get(&email.to_ascii_lowercase())
            .expect("seed_session requires a seeded account")
            .clone();
        let session = self.mint_session(&account);
        *self.session.write().await = Some(session.clone());
        session
    }

    /// Simulate a server-side revocation: the provider announces the
    /// sign-out without any local call having been made.
    pub async fn revoke_session(&self) {
        *self.session.write().await = None;
        let _ = self.events.send(AuthEvent::SignedOut);
    }

    /// Announce that identity fields changed (e.g. an email update
    /// confirmed out of band).
    pub async fn announce_user_updated(&self) {
        if let Some(session) = self.session.read().await.clone() {
            let _ = self.events.send(AuthEvent::UserUpdated(session));
        }
    }

    /// Make every subsequent call fail as unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// How many times `delete_user` was invoked.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn account_exists(&self, email: &str) -> bool {
        self.accounts.contains_key(&email.to_ascii_lowercase())
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::Auth(Error::UNREACHABLE.to_string()));
        }
        Ok(())
    }

    fn mint_session(&self, account: &Account) -> Session {
        let expires_at = Utc::now() + Duration::seconds(SESSION_TTL_SECS);
        let claims = serde_json::json!({
            "sub": account.id,
            "email": account.email,
            "exp": expires_at.timestamp(),
            "user_metadata": account.metadata,
        });
        // Sessions carry real JWTs so claim-decoding paths stay honest
        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SIGNING_SECRET),
        )
        .unwrap_or_default();

        Session {
            access_token,
            refresh_token: format!(
                "refresh-{}-{}",
                account.id,
                self.next_token.fetch_add(1, Ordering::SeqCst)
            ),
            expires_at,
            user: Identity {
                id: account.id.clone(),
                email: account.email.clone(),
                metadata: account.metadata.clone(),
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn get_session(&self) -> Result<Option<Session>> {
        self.check_reachable()?;
        Ok(self.session.read().await.clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.check_reachable()?;
        let account = self
            .accounts
            .get(&email.to_ascii_lowercase())
            .map(|a| a.clone())
            .ok_or_else(|| Error::Auth("invalid login credentials".to_string()))?;
        if account.password != password {
            return Err(Error::Auth("invalid login credentials".to_string()));
        }

        let session = self.mint_session(&account);
        *self.session.write().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<Identity> {
        self.check_reachable()?;
        let key = email.to_ascii_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(Error::Auth("user already registered".to_string()));
        }

        let account = Account {
            id: format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            email: email.to_string(),
            password: password.to_string(),
            metadata,
        };
        self.accounts.insert(key, account.clone());

        // Auto-confirm: a session is issued immediately, like the
        // hosted provider with confirmations disabled
        let session = self.mint_session(&account);
        let identity = session.user.clone();
        *self.session.write().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.check_reachable()?;
        *self.session.write().await = None;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.check_reachable()?;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.accounts.retain(|_, account| account.id != user_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// In-memory table store.
pub struct MemoryStore {
    profiles: DashMap<String, UserProfile>,
    appointments: DashMap<String, Appointment>,
    diagnoses: Mutex<Vec<Diagnosis>>,
    prescriptions: Mutex<Vec<Prescription>>,
    medicines: Mutex<Vec<Medicine>>,
    doctors: Mutex<Vec<Doctor>>,
    specialities: Mutex<Vec<Speciality>>,
    next_appointment_id: AtomicU64,
    /// Counts actual profile writes (inserts + updates)
    profile_writes: AtomicUsize,
    fail_profile_inserts: AtomicBool,
    fail_profile_updates: AtomicBool,
    fail_profile_fetches: AtomicBool,
    /// Artificial latency for profile fetches, for race tests
    fetch_delay: Mutex<Option<std::time::Duration>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
            appointments: DashMap::new(),
            diagnoses: Mutex::new(Vec::new()),
            prescriptions: Mutex::new(Vec::new()),
            medicines: Mutex::new(Vec::new()),
            doctors: Mutex::new(Vec::new()),
            specialities: Mutex::new(Vec::new()),
            next_appointment_id: AtomicU64::new(1),
            profile_writes: AtomicUsize::new(0),
            fail_profile_inserts: AtomicBool::new(false),
            fail_profile_updates: AtomicBool::new(false),
            fail_profile_fetches: AtomicBool::new(false),
            fetch_delay: Mutex::new(None),
        }
    }

    pub fn seed_profile(&self, profile: UserProfile) {
        self.profiles.insert(profile.user_id.clone(), profile);
    }

    pub fn seed_diagnosis(&self, diagnosis: Diagnosis) {
        self.diagnoses.lock().expect("diagnoses lock").push(diagnosis);
    }

    pub fn seed_prescription(&self, prescription: Prescription) {
        self.prescriptions
            .lock()
            .expect("prescriptions lock")
            .push(prescription);
    }

    pub fn seed_medicine(&self, medicine: Medicine) {
        self.medicines.lock().expect("medicines lock").push(medicine);
    }

    pub fn seed_doctor(&self, doctor: Doctor) {
        self.doctors.lock().expect("doctors lock").push(doctor);
    }

    pub fn seed_speciality(&self, speciality: Speciality) {
        self.specialities
            .lock()
            .expect("specialities lock")
            .push(speciality);
    }

    /// Stored profile row, for assertions.
    pub fn profile_row(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.get(user_id).map(|p| p.clone())
    }

    pub fn profile_writes(&self) -> usize {
        self.profile_writes.load(Ordering::SeqCst)
    }

    pub fn fail_profile_inserts(&self, fail: bool) {
        self.fail_profile_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_profile_updates(&self, fail: bool) {
        self.fail_profile_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_profile_fetches(&self, fail: bool) {
        self.fail_profile_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn set_fetch_delay(&self, delay: Option<std::time::Duration>) {
        *self.fetch_delay.lock().expect("fetch_delay lock") = delay;
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let delay = *self.fetch_delay.lock().expect("fetch_delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_profile_fetches.load(Ordering::SeqCst) {
            return Err(Error::Profile("store unreachable".to_string()));
        }
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<()> {
        if self.fail_profile_inserts.load(Ordering::SeqCst) {
            return Err(Error::Store("insert rejected".to_string()));
        }
        if self.profiles.contains_key(&profile.user_id) {
            return Err(Error::Store("duplicate key: user_id".to_string()));
        }
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        self.profile_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        if self.fail_profile_updates.load(Ordering::SeqCst) {
            return Err(Error::Store("update rejected".to_string()));
        }
        // Matching PostgREST: a patch with no matching row is a no-op
        if let Some(mut row) = self.profiles.get_mut(user_id) {
            if let Some(name) = &update.name {
                row.name = name.clone();
            }
            if let Some(role) = update.role {
                row.role = role;
            }
            if let Some(age) = update.age {
                row.age = Some(age);
            }
            if let Some(diseases) = &update.diseases {
                row.diseases = diseases.clone();
            }
            if let Some(disorders) = &update.disorders {
                row.disorders = disorders.clone();
            }
            self.profile_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn insert_appointment(
        &self,
        patient_id: &str,
        booking: &NewAppointment,
    ) -> Result<Appointment> {
        let appointment = Appointment {
            id: format!(
                "appt-{}",
                self.next_appointment_id.fetch_add(1, Ordering::SeqCst)
            ),
            patient_id: patient_id.to_string(),
            doctor_id: booking.doctor_id.clone(),
            date: booking.date,
            time_slot: booking.time_slot.clone(),
            reason: booking.reason.clone(),
            status: AppointmentStatus::Scheduled,
            created_at: Utc::now(),
        };
        self.appointments
            .insert(appointment.id.clone(), appointment.clone());
        Ok(appointment)
    }

    async fn appointments_for_patient(&self, patient_id: &str) -> Result<Vec<Appointment>> {
        let mut rows: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|entry| entry.patient_id == patient_id)
            .map(|entry| entry.clone())
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    async fn cancel_appointment(&self, patient_id: &str, appointment_id: &str) -> Result<()> {
        match self.appointments.get_mut(appointment_id) {
            Some(mut row) if row.patient_id == patient_id => {
                row.status = AppointmentStatus::Cancelled;
                Ok(())
            }
            _ => Err(Error::Store("appointment not found".to_string())),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn diagnoses_for_patient(&self, patient_id: &str) -> Result<Vec<Diagnosis>> {
        let mut rows: Vec<Diagnosis> = self
            .diagnoses
            .lock()
            .expect("diagnoses lock")
            .iter()
            .filter(|d| d.patient_id == patient_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn prescriptions_for_patient(&self, patient_id: &str) -> Result<Vec<Prescription>> {
        let mut rows: Vec<Prescription> = self
            .prescriptions
            .lock()
            .expect("prescriptions lock")
            .iter()
            .filter(|p| p.patient_id == patient_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn medicines(&self) -> Result<Vec<Medicine>> {
        Ok(self.medicines.lock().expect("medicines lock").clone())
    }

    async fn doctors(&self) -> Result<Vec<Doctor>> {
        Ok(self.doctors.lock().expect("doctors lock").clone())
    }

    async fn doctors_by_speciality(&self, speciality_id: &str) -> Result<Vec<Doctor>> {
        Ok(self
            .doctors
            .lock()
            .expect("doctors lock")
            .iter()
            .filter(|d| d.speciality_id == speciality_id)
            .cloned()
            .collect())
    }

    async fn specialities(&self) -> Result<Vec<Speciality>> {
        Ok(self.specialities.lock().expect("specialities lock").clone())
    }
}
