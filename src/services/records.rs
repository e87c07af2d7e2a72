// SPDX-License-Identifier: MIT

//! Medical records viewing for the authenticated patient.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Diagnosis, Prescription};
use crate::providers::RecordStore;
use crate::services::Synchronizer;

/// Reads the current user's diagnoses and prescriptions.
pub struct RecordsService {
    store: Arc<dyn RecordStore>,
    auth: Arc<Synchronizer>,
}

impl RecordsService {
    pub fn new(store: Arc<dyn RecordStore>, auth: Arc<Synchronizer>) -> Self {
        Self { store, auth }
    }

    fn current_patient(&self) -> Result<String> {
        self.auth
            .session()
            .map(|s| s.user.id)
            .ok_or_else(|| Error::Validation("you must be logged in".to_string()))
    }

    /// All diagnoses of the authenticated user, most recent first.
    pub async fn diagnoses(&self) -> Result<Vec<Diagnosis>> {
        let patient_id = self.current_patient()?;
        self.store.diagnoses_for_patient(&patient_id).await
    }

    /// All prescriptions of the authenticated user, most recent first.
    pub async fn prescriptions(&self) -> Result<Vec<Prescription>> {
        let patient_id = self.current_patient()?;
        self.store.prescriptions_for_patient(&patient_id).await
    }

    /// Only the prescriptions whose end date has not passed.
    pub async fn active_prescriptions(&self) -> Result<Vec<Prescription>> {
        let mut rows = self.prescriptions().await?;
        rows.retain(Prescription::is_active);
        Ok(rows)
    }
}
