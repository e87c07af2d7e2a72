// SPDX-License-Identifier: MIT

//! Medical record rows: diagnoses and prescriptions. Written by
//! clinicians through other channels; this client only reads them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Row in the `diagnoses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub condition: String,
    pub description: String,
    pub treatment: String,
    pub created_at: DateTime<Utc>,
}

/// Row in the `prescriptions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub medication: String,
    pub dosage: String,
    pub instructions: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Prescription {
    /// Active until the end date has passed; the end date itself counts.
    pub fn is_active(&self) -> bool {
        self.end_date >= Utc::now().date_naive()
    }
}
