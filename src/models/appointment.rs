// SPDX-License-Identifier: MIT

//! Appointment models: the stored row and the validated booking input.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle of an appointment. Cancellation is a status flip, never a
/// row deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

/// Row in the `appointments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    /// Display slot, e.g. "10:00 AM"
    pub time_slot: String,
    pub reason: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Booking input. `patient_id` comes from the authenticated user, not
/// from the caller.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewAppointment {
    #[validate(length(min = 1, message = "doctor is required"))]
    pub doctor_id: String,
    pub date: NaiveDate,
    #[validate(length(min = 1, message = "time slot is required"))]
    pub time_slot: String,
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    pub reason: String,
}

impl NewAppointment {
    /// Bookings must be for today or later.
    pub fn is_in_past(&self) -> bool {
        self.date < Utc::now().date_naive()
    }
}
