// SPDX-License-Identifier: MIT

//! Appointment booking for the authenticated patient.

use std::sync::Arc;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::{Appointment, NewAppointment};
use crate::providers::AppointmentStore;
use crate::services::Synchronizer;

/// Books, lists and cancels appointments for the current user.
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    auth: Arc<Synchronizer>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn AppointmentStore>, auth: Arc<Synchronizer>) -> Self {
        Self { store, auth }
    }

    fn current_patient(&self) -> Result<String> {
        self.auth
            .session()
            .map(|s| s.user.id)
            .ok_or_else(|| Error::Validation("you must be logged in".to_string()))
    }

    /// Book an appointment for the authenticated user.
    pub async fn book(&self, booking: NewAppointment) -> Result<Appointment> {
        let patient_id = self.current_patient()?;

        booking
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;
        if booking.is_in_past() {
            return Err(Error::Validation(
                "appointment date must be today or later".to_string(),
            ));
        }

        let appointment = self.store.insert_appointment(&patient_id, &booking).await?;
        tracing::info!(
            appointment_id = %appointment.id,
            doctor_id = %appointment.doctor_id,
            date = %appointment.date,
            "Appointment booked"
        );
        Ok(appointment)
    }

    /// All appointments of the authenticated user, most recent first.
    pub async fn for_current_user(&self) -> Result<Vec<Appointment>> {
        let patient_id = self.current_patient()?;
        self.store.appointments_for_patient(&patient_id).await
    }

    /// Cancel one of the authenticated user's appointments. The row is
    /// kept with a cancelled status.
    pub async fn cancel(&self, appointment_id: &str) -> Result<()> {
        let patient_id = self.current_patient()?;
        self.store
            .cancel_appointment(&patient_id, appointment_id)
            .await?;
        tracing::info!(appointment_id, "Appointment cancelled");
        Ok(())
    }
}
