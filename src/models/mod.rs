// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod appointment;
pub mod catalog;
pub mod records;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus, NewAppointment};
pub use catalog::{Doctor, Medicine, Speciality};
pub use records::{Diagnosis, Prescription};
pub use user::{CompositeUser, Identity, ProfileUpdate, Role, Session, UserMetadata, UserProfile};
