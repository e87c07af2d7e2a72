// SPDX-License-Identifier: MIT

//! Application services built on the provider ports.

pub mod appointments;
pub mod catalog;
pub mod records;
pub mod sync;

pub use appointments::AppointmentService;
pub use catalog::CatalogService;
pub use records::RecordsService;
pub use sync::{AuthSnapshot, SignupPolicy, Synchronizer};
