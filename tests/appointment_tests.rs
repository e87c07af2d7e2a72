// SPDX-License-Identifier: MIT

//! Appointment booking and catalog reads over the in-memory store.

mod common;

use careportal::models::{AppointmentStatus, Doctor, Medicine, NewAppointment, Speciality};
use careportal::services::{AppointmentService, CatalogService};
use chrono::{Duration, Utc};

fn booking(doctor_id: &str) -> NewAppointment {
    NewAppointment {
        doctor_id: doctor_id.to_string(),
        date: Utc::now().date_naive() + Duration::days(3),
        time_slot: "10:00 AM".to_string(),
        reason: "Persistent cough".to_string(),
    }
}

#[tokio::test]
async fn test_booking_requires_authentication() {
    let h = common::start().await;
    let service = AppointmentService::new(h.store.clone(), h.auth.clone());

    let err = service
        .book(booking("doc-1"))
        .await
        .expect_err("anonymous booking must fail");
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_book_and_list_for_current_user() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", None);
    h.auth.login("jane@example.com", "secret123").await.unwrap();
    common::wait_for(&h.auth, |s| s.user.is_some()).await;

    let service = AppointmentService::new(h.store.clone(), h.auth.clone());
    let appointment = service.book(booking("doc-1")).await.expect("booking succeeds");
    assert!(!appointment.id.is_empty());
    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(appointment.doctor_id, "doc-1");

    let list = service.for_current_user().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, appointment.id);
}

#[tokio::test]
async fn test_booking_validation() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", None);
    h.auth.login("jane@example.com", "secret123").await.unwrap();
    common::wait_for(&h.auth, |s| s.user.is_some()).await;

    let service = AppointmentService::new(h.store.clone(), h.auth.clone());

    let mut b = booking("doc-1");
    b.reason = String::new();
    assert!(service.book(b).await.expect_err("empty reason").is_validation());

    let mut b = booking("doc-1");
    b.date = Utc::now().date_naive() - Duration::days(1);
    assert!(service.book(b).await.expect_err("past date").is_validation());
}

#[tokio::test]
async fn test_cancel_flips_status_only() {
    let h = common::start().await;
    common::seed_patient(&h, "jane@example.com", "secret123", "Jane Doe", None);
    h.auth.login("jane@example.com", "secret123").await.unwrap();
    common::wait_for(&h.auth, |s| s.user.is_some()).await;

    let service = AppointmentService::new(h.store.clone(), h.auth.clone());
    let appointment = service.book(booking("doc-1")).await.unwrap();

    service.cancel(&appointment.id).await.expect("cancel succeeds");

    // The row is kept, only the status changes
    let list = service.for_current_user().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].status, AppointmentStatus::Cancelled);

    let err = service
        .cancel("appt-does-not-exist")
        .await
        .expect_err("unknown id");
    assert!(err.is_store());
}

#[tokio::test]
async fn test_catalog_reads() {
    let h = common::start().await;
    h.store.seed_speciality(Speciality {
        id: "spec-1".to_string(),
        name: "Cardiology".to_string(),
        description: None,
    });
    h.store.seed_doctor(Doctor {
        id: "doc-1".to_string(),
        name: "Dr. Patel".to_string(),
        speciality_id: "spec-1".to_string(),
        qualification: Some("MD".to_string()),
        experience_years: Some(12),
    });
    h.store.seed_doctor(Doctor {
        id: "doc-2".to_string(),
        name: "Dr. Chen".to_string(),
        speciality_id: "spec-2".to_string(),
        qualification: None,
        experience_years: None,
    });
    h.store.seed_medicine(Medicine {
        id: "med-1".to_string(),
        name: "Paracetamol".to_string(),
        description: "Pain relief".to_string(),
        price_cents: 499,
        category: "Analgesic".to_string(),
        in_stock: true,
    });

    let catalog = CatalogService::new(h.store.clone());

    assert_eq!(catalog.medicines().await.unwrap().len(), 1);
    assert_eq!(catalog.doctors().await.unwrap().len(), 2);

    let cardiologists = catalog.doctors_by_speciality("spec-1").await.unwrap();
    assert_eq!(cardiologists.len(), 1);
    assert_eq!(cardiologists[0].name, "Dr. Patel");

    let overview = catalog.overview().await.unwrap();
    assert_eq!(overview.medicines.len(), 1);
    assert_eq!(overview.doctors.len(), 2);
    assert_eq!(overview.specialities.len(), 1);
}
