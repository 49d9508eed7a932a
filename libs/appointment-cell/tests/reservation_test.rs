use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use futures::future::join_all;
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentError, AppointmentStatus, ReserveSlotRequest, MAIN_CLINIC, VIDEO_CONSULTATION,
};
use appointment_cell::{AppointmentBookingService, InMemoryAppointmentStore};
use doctor_cell::models::AppointmentType;
use shared_utils::test_utils::TestUser;

const TOKEN: &str = "test-token";
const TYPE_ID: i64 = 1;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, h, m, 0).unwrap()
}

fn appointment_type(id: i64, doctor: &TestUser) -> AppointmentType {
    AppointmentType {
        id,
        name: "General Appointment".to_string(),
        price: 600.0,
        duration: 30,
        doctor_id: doctor.uuid(),
        doctor_name: "Dr. Test".to_string(),
        doctor_specialization: Some("General".to_string()),
        created_at: None,
    }
}

fn setup() -> (Arc<AppointmentBookingService<InMemoryAppointmentStore>>, Arc<InMemoryAppointmentStore>, TestUser) {
    let doctor = TestUser::doctor("doctor@example.com");
    let store = Arc::new(InMemoryAppointmentStore::with_types([
        appointment_type(TYPE_ID, &doctor),
        appointment_type(2, &doctor),
    ]));
    let service = AppointmentBookingService::with_store(Arc::clone(&store), "https://meet.jit.si");
    (Arc::new(service), store, doctor)
}

fn request(patient_id: Uuid, start: DateTime<Utc>, location: &str) -> ReserveSlotRequest {
    ReserveSlotRequest {
        appointment_type_id: TYPE_ID,
        start_time: start,
        patient_id,
        location: location.to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn same_slot_twice_conflicts_and_next_slot_is_free() {
    let (service, store, _) = setup();
    let patient = Uuid::new_v4();

    let first = service.reserve(request(patient, at(9, 0), MAIN_CLINIC), TOKEN).await.unwrap();
    assert_eq!(first.status, AppointmentStatus::Upcoming);
    assert_eq!(first.meeting_url, None);

    let second = service.reserve(request(Uuid::new_v4(), at(9, 0), MAIN_CLINIC), TOKEN).await;
    assert_matches!(second, Err(AppointmentError::SlotConflict));

    let half_past = service.reserve(request(patient, at(9, 30), MAIN_CLINIC), TOKEN).await;
    assert!(half_past.is_ok());

    assert_eq!(store.appointments().await.len(), 2);
}

#[tokio::test]
async fn overlapping_start_conflicts_but_other_type_does_not() {
    let (service, _, _) = setup();

    service.reserve(request(Uuid::new_v4(), at(9, 0), MAIN_CLINIC), TOKEN).await.unwrap();

    let overlapping = service.reserve(request(Uuid::new_v4(), at(9, 15), MAIN_CLINIC), TOKEN).await;
    assert_matches!(overlapping, Err(AppointmentError::SlotConflict));

    let mut other_type = request(Uuid::new_v4(), at(9, 0), MAIN_CLINIC);
    other_type.appointment_type_id = 2;
    assert!(service.reserve(other_type, TOKEN).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_reservations_yield_exactly_one_booking() {
    let (service, store, _) = setup();

    let attempts = (0..16).map(|_| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service.reserve(request(Uuid::new_v4(), at(10, 0), MAIN_CLINIC), TOKEN).await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let booked = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppointmentError::SlotConflict)))
        .count();

    assert_eq!(booked, 1);
    assert_eq!(conflicts, 15);

    let upcoming = store
        .appointments()
        .await
        .into_iter()
        .filter(|a| a.status == AppointmentStatus::Upcoming && a.start_time == at(10, 0))
        .count();
    assert_eq!(upcoming, 1);
}

#[tokio::test]
async fn video_consultation_gets_valid_meeting_url() {
    let (service, _, _) = setup();

    let booked = service
        .reserve(request(Uuid::new_v4(), at(11, 0), VIDEO_CONSULTATION), TOKEN)
        .await
        .unwrap();

    let url = booked.meeting_url.expect("video consultations carry a link");
    let parsed = reqwest::Url::parse(&url).unwrap();
    assert_eq!(parsed.host_str(), Some("meet.jit.si"));
    assert_eq!(parsed.path().trim_start_matches('/').len(), 10);
}

#[tokio::test]
async fn cancelling_frees_the_slot() {
    let (service, _, _) = setup();
    let patient = TestUser::patient("patient@example.com");

    let booked = service
        .reserve(request(patient.uuid(), at(9, 0), MAIN_CLINIC), TOKEN)
        .await
        .unwrap();

    let cancelled = service.cancel(booked.id, &patient.to_user(), TOKEN).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let rebooked = service.reserve(request(Uuid::new_v4(), at(9, 0), MAIN_CLINIC), TOKEN).await;
    assert!(rebooked.is_ok());
}

#[tokio::test]
async fn terminal_appointments_cannot_transition() {
    let (service, _, doctor) = setup();
    let patient = TestUser::patient("patient@example.com");

    let booked = service
        .reserve(request(patient.uuid(), at(9, 0), MAIN_CLINIC), TOKEN)
        .await
        .unwrap();

    service.complete(booked.id, &doctor.to_user(), TOKEN).await.unwrap();

    let cancel = service.cancel(booked.id, &patient.to_user(), TOKEN).await;
    assert_matches!(
        cancel,
        Err(AppointmentError::InvalidStatusTransition {
            from: AppointmentStatus::Completed,
            to: AppointmentStatus::Cancelled
        })
    );
}

#[tokio::test]
async fn only_owning_doctor_or_admin_completes() {
    let (service, _, _) = setup();
    let patient = TestUser::patient("patient@example.com");
    let stranger = TestUser::doctor("other@example.com");
    let admin = TestUser::admin("admin@example.com");

    let booked = service
        .reserve(request(patient.uuid(), at(9, 0), MAIN_CLINIC), TOKEN)
        .await
        .unwrap();

    assert_matches!(
        service.complete(booked.id, &patient.to_user(), TOKEN).await,
        Err(AppointmentError::Unauthorized(_))
    );
    assert_matches!(
        service.complete(booked.id, &stranger.to_user(), TOKEN).await,
        Err(AppointmentError::Unauthorized(_))
    );

    let completed = service.complete(booked.id, &admin.to_user(), TOKEN).await.unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn slot_grid_reflects_bookings() {
    let (service, _, _) = setup();
    let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

    service.reserve(request(Uuid::new_v4(), at(9, 30), MAIN_CLINIC), TOKEN).await.unwrap();

    let slots = service.available_slots(TYPE_ID, date, TOKEN).await.unwrap();
    assert_eq!(slots.len(), 25);
    assert!(slots[0].available);
    assert_eq!(slots[1].time, "09:30");
    assert!(!slots[1].available);

    assert_matches!(
        service.available_slots(99, date, TOKEN).await,
        Err(AppointmentError::AppointmentTypeNotFound(99))
    );
}

#[tokio::test]
async fn listings_for_patient_and_doctor() {
    let (service, _, doctor) = setup();
    let patient = Uuid::new_v4();

    service.reserve(request(patient, at(9, 0), MAIN_CLINIC), TOKEN).await.unwrap();
    service.reserve(request(patient, at(14, 0), VIDEO_CONSULTATION), TOKEN).await.unwrap();
    service.reserve(request(Uuid::new_v4(), at(12, 0), MAIN_CLINIC), TOKEN).await.unwrap();

    let mine = service.patient_appointments(patient, TOKEN).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].start_time, at(14, 0));
    assert_eq!(
        mine[0].appointment_type.as_ref().and_then(|t| t.doctor_name.as_deref()),
        Some("Dr. Test")
    );

    let schedule = service
        .doctor_schedule(doctor.uuid(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), TOKEN)
        .await
        .unwrap();
    let starts: Vec<_> = schedule.iter().map(|a| a.start_time).collect();
    assert_eq!(starts, vec![at(9, 0), at(12, 0), at(14, 0)]);

    let next_day = service
        .doctor_schedule(doctor.uuid(), NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(), TOKEN)
        .await
        .unwrap();
    assert!(next_day.is_empty());
}
