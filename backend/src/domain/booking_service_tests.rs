//! Behaviour coverage for the booking command service.

use std::sync::Arc;

use chrono::NaiveDate;
use rstest::{fixture, rstest};
use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::domain::ports::MockBookingStore;
use crate::domain::{ConflictKind, ErrorCode};

fn service(store: MockBookingStore, mode: BookingMode) -> BookingCommandService<MockBookingStore> {
    BookingCommandService::new(Arc::new(store), mode)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid test date")
}

#[fixture]
fn request() -> CreateBookingRequest {
    CreateBookingRequest {
        teacher_id: Uuid::new_v4(),
        student_ids: vec![Uuid::new_v4()],
        session_date: date(),
        start_time: "09:00".to_owned(),
        end_time: "10:00".to_owned(),
        course_type_id: Uuid::new_v4(),
        location: None,
        fee_cents: Some(5_000),
        status: None,
    }
}

#[rstest]
#[tokio::test]
async fn create_persists_only_the_first_student(mut request: CreateBookingRequest) {
    let first = Uuid::new_v4();
    request.student_ids = vec![first, Uuid::new_v4(), Uuid::new_v4()];

    let mut store = MockBookingStore::new();
    store
        .expect_create()
        .withf(move |booking, _mode| booking.student_id() == first)
        .times(1)
        .returning(|_, _| Ok(()));

    let response = service(store, BookingMode::Strict)
        .create(request)
        .await
        .expect("creation succeeds");
    assert_eq!(response.skipped_students, 2);
}

#[rstest]
#[tokio::test]
async fn create_defaults_status_to_pending(request: CreateBookingRequest) {
    let mut store = MockBookingStore::new();
    store
        .expect_create()
        .withf(|booking, _mode| booking.status() == BookingStatus::Pending)
        .times(1)
        .returning(|_, _| Ok(()));

    service(store, BookingMode::Strict)
        .create(request)
        .await
        .expect("creation succeeds");
}

#[rstest]
#[tokio::test]
async fn create_accepts_an_explicit_confirmed_status(mut request: CreateBookingRequest) {
    request.status = Some("confirmed".to_owned());

    let mut store = MockBookingStore::new();
    store
        .expect_create()
        .withf(|booking, _mode| booking.status() == BookingStatus::Confirmed)
        .times(1)
        .returning(|_, _| Ok(()));

    service(store, BookingMode::Strict)
        .create(request)
        .await
        .expect("creation succeeds");
}

#[rstest]
#[case("completed")]
#[case("cancelled")]
#[case("archived")]
#[tokio::test]
async fn create_rejects_disallowed_initial_statuses(
    mut request: CreateBookingRequest,
    #[case] status: &str,
) {
    request.status = Some(status.to_owned());

    let mut store = MockBookingStore::new();
    store.expect_create().never();

    let error = service(store, BookingMode::Strict)
        .create(request)
        .await
        .expect_err("status must be rejected");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        error.details().and_then(|d| d.get("field")),
        Some(&json!("status"))
    );
}

#[rstest]
#[tokio::test]
async fn create_rejects_an_empty_student_list(mut request: CreateBookingRequest) {
    request.student_ids.clear();

    let mut store = MockBookingStore::new();
    store.expect_create().never();

    let error = service(store, BookingMode::Strict)
        .create(request)
        .await
        .expect_err("empty student list must fail");
    assert_eq!(
        error.details().and_then(|d| d.get("field")),
        Some(&json!("student_ids"))
    );
}

#[rstest]
#[tokio::test]
async fn create_rejects_inverted_windows_before_any_write(mut request: CreateBookingRequest) {
    request.start_time = "10:00".to_owned();
    request.end_time = "09:00".to_owned();

    let mut store = MockBookingStore::new();
    store.expect_create().never();

    let error = service(store, BookingMode::Strict)
        .create(request)
        .await
        .expect_err("inverted window must fail");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        error.details().and_then(|d| d.get("field")),
        Some(&json!("end_time"))
    );
}

#[rstest]
#[tokio::test]
async fn create_passes_the_configured_mode_to_the_store(request: CreateBookingRequest) {
    let mut store = MockBookingStore::new();
    store
        .expect_create()
        .withf(|_, mode| *mode == BookingMode::Permissive)
        .times(1)
        .returning(|_, _| Ok(()));

    service(store, BookingMode::Permissive)
        .create(request)
        .await
        .expect("creation succeeds");
}

#[rstest]
#[tokio::test]
async fn conflicts_surface_with_the_existing_row_identity(request: CreateBookingRequest) {
    let existing = Uuid::new_v4();
    let mut store = MockBookingStore::new();
    store.expect_create().returning(move |_, _| {
        Err(BookingStoreError::conflict(
            ConflictKind::TeacherOverlap,
            existing,
        ))
    });

    let error = service(store, BookingMode::Strict)
        .create(request)
        .await
        .expect_err("conflict must surface");
    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        error.details().and_then(|d| d.get("conflictingBookingId")),
        Some(&json!(existing))
    );
    assert_eq!(
        error.details().and_then(|d| d.get("kind")),
        Some(&json!("teacher_overlap"))
    );
}

#[rstest]
#[tokio::test]
async fn connection_failures_surface_as_service_unavailable(request: CreateBookingRequest) {
    let mut store = MockBookingStore::new();
    store
        .expect_create()
        .returning(|_, _| Err(BookingStoreError::connection("pool exhausted")));

    let error = service(store, BookingMode::Strict)
        .create(request)
        .await
        .expect_err("connection failure must surface");
    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn update_rejects_an_empty_patch() {
    let mut store = MockBookingStore::new();
    store.expect_update().never();

    let error = service(store, BookingMode::Strict)
        .update(Uuid::new_v4(), UpdateBookingRequest::default())
        .await
        .expect_err("empty patch must fail");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn update_parses_times_into_the_patch(request: CreateBookingRequest) {
    let booking_id = Uuid::new_v4();
    let stored = Booking::new(BookingDraft {
        id: booking_id,
        teacher_id: request.teacher_id,
        student_id: Uuid::new_v4(),
        course_type_id: request.course_type_id,
        session_date: date(),
        window: SessionWindow::parse("09:00", "11:00").expect("valid window"),
        status: BookingStatus::Pending,
        last_auto_update: None,
        location: None,
        fee_cents: None,
    })
    .expect("valid booking");

    let mut store = MockBookingStore::new();
    store
        .expect_update()
        .withf(move |id, patch| {
            *id == booking_id
                && patch.end_time
                    == chrono::NaiveTime::parse_from_str("11:00", "%H:%M").ok()
                && patch.start_time.is_none()
        })
        .times(1)
        .return_once(move |_, _| Ok(stored));

    let updated = service(store, BookingMode::Strict)
        .update(
            booking_id,
            UpdateBookingRequest {
                end_time: Some("11:00".to_owned()),
                ..UpdateBookingRequest::default()
            },
        )
        .await
        .expect("update succeeds");
    assert_eq!(updated.id(), booking_id);
}

#[rstest]
#[tokio::test]
async fn update_rejects_unknown_status_strings() {
    let mut store = MockBookingStore::new();
    store.expect_update().never();

    let error = service(store, BookingMode::Strict)
        .update(
            Uuid::new_v4(),
            UpdateBookingRequest {
                status: Some("archived".to_owned()),
                ..UpdateBookingRequest::default()
            },
        )
        .await
        .expect_err("unknown status must fail");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn cancel_submits_a_cancelled_status_patch(request: CreateBookingRequest) {
    let booking_id = Uuid::new_v4();
    let cancelled = Booking::new(BookingDraft {
        id: booking_id,
        teacher_id: request.teacher_id,
        student_id: Uuid::new_v4(),
        course_type_id: request.course_type_id,
        session_date: date(),
        window: SessionWindow::parse("09:00", "10:00").expect("valid window"),
        status: BookingStatus::Cancelled,
        last_auto_update: None,
        location: None,
        fee_cents: None,
    })
    .expect("valid booking");

    let mut store = MockBookingStore::new();
    store
        .expect_update()
        .withf(move |id, patch| {
            *id == booking_id
                && patch.status == Some(BookingStatus::Cancelled)
                && patch.start_time.is_none()
                && patch.session_date.is_none()
        })
        .times(1)
        .return_once(move |_, _| Ok(cancelled));

    service(store, BookingMode::Strict)
        .cancel(booking_id)
        .await
        .expect("cancel succeeds");
}

#[rstest]
#[tokio::test]
async fn get_maps_missing_rows_to_not_found() {
    let mut store = MockBookingStore::new();
    store.expect_find_by_id().returning(|_| Ok(None));

    let error = service(store, BookingMode::Strict)
        .get(Uuid::new_v4())
        .await
        .expect_err("missing booking must 404");
    assert_eq!(error.code(), ErrorCode::NotFound);
}
