//! PostgreSQL-backed `BookingStore` implementation using Diesel.
//!
//! Creation and update each run as one transaction. Reads of the session
//! date go through the probe-resolved expression so historical rows with a
//! legacy date column stay visible; writes always target the canonical
//! column the migrations guarantee.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Date, Text, Uuid as SqlUuid};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{BookingStore, BookingStoreError};
use crate::domain::{
    ActiveBooking, Booking, BookingCandidate, BookingDraft, BookingMode, BookingPatch,
    BookingStatus, Role, SessionWindow, classify_conflict,
};

use super::error_mapping::{map_booking_diesel_error, map_booking_pool_error};
use super::models::{
    BookingChangeset, BookingSqlRow, ConflictSqlRow, NewBookingRow, ParticipantStatusRow,
};
use super::pool::DbPool;
use super::schema::bookings;
use super::session_date::{SchemaCapabilities, SchemaProbe};

/// Participant status required for new bookings.
const ACTIVE_PARTICIPANT_STATUS: &str = "active";

/// Diesel-backed implementation of the booking store port.
#[derive(Clone)]
pub struct DieselBookingStore {
    pool: DbPool,
    probe: Arc<SchemaProbe>,
}

impl DieselBookingStore {
    /// Create a store over the given pool and schema probe.
    pub fn new(pool: DbPool, probe: Arc<SchemaProbe>) -> Self {
        Self { pool, probe }
    }
}

/// Transaction-internal error carrier.
///
/// Lets domain-level refusals (conflicts, invalid merges) abort and roll
/// back the transaction without being squeezed through Diesel's error type.
enum TxError {
    Store(BookingStoreError),
    Sql(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Sql(error)
    }
}

fn collapse(error: TxError) -> BookingStoreError {
    match error {
        TxError::Store(store_error) => store_error,
        TxError::Sql(sql_error) => map_booking_diesel_error(sql_error),
    }
}

/// SQL selecting the conflict-scan slice through the resolved date
/// expression.
fn conflict_scan_sql(capabilities: &SchemaCapabilities) -> String {
    let expr = capabilities.session_date_expression(Some("b"));
    format!(
        "SELECT b.id, b.teacher_id, b.student_id, b.start_time, b.end_time \
         FROM bookings b \
         WHERE {expr} = $1 AND b.status <> 'cancelled' \
           AND (b.teacher_id = $2 OR b.student_id = $3) \
         ORDER BY b.start_time ASC"
    )
}

/// SQL selecting one full booking row, aliasing the resolved date expression
/// as `session_date`.
fn select_booking_sql(capabilities: &SchemaCapabilities, for_update: bool) -> String {
    let expr = capabilities.session_date_expression(Some("b"));
    let suffix = if for_update { " FOR UPDATE" } else { "" };
    format!(
        "SELECT b.id, b.teacher_id, b.student_id, b.course_type_id, \
                {expr} AS session_date, b.start_time, b.end_time, b.status, \
                b.last_auto_update, b.location, b.fee_cents \
         FROM bookings b WHERE b.id = $1{suffix}"
    )
}

/// Convert a database row into a validated domain booking.
fn row_to_booking(row: BookingSqlRow) -> Result<Booking, BookingStoreError> {
    let BookingSqlRow {
        id,
        teacher_id,
        student_id,
        course_type_id,
        session_date,
        start_time,
        end_time,
        status,
        last_auto_update,
        location,
        fee_cents,
    } = row;

    let status = BookingStatus::parse(&status)
        .map_err(|err| BookingStoreError::query(format!("stored booking {id}: {err}")))?;
    let window = SessionWindow::new(start_time, end_time)
        .map_err(|err| BookingStoreError::query(format!("stored booking {id}: {err}")))?;

    Booking::new(BookingDraft {
        id,
        teacher_id,
        student_id,
        course_type_id,
        session_date,
        window,
        status,
        last_auto_update,
        location,
        fee_cents,
    })
    .map_err(|err| BookingStoreError::query(format!("stored booking {id}: {err}")))
}

/// Serialise concurrent creations touching the same participants.
///
/// Locks are taken in sorted id order so two creations naming the same pair
/// in opposite roles cannot deadlock. Transaction-scoped, so they release on
/// commit or rollback.
async fn lock_participants(
    conn: &mut AsyncPgConnection,
    teacher_id: Uuid,
    student_id: Uuid,
) -> Result<(), TxError> {
    let mut keys = [teacher_id.to_string(), student_id.to_string()];
    keys.sort();
    for key in keys {
        sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind::<Text, _>(key)
            .execute(conn)
            .await?;
    }
    Ok(())
}

/// Verify a referenced participant exists and is active.
///
/// Only called when the probe saw a `status` column on the table; schemas
/// without one skip the check entirely.
async fn check_participant(
    conn: &mut AsyncPgConnection,
    table: &str,
    role: Role,
    person_id: Uuid,
) -> Result<(), TxError> {
    let rows: Vec<ParticipantStatusRow> =
        sql_query(format!("SELECT status FROM {table} WHERE id = $1"))
            .bind::<SqlUuid, _>(person_id)
            .load(conn)
            .await?;

    match rows.into_iter().next() {
        None => Err(TxError::Store(BookingStoreError::reference_missing(
            format!("{role} {person_id} does not exist"),
        ))),
        Some(row) if row.status != ACTIVE_PARTICIPANT_STATUS => Err(TxError::Store(
            BookingStoreError::participant_inactive(role, person_id),
        )),
        Some(_) => Ok(()),
    }
}

/// Run the duplicate/overlap classification against same-day active rows.
async fn scan_conflicts(
    conn: &mut AsyncPgConnection,
    capabilities: &SchemaCapabilities,
    booking: &Booking,
) -> Result<(), TxError> {
    let rows: Vec<ConflictSqlRow> = sql_query(conflict_scan_sql(capabilities))
        .bind::<Date, _>(booking.session_date())
        .bind::<SqlUuid, _>(booking.teacher_id())
        .bind::<SqlUuid, _>(booking.student_id())
        .load(conn)
        .await?;

    let mut active = Vec::with_capacity(rows.len());
    for row in rows {
        let window = SessionWindow::new(row.start_time, row.end_time).map_err(|err| {
            TxError::Store(BookingStoreError::query(format!(
                "stored booking {}: {err}",
                row.id
            )))
        })?;
        active.push(ActiveBooking {
            id: row.id,
            teacher_id: row.teacher_id,
            student_id: row.student_id,
            window,
        });
    }

    let candidate = BookingCandidate {
        teacher_id: booking.teacher_id(),
        student_id: booking.student_id(),
        window: booking.window(),
    };
    match classify_conflict(&candidate, &active) {
        Some(conflict) => Err(TxError::Store(BookingStoreError::conflict(
            conflict.kind,
            conflict.booking_id,
        ))),
        None => Ok(()),
    }
}

/// Load one booking through the resolved date expression.
async fn load_booking(
    conn: &mut AsyncPgConnection,
    capabilities: &SchemaCapabilities,
    booking_id: Uuid,
    for_update: bool,
) -> Result<Option<Booking>, TxError> {
    let rows: Vec<BookingSqlRow> = sql_query(select_booking_sql(capabilities, for_update))
        .bind::<SqlUuid, _>(booking_id)
        .load(conn)
        .await?;

    rows.into_iter()
        .next()
        .map(|row| row_to_booking(row).map_err(TxError::Store))
        .transpose()
}

/// Re-run the participant eligibility checks the schema supports.
async fn check_participants(
    conn: &mut AsyncPgConnection,
    capabilities: &SchemaCapabilities,
    teacher_id: Uuid,
    student_id: Uuid,
) -> Result<(), TxError> {
    if capabilities.teachers_have_status {
        check_participant(conn, "teachers", Role::Teacher, teacher_id).await?;
    }
    if capabilities.students_have_status {
        check_participant(conn, "students", Role::Student, student_id).await?;
    }
    Ok(())
}

#[async_trait]
impl BookingStore for DieselBookingStore {
    async fn create(&self, booking: &Booking, mode: BookingMode) -> Result<(), BookingStoreError> {
        let capabilities = self.probe.capabilities().await.clone();
        let mut conn = self.pool.get().await.map_err(map_booking_pool_error)?;

        let new_row = NewBookingRow {
            id: booking.id(),
            teacher_id: booking.teacher_id(),
            student_id: booking.student_id(),
            course_type_id: booking.course_type_id(),
            class_date: booking.session_date(),
            start_time: booking.window().start(),
            end_time: booking.window().end(),
            status: booking.status().as_str(),
            location: booking.location(),
            fee_cents: booking.fee_cents(),
        };

        conn.transaction(|conn| {
            async move {
                if mode.enforces_conflicts() {
                    lock_participants(conn, booking.teacher_id(), booking.student_id()).await?;
                }
                check_participants(
                    conn,
                    &capabilities,
                    booking.teacher_id(),
                    booking.student_id(),
                )
                .await?;
                if mode.enforces_conflicts() {
                    scan_conflicts(conn, &capabilities, booking).await?;
                }

                diesel::insert_into(bookings::table)
                    .values(&new_row)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(collapse)
    }

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingStoreError> {
        let capabilities = self.probe.capabilities().await.clone();
        let mut conn = self.pool.get().await.map_err(map_booking_pool_error)?;

        load_booking(&mut conn, &capabilities, booking_id, false)
            .await
            .map_err(collapse)
    }

    async fn update(
        &self,
        booking_id: Uuid,
        patch: &BookingPatch,
    ) -> Result<Booking, BookingStoreError> {
        let capabilities = self.probe.capabilities().await.clone();
        let mut conn = self.pool.get().await.map_err(map_booking_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let current = load_booking(conn, &capabilities, booking_id, true)
                    .await?
                    .ok_or_else(|| TxError::Store(BookingStoreError::not_found(booking_id)))?;

                let merged = current.apply(patch).map_err(|err| {
                    TxError::Store(BookingStoreError::invalid_merge(err.field(), err.message()))
                })?;

                check_participants(
                    conn,
                    &capabilities,
                    merged.teacher_id(),
                    merged.student_id(),
                )
                .await?;

                let changeset = BookingChangeset {
                    class_date: patch.session_date,
                    start_time: patch.start_time,
                    end_time: patch.end_time,
                    status: patch.status.map(BookingStatus::as_str),
                    course_type_id: patch.course_type_id,
                    location: patch.location.as_deref(),
                    fee_cents: patch.fee_cents,
                    updated_at: Utc::now(),
                };
                diesel::update(bookings::table.find(booking_id))
                    .set(&changeset)
                    .execute(conn)
                    .await?;

                Ok(merged)
            }
            .scope_boxed()
        })
        .await
        .map_err(collapse)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for SQL assembly and row conversion.

    use chrono::{NaiveDate, NaiveTime};
    use rstest::{fixture, rstest};

    use super::*;

    fn capabilities(present: &[&str]) -> SchemaCapabilities {
        let present: Vec<String> = present.iter().map(|name| (*name).to_owned()).collect();
        SchemaCapabilities::from_probe(&present, true, true)
    }

    #[fixture]
    fn valid_row() -> BookingSqlRow {
        BookingSqlRow {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            course_type_id: Uuid::new_v4(),
            session_date: NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid test date"),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid test time"),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).expect("valid test time"),
            status: "confirmed".to_owned(),
            last_auto_update: None,
            location: Some("Room 2".to_owned()),
            fee_cents: Some(4_000),
        }
    }

    #[rstest]
    fn conflict_scan_embeds_the_resolved_expression() {
        let sql = conflict_scan_sql(&capabilities(&["arr_date", "class_date"]));
        assert!(sql.contains("COALESCE(b.\"arr_date\", b.\"class_date\") = $1"));
        assert!(sql.contains("b.status <> 'cancelled'"));
    }

    #[rstest]
    fn booking_select_aliases_the_expression_as_session_date() {
        let sql = select_booking_sql(&capabilities(&["class_date"]), true);
        assert!(sql.contains("b.\"class_date\" AS session_date"));
        assert!(sql.ends_with("FOR UPDATE"));

        let plain = select_booking_sql(&capabilities(&["class_date"]), false);
        assert!(!plain.contains("FOR UPDATE"));
    }

    #[rstest]
    fn row_conversion_accepts_a_valid_row(valid_row: BookingSqlRow) {
        let booking = row_to_booking(valid_row).expect("valid row converts");
        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.location(), Some("Room 2"));
    }

    #[rstest]
    fn row_conversion_rejects_unknown_status_strings(mut valid_row: BookingSqlRow) {
        valid_row.status = "archived".to_owned();

        let error = row_to_booking(valid_row).expect_err("unknown status must fail");
        assert!(matches!(error, BookingStoreError::Query { .. }));
    }

    #[rstest]
    fn row_conversion_rejects_inverted_windows(mut valid_row: BookingSqlRow) {
        valid_row.end_time = NaiveTime::from_hms_opt(8, 0, 0).expect("valid test time");

        let error = row_to_booking(valid_row).expect_err("inverted window must fail");
        assert!(matches!(error, BookingStoreError::Query { .. }));
    }
}
