//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Booking reads arrive through raw SQL (the
//! session-date expression is resolved at runtime), so their structs derive
//! `QueryableByName`; writes go through the typed `bookings` definition.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Date, Int8, Nullable, Text, Time, Timestamptz, Uuid as SqlUuid};
use uuid::Uuid;

use super::schema::{bookings, booking_auto_updates, student_availability, teacher_availability};

// ---------------------------------------------------------------------------
// Booking rows
// ---------------------------------------------------------------------------

/// Full booking row loaded through the resolved session-date expression.
///
/// The SQL selecting this struct must alias the date expression as
/// `session_date`.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct BookingSqlRow {
    #[diesel(sql_type = SqlUuid)]
    pub id: Uuid,
    #[diesel(sql_type = SqlUuid)]
    pub teacher_id: Uuid,
    #[diesel(sql_type = SqlUuid)]
    pub student_id: Uuid,
    #[diesel(sql_type = SqlUuid)]
    pub course_type_id: Uuid,
    #[diesel(sql_type = Date)]
    pub session_date: NaiveDate,
    #[diesel(sql_type = Time)]
    pub start_time: NaiveTime,
    #[diesel(sql_type = Time)]
    pub end_time: NaiveTime,
    #[diesel(sql_type = Text)]
    pub status: String,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub last_auto_update: Option<DateTime<Utc>>,
    #[diesel(sql_type = Nullable<Text>)]
    pub location: Option<String>,
    #[diesel(sql_type = Nullable<Int8>)]
    pub fee_cents: Option<i64>,
}

/// Slice of a booking row the conflict scan needs.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct ConflictSqlRow {
    #[diesel(sql_type = SqlUuid)]
    pub id: Uuid,
    #[diesel(sql_type = SqlUuid)]
    pub teacher_id: Uuid,
    #[diesel(sql_type = SqlUuid)]
    pub student_id: Uuid,
    #[diesel(sql_type = Time)]
    pub start_time: NaiveTime,
    #[diesel(sql_type = Time)]
    pub end_time: NaiveTime,
}

/// Row returned by the lifecycle claim's `RETURNING` clause.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct TransitionSqlRow {
    #[diesel(sql_type = SqlUuid)]
    pub booking_id: Uuid,
    #[diesel(sql_type = Text)]
    pub previous_status: String,
}

/// Row returned by information-schema column probes.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct ColumnNameRow {
    #[diesel(sql_type = Text)]
    pub column_name: String,
}

/// Row returned by the participant status check.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct ParticipantStatusRow {
    #[diesel(sql_type = Text)]
    pub status: String,
}

/// Row returned by availability discovery queries.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct AvailablePersonRow {
    #[diesel(sql_type = SqlUuid)]
    pub person_id: Uuid,
}

/// Insertable struct for creating new bookings.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub(crate) struct NewBookingRow<'a> {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub course_type_id: Uuid,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: &'a str,
    pub location: Option<&'a str>,
    pub fee_cents: Option<i64>,
}

/// Changeset carrying only the booking columns a patch actually supplied.
///
/// `None` fields are omitted from the generated `UPDATE`; `updated_at` is
/// always set, so the statement can never be empty.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = bookings)]
pub(crate) struct BookingChangeset<'a> {
    pub class_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: Option<&'a str>,
    pub course_type_id: Option<Uuid>,
    pub location: Option<&'a str>,
    pub fee_cents: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Availability rows
// ---------------------------------------------------------------------------

/// Stamp the row, insert, and changeset structs for one availability table.
///
/// The teacher and student tables share a shape but Diesel types are per
/// table, so the structs are generated rather than written twice.
macro_rules! availability_models {
    ($table:ident, $row:ident, $new_row:ident, $changeset:ident) => {
        /// Row struct for reading from the availability table.
        #[derive(Debug, Clone, Copy, Queryable, Selectable)]
        #[diesel(table_name = $table)]
        #[diesel(check_for_backend(diesel::pg::Pg))]
        pub(crate) struct $row {
            pub person_id: Uuid,
            pub day: NaiveDate,
            pub morning: bool,
            pub afternoon: bool,
            pub evening: bool,
        }

        /// Insertable struct for creating availability rows.
        #[derive(Debug, Clone, Copy, Insertable)]
        #[diesel(table_name = $table)]
        pub(crate) struct $new_row {
            pub person_id: Uuid,
            pub day: NaiveDate,
            pub morning: bool,
            pub afternoon: bool,
            pub evening: bool,
        }

        /// Changeset applied on upsert conflicts.
        #[derive(Debug, Clone, Copy, AsChangeset)]
        #[diesel(table_name = $table)]
        pub(crate) struct $changeset {
            pub morning: bool,
            pub afternoon: bool,
            pub evening: bool,
        }
    };
}

availability_models!(
    teacher_availability,
    TeacherAvailabilityRow,
    NewTeacherAvailabilityRow,
    TeacherAvailabilityChangeset
);
availability_models!(
    student_availability,
    StudentAvailabilityRow,
    NewStudentAvailabilityRow,
    StudentAvailabilityChangeset
);

// ---------------------------------------------------------------------------
// Audit log rows
// ---------------------------------------------------------------------------

/// Insertable struct for the append-only auto-update log.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_auto_updates)]
pub(crate) struct NewAutoUpdateRow<'a> {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub previous_status: &'a str,
    pub new_status: &'a str,
    pub run_id: Uuid,
    pub note: &'a str,
}
