//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly; Diesel uses
//! them for type-safe inserts and updates.
//!
//! The `bookings` table is declared with the canonical `class_date` column.
//! Deployments migrated from older schema generations may still carry a
//! populated `arr_date` or `date` column with a NULL `class_date` on
//! historical rows, which is why every booking *read* goes through the
//! session-date expression resolved by the schema probe instead of this
//! definition (see `session_date`).
//!
//! The `teachers` and `students` tables are reached only through probe-gated
//! raw SQL (their `status` column is optional across deployments), so they
//! carry no definition here.

diesel::table! {
    /// Scheduled tutoring sessions.
    bookings (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Teacher delivering the session.
        teacher_id -> Uuid,
        /// Student attending the session.
        student_id -> Uuid,
        /// Course type reference.
        course_type_id -> Uuid,
        /// Canonical session date; NULL on rows predating the rename.
        class_date -> Nullable<Date>,
        /// Window start (inclusive).
        start_time -> Time,
        /// Window end (exclusive); checked to be after the start.
        end_time -> Time,
        /// Lifecycle status string.
        status -> Text,
        /// Tombstone set by the lifecycle job.
        last_auto_update -> Nullable<Timestamptz>,
        /// Free-form location.
        location -> Nullable<Text>,
        /// Fee in minor currency units.
        fee_cents -> Nullable<Int8>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Teacher availability declarations, one row per person and day.
    teacher_availability (person_id, day) {
        /// The declaring teacher.
        person_id -> Uuid,
        /// The day this declaration covers.
        day -> Date,
        /// Available before 12:00.
        morning -> Bool,
        /// Available 12:00 to 18:00.
        afternoon -> Bool,
        /// Available from 18:00.
        evening -> Bool,
    }
}

diesel::table! {
    /// Student availability declarations, one row per person and day.
    student_availability (person_id, day) {
        /// The declaring student.
        person_id -> Uuid,
        /// The day this declaration covers.
        day -> Date,
        /// Available before 12:00.
        morning -> Bool,
        /// Available 12:00 to 18:00.
        afternoon -> Bool,
        /// Available from 18:00.
        evening -> Bool,
    }
}

diesel::table! {
    /// Append-only audit trail of lifecycle job transitions.
    booking_auto_updates (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// The transitioned booking.
        booking_id -> Uuid,
        /// Status before the transition.
        previous_status -> Text,
        /// Status after the transition.
        new_status -> Text,
        /// Job run this transition belongs to.
        run_id -> Uuid,
        /// Human-readable transition note.
        note -> Text,
        /// Transition timestamp.
        created_at -> Timestamptz,
    }
}
