//! Booking aggregate and its value types.
//!
//! A booking is one scheduled session between a teacher and a student on a
//! given date, spanning a half-open `[start, end)` time-of-day window. The
//! constructors here are the only way to build these types, so every booking
//! the rest of the engine sees already satisfies `end > start` and carries a
//! legal status.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// Wire format accepted for time-of-day fields.
const TIME_FORMAT: &str = "%H:%M";

/// Validation failure scoped to a single input field.
///
/// Carries the offending field name so callers can render per-field feedback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct BookingValidationError {
    field: &'static str,
    message: String,
}

impl BookingValidationError {
    /// Create a validation error for `field`.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// The offending input field.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Human-readable failure description.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Booking lifecycle status.
///
/// The state machine only moves forward: `Pending -> Confirmed -> Completed`,
/// with `Cancelled` reachable from `Pending` or `Confirmed` and terminal.
/// Any other string is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    /// Created but not yet confirmed by the teacher or an administrator.
    Pending,
    /// Confirmed; still scheduled to happen.
    Confirmed,
    /// The session has taken place (manually or via the lifecycle job).
    Completed,
    /// Explicitly cancelled; terminal.
    Cancelled,
}

impl BookingStatus {
    /// Every legal status value, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Parse a caller-supplied status string, rejecting unknown values.
    pub fn parse(value: &str) -> Result<Self, BookingValidationError> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(BookingValidationError::new(
                "status",
                format!("unknown booking status '{other}'"),
            )),
        }
    }

    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this booking still occupies its time window.
    ///
    /// Cancelled bookings release their slot; every other status keeps it.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Re-asserting the current status is always legal (no-op updates).
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::Pending => matches!(next, Self::Confirmed | Self::Completed | Self::Cancelled),
            Self::Confirmed => matches!(next, Self::Completed | Self::Cancelled),
            Self::Completed | Self::Cancelled => false,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open `[start, end)` time-of-day window of one session.
///
/// ## Invariants
/// - `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl SessionWindow {
    /// Build a window from already-parsed times.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, BookingValidationError> {
        if end <= start {
            return Err(BookingValidationError::new(
                "end_time",
                format!("end time {end} must be after start time {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse a window from `HH:MM` wire strings.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::SessionWindow;
    ///
    /// let window = SessionWindow::parse("09:00", "10:30").expect("valid window");
    /// assert!(SessionWindow::parse("10:00", "09:00").is_err());
    /// let _ = window;
    /// ```
    pub fn parse(start: &str, end: &str) -> Result<Self, BookingValidationError> {
        let start = parse_time("start_time", start)?;
        let end = parse_time("end_time", end)?;
        Self::new(start, end)
    }

    /// Window start (inclusive).
    pub fn start(self) -> NaiveTime {
        self.start
    }

    /// Window end (exclusive).
    pub fn end(self) -> NaiveTime {
        self.end
    }

    /// Half-open interval intersection test.
    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, BookingValidationError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| {
        BookingValidationError::new(field, format!("'{value}' is not a valid HH:MM time"))
    })
}

/// Unvalidated booking field bundle consumed by [`Booking::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    /// Surrogate key.
    pub id: Uuid,
    /// The teacher delivering the session.
    pub teacher_id: Uuid,
    /// The student attending the session.
    pub student_id: Uuid,
    /// The course type being delivered.
    pub course_type_id: Uuid,
    /// Logical session date.
    pub session_date: NaiveDate,
    /// Session time window.
    pub window: SessionWindow,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Tombstone set by the lifecycle job; non-null rows are never revisited.
    pub last_auto_update: Option<DateTime<Utc>>,
    /// Free-form location, opaque to the engine.
    pub location: Option<String>,
    /// Session fee in minor currency units, opaque to the engine.
    pub fee_cents: Option<i64>,
}

/// One scheduled tutoring session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    id: Uuid,
    teacher_id: Uuid,
    student_id: Uuid,
    course_type_id: Uuid,
    session_date: NaiveDate,
    window: SessionWindow,
    status: BookingStatus,
    last_auto_update: Option<DateTime<Utc>>,
    location: Option<String>,
    fee_cents: Option<i64>,
}

impl Booking {
    /// Build a booking from a draft.
    ///
    /// The window inside the draft is already validated by construction, so
    /// this cannot currently fail; it stays fallible because future invariants
    /// (fee sanity, date bounds) belong here.
    pub fn new(draft: BookingDraft) -> Result<Self, BookingValidationError> {
        let BookingDraft {
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
        } = draft;

        Ok(Self {
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
    }

    /// Surrogate key.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The teacher delivering the session.
    pub fn teacher_id(&self) -> Uuid {
        self.teacher_id
    }

    /// The student attending the session.
    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    /// The course type being delivered.
    pub fn course_type_id(&self) -> Uuid {
        self.course_type_id
    }

    /// Logical session date.
    pub fn session_date(&self) -> NaiveDate {
        self.session_date
    }

    /// Session time window.
    pub fn window(&self) -> SessionWindow {
        self.window
    }

    /// Lifecycle status.
    pub fn status(&self) -> BookingStatus {
        self.status
    }

    /// Auto-transition tombstone.
    pub fn last_auto_update(&self) -> Option<DateTime<Utc>> {
        self.last_auto_update
    }

    /// Free-form location.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Session fee in minor currency units.
    pub fn fee_cents(&self) -> Option<i64> {
        self.fee_cents
    }

    /// Merge a patch over this booking and validate the effective result.
    ///
    /// Missing patch fields retain the current values. Validation runs
    /// against the merged values: the merged window must satisfy
    /// `end > start` and a supplied status must be reachable from the
    /// current one.
    pub fn apply(&self, patch: &BookingPatch) -> Result<Self, BookingValidationError> {
        let window = SessionWindow::new(
            patch.start_time.unwrap_or_else(|| self.window.start()),
            patch.end_time.unwrap_or_else(|| self.window.end()),
        )?;

        let status = match patch.status {
            Some(next) if self.status.can_transition_to(next) => next,
            Some(next) => {
                return Err(BookingValidationError::new(
                    "status",
                    format!("cannot move booking from {} to {next}", self.status),
                ));
            }
            None => self.status,
        };

        Ok(Self {
            id: self.id,
            teacher_id: self.teacher_id,
            student_id: self.student_id,
            course_type_id: patch.course_type_id.unwrap_or(self.course_type_id),
            session_date: patch.session_date.unwrap_or(self.session_date),
            window,
            status,
            last_auto_update: self.last_auto_update,
            location: patch.location.clone().or_else(|| self.location.clone()),
            fee_cents: patch.fee_cents.or(self.fee_cents),
        })
    }
}

/// Conflict enforcement mode for booking creation.
///
/// The scheduling path runs the full duplicate/overlap scan; the
/// administrative direct-booking path intentionally allows both. Which path
/// a deployment gets is configuration, not an accident of routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingMode {
    /// Refuse duplicates and overlapping bookings.
    #[default]
    Strict,
    /// Skip the conflict scan; duplicates and overlaps are allowed.
    Permissive,
}

impl BookingMode {
    /// Parse a configuration string.
    pub fn parse(value: &str) -> Result<Self, BookingValidationError> {
        match value {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(BookingValidationError::new(
                "booking_mode",
                format!("unknown booking mode '{other}'"),
            )),
        }
    }

    /// Whether creation must run the conflict scan.
    pub fn enforces_conflicts(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Partial booking update; `None` fields keep their current values.
///
/// Participants are deliberately absent: `teacher_id` and `student_id` are
/// immutable once a booking exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingPatch {
    /// Replacement session date.
    pub session_date: Option<NaiveDate>,
    /// Replacement window start.
    pub start_time: Option<NaiveTime>,
    /// Replacement window end.
    pub end_time: Option<NaiveTime>,
    /// Replacement lifecycle status.
    pub status: Option<BookingStatus>,
    /// Replacement course type.
    pub course_type_id: Option<Uuid>,
    /// Replacement location.
    pub location: Option<String>,
    /// Replacement fee.
    pub fee_cents: Option<i64>,
}

impl BookingPatch {
    /// Whether the patch supplies no fields at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use chrono::NaiveDate;
    use rstest::rstest;

    use super::*;

    fn time(value: &str) -> NaiveTime {
        NaiveTime::parse_from_str(value, "%H:%M").expect("valid test time")
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking::new(BookingDraft {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            course_type_id: Uuid::new_v4(),
            session_date: NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid test date"),
            window: SessionWindow::parse("09:00", "10:00").expect("valid test window"),
            status,
            last_auto_update: None,
            location: None,
            fee_cents: Some(4_500),
        })
        .expect("valid test booking")
    }

    #[rstest]
    #[case("pending", BookingStatus::Pending)]
    #[case("confirmed", BookingStatus::Confirmed)]
    #[case("completed", BookingStatus::Completed)]
    #[case("cancelled", BookingStatus::Cancelled)]
    fn status_round_trips_through_storage_strings(
        #[case] raw: &str,
        #[case] expected: BookingStatus,
    ) {
        let parsed = BookingStatus::parse(raw).expect("known status parses");
        assert_eq!(parsed, expected);
        assert_eq!(parsed.as_str(), raw);
    }

    #[rstest]
    #[case("PENDING")]
    #[case("archived")]
    #[case("")]
    fn status_rejects_unknown_strings(#[case] raw: &str) {
        let err = BookingStatus::parse(raw).expect_err("unknown status must fail");
        assert_eq!(err.field(), "status");
    }

    #[rstest]
    #[case(BookingStatus::Pending, BookingStatus::Confirmed, true)]
    #[case(BookingStatus::Pending, BookingStatus::Completed, true)]
    #[case(BookingStatus::Pending, BookingStatus::Cancelled, true)]
    #[case(BookingStatus::Confirmed, BookingStatus::Completed, true)]
    #[case(BookingStatus::Confirmed, BookingStatus::Cancelled, true)]
    #[case(BookingStatus::Confirmed, BookingStatus::Pending, false)]
    #[case(BookingStatus::Completed, BookingStatus::Cancelled, false)]
    #[case(BookingStatus::Completed, BookingStatus::Pending, false)]
    #[case(BookingStatus::Cancelled, BookingStatus::Pending, false)]
    #[case(BookingStatus::Cancelled, BookingStatus::Confirmed, false)]
    fn lifecycle_only_moves_forward(
        #[case] from: BookingStatus,
        #[case] to: BookingStatus,
        #[case] legal: bool,
    ) {
        assert_eq!(from.can_transition_to(to), legal);
    }

    #[rstest]
    fn window_rejects_inverted_and_empty_ranges() {
        let err = SessionWindow::parse("10:00", "10:00").expect_err("empty window must fail");
        assert_eq!(err.field(), "end_time");
        assert!(SessionWindow::parse("10:00", "09:30").is_err());
    }

    #[rstest]
    fn window_rejects_malformed_times() {
        let err = SessionWindow::parse("9am", "10:00").expect_err("malformed time must fail");
        assert_eq!(err.field(), "start_time");
        assert!(SessionWindow::parse("09:00", "25:61").is_err());
    }

    #[rstest]
    #[case("09:00", "10:00", "09:30", "10:30", true)]
    #[case("09:00", "10:00", "10:00", "11:00", false)]
    #[case("09:00", "10:00", "08:00", "09:00", false)]
    #[case("09:00", "10:00", "09:00", "10:00", true)]
    #[case("09:00", "12:00", "10:00", "11:00", true)]
    fn overlap_is_half_open(
        #[case] a_start: &str,
        #[case] a_end: &str,
        #[case] b_start: &str,
        #[case] b_end: &str,
        #[case] expected: bool,
    ) {
        let a = SessionWindow::new(time(a_start), time(a_end)).expect("window a");
        let b = SessionWindow::new(time(b_start), time(b_end)).expect("window b");
        assert_eq!(a.overlaps(b), expected);
        assert_eq!(b.overlaps(a), expected);
    }

    #[rstest]
    fn apply_merges_missing_fields_from_current_row() {
        let current = booking(BookingStatus::Pending);
        let patch = BookingPatch {
            end_time: Some(time("11:00")),
            location: Some("Room 4".to_owned()),
            ..BookingPatch::default()
        };

        let merged = current.apply(&patch).expect("merge succeeds");
        assert_eq!(merged.window().start(), time("09:00"));
        assert_eq!(merged.window().end(), time("11:00"));
        assert_eq!(merged.location(), Some("Room 4"));
        assert_eq!(merged.status(), BookingStatus::Pending);
        assert_eq!(merged.fee_cents(), Some(4_500));
    }

    #[rstest]
    fn apply_validates_the_effective_window() {
        let current = booking(BookingStatus::Pending);
        let patch = BookingPatch {
            end_time: Some(time("08:00")),
            ..BookingPatch::default()
        };

        let err = current.apply(&patch).expect_err("merged window is inverted");
        assert_eq!(err.field(), "end_time");
    }

    #[rstest]
    fn apply_rejects_backward_status_moves() {
        let current = booking(BookingStatus::Completed);
        let patch = BookingPatch {
            status: Some(BookingStatus::Pending),
            ..BookingPatch::default()
        };

        let err = current.apply(&patch).expect_err("backward move must fail");
        assert_eq!(err.field(), "status");
    }
}
