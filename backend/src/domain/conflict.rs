//! Conflict classification for proposed bookings.
//!
//! Classification only ever looks at other bookings, never at availability
//! declarations; a booking may be created inside a window someone declared
//! unavailable. Checks run in a fixed order and short-circuit on the first
//! match, which is the tie-break policy: an exact duplicate outranks a
//! teacher overlap, which outranks a student overlap.

use uuid::Uuid;

use super::booking::SessionWindow;

/// The proposed booking under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingCandidate {
    /// Teacher the session is proposed for.
    pub teacher_id: Uuid,
    /// Student the session is proposed for.
    pub student_id: Uuid,
    /// Proposed session window.
    pub window: SessionWindow,
}

/// The slice of an existing booking that classification needs.
///
/// Callers supply only same-day, non-cancelled bookings involving either
/// participant; rows outside that set cannot conflict by definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveBooking {
    /// Existing booking id, reported back on a conflict.
    pub id: Uuid,
    /// Teacher on the existing booking.
    pub teacher_id: Uuid,
    /// Student on the existing booking.
    pub student_id: Uuid,
    /// Existing session window.
    pub window: SessionWindow,
}

/// How a candidate collides with an existing booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Same teacher, same student, identical start and end. Reported
    /// distinctly so re-submissions can be treated differently from genuine
    /// collisions.
    ExactDuplicate,
    /// The teacher already has an intersecting booking.
    TeacherOverlap,
    /// The student already has an intersecting booking.
    StudentOverlap,
}

impl ConflictKind {
    /// Stable name used in error details and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactDuplicate => "exact_duplicate",
            Self::TeacherOverlap => "teacher_overlap",
            Self::StudentOverlap => "student_overlap",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected conflict, carrying the existing row's identity so callers can
/// offer "view existing" actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    /// Classification of the collision.
    pub kind: ConflictKind,
    /// Id of the conflicting booking.
    pub booking_id: Uuid,
}

/// Classify `candidate` against the existing same-day active bookings.
///
/// Returns `None` when the candidate is conflict-free.
///
/// # Examples
/// ```
/// use backend::domain::{ActiveBooking, BookingCandidate, SessionWindow, classify_conflict};
/// use uuid::Uuid;
///
/// let teacher = Uuid::new_v4();
/// let candidate = BookingCandidate {
///     teacher_id: teacher,
///     student_id: Uuid::new_v4(),
///     window: SessionWindow::parse("09:30", "10:30").expect("valid window"),
/// };
/// let existing = [ActiveBooking {
///     id: Uuid::new_v4(),
///     teacher_id: teacher,
///     student_id: Uuid::new_v4(),
///     window: SessionWindow::parse("09:00", "10:00").expect("valid window"),
/// }];
///
/// let conflict = classify_conflict(&candidate, &existing).expect("overlap detected");
/// assert_eq!(conflict.booking_id, existing[0].id);
/// ```
pub fn classify_conflict(
    candidate: &BookingCandidate,
    existing: &[ActiveBooking],
) -> Option<Conflict> {
    let duplicate = existing.iter().find(|row| {
        row.teacher_id == candidate.teacher_id
            && row.student_id == candidate.student_id
            && row.window == candidate.window
    });
    if let Some(row) = duplicate {
        return Some(Conflict {
            kind: ConflictKind::ExactDuplicate,
            booking_id: row.id,
        });
    }

    let teacher_hit = existing.iter().find(|row| {
        row.teacher_id == candidate.teacher_id && row.window.overlaps(candidate.window)
    });
    if let Some(row) = teacher_hit {
        return Some(Conflict {
            kind: ConflictKind::TeacherOverlap,
            booking_id: row.id,
        });
    }

    let student_hit = existing.iter().find(|row| {
        row.student_id == candidate.student_id && row.window.overlaps(candidate.window)
    });
    student_hit.map(|row| Conflict {
        kind: ConflictKind::StudentOverlap,
        booking_id: row.id,
    })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::{fixture, rstest};

    use super::*;

    fn window(start: &str, end: &str) -> SessionWindow {
        SessionWindow::parse(start, end).expect("valid test window")
    }

    #[fixture]
    fn teacher() -> Uuid {
        Uuid::new_v4()
    }

    #[fixture]
    fn student() -> Uuid {
        Uuid::new_v4()
    }

    #[rstest]
    fn overlapping_teacher_booking_is_classified_as_teacher_overlap(
        teacher: Uuid,
        student: Uuid,
    ) {
        let existing = [ActiveBooking {
            id: Uuid::new_v4(),
            teacher_id: teacher,
            student_id: Uuid::new_v4(),
            window: window("09:00", "10:00"),
        }];
        let candidate = BookingCandidate {
            teacher_id: teacher,
            student_id: student,
            window: window("09:30", "10:30"),
        };

        let conflict = classify_conflict(&candidate, &existing).expect("conflict expected");
        assert_eq!(conflict.kind, ConflictKind::TeacherOverlap);
        assert_eq!(conflict.booking_id, existing[0].id);
    }

    #[rstest]
    fn same_interval_for_a_different_teacher_is_clear(student: Uuid) {
        let existing = [ActiveBooking {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            window: window("09:00", "10:00"),
        }];
        let candidate = BookingCandidate {
            teacher_id: Uuid::new_v4(),
            student_id: student,
            window: window("09:30", "10:30"),
        };

        assert_eq!(classify_conflict(&candidate, &existing), None);
    }

    #[rstest]
    fn identical_times_and_participants_rank_as_duplicate_not_overlap(
        teacher: Uuid,
        student: Uuid,
    ) {
        let existing = [ActiveBooking {
            id: Uuid::new_v4(),
            teacher_id: teacher,
            student_id: student,
            window: window("14:00", "15:00"),
        }];
        let candidate = BookingCandidate {
            teacher_id: teacher,
            student_id: student,
            window: window("14:00", "15:00"),
        };

        let conflict = classify_conflict(&candidate, &existing).expect("conflict expected");
        assert_eq!(conflict.kind, ConflictKind::ExactDuplicate);
    }

    #[rstest]
    fn duplicate_outranks_overlap_with_another_row(teacher: Uuid, student: Uuid) {
        let duplicate_id = Uuid::new_v4();
        let existing = [
            ActiveBooking {
                id: Uuid::new_v4(),
                teacher_id: teacher,
                student_id: Uuid::new_v4(),
                window: window("13:30", "14:30"),
            },
            ActiveBooking {
                id: duplicate_id,
                teacher_id: teacher,
                student_id: student,
                window: window("14:00", "15:00"),
            },
        ];
        let candidate = BookingCandidate {
            teacher_id: teacher,
            student_id: student,
            window: window("14:00", "15:00"),
        };

        let conflict = classify_conflict(&candidate, &existing).expect("conflict expected");
        assert_eq!(conflict.kind, ConflictKind::ExactDuplicate);
        assert_eq!(conflict.booking_id, duplicate_id);
    }

    #[rstest]
    fn student_overlap_is_reported_when_the_teacher_is_free(teacher: Uuid, student: Uuid) {
        let existing = [ActiveBooking {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            student_id: student,
            window: window("09:00", "10:00"),
        }];
        let candidate = BookingCandidate {
            teacher_id: teacher,
            student_id: student,
            window: window("09:45", "10:45"),
        };

        let conflict = classify_conflict(&candidate, &existing).expect("conflict expected");
        assert_eq!(conflict.kind, ConflictKind::StudentOverlap);
    }

    #[rstest]
    fn adjacent_windows_do_not_conflict(teacher: Uuid, student: Uuid) {
        let existing = [ActiveBooking {
            id: Uuid::new_v4(),
            teacher_id: teacher,
            student_id: student,
            window: window("09:00", "10:00"),
        }];
        let candidate = BookingCandidate {
            teacher_id: teacher,
            student_id: student,
            window: window("10:00", "11:00"),
        };

        assert_eq!(classify_conflict(&candidate, &existing), None);
    }
}
