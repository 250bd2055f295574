//! Per-person, per-day, per-slot availability declarations.
//!
//! Availability is advisory input for discovery queries; the booking write
//! path never consults it. Slot values arrive from heterogeneous clients as
//! booleans, 0/1 integers, or a small string vocabulary, and unrecognized
//! values are ignored rather than rejected.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use super::booking::SessionWindow;

/// Which availability table a person belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A teacher delivering sessions.
    Teacher,
    /// A student attending sessions.
    Student,
}

impl Role {
    /// Stable name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed thirds of a day a person can declare themselves available for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSlot {
    /// Before 12:00.
    Morning,
    /// 12:00 to 18:00.
    Afternoon,
    /// From 18:00.
    Evening,
}

/// Noon boundary between the morning and afternoon slots.
fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Six-o'clock boundary between the afternoon and evening slots.
fn six_pm() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// The slots a session window touches, in day order.
///
/// Used by discovery queries to translate a requested window into required
/// availability slots.
///
/// # Examples
/// ```
/// use backend::domain::{SessionWindow, TimeSlot, slots_spanning};
///
/// let window = SessionWindow::parse("11:00", "13:00").expect("valid window");
/// assert_eq!(
///     slots_spanning(window),
///     vec![TimeSlot::Morning, TimeSlot::Afternoon]
/// );
/// ```
pub fn slots_spanning(window: SessionWindow) -> Vec<TimeSlot> {
    let mut slots = Vec::with_capacity(3);
    if window.start() < noon() {
        slots.push(TimeSlot::Morning);
    }
    if window.start() < six_pm() && window.end() > noon() {
        slots.push(TimeSlot::Afternoon);
    }
    if window.end() > six_pm() {
        slots.push(TimeSlot::Evening);
    }
    slots
}

/// One person's declared availability for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAvailability {
    /// The day this declaration covers.
    pub day: NaiveDate,
    /// Available before 12:00.
    pub morning: bool,
    /// Available 12:00 to 18:00.
    pub afternoon: bool,
    /// Available from 18:00.
    pub evening: bool,
}

impl DayAvailability {
    /// A day with every slot declared unavailable.
    pub fn closed(day: NaiveDate) -> Self {
        Self {
            day,
            morning: false,
            afternoon: false,
            evening: false,
        }
    }

    /// Whether any slot remains available.
    ///
    /// Days where this is false are deleted from storage instead of being
    /// kept as all-false rows.
    pub fn has_any_slot(self) -> bool {
        self.morning || self.afternoon || self.evening
    }

    /// Whether the named slot is available.
    pub fn covers(self, slot: TimeSlot) -> bool {
        match slot {
            TimeSlot::Morning => self.morning,
            TimeSlot::Afternoon => self.afternoon,
            TimeSlot::Evening => self.evening,
        }
    }
}

/// Raw slot value as supplied by a client payload.
///
/// Deserialized untagged so booleans, numbers, and strings all land here
/// without the caller having to pick a shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SlotInput {
    /// A literal boolean.
    Flag(bool),
    /// A numeric flag; only 0 and 1 are recognized.
    Number(i64),
    /// A vocabulary word such as `available` or `no`.
    Text(String),
}

/// Normalize a raw slot value to a stored boolean.
///
/// Returns `None` for unrecognized values, which callers must treat as "leave
/// the slot untouched" rather than as an error.
///
/// # Examples
/// ```
/// use backend::domain::{SlotInput, normalize_slot};
///
/// assert_eq!(normalize_slot(&SlotInput::Flag(true)), Some(true));
/// assert_eq!(normalize_slot(&SlotInput::Number(1)), Some(true));
/// assert_eq!(normalize_slot(&SlotInput::Text("available".into())), Some(true));
/// assert_eq!(normalize_slot(&SlotInput::Text("unspecified".into())), None);
/// ```
pub fn normalize_slot(input: &SlotInput) -> Option<bool> {
    match input {
        SlotInput::Flag(value) => Some(*value),
        SlotInput::Number(1) => Some(true),
        SlotInput::Number(0) => Some(false),
        SlotInput::Number(_) => None,
        SlotInput::Text(word) => match word.trim().to_ascii_lowercase().as_str() {
            "available" | "yes" | "true" | "y" | "1" => Some(true),
            "unavailable" | "no" | "false" | "n" | "0" => Some(false),
            _ => None,
        },
    }
}

/// One day's worth of requested slot changes.
///
/// `None` slots were not supplied at all; `Some` slots still pass through
/// [`normalize_slot`], so unrecognized values degrade to "untouched" too.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DayAvailabilityUpdate {
    /// The day being updated.
    pub day: NaiveDate,
    /// Requested morning value.
    #[serde(default)]
    pub morning: Option<SlotInput>,
    /// Requested afternoon value.
    #[serde(default)]
    pub afternoon: Option<SlotInput>,
    /// Requested evening value.
    #[serde(default)]
    pub evening: Option<SlotInput>,
}

impl DayAvailabilityUpdate {
    /// Apply the recognized slots over `current`, leaving the rest untouched.
    pub fn resolve_over(&self, current: DayAvailability) -> DayAvailability {
        let apply = |requested: Option<&SlotInput>, current_value: bool| {
            requested
                .and_then(normalize_slot)
                .unwrap_or(current_value)
        };

        DayAvailability {
            day: self.day,
            morning: apply(self.morning.as_ref(), current.morning),
            afternoon: apply(self.afternoon.as_ref(), current.afternoon),
            evening: apply(self.evening.as_ref(), current.evening),
        }
    }

    /// Whether any supplied slot value was actually recognized.
    pub fn has_recognized_slot(&self) -> bool {
        [&self.morning, &self.afternoon, &self.evening]
            .into_iter()
            .flatten()
            .any(|input| normalize_slot(input).is_some())
    }
}

/// Selector naming the slots a clear operation should switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSelector {
    /// Clear the morning slot.
    pub morning: bool,
    /// Clear the afternoon slot.
    pub afternoon: bool,
    /// Clear the evening slot.
    pub evening: bool,
}

impl SlotSelector {
    /// Selector covering all three slots.
    pub fn all() -> Self {
        Self {
            morning: true,
            afternoon: true,
            evening: true,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use chrono::NaiveDate;
    use rstest::rstest;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid test date")
    }

    #[rstest]
    #[case(SlotInput::Flag(true), Some(true))]
    #[case(SlotInput::Flag(false), Some(false))]
    #[case(SlotInput::Number(1), Some(true))]
    #[case(SlotInput::Number(0), Some(false))]
    #[case(SlotInput::Number(7), None)]
    #[case(SlotInput::Text("available".into()), Some(true))]
    #[case(SlotInput::Text("  YES ".into()), Some(true))]
    #[case(SlotInput::Text("unavailable".into()), Some(false))]
    #[case(SlotInput::Text("no".into()), Some(false))]
    #[case(SlotInput::Text("unspecified".into()), None)]
    #[case(SlotInput::Text(String::new()), None)]
    fn slot_values_normalize_per_vocabulary(
        #[case] input: SlotInput,
        #[case] expected: Option<bool>,
    ) {
        assert_eq!(normalize_slot(&input), expected);
    }

    #[rstest]
    fn truthy_forms_converge_on_one_stored_value() {
        let forms = [
            SlotInput::Flag(true),
            SlotInput::Number(1),
            SlotInput::Text("available".into()),
        ];
        for form in &forms {
            assert_eq!(normalize_slot(form), Some(true));
        }
    }

    #[rstest]
    fn unrecognized_values_leave_slots_untouched() {
        let current = DayAvailability {
            day: day(),
            morning: true,
            afternoon: false,
            evening: true,
        };
        let update = DayAvailabilityUpdate {
            day: day(),
            morning: Some(SlotInput::Text("unspecified".into())),
            afternoon: Some(SlotInput::Flag(true)),
            evening: None,
        };

        let resolved = update.resolve_over(current);
        assert!(resolved.morning, "unrecognized value must not clear morning");
        assert!(resolved.afternoon);
        assert!(resolved.evening);
    }

    #[rstest]
    fn all_false_days_report_no_remaining_slot() {
        assert!(!DayAvailability::closed(day()).has_any_slot());
        let open = DayAvailability {
            evening: true,
            ..DayAvailability::closed(day())
        };
        assert!(open.has_any_slot());
    }

    #[rstest]
    #[case("08:00", "09:00", vec![TimeSlot::Morning])]
    #[case("13:00", "14:00", vec![TimeSlot::Afternoon])]
    #[case("19:00", "20:00", vec![TimeSlot::Evening])]
    #[case("11:30", "12:30", vec![TimeSlot::Morning, TimeSlot::Afternoon])]
    #[case("09:00", "19:00", vec![TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Evening])]
    #[case("12:00", "18:00", vec![TimeSlot::Afternoon])]
    fn windows_map_onto_the_slots_they_touch(
        #[case] start: &str,
        #[case] end: &str,
        #[case] expected: Vec<TimeSlot>,
    ) {
        let window = SessionWindow::parse(start, end).expect("valid test window");
        assert_eq!(slots_spanning(window), expected);
    }
}
