//! Appointment status machine.
//!
//! ```text
//!  scheduled --confirm/checkin--> confirmed --start--> in_progress --complete--> completed
//!      |                              |
//!      +--------cancel/no_show--------+--> cancelled | no_show
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

/// Actions that move an appointment between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Confirm,
    CheckIn,
    Start,
    Complete,
    Cancel,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "confirmed" => Some(Self::Confirmed),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    /// No further transitions leave a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Details (time, staff, price) may only change before the visit starts.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }

    /// Whether the appointment still occupies its slot.
    pub fn blocks_slot(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed | Self::InProgress)
    }

    /// Apply an action, returning the next state or `None` if illegal.
    pub fn apply(self, action: StatusAction) -> Option<Self> {
        use AppointmentStatus::*;
        use StatusAction as A;

        match (self, action) {
            (Scheduled, A::Confirm) => Some(Confirmed),
            (Scheduled | Confirmed, A::CheckIn) => Some(Confirmed),
            (Confirmed, A::Start) => Some(InProgress),
            (InProgress, A::Complete) => Some(Completed),
            (Scheduled | Confirmed, A::Cancel) => Some(Cancelled),
            (Scheduled | Confirmed, A::NoShow) => Some(NoShow),
            _ => None,
        }
    }

    /// Actions available from this state, in display order.
    pub fn available_actions(self) -> Vec<StatusAction> {
        StatusAction::ALL
            .into_iter()
            .filter(|action| self.apply(*action).is_some())
            .collect()
    }
}

impl StatusAction {
    pub const ALL: [StatusAction; 6] = [
        Self::Confirm,
        Self::CheckIn,
        Self::Start,
        Self::Complete,
        Self::Cancel,
        Self::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::CheckIn => "checkin",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::NoShow => "no-show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use AppointmentStatus::*;

    #[test_case(Scheduled, StatusAction::Confirm, Some(Confirmed))]
    #[test_case(Scheduled, StatusAction::CheckIn, Some(Confirmed))]
    #[test_case(Confirmed, StatusAction::CheckIn, Some(Confirmed))]
    #[test_case(Confirmed, StatusAction::Start, Some(InProgress))]
    #[test_case(Scheduled, StatusAction::Start, None ; "cannot start before check in")]
    #[test_case(InProgress, StatusAction::Complete, Some(Completed))]
    #[test_case(Confirmed, StatusAction::Complete, None ; "cannot complete unstarted")]
    #[test_case(InProgress, StatusAction::Cancel, None ; "cannot cancel in progress")]
    #[test_case(Completed, StatusAction::Cancel, None ; "completed is final")]
    #[test_case(Cancelled, StatusAction::Confirm, None ; "cancelled is final")]
    #[test_case(Confirmed, StatusAction::NoShow, Some(NoShow))]
    fn test_transitions(from: AppointmentStatus, action: StatusAction, expected: Option<AppointmentStatus>) {
        assert_eq!(from.apply(action), expected);
    }

    #[test]
    fn test_terminal_states_have_no_actions() {
        for status in AppointmentStatus::ALL {
            if status.is_terminal() {
                assert!(status.available_actions().is_empty(), "{} has actions", status);
            } else {
                assert!(!status.available_actions().is_empty(), "{} has none", status);
            }
        }
    }

    #[test]
    fn test_available_actions_for_scheduled() {
        assert_eq!(
            Scheduled.available_actions(),
            vec![
                StatusAction::Confirm,
                StatusAction::CheckIn,
                StatusAction::Cancel,
                StatusAction::NoShow
            ]
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("pending"), None);
    }

    #[test]
    fn test_editable_and_blocking() {
        assert!(Scheduled.is_editable());
        assert!(!InProgress.is_editable());
        assert!(InProgress.blocks_slot());
        assert!(!Cancelled.blocks_slot());
    }
}
