use std::fmt;

use serde::{Deserialize, Serialize};

/// Regulatory duty status. Declaration order is the chart row order.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum DutyStatus {
    #[default]
    OffDuty,
    SleeperBerth,
    Driving,
    OnDutyNotDriving,
}

impl DutyStatus {
    pub const ALL: [DutyStatus; 4] = [
        DutyStatus::OffDuty,
        DutyStatus::SleeperBerth,
        DutyStatus::Driving,
        DutyStatus::OnDutyNotDriving,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DutyStatus::OffDuty => "Off Duty",
            DutyStatus::SleeperBerth => "Sleeper Berth",
            DutyStatus::Driving => "Driving",
            DutyStatus::OnDutyNotDriving => "On Duty (not driving)",
        }
    }

    pub fn row_index(&self) -> usize {
        match self {
            DutyStatus::OffDuty => 0,
            DutyStatus::SleeperBerth => 1,
            DutyStatus::Driving => 2,
            DutyStatus::OnDutyNotDriving => 3,
        }
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Duty status for a recognised halt type token.
pub fn lookup(halt_type: &str) -> Option<DutyStatus> {
    match halt_type.trim() {
        "ON_DUTY_NOT_DRIVING" | "STOP" => Some(DutyStatus::OnDutyNotDriving),
        "DRIVE" => Some(DutyStatus::Driving),
        "BREAK" | "OFF_DUTY" => Some(DutyStatus::OffDuty),
        "SLEEPER" => Some(DutyStatus::SleeperBerth),
        _ => None,
    }
}

/// Map a planner halt type onto its duty status. Unknown tokens are off duty.
pub fn classify(halt_type: &str) -> DutyStatus {
    lookup(halt_type).unwrap_or_default()
}

/// Whether `classify` recognises the token rather than falling back.
pub fn is_known_halt_type(halt_type: &str) -> bool {
    lookup(halt_type).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_halt_types() {
        assert_eq!(classify("DRIVE"), DutyStatus::Driving);
        assert_eq!(classify("STOP"), DutyStatus::OnDutyNotDriving);
        assert_eq!(classify("ON_DUTY_NOT_DRIVING"), DutyStatus::OnDutyNotDriving);
        assert_eq!(classify("BREAK"), DutyStatus::OffDuty);
        assert_eq!(classify("OFF_DUTY"), DutyStatus::OffDuty);
        assert_eq!(classify("SLEEPER"), DutyStatus::SleeperBerth);
    }

    #[test]
    fn test_classify_defaults_to_off_duty() {
        assert_eq!(classify("FUEL"), DutyStatus::OffDuty);
        assert_eq!(classify(""), DutyStatus::OffDuty);
        assert_eq!(classify("drive"), DutyStatus::OffDuty);
        assert!(!is_known_halt_type("drive"));
        assert!(is_known_halt_type(" SLEEPER "));
    }

    #[test]
    fn test_known_tokens_agree_with_classify() {
        for token in ["ON_DUTY_NOT_DRIVING", "STOP", "DRIVE", "BREAK", "OFF_DUTY", "SLEEPER"] {
            assert!(is_known_halt_type(token));
            assert_eq!(lookup(token), Some(classify(token)));
        }
        assert_eq!(lookup("FUEL"), None);
        assert_eq!(DutyStatus::default(), DutyStatus::OffDuty);
    }

    #[test]
    fn test_row_order_matches_all() {
        for (idx, status) in DutyStatus::ALL.iter().enumerate() {
            assert_eq!(status.row_index(), idx);
        }
        assert_eq!(DutyStatus::OnDutyNotDriving.to_string(), "On Duty (not driving)");
    }
}
