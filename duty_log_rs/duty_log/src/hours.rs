use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::DutyStatus;
use crate::timeline::DayTimeline;

/// Hours per duty status for one day. All four statuses are always present.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusTotals {
    pub off_duty: f64,
    pub sleeper_berth: f64,
    pub driving: f64,
    pub on_duty_not_driving: f64,
}

impl StatusTotals {
    pub fn hours(&self, status: DutyStatus) -> f64 {
        match status {
            DutyStatus::OffDuty => self.off_duty,
            DutyStatus::SleeperBerth => self.sleeper_berth,
            DutyStatus::Driving => self.driving,
            DutyStatus::OnDutyNotDriving => self.on_duty_not_driving,
        }
    }

    fn slot_mut(&mut self, status: DutyStatus) -> &mut f64 {
        match status {
            DutyStatus::OffDuty => &mut self.off_duty,
            DutyStatus::SleeperBerth => &mut self.sleeper_berth,
            DutyStatus::Driving => &mut self.driving,
            DutyStatus::OnDutyNotDriving => &mut self.on_duty_not_driving,
        }
    }

    pub fn total(&self) -> f64 {
        DutyStatus::ALL.iter().map(|s| self.hours(*s)).sum()
    }

    pub fn clock(&self, status: DutyStatus) -> String {
        format_clock(self.hours(status))
    }

    /// Status → `"HH:MM"`, in chart row order.
    pub fn clock_map(&self) -> BTreeMap<DutyStatus, String> {
        DutyStatus::ALL
            .iter()
            .map(|s| (*s, self.clock(*s)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DutyStatus, f64)> + '_ {
        DutyStatus::ALL.iter().map(move |s| (*s, self.hours(*s)))
    }
}

pub fn aggregate(day: &DayTimeline) -> StatusTotals {
    let mut totals = StatusTotals::default();
    for segment in day.segments() {
        *totals.slot_mut(segment.status) += segment.duration_h();
    }
    totals
}

fn split_hours(hours: f64) -> (u64, u64) {
    let value = if hours.is_finite() { hours.max(0.0) } else { 0.0 };
    let mut whole = value.floor();
    let mut minutes = ((value - whole) * 60.0).round();
    if minutes >= 60.0 {
        whole += 1.0;
        minutes -= 60.0;
    }
    (whole as u64, minutes as u64)
}

/// `"HH:MM"`; minutes that round up to 60 carry into the hour.
pub fn format_clock(hours: f64) -> String {
    let (h, m) = split_hours(hours);
    format!("{h:02}:{m:02}")
}

/// Tooltip duration, `"Xh Ym"`.
pub fn format_duration(hours: f64) -> String {
    let (h, m) = split_hours(hours);
    format!("{h}h {m}m")
}
