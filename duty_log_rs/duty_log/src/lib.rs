//! Duty-status timeline engine for a driver's daily log sheet.
//!
//! Route events from the trip planner are folded into one gapless 24 hour
//! timeline per day, summed per duty status and laid out as a log sheet
//! chart that both the CLI and the web front-end draw.

pub mod chart;
pub mod event;
pub mod geometry;
pub mod hours;
pub mod location;
pub mod status;
pub mod timeline;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use chart::{build_day_scene, build_scene, status_color, Primitive, Rgba, Scene, TextAnchor};
pub use event::{RouteEvent, TripDocument, TripPlan};
pub use geometry::{time_to_x, ChartGeometry, ChartLayout, Hit};
pub use hours::{aggregate, format_clock, format_duration, StatusTotals};
pub use location::{parse_location, ParsedLocation};
pub use status::{classify, DutyStatus};
pub use timeline::{
    build_timelines, validate_events, BuildDiagnostics, DayTimeline, DutyLog, Remark, Segment,
    TimelineBuilder, HOURS_PER_DAY,
};

/// Route events the timeline fold refuses to interpret.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("event {index}: day numbers start at 1")]
    DayZero { index: usize },
    #[error("event {index}: duration is not a finite number")]
    NonFiniteDuration { index: usize },
    #[error("event {index}: negative duration ({minutes} min)")]
    NegativeDuration { index: usize, minutes: f64 },
    #[error("event {index}: day {day} comes after day {previous}")]
    DecreasingDay { index: usize, day: u32, previous: u32 },
}

/// A closed day that does not cover `[0, 24]` exactly once.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantError {
    #[error("day {day} has no segments")]
    Empty { day: u32 },
    #[error("day {day} starts at {start}h instead of midnight")]
    StartsLate { day: u32, start: f64 },
    #[error("day {day}: segment {index} ends before it starts")]
    Reversed { day: u32, index: usize },
    #[error("day {day}: segment {index} ends at {end}h but the next starts at {next_start}h")]
    Gap {
        day: u32,
        index: usize,
        end: f64,
        next_start: f64,
    },
    #[error("day {day} ends at {end}h instead of 24h")]
    EndsEarly { day: u32, end: f64 },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogParams {
    /// Location name used when an event carries none.
    pub unknown_location: String,
    pub end_of_day_description: String,
    /// Description of the off-duty filler for days with no events.
    pub idle_day_description: String,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            unknown_location: "Unknown Location".to_string(),
            end_of_day_description: "End of the day".to_string(),
            idle_day_description: "Off duty (no activity)".to_string(),
        }
    }
}

/// Build the full log for a list of route events.
pub fn build_log(events: &[RouteEvent], params: &LogParams) -> Result<DutyLog, InputError> {
    TimelineBuilder::new(params.clone()).build(events)
}

/// Per-day status totals in day order.
pub fn daily_totals(log: &DutyLog) -> Vec<(u32, StatusTotals)> {
    log.days.iter().map(|d| (d.day(), aggregate(d))).collect()
}
