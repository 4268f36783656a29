//! Folding an ordered route event list into gapless 24 hour day timelines.
//!
//! The builder is an explicit state machine over events: the active day
//! number, the day clock and the segments collected so far. Every closed day
//! is checked against the timeline invariant (sorted, contiguous, covering
//! exactly `[0, 24]`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hours::format_clock;
use crate::location::parse_location;
use crate::status::{classify, is_known_halt_type, DutyStatus};
use crate::{InputError, InvariantError, LogParams, RouteEvent};

pub const HOURS_PER_DAY: f64 = 24.0;
const MINUTES_PER_DAY: f64 = HOURS_PER_DAY * 60.0;
const INVARIANT_EPS: f64 = 1e-6;

/// A contiguous interval of one duty status within a day, in hours since
/// midnight.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub status: DutyStatus,
    pub description: String,
    pub location_name: String,
}

impl Segment {
    pub fn duration_h(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Remark {
    pub start: String,
    pub description: String,
    pub location: String,
}

impl fmt::Display for Remark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} at {}", self.start, self.description, self.location)
    }
}

/// One day of the log. Only the builder constructs these, so the segment
/// list always covers the full day.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DayTimeline {
    day: u32,
    segments: Vec<Segment>,
}

impl DayTimeline {
    fn closed(day: u32, segments: Vec<Segment>) -> Self {
        let timeline = Self { day, segments };
        // checked in release builds too; a broken day must never reach a caller
        if let Err(err) = timeline.validate() {
            panic!("builder emitted an inconsistent timeline: {err}");
        }
        timeline
    }

    /// 1-based trip day number.
    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn validate(&self) -> Result<(), InvariantError> {
        let day = self.day;
        let first = self
            .segments
            .first()
            .ok_or(InvariantError::Empty { day })?;
        if first.start.abs() > INVARIANT_EPS {
            return Err(InvariantError::StartsLate {
                day,
                start: first.start,
            });
        }
        for (index, segment) in self.segments.iter().enumerate() {
            if segment.end < segment.start {
                return Err(InvariantError::Reversed { day, index });
            }
        }
        for (index, pair) in self.segments.windows(2).enumerate() {
            if (pair[0].end - pair[1].start).abs() > INVARIANT_EPS {
                return Err(InvariantError::Gap {
                    day,
                    index,
                    end: pair[0].end,
                    next_start: pair[1].start,
                });
            }
        }
        let last_end = self.segments[self.segments.len() - 1].end;
        if (last_end - HOURS_PER_DAY).abs() > INVARIANT_EPS {
            return Err(InvariantError::EndsEarly { day, end: last_end });
        }
        Ok(())
    }

    /// Log sheet remarks: every segment whose location is actually known.
    pub fn remarks(&self, placeholder: &str) -> Vec<Remark> {
        self.segments
            .iter()
            .filter(|s| !s.location_name.is_empty() && s.location_name != placeholder)
            .map(|s| Remark {
                start: format_clock(s.start),
                description: s.description.clone(),
                location: s.location_name.clone(),
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildDiagnostics {
    pub events: usize,
    pub unrecognized_halt_types: Vec<String>,
    pub backfilled_days: Vec<u32>,
    pub truncated_events: usize,
    pub truncated_hours: f64,
}

impl BuildDiagnostics {
    fn note_unrecognized(&mut self, halt_type: &str) {
        if !self.unrecognized_halt_types.iter().any(|h| h == halt_type) {
            self.unrecognized_halt_types.push(halt_type.to_string());
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct DutyLog {
    pub days: Vec<DayTimeline>,
    pub diagnostics: BuildDiagnostics,
}

impl DutyLog {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, day: u32) -> Option<&DayTimeline> {
        self.days.iter().find(|d| d.day == day)
    }
}

/// Reject inputs the fold cannot account for. Runs before any segment is
/// produced so a failed build has no partial output.
pub fn validate_events(events: &[RouteEvent]) -> Result<(), InputError> {
    let mut previous_day = 0u32;
    for (index, event) in events.iter().enumerate() {
        if event.day == 0 {
            return Err(InputError::DayZero { index });
        }
        if !event.duration_minutes.is_finite() {
            return Err(InputError::NonFiniteDuration { index });
        }
        if event.duration_minutes < 0.0 {
            return Err(InputError::NegativeDuration {
                index,
                minutes: event.duration_minutes,
            });
        }
        if event.day < previous_day {
            return Err(InputError::DecreasingDay {
                index,
                day: event.day,
                previous: previous_day,
            });
        }
        previous_day = event.day;
    }
    Ok(())
}

#[derive(Clone, Debug, Default)]
pub struct TimelineBuilder {
    params: LogParams,
}

impl TimelineBuilder {
    pub fn new(params: LogParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LogParams {
        &self.params
    }

    pub fn build(&self, events: &[RouteEvent]) -> Result<DutyLog, InputError> {
        validate_events(events)?;
        let Some(last_index) = events.len().checked_sub(1) else {
            return Ok(DutyLog::default());
        };

        let state = events
            .iter()
            .enumerate()
            .fold(FoldState::new(&self.params), |state, (index, event)| {
                state.advance(event, index == last_index)
            });
        Ok(state.finish())
    }
}

/// `{day, clock, segments}` plus what has been emitted so far. The clock is
/// kept in minutes so that boundaries of whole-minute events stay exact.
struct FoldState<'p> {
    params: &'p LogParams,
    day: u32,
    clock_min: f64,
    segments: Vec<Segment>,
    last_location: Option<String>,
    days: Vec<DayTimeline>,
    diagnostics: BuildDiagnostics,
}

impl<'p> FoldState<'p> {
    fn new(params: &'p LogParams) -> Self {
        Self {
            params,
            day: 1,
            clock_min: 0.0,
            segments: Vec::new(),
            last_location: None,
            days: Vec::new(),
            diagnostics: BuildDiagnostics::default(),
        }
    }

    fn clock_h(&self) -> f64 {
        self.clock_min / 60.0
    }

    fn advance(mut self, event: &RouteEvent, is_last: bool) -> Self {
        self.diagnostics.events += 1;
        if !is_known_halt_type(&event.halt_type) {
            self.diagnostics.note_unrecognized(&event.halt_type);
        }

        if event.day > self.day {
            self.roll_to(event.day);
        }

        let location = parse_location(event.location.as_deref(), &self.params.unknown_location);
        let start_min = self.clock_min;
        let mut end_min = start_min + event.duration_minutes;
        if end_min > MINUTES_PER_DAY {
            // no mid-event split: the overflow is dropped from the declared day
            self.diagnostics.truncated_events += 1;
            self.diagnostics.truncated_hours += (end_min - MINUTES_PER_DAY) / 60.0;
            end_min = MINUTES_PER_DAY;
        }

        self.segments.push(Segment {
            start: start_min / 60.0,
            end: end_min / 60.0,
            status: classify(&event.halt_type),
            description: event.description.clone(),
            location_name: location.name.clone(),
        });
        self.clock_min = end_min;
        if event.location.as_deref().is_some_and(|text| !text.is_empty()) {
            self.last_location = Some(location.name);
        }

        if self.clock_min >= MINUTES_PER_DAY && !is_last {
            let next = self.day + 1;
            self.roll_to(next);
        }
        self
    }

    /// Close the active day, backfill any skipped days and open `target`.
    fn roll_to(&mut self, target: u32) {
        self.close_day();
        for day in (self.day + 1)..target {
            self.push_idle_day(day);
        }
        self.day = target;
        self.clock_min = 0.0;
    }

    fn close_day(&mut self) {
        if self.segments.is_empty() {
            self.push_idle_day(self.day);
            return;
        }
        let mut segments = std::mem::take(&mut self.segments);
        if self.clock_min < MINUTES_PER_DAY {
            segments.push(Segment {
                start: self.clock_h(),
                end: HOURS_PER_DAY,
                status: DutyStatus::OffDuty,
                description: self.params.end_of_day_description.clone(),
                location_name: self.known_location(),
            });
        }
        self.days.push(DayTimeline::closed(self.day, segments));
    }

    fn push_idle_day(&mut self, day: u32) {
        let segment = Segment {
            start: 0.0,
            end: HOURS_PER_DAY,
            status: DutyStatus::OffDuty,
            description: self.params.idle_day_description.clone(),
            location_name: self.known_location(),
        };
        self.diagnostics.backfilled_days.push(day);
        self.days.push(DayTimeline::closed(day, vec![segment]));
    }

    fn known_location(&self) -> String {
        self.last_location
            .clone()
            .unwrap_or_else(|| self.params.unknown_location.clone())
    }

    fn finish(mut self) -> DutyLog {
        self.close_day();
        DutyLog {
            days: self.days,
            diagnostics: self.diagnostics,
        }
    }
}

/// Build day timelines with default parameters.
pub fn build_timelines(events: &[RouteEvent]) -> Result<Vec<DayTimeline>, InputError> {
    TimelineBuilder::default().build(events).map(|log| log.days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(day: &DayTimeline) -> Vec<(f64, f64, DutyStatus)> {
        day.segments()
            .iter()
            .map(|s| (s.start, s.end, s.status))
            .collect()
    }

    #[test]
    fn test_single_day_gets_trailing_off_duty() {
        let events = vec![
            RouteEvent::new(1, 60.0, "ON_DUTY_NOT_DRIVING"),
            RouteEvent::new(1, 240.0, "DRIVE"),
        ];
        let days = build_timelines(&events).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(
            hours(&days[0]),
            vec![
                (0.0, 1.0, DutyStatus::OnDutyNotDriving),
                (1.0, 5.0, DutyStatus::Driving),
                (5.0, 24.0, DutyStatus::OffDuty),
            ]
        );
        assert_eq!(days[0].segments()[2].description, "End of the day");
    }

    #[test]
    fn test_filler_uses_completed_day_location() {
        let events = vec![
            RouteEvent::new(1, 300.0, "DRIVE").with_location("Omaha, NE (41.2565, -95.9345)"),
            RouteEvent::new(2, 120.0, "DRIVE").with_location("Lincoln, NE (40.8136, -96.7026)"),
        ];
        let days = build_timelines(&events).unwrap();
        let filler = days[0].segments().last().unwrap();
        assert_eq!(filler.location_name, "Omaha, NE");
        assert_eq!(days[1].segments()[0].location_name, "Lincoln, NE");
    }

    #[test]
    fn test_full_day_rolls_over_without_filler() {
        let events = vec![
            RouteEvent::new(1, 600.0, "DRIVE"),
            RouteEvent::new(1, 840.0, "SLEEPER"),
            RouteEvent::new(2, 60.0, "DRIVE"),
        ];
        let days = build_timelines(&events).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].segments().len(), 2);
        assert_eq!(days[0].segments()[1].end, 24.0);
        assert_eq!(days[1].day(), 2);
        assert_eq!(days[1].segments()[0].start, 0.0);
    }

    #[test]
    fn test_rollover_keeps_stale_day_on_active_day() {
        // day 1 is full, so the next event lands on day 2 even though it
        // still declares day 1
        let events = vec![
            RouteEvent::new(1, 1440.0, "OFF_DUTY"),
            RouteEvent::new(1, 30.0, "DRIVE"),
        ];
        let days = build_timelines(&events).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[1].day(), 2);
        assert_eq!(days[1].segments()[0].status, DutyStatus::Driving);
        assert_eq!(days[1].segments()[0].end, 0.5);
    }

    #[test]
    fn test_skipped_days_are_backfilled() {
        let events = vec![
            RouteEvent::new(1, 60.0, "DRIVE").with_location("Reno, NV (39.5296, -119.8138)"),
            RouteEvent::new(4, 60.0, "DRIVE"),
        ];
        let log = TimelineBuilder::default().build(&events).unwrap();
        let numbers: Vec<u32> = log.days.iter().map(|d| d.day()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(log.diagnostics.backfilled_days, vec![2, 3]);
        for idle in &log.days[1..3] {
            assert_eq!(hours(idle), vec![(0.0, 24.0, DutyStatus::OffDuty)]);
            assert_eq!(idle.segments()[0].location_name, "Reno, NV");
        }
    }

    #[test]
    fn test_first_event_after_day_one_backfills_from_day_one() {
        let events = vec![RouteEvent::new(2, 60.0, "DRIVE")];
        let log = TimelineBuilder::default().build(&events).unwrap();
        assert_eq!(log.days.len(), 2);
        assert_eq!(log.diagnostics.backfilled_days, vec![1]);
        assert_eq!(log.days[0].segments()[0].location_name, "Unknown Location");
    }

    #[test]
    fn test_zero_duration_events_keep_clock() {
        let events = vec![
            RouteEvent::new(1, 0.0, "STOP"),
            RouteEvent::new(1, 90.0, "DRIVE"),
            RouteEvent::new(1, 0.0, "STOP"),
        ];
        let days = build_timelines(&events).unwrap();
        assert_eq!(
            hours(&days[0]),
            vec![
                (0.0, 0.0, DutyStatus::OnDutyNotDriving),
                (0.0, 1.5, DutyStatus::Driving),
                (1.5, 1.5, DutyStatus::OnDutyNotDriving),
                (1.5, 24.0, DutyStatus::OffDuty),
            ]
        );
        assert!(days[0].validate().is_ok());
    }

    #[test]
    fn test_overflowing_event_is_clamped_and_reported() {
        let events = vec![
            RouteEvent::new(1, 1200.0, "DRIVE"),
            RouteEvent::new(1, 300.0, "ON_DUTY_NOT_DRIVING"),
        ];
        let log = TimelineBuilder::default().build(&events).unwrap();
        assert_eq!(log.days.len(), 1);
        let last = log.days[0].segments().last().unwrap();
        assert_eq!((last.start, last.end), (20.0, 24.0));
        assert_eq!(log.diagnostics.truncated_events, 1);
        assert!((log.diagnostics.truncated_hours - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_input_errors() {
        let negative = vec![RouteEvent::new(1, -5.0, "DRIVE")];
        assert!(matches!(
            build_timelines(&negative),
            Err(InputError::NegativeDuration { index: 0, .. })
        ));

        let decreasing = vec![
            RouteEvent::new(2, 10.0, "DRIVE"),
            RouteEvent::new(1, 10.0, "DRIVE"),
        ];
        assert!(matches!(
            build_timelines(&decreasing),
            Err(InputError::DecreasingDay {
                index: 1,
                day: 1,
                previous: 2
            })
        ));

        let zero_day = vec![RouteEvent::new(0, 10.0, "DRIVE")];
        assert!(matches!(
            build_timelines(&zero_day),
            Err(InputError::DayZero { index: 0 })
        ));

        let nan = vec![RouteEvent::new(1, f64::NAN, "DRIVE")];
        assert!(matches!(
            build_timelines(&nan),
            Err(InputError::NonFiniteDuration { index: 0 })
        ));
    }

    #[test]
    fn test_unrecognized_halt_types_are_listed_once() {
        let events = vec![
            RouteEvent::new(1, 30.0, "FUEL"),
            RouteEvent::new(1, 30.0, "FUEL"),
            RouteEvent::new(1, 30.0, "DRIVE"),
        ];
        let log = TimelineBuilder::default().build(&events).unwrap();
        assert_eq!(log.diagnostics.unrecognized_halt_types, vec!["FUEL".to_string()]);
        assert_eq!(log.days[0].segments()[0].status, DutyStatus::OffDuty);
        assert_eq!(log.diagnostics.events, 3);
    }

    #[test]
    fn test_remarks_skip_unknown_locations() {
        let events = vec![
            RouteEvent::new(1, 90.0, "DRIVE")
                .with_location("Boise, ID (43.6150, -116.2023)")
                .with_description("Drive to fuel stop"),
            RouteEvent::new(1, 30.0, "STOP").with_description("Fueling"),
        ];
        let params = LogParams::default();
        let days = TimelineBuilder::new(params.clone()).build(&events).unwrap().days;
        let remarks = days[0].remarks(&params.unknown_location);
        // the fuel stop has no location; the end-of-day filler inherits Boise
        assert_eq!(remarks.len(), 2);
        assert_eq!(remarks[0].start, "00:00");
        assert_eq!(remarks[0].location, "Boise, ID");
        assert_eq!(remarks[1].start, "02:00");
        assert_eq!(remarks[1].description, "End of the day");
        assert_eq!(remarks[0].to_string(), "00:00: Drive to fuel stop at Boise, ID");
    }

    #[test]
    fn test_validate_reports_gaps() {
        let broken = DayTimeline {
            day: 3,
            segments: vec![
                Segment {
                    start: 0.0,
                    end: 2.0,
                    status: DutyStatus::Driving,
                    description: String::new(),
                    location_name: String::new(),
                },
                Segment {
                    start: 3.0,
                    end: 24.0,
                    status: DutyStatus::OffDuty,
                    description: String::new(),
                    location_name: String::new(),
                },
            ],
        };
        assert!(matches!(
            broken.validate(),
            Err(InvariantError::Gap { day: 3, index: 0, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "inconsistent timeline")]
    fn test_closing_a_short_day_panics() {
        let segment = Segment {
            start: 0.0,
            end: 20.0,
            status: DutyStatus::Driving,
            description: String::new(),
            location_name: String::new(),
        };
        DayTimeline::closed(1, vec![segment]);
    }
}
