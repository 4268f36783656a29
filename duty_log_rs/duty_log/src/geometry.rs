//! Time of day ↔ chart pixel mapping, gridline snapping and hit testing.
//!
//! Drawing and hit testing both go through [`ChartGeometry::segment_span`],
//! so a segment is hoverable exactly where it is drawn. A geometry is tied to
//! one canvas width; build a new one whenever the surface is resized.

use serde::{Deserialize, Serialize};

use crate::status::DutyStatus;
use crate::timeline::{DayTimeline, Segment, HOURS_PER_DAY};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartLayout {
    pub height: f64,
    pub row_height: f64,
    /// Left gutter holding the status labels; also the chart origin.
    pub label_width: f64,
    /// Right gutter holding the per-status totals.
    pub totals_width: f64,
    pub chart_top: f64,
    pub snap_threshold_h: f64,
    pub hit_tolerance_px: f64,
    pub transition_snap_px: f64,
    /// Canvas width used when the host reports none.
    pub fallback_width: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            height: 200.0,
            row_height: 40.0,
            label_width: 120.0,
            totals_width: 80.0,
            chart_top: 30.0,
            snap_threshold_h: 0.1,
            hit_tolerance_px: 10.0,
            transition_snap_px: 5.0,
            fallback_width: 800.0,
        }
    }
}

const SNAP_SLACK_MIN: f64 = 1e-9;

/// Linear map of `t` hours in `[0, 24]` onto `[origin_x, origin_x + width]`.
pub fn time_to_x(t: f64, origin_x: f64, width: f64) -> f64 {
    origin_x + (t / HOURS_PER_DAY) * width
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartGeometry {
    layout: ChartLayout,
    canvas_width: f64,
    origin_x: f64,
    width: f64,
}

/// The segment under the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit<'a> {
    pub index: usize,
    pub segment: &'a Segment,
    pub status: DutyStatus,
}

impl ChartGeometry {
    pub fn new(layout: ChartLayout, canvas_width: f64) -> Self {
        let canvas_width = if canvas_width.is_finite() && canvas_width > 0.0 {
            canvas_width
        } else {
            layout.fallback_width
        };
        let origin_x = layout.label_width;
        let width = (canvas_width - layout.label_width - layout.totals_width).max(0.0);
        Self {
            layout,
            canvas_width,
            origin_x,
            width,
        }
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    pub fn canvas_width(&self) -> f64 {
        self.canvas_width
    }

    pub fn canvas_height(&self) -> f64 {
        self.layout.height
    }

    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn time_to_x(&self, t: f64) -> f64 {
        time_to_x(t, self.origin_x, self.width)
    }

    /// Inverse of [`time_to_x`], clamped to the day.
    pub fn x_to_time(&self, x: f64) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        ((x - self.origin_x) / self.width * HOURS_PER_DAY).clamp(0.0, HOURS_PER_DAY)
    }

    pub fn gridline_x(&self, hour: u32) -> f64 {
        self.time_to_x(hour as f64)
    }

    pub fn gridlines(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        (0..=HOURS_PER_DAY as u32).map(move |h| (h, self.gridline_x(h)))
    }

    /// Pixel for a segment boundary at `t`: the hour gridline when `t` is
    /// within the snap threshold of a whole hour, the exact position otherwise.
    pub fn snapped_x(&self, t: f64) -> f64 {
        let hour = t.round();
        // compared in minutes so that boundaries exactly on the threshold snap
        let off_min = (t - hour).abs() * 60.0;
        if off_min <= self.layout.snap_threshold_h * 60.0 + SNAP_SLACK_MIN
            && (0.0..=HOURS_PER_DAY).contains(&hour)
        {
            self.gridline_x(hour as u32)
        } else {
            self.time_to_x(t)
        }
    }

    pub fn segment_span(&self, segment: &Segment) -> (f64, f64) {
        (self.snapped_x(segment.start), self.snapped_x(segment.end))
    }

    pub fn nearest_gridline_x(&self, x: f64) -> f64 {
        let hour = self.x_to_time(x).round();
        self.gridline_x(hour as u32)
    }

    pub fn row_top(&self, status: DutyStatus) -> f64 {
        self.layout.chart_top + status.row_index() as f64 * self.layout.row_height
    }

    /// The row's line; segments are drawn on it.
    pub fn row_baseline(&self, status: DutyStatus) -> f64 {
        self.row_top(status) + self.layout.row_height
    }

    pub fn grid_bottom(&self) -> f64 {
        self.layout.chart_top + DutyStatus::ALL.len() as f64 * self.layout.row_height
    }

    pub fn rows_at(&self, y: f64) -> impl Iterator<Item = DutyStatus> + '_ {
        DutyStatus::ALL
            .into_iter()
            .filter(move |s| (y - self.row_baseline(*s)).abs() <= self.layout.hit_tolerance_px)
    }

    /// Row whose baseline is closest to `y`, within the hit tolerance. Ties
    /// go to the upper row.
    pub fn nearest_row(&self, y: f64) -> Option<DutyStatus> {
        self.rows_at(y).fold(None, |best: Option<DutyStatus>, status| match best {
            Some(b)
                if (y - self.row_baseline(b)).abs() <= (y - self.row_baseline(status)).abs() =>
            {
                Some(b)
            }
            _ => Some(status),
        })
    }

    /// Segment under `(x, y)`. Segments are scanned in time order, so a
    /// boundary pixel shared by two segments belongs to the earlier one.
    pub fn hit_test<'d>(&self, x: f64, y: f64, day: &'d DayTimeline) -> Option<Hit<'d>> {
        let status = self.nearest_row(y)?;
        day.segments()
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.status == status && !segment.is_empty())
            .find(|(_, segment)| {
                let (start_x, end_x) = self.segment_span(segment);
                x >= start_x && x <= end_x
            })
            .map(|(index, segment)| Hit {
                index,
                segment,
                status,
            })
    }
}
