//! Log sheet chart as a backend-neutral display list.
//!
//! [`build_scene`] lays out one day in pixel space using [`ChartGeometry`]
//! and returns primitives; the CLI draws them with plotters and the web
//! front-end turns them into SVG nodes. Nothing here decides what a segment
//! means, it only places what the timeline and totals already say.

use serde::{Deserialize, Serialize};

use crate::geometry::ChartGeometry;
use crate::hours::{aggregate, format_duration, StatusTotals};
use crate::status::DutyStatus;
use crate::timeline::{DayTimeline, Segment};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

pub const BACKGROUND: Rgba = Rgba::rgb(17, 24, 39);
pub const TEXT: Rgba = Rgba::rgb(209, 213, 219);
pub const GRID: Rgba = Rgba::rgb(255, 255, 255).with_alpha(0.2);
pub const MARKER: Rgba = Rgba::rgb(255, 255, 255);
pub const TOOLTIP_FILL: Rgba = Rgba::rgb(0, 0, 0).with_alpha(0.8);

pub fn status_color(status: DutyStatus) -> Rgba {
    match status {
        DutyStatus::OffDuty => Rgba::rgb(220, 38, 38),
        DutyStatus::SleeperBerth => Rgba::rgb(37, 99, 235),
        DutyStatus::Driving => Rgba::rgb(202, 138, 4),
        DutyStatus::OnDutyNotDriving => Rgba::rgb(234, 88, 12),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// Text is positioned by its baseline.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Line {
        from: (f64, f64),
        to: (f64, f64),
        color: Rgba,
        width: f64,
    },
    Text {
        at: (f64, f64),
        text: String,
        size: f64,
        anchor: TextAnchor,
        color: Rgba,
    },
    Rect {
        upper_left: (f64, f64),
        lower_right: (f64, f64),
        fill: Rgba,
    },
    Triangle {
        points: [(f64, f64); 3],
        fill: Rgba,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub background: Rgba,
    pub primitives: Vec<Primitive>,
}

impl Scene {
    fn new(geometry: &ChartGeometry) -> Self {
        Self {
            width: geometry.canvas_width(),
            height: geometry.canvas_height(),
            background: BACKGROUND,
            primitives: Vec::new(),
        }
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgba, width: f64) {
        self.primitives.push(Primitive::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn text(&mut self, at: (f64, f64), text: String, size: f64, anchor: TextAnchor, color: Rgba) {
        self.primitives.push(Primitive::Text {
            at,
            text,
            size,
            anchor,
            color,
        });
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

const LABEL_FONT: f64 = 12.0;
const MARKER_FONT: f64 = 10.0;
const SEGMENT_STROKE: f64 = 4.0;
const TRANSITION_STROKE: f64 = 2.0;
const TRANSITION_HEIGHT: f64 = 20.0;
const HALF_HOUR_TICK: f64 = 5.0;
const TOOLTIP_HEIGHT: f64 = 20.0;
const TOOLTIP_PADDING: f64 = 20.0;
const REST_BREAK: &str = "rest break";

pub fn hour_label(hour: u32) -> String {
    match hour {
        0 => "Mid".to_string(),
        12 => "Noon".to_string(),
        24 => "24".to_string(),
        h => h.to_string(),
    }
}

pub fn is_rest_break(segment: &Segment) -> bool {
    segment.description.contains(REST_BREAK)
}

/// Rough advance width for sans-serif text; only used to size boxes.
pub fn estimate_text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * 0.6
}

/// Lay out one day. `hovered` is the index of the segment under the
/// pointer, as reported by [`ChartGeometry::hit_test`].
pub fn build_scene(
    day: &DayTimeline,
    totals: &StatusTotals,
    geometry: &ChartGeometry,
    hovered: Option<usize>,
) -> Scene {
    let mut scene = Scene::new(geometry);
    let top = geometry.layout().chart_top;
    let bottom = geometry.grid_bottom();
    let gridlines: Vec<(u32, f64)> = geometry.gridlines().collect();

    for &(hour, x) in &gridlines {
        scene.text((x, 20.0), hour_label(hour), LABEL_FONT, TextAnchor::Middle, TEXT);
        scene.line((x, top), (x, bottom), GRID, 1.0);
    }

    let mut tooltip = None;
    for status in DutyStatus::ALL {
        let row_top = geometry.row_top(status);
        let baseline = geometry.row_baseline(status);

        scene.line(
            (geometry.origin_x(), baseline),
            (geometry.origin_x() + geometry.width(), baseline),
            GRID,
            1.0,
        );
        for pair in gridlines.windows(2) {
            let mid = (pair[0].1 + pair[1].1) / 2.0;
            scene.line(
                (mid, baseline - HALF_HOUR_TICK),
                (mid, baseline + HALF_HOUR_TICK),
                GRID,
                1.0,
            );
        }
        scene.text(
            (10.0, baseline - 5.0),
            status.label().to_string(),
            LABEL_FONT,
            TextAnchor::Start,
            TEXT,
        );
        scene.text(
            (geometry.canvas_width() - 10.0, baseline - 5.0),
            totals.clock(status),
            LABEL_FONT,
            TextAnchor::End,
            TEXT,
        );

        let color = status_color(status);
        for (index, segment) in day.segments().iter().enumerate() {
            if segment.status != status {
                continue;
            }
            let (start_x, end_x) = geometry.segment_span(segment);
            scene.line((start_x, baseline), (end_x, baseline), color, SEGMENT_STROKE);

            let changed = index > 0 && day.segments()[index - 1].status != segment.status;
            if changed {
                let nearest = geometry.nearest_gridline_x(start_x);
                let tick_x = if (start_x - nearest).abs() < geometry.layout().transition_snap_px {
                    nearest
                } else {
                    start_x
                };
                scene.line(
                    (tick_x, baseline - TRANSITION_HEIGHT),
                    (tick_x, baseline),
                    color,
                    TRANSITION_STROKE,
                );
            }

            if is_rest_break(segment) {
                scene.text(
                    (start_x, row_top - 10.0),
                    format!("Break {index}"),
                    MARKER_FONT,
                    TextAnchor::Middle,
                    MARKER,
                );
                scene.primitives.push(Primitive::Triangle {
                    points: [
                        (start_x, row_top - 5.0),
                        (start_x - 4.0, row_top - 15.0),
                        (start_x + 4.0, row_top - 15.0),
                    ],
                    fill: MARKER,
                });
            }

            if hovered == Some(index) {
                tooltip = Some((segment, start_x, end_x, row_top));
            }
        }
    }

    // drawn last so it sits above every row
    if let Some((segment, start_x, end_x, row_top)) = tooltip {
        let label = format_duration(segment.duration_h());
        let box_width = estimate_text_width(&label, LABEL_FONT) + TOOLTIP_PADDING;
        let box_x = start_x + (end_x - start_x) / 2.0 - box_width / 2.0;
        let box_y = row_top - 30.0;
        scene.primitives.push(Primitive::Rect {
            upper_left: (box_x, box_y),
            lower_right: (box_x + box_width, box_y + TOOLTIP_HEIGHT),
            fill: TOOLTIP_FILL,
        });
        scene.text(
            (box_x + box_width / 2.0, box_y + 15.0),
            label,
            LABEL_FONT,
            TextAnchor::Middle,
            MARKER,
        );
    }

    scene
}

/// Scene for a day with totals computed on the spot.
pub fn build_day_scene(day: &DayTimeline, geometry: &ChartGeometry, hovered: Option<usize>) -> Scene {
    build_scene(day, &aggregate(day), geometry, hovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ChartLayout;
    use crate::timeline::build_timelines;
    use crate::RouteEvent;

    fn sample_day() -> DayTimeline {
        build_timelines(&[
            RouteEvent::new(1, 60.0, "ON_DUTY_NOT_DRIVING"),
            RouteEvent::new(1, 240.0, "DRIVE"),
            RouteEvent::new(1, 30.0, "BREAK").with_description("30-minute rest break"),
            RouteEvent::new(1, 180.0, "DRIVE"),
        ])
        .unwrap()
        .remove(0)
    }

    fn count_lines(scene: &Scene, color: Rgba, width: f64) -> usize {
        scene
            .primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Line { color: c, width: w, .. } if *c == color && *w == width))
            .count()
    }

    #[test]
    fn test_hour_labels() {
        let labels: Vec<String> = (0..=24).map(hour_label).collect();
        assert_eq!(labels[0], "Mid");
        assert_eq!(labels[12], "Noon");
        assert_eq!(labels[24], "24");
        assert_eq!(labels[7], "7");
    }

    #[test]
    fn test_scene_grid_rows_and_totals() {
        let day = sample_day();
        let geometry = ChartGeometry::new(ChartLayout::default(), 800.0);
        let scene = build_day_scene(&day, &geometry, None);
        let texts: Vec<&str> = scene.texts().collect();
        assert!(texts.contains(&"Mid"));
        assert!(texts.contains(&"Noon"));
        assert!(texts.contains(&"On Duty (not driving)"));
        assert!(texts.contains(&"07:00"));
        assert_eq!(scene.width, 800.0);
        // 25 hour gridlines + 4 row lines + 4 * 24 half-hour ticks
        assert_eq!(count_lines(&scene, GRID, 1.0), 25 + 4 + 96);
    }

    #[test]
    fn test_transition_ticks_and_break_marker() {
        let day = sample_day();
        let geometry = ChartGeometry::new(ChartLayout::default(), 800.0);
        let scene = build_day_scene(&day, &geometry, None);
        let ticks = scene
            .primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Line { width, .. } if *width == TRANSITION_STROKE))
            .count();
        // on-duty → drive → break → drive → end-of-day off duty
        assert_eq!(ticks, 4);
        assert!(scene.texts().any(|t| t == "Break 2"));
        assert_eq!(
            scene
                .primitives
                .iter()
                .filter(|p| matches!(p, Primitive::Triangle { .. }))
                .count(),
            1
        );
        assert!(!scene.primitives.iter().any(|p| matches!(p, Primitive::Rect { .. })));
    }

    #[test]
    fn test_tooltip_only_for_hovered_segment() {
        let day = sample_day();
        let geometry = ChartGeometry::new(ChartLayout::default(), 800.0);
        let scene = build_day_scene(&day, &geometry, Some(1));
        assert!(matches!(scene.primitives.last(), Some(Primitive::Text { text, .. }) if text == "4h 0m"));
        assert_eq!(
            scene
                .primitives
                .iter()
                .filter(|p| matches!(p, Primitive::Rect { .. }))
                .count(),
            1
        );
    }
}
