use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use duty_log::{
    aggregate, build_log, build_scene, format_clock, format_duration, ChartGeometry, ChartLayout,
    DayTimeline, DutyLog, DutyStatus, LogParams, Primitive, Rgba, Scene, TextAnchor, TripDocument,
};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Driver duty-status log sheet CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build day timelines from a trip document and export CSV/report/log sheets
    Log(LogArgs),
    /// Report which segment sits under a chart pixel
    Hit(HitArgs),
}

#[derive(Parser, Debug)]
struct LogArgs {
    /// Trip JSON (trip object or bare route instruction list)
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "duty_log.csv", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Base path for per-day PNG log sheets (defaults next to CSV)
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Base path for per-day SVG log sheets
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Disable log sheet rendering
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Optional text report with per-day totals and remarks
    #[arg(long, value_hint = ValueHint::FilePath)]
    report: Option<PathBuf>,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 800.0)]
    width: f64,

    /// Optional chart layout override JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    layout: Option<PathBuf>,

    /// Location name used when an event has none
    #[arg(long, default_value = "Unknown Location")]
    unknown_location: String,

    /// Pointer x for the tooltip overlay
    #[arg(long, requires = "hover_y", requires = "hover_day")]
    hover_x: Option<f64>,

    /// Pointer y for the tooltip overlay
    #[arg(long, requires = "hover_x")]
    hover_y: Option<f64>,

    /// Day whose sheet gets the tooltip overlay
    #[arg(long, requires = "hover_x")]
    hover_day: Option<u32>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct HitArgs {
    /// Trip JSON
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Trip day (1-based)
    #[arg(long)]
    day: u32,

    #[arg(long)]
    x: f64,

    #[arg(long)]
    y: f64,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 800.0)]
    width: f64,

    /// Optional chart layout override JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    layout: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Log(args) => args.verbose,
        Command::Hit(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Log(args) => handle_log(args),
        Command::Hit(args) => handle_hit(args),
    }
}

fn load_trip(path: &Path) -> Result<TripDocument> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    TripDocument::from_slice(&data)
        .with_context(|| format!("{} is not a trip document", path.display()))
}

fn load_layout(path: Option<&Path>) -> Result<ChartLayout> {
    let Some(path) = path else {
        return Ok(ChartLayout::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read layout {}", path.display()))?;
    let layout: ChartLayout = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid chart layout", path.display()))?;
    if layout.row_height <= 0.0 || layout.height <= 0.0 {
        return Err(anyhow!(
            "layout {} needs positive height and row_height",
            path.display()
        ));
    }
    Ok(layout)
}

fn handle_log(args: LogArgs) -> Result<()> {
    let t_build = Instant::now();
    let trip = load_trip(&args.input)?;
    let params = LogParams {
        unknown_location: args.unknown_location.clone(),
        ..LogParams::default()
    };
    let log = build_log(trip.events(), &params)
        .with_context(|| format!("rejected route events in {}", args.input.display()))?;
    log_diagnostics(&log);
    if args.profile || args.verbose {
        info!(
            "Build stage: {:.1} ms ({} events, {} days)",
            t_build.elapsed().as_secs_f64() * 1000.0,
            log.diagnostics.events,
            log.days.len()
        );
    }
    if log.is_empty() {
        warn!("{} has no route instructions", args.input.display());
    }

    if args.output.as_os_str() == "-" {
        write_segments_stdout(&log)?;
    } else {
        write_segments_csv(&log, &args.output)?;
        info!("Wrote segment CSV: {}", args.output.display());
    }

    if let Some(path) = args.report.as_ref() {
        let report = render_report(&trip, &log, &params);
        fs::write(path, report).with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote report: {}", path.display());
    }

    if args.no_plot || log.is_empty() {
        return Ok(());
    }

    let layout = load_layout(args.layout.as_deref())?;
    let geometry = ChartGeometry::new(layout, args.width);
    let hover = hover_target(args.hover_day, args.hover_x, args.hover_y);
    let t_scene = Instant::now();
    let scenes: Vec<(u32, Scene)> = log
        .days
        .iter()
        .map(|day| {
            let hovered = hovered_index(day, &geometry, hover);
            (day.day(), build_scene(day, &aggregate(day), &geometry, hovered))
        })
        .collect();
    if args.profile || args.verbose {
        info!(
            "Scene stage: {:.1} ms",
            t_scene.elapsed().as_secs_f64() * 1000.0
        );
    }

    let png_base = match args.png.clone() {
        Some(path) => Some(path),
        None if args.output.as_os_str() != "-" => {
            let mut path = args.output.clone();
            path.set_extension("png");
            Some(path)
        }
        None => None,
    };

    let t_plot = Instant::now();
    if let Some(base) = png_base {
        render_days(&scenes, &base, ChartKind::Png);
    }
    if let Some(base) = args.svg.as_ref() {
        render_days(&scenes, base, ChartKind::Svg);
    }
    if args.profile || args.verbose {
        info!(
            "Plot stage: {:.1} ms",
            t_plot.elapsed().as_secs_f64() * 1000.0
        );
    }

    Ok(())
}

fn handle_hit(args: HitArgs) -> Result<()> {
    let trip = load_trip(&args.input)?;
    let log = build_log(trip.events(), &LogParams::default())
        .with_context(|| format!("rejected route events in {}", args.input.display()))?;
    let day = log
        .day(args.day)
        .ok_or_else(|| anyhow!("trip has no day {}", args.day))?;
    let layout = load_layout(args.layout.as_deref())?;
    let geometry = ChartGeometry::new(layout, args.width);
    debug!(
        "hit test at ({}, {}) on a {}px canvas, t={:.3}h",
        args.x,
        args.y,
        geometry.canvas_width(),
        geometry.x_to_time(args.x)
    );

    match geometry.hit_test(args.x, args.y, day) {
        Some(hit) => println!(
            "day {} segment {}: {} {}-{} ({}) {}",
            day.day(),
            hit.index,
            hit.status,
            format_clock(hit.segment.start),
            format_clock(hit.segment.end),
            format_duration(hit.segment.duration_h()),
            hit.segment.description
        ),
        None => println!("no segment"),
    }
    Ok(())
}

fn log_diagnostics(log: &DutyLog) {
    let diag = &log.diagnostics;
    if !diag.unrecognized_halt_types.is_empty() {
        warn!(
            "Unrecognised halt types logged as off duty: {}",
            diag.unrecognized_halt_types.join(", ")
        );
    }
    if !diag.backfilled_days.is_empty() {
        info!("Backfilled idle days: {:?}", diag.backfilled_days);
    }
    if diag.truncated_events > 0 {
        warn!(
            "{} event(s) ran past midnight; dropped {:.2} h",
            diag.truncated_events, diag.truncated_hours
        );
    }
}

/// Pointer for the tooltip overlay, when all three coordinates are given.
fn hover_target(day: Option<u32>, x: Option<f64>, y: Option<f64>) -> Option<(u32, f64, f64)> {
    Some((day?, x?, y?))
}

fn hovered_index(
    day: &DayTimeline,
    geometry: &ChartGeometry,
    hover: Option<(u32, f64, f64)>,
) -> Option<usize> {
    let (target, x, y) = hover?;
    if target != day.day() {
        return None;
    }
    geometry.hit_test(x, y, day).map(|hit| hit.index)
}

fn write_segments_stdout(log: &DutyLog) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_segment_rows(log, &mut writer)
}

fn write_segments_csv(log: &DutyLog, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_segment_rows(log, &mut writer)
}

fn write_segment_rows<W: Write>(log: &DutyLog, writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record([
        "day",
        "start",
        "end",
        "start_h",
        "end_h",
        "status",
        "description",
        "location",
    ])?;
    for day in &log.days {
        for segment in day.segments() {
            writer.write_record([
                day.day().to_string(),
                format_clock(segment.start),
                format_clock(segment.end),
                format!("{:.4}", segment.start),
                format!("{:.4}", segment.end),
                segment.status.label().to_string(),
                segment.description.clone(),
                segment.location_name.clone(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn render_report(trip: &TripDocument, log: &DutyLog, params: &LogParams) -> String {
    let mut report = String::from("DUTY LOG\n");
    report.push_str(&format!(
        "  generated: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(id) = trip.id_label() {
        report.push_str(&format!("  trip: {}\n", id));
    }
    if let Some(plan) = trip.plan() {
        if let Some(distance) = plan.distance {
            report.push_str(&format!("  distance: {:.1}\n", distance));
        }
        if let Some(days) = plan.number_of_days {
            report.push_str(&format!("  number_of_days: {}\n", days));
        }
    }
    report.push('\n');

    for day in &log.days {
        let totals = aggregate(day);
        report.push_str(&format!("DAY {}\n", day.day()));
        for status in DutyStatus::ALL {
            report.push_str(&format!("  {:<24}{}\n", status.label(), totals.clock(status)));
        }
        report.push_str(&format!("  {:<24}{}\n", "Total", format_clock(totals.total())));
        let remarks = day.remarks(&params.unknown_location);
        if !remarks.is_empty() {
            report.push_str("  remarks:\n");
            for remark in remarks {
                report.push_str(&format!("    - {}\n", remark));
            }
        }
        report.push('\n');
    }

    let diag = &log.diagnostics;
    if !diag.unrecognized_halt_types.is_empty() {
        report.push_str(&format!(
            "unrecognised halt types: {}\n",
            diag.unrecognized_halt_types.join(", ")
        ));
    }
    if diag.truncated_events > 0 {
        report.push_str(&format!(
            "truncated events: {} ({:.2} h past midnight)\n",
            diag.truncated_events, diag.truncated_hours
        ));
    }
    report
}

#[derive(Clone, Copy, Debug)]
enum ChartKind {
    Png,
    Svg,
}

fn render_days(scenes: &[(u32, Scene)], base: &Path, kind: ChartKind) {
    scenes.par_iter().for_each(|(day, scene)| {
        let path = derive_day_path(base, *day, kind);
        match render_chart_guard(scene, &path, kind) {
            Ok(()) => info!("Wrote log sheet: {}", path.display()),
            Err(err) => warn!("Skipping {:?} render ({}): {}", kind, path.display(), err),
        }
    });
}

/// `<dir>/<stem>_day<N>.<ext>`
fn derive_day_path(base: &Path, day: u32, kind: ChartKind) -> PathBuf {
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("duty_log");
    let default_ext = match kind {
        ChartKind::Png => "png",
        ChartKind::Svg => "svg",
    };
    let ext = base
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or(default_ext);
    base.with_file_name(format!("{}_day{}.{}", stem, day, ext))
}

fn render_chart_guard(scene: &Scene, path: &Path, kind: ChartKind) -> Result<(), String> {
    let size = (scene.width.round() as u32, scene.height.round() as u32);
    let render = || -> Result<(), String> {
        let drawn = match kind {
            ChartKind::Png => draw_scene(BitMapBackend::new(path, size).into_drawing_area(), scene),
            ChartKind::Svg => draw_scene(SVGBackend::new(path, size).into_drawing_area(), scene),
        };
        drawn.map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn rgba(color: Rgba) -> RGBAColor {
    RGBAColor(color.r, color.g, color.b, color.a)
}

fn px(point: (f64, f64)) -> (i32, i32) {
    (point.0.round() as i32, point.1.round() as i32)
}

fn draw_scene<DB>(root: DrawingArea<DB, plotters::coord::Shift>, scene: &Scene) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&rgba(scene.background))?;

    for primitive in &scene.primitives {
        match primitive {
            Primitive::Line {
                from,
                to,
                color,
                width,
            } => {
                let style = ShapeStyle {
                    color: rgba(*color),
                    filled: false,
                    stroke_width: width.round().max(1.0) as u32,
                };
                root.draw(&PathElement::new(vec![px(*from), px(*to)], style))?;
            }
            Primitive::Text {
                at,
                text,
                size,
                anchor,
                color,
            } => {
                let hpos = match anchor {
                    TextAnchor::Start => HPos::Left,
                    TextAnchor::Middle => HPos::Center,
                    TextAnchor::End => HPos::Right,
                };
                let style = FontDesc::new(FontFamily::SansSerif, *size, FontStyle::Normal)
                    .color(&rgba(*color))
                    .pos(Pos::new(hpos, VPos::Bottom));
                root.draw(&Text::new(text.clone(), px(*at), style))?;
            }
            Primitive::Rect {
                upper_left,
                lower_right,
                fill,
            } => {
                root.draw(&Rectangle::new(
                    [px(*upper_left), px(*lower_right)],
                    rgba(*fill).filled(),
                ))?;
            }
            Primitive::Triangle { points, fill } => {
                let vertices: Vec<(i32, i32)> = points.iter().map(|p| px(*p)).collect();
                root.draw(&Polygon::new(vertices, rgba(*fill).filled()))?;
            }
        }
    }

    root.present()?;
    Ok(())
}
