use leptos::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlInputElement;

use duty_log::{
    aggregate, build_log, status_color, DayTimeline, DutyLog, DutyStatus, LogParams, StatusTotals,
    TextAnchor, TripDocument,
};

#[cfg(feature = "web_svg")]
use duty_log::{build_scene, ChartGeometry, ChartLayout, Primitive};

#[cfg(not(feature = "web_svg"))]
use duty_log::format_clock;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_BUILD: &str = env!("DUTY_LOG_BUILD");

#[derive(Clone, Debug, PartialEq)]
struct LoadedTrip {
    name: String,
    header: Vec<(&'static str, String)>,
    log: DutyLog,
}

fn trip_header(doc: &TripDocument) -> Vec<(&'static str, String)> {
    let mut header = Vec::new();
    if let Some(id) = doc.id_label() {
        header.push(("Trip", id));
    }
    if let Some(plan) = doc.plan() {
        if let Some(distance) = plan.distance {
            header.push(("Distance", format!("{distance:.1} mi")));
        }
        if let Some(days) = plan.number_of_days {
            header.push(("Days", days.to_string()));
        }
    }
    header
}

fn load_trip(name: &str, bytes: &[u8], params: &LogParams) -> Result<LoadedTrip, String> {
    let doc = TripDocument::from_slice(bytes)
        .map_err(|err| format!("{name} is not a trip document: {err}"))?;
    let log = build_log(doc.events(), params).map_err(|err| format!("{name}: {err}"))?;
    Ok(LoadedTrip {
        name: name.to_string(),
        header: trip_header(&doc),
        log,
    })
}

fn status_line(trip: &LoadedTrip) -> String {
    let diag = &trip.log.diagnostics;
    let mut msg = format!(
        "Loaded {}: {} day(s) from {} event(s).",
        trip.name,
        trip.log.days.len(),
        diag.events
    );
    if !diag.unrecognized_halt_types.is_empty() {
        msg.push_str(&format!(
            " Logged as off duty: {}.",
            diag.unrecognized_halt_types.join(", ")
        ));
    }
    if diag.truncated_events > 0 {
        msg.push_str(&format!(
            " {} event(s) cut at midnight.",
            diag.truncated_events
        ));
    }
    msg
}

async fn read_first_file(input: &HtmlInputElement) -> Option<(String, Vec<u8>)> {
    let file = input.files()?.item(0)?;
    let name = file.name();
    let buf = JsFuture::from(file.array_buffer()).await.ok()?;
    let u8arr = js_sys::Uint8Array::new(&buf);
    let mut bytes = vec![0u8; u8arr.length() as usize];
    u8arr.copy_to(&mut bytes[..]);
    Some((name, bytes))
}

fn svg_anchor(anchor: TextAnchor) -> &'static str {
    match anchor {
        TextAnchor::Start => "start",
        TextAnchor::Middle => "middle",
        TextAnchor::End => "end",
    }
}

fn polygon_points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "web_svg")]
fn primitive_view(primitive: Primitive) -> View {
    match primitive {
        Primitive::Line {
            from,
            to,
            color,
            width,
        } => view! {
            <line x1={from.0.to_string()} y1={from.1.to_string()} x2={to.0.to_string()} y2={to.1.to_string()}
                stroke={color.css()} stroke-width={width.to_string()} />
        }
        .into_view(),
        Primitive::Text {
            at,
            text,
            size,
            anchor,
            color,
        } => view! {
            <text x={at.0.to_string()} y={at.1.to_string()} fill={color.css()} font-size={size.to_string()}
                font-family="sans-serif" text-anchor={svg_anchor(anchor)}>{text}</text>
        }
        .into_view(),
        Primitive::Rect {
            upper_left,
            lower_right,
            fill,
        } => view! {
            <rect x={upper_left.0.to_string()} y={upper_left.1.to_string()}
                width={(lower_right.0 - upper_left.0).to_string()}
                height={(lower_right.1 - upper_left.1).to_string()}
                fill={fill.css()} />
        }
        .into_view(),
        Primitive::Triangle { points, fill } => view! {
            <polygon points={polygon_points(&points)} fill={fill.css()} />
        }
        .into_view(),
    }
}

/// Interactive log sheet. Geometry is rebuilt from the measured container
/// width on every render and every pointer move.
#[cfg(feature = "web_svg")]
fn day_chart(day: DayTimeline, totals: StatusTotals) -> impl IntoView {
    let day = store_value(day);
    let container = create_node_ref::<html::Div>();
    let (width, set_width) = create_signal(0.0_f64);
    let (hovered, set_hovered) = create_signal(Option::<usize>::None);

    let measure = move || {
        container
            .get_untracked()
            .map(|el| el.get_bounding_client_rect().width())
            .unwrap_or(0.0)
    };
    container.on_load(move |_| request_animation_frame(move || set_width.set(measure())));
    let resize = window_event_listener(ev::resize, move |_| set_width.set(measure()));
    on_cleanup(move || resize.remove());

    let on_move = move |ev: ev::MouseEvent| {
        let Some(el) = container.get_untracked() else {
            return;
        };
        let rect = el.get_bounding_client_rect();
        let geometry = ChartGeometry::new(ChartLayout::default(), rect.width());
        let x = ev.client_x() as f64 - rect.left();
        let y = ev.client_y() as f64 - rect.top();
        let hit = day.with_value(|d| geometry.hit_test(x, y, d).map(|h| h.index));
        if hovered.get_untracked() != hit {
            set_hovered.set(hit);
        }
    };

    let sheet = move || {
        let geometry = ChartGeometry::new(ChartLayout::default(), width.get());
        let scene = day.with_value(|d| build_scene(d, &totals, &geometry, hovered.get()));
        let background = format!("background:{}", scene.background.css());
        view! {
            <svg width={scene.width.to_string()} height={scene.height.to_string()} style={background}>
                {scene.primitives.into_iter().map(primitive_view).collect_view()}
            </svg>
        }
    };

    view! {
        <div class="chart" node_ref=container on:mousemove=on_move
            on:mouseleave=move |_| set_hovered.set(None)>
            {sheet}
        </div>
    }
}

/// Plain segment table for builds without the SVG sheet.
#[cfg(not(feature = "web_svg"))]
fn day_chart(day: DayTimeline, _totals: StatusTotals) -> impl IntoView {
    let rows = day
        .segments()
        .iter()
        .map(|s| {
            view! {
                <tr>
                    <td>{format_clock(s.start)}</td>
                    <td>{format_clock(s.end)}</td>
                    <td>{s.status.label()}</td>
                    <td>{s.description.clone()}</td>
                </tr>
            }
        })
        .collect_view();
    view! { <table class="segments">{rows}</table> }
}

#[component]
fn DaySheet(day: DayTimeline, unknown_location: String) -> impl IntoView {
    let totals = aggregate(&day);
    let number = day.day();
    let cards = DutyStatus::ALL
        .into_iter()
        .map(|status| {
            let style = format!("border-left: 4px solid {}", status_color(status).css());
            view! {
                <div class="total-card" style={style}>
                    <span class="note">{status.label()}</span>
                    <strong>{totals.clock(status)}</strong>
                </div>
            }
        })
        .collect_view();
    let remarks = day
        .remarks(&unknown_location)
        .into_iter()
        .map(|remark| view! { <li>{remark.to_string()}</li> })
        .collect_view();

    view! {
        <section class="day">
            <h2>{format!("Day {number}")}</h2>
            <div class="totals">{cards}</div>
            {day_chart(day, totals)}
            <h3>"Remarks"</h3>
            <ul class="remarks">{remarks}</ul>
        </section>
    }
}

#[component]
pub fn App() -> impl IntoView {
    let (trip, set_trip) = create_signal(Option::<LoadedTrip>::None);
    let (status, set_status) = create_signal(String::from("No trip loaded."));
    let params = LogParams::default();
    let unknown_location = params.unknown_location.clone();

    let on_file = move |ev: leptos::ev::Event| {
        let Some(target) = ev.target() else {
            return;
        };
        let Ok(input) = target.dyn_into::<HtmlInputElement>() else {
            return;
        };
        set_status.set("Reading trip…".to_string());
        let params = params.clone();
        spawn_local(async move {
            match read_first_file(&input).await {
                Some((name, bytes)) => match load_trip(&name, &bytes, &params) {
                    Ok(loaded) => {
                        set_status.set(status_line(&loaded));
                        set_trip.set(Some(loaded));
                    }
                    Err(err) => {
                        set_status.set(err);
                        set_trip.set(None);
                    }
                },
                None => set_status.set("Could not read the selected file.".to_string()),
            }
            input.set_value("");
        });
    };

    let header_view = move || {
        trip.with(|t| {
            t.as_ref()
                .map(|loaded| {
                    loaded
                        .header
                        .iter()
                        .map(|(label, value)| view! { <span class="note">{*label}": "{value.clone()}" "</span> })
                        .collect_view()
                })
        })
    };

    let days_view = move || {
        let placeholder = unknown_location.clone();
        trip.get()
            .map(|loaded| {
                loaded
                    .log
                    .days
                    .into_iter()
                    .map(|day| view! { <DaySheet day=day unknown_location=placeholder.clone()/> })
                    .collect_view()
            })
    };

    view! {
        <main class="log-sheet">
            <header>
                <h1>"Driver's Daily Log"</h1>
                <p class="note">{"Web version "}{APP_VERSION}{" ("}{APP_BUILD}{")"}</p>
            </header>
            <section class="controls">
                <label class="dropzone">
                    <span>"Choose a trip JSON file"</span>
                    <input id="trip_input" type="file" accept=".json,application/json" on:change=on_file />
                </label>
                <span class="note">{move || status.get()}</span>
            </section>
            <section class="trip-header">{header_view}</section>
            <section class="days">{days_view}</section>
        </main>
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    leptos::mount_to_body(|| view! { <App/> });
}
