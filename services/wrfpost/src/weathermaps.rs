//! Hourly map products. Each configured product gets its own output
//! directory with one PNG per forecast hour, all sharing the same
//! furniture: graticule, airport values, extremes box, colorbar, and
//! the three-line title block.

use std::fs;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use renderer::chart::nice_ticks;
use renderer::color::{ptype_colors, ramp};
use renderer::contour::{contour_levels, LineStyle};
use renderer::map::{MapCanvas, ValueScale};
use renderer::streamline::StreamlineConfig;
use renderer::text::{draw_text_boxed, measure_text, TextStyle};
use renderer::{Color, ColorRamp};
use wrf_common::units::{
    celsius_delta_to_fahrenheit, celsius_to_fahrenheit, kelvin_to_fahrenheit, mm_to_inches,
    mps_to_knots, mps_to_mph, pa_to_hpa,
};
use wrf_common::{smooth2d, Grid2};
use wrf_decoder::diag;
use wrf_decoder::kuchera::kuchera_ratio;

use crate::context::RunContext;
use crate::products::ProductSpec;

const MAP_WIDTH: u32 = 1200;
const MAP_HEIGHT: u32 = 1000;
const BARB_SPACING: f32 = 40.0;
const BARB_SIZE: f32 = 16.0;

/// Matplotlib's default line color, used for the dashed freezing line.
const FREEZING_LINE: Color = Color::rgb(31, 119, 180);

const HELICITY_LEVELS: [f64; 6] = [50.0, 100.0, 200.0, 300.0, 400.0, 500.0];
const HELICITY_COLORS: [Color; 6] = [
    Color::rgb(0, 128, 0),
    Color::rgb(0, 255, 255),
    Color::rgb(0, 0, 255),
    Color::rgb(128, 0, 128),
    Color::rgb(255, 0, 0),
    Color::rgb(0, 0, 0),
];
const HELICITY_LABELS: [&str; 6] = ["50", "100", "200", "300", "400", "500"];

const PTYPE_LABELS: [&str; 13] = [
    "None", "--", "Snow", "+", "--", "Ice", "+", "--", "FzRa", "+", "--", "Rain", "+",
];

const FIRST_HOUR_NOTE: &[&str] = &["This product starts on hour 1."];

const KUCHERA_NOTE: &[&str] = &[
    "Kuchera ratio caveat: the ratio for the entire total",
    "snowfall is recalculated at each step, so values may",
    "not be fully indicative of actual snowfall.",
];

const INTENSITY_NOTE: &[&str] = &[
    "Intensity Breakpoints (Liquid Eq.):",
    "Heavy - 7.6mm/hr",
    "Moderate - 2.5mm/hr",
    "Light - <2.5mm/hr",
];

const STARGAZING_NOTE: &[&str] = &[
    "Index Explanation:",
    "75% Clear Sky",
    "15% Atmospheric Transparency",
    "10% Seeing Conditions",
    "Penalties for High Sfc. RH and Wind",
];

pub fn run(ctx: &RunContext) -> Result<()> {
    for product in &ctx.config.products {
        let started = Instant::now();
        match render_product(ctx, product) {
            Ok(0) => {}
            Ok(hours) => info!(
                product = %product.name,
                hours,
                elapsed_secs = started.elapsed().as_secs_f64(),
                "product finished"
            ),
            Err(err) => error!(product = %product.name, error = %err, "product failed"),
        }
    }
    Ok(())
}

fn render_product(ctx: &RunContext, spec: &ProductSpec) -> Result<usize> {
    if ctx.partial && needs_previous_hour(&spec.name) {
        warn!(
            product = %spec.name,
            "skipping on partial run, needs the previous timestep"
        );
        return Ok(0);
    }
    let dir = ctx.ensure_dir(&spec.name)?;
    let mut helicity_sum = None;
    for t in 0..ctx.hours() {
        let png = render_hour(ctx, spec, t, &mut helicity_sum)?;
        let path = dir.join(format!("hour_{}.png", ctx.forecast_hour(t)));
        fs::write(&path, png).with_context(|| format!("Failed to write {:?}", path))?;
    }
    Ok(ctx.hours())
}

/// Hourly-change products and the type composite read the previous
/// timestep, which a partial file does not have yet.
fn needs_previous_hour(name: &str) -> bool {
    name.starts_with("1hr_") || name == "ptype"
}

fn render_hour(
    ctx: &RunContext,
    spec: &ProductSpec,
    t: usize,
    helicity_sum: &mut Option<Grid2>,
) -> Result<Vec<u8>> {
    let mut canvas = MapCanvas::new(MAP_WIDTH, MAP_HEIGHT, ctx.lat.ny(), ctx.lat.nx())?;
    let finish = match (spec.name.as_str(), spec.level()) {
        ("temperature", _) => temperature(&mut canvas, ctx, t)?,
        ("1hr_temp_c", _) => temp_change(&mut canvas, ctx, t)?,
        ("dewp", _) => dewpoint(&mut canvas, ctx, t)?,
        ("1hr_dewp_c", _) => dewpoint_change(&mut canvas, ctx, t)?,
        ("rh", _) => humidity(&mut canvas, ctx, t)?,
        ("pressure", _) => mslp(&mut canvas, ctx, t)?,
        ("wind", _) => wind_speed(&mut canvas, ctx, t)?,
        ("wind_gust", _) => wind_gust(&mut canvas, ctx, t)?,
        ("comp_reflectivity", _) => reflectivity(&mut canvas, ctx, t)?,
        ("echo_tops", _) => echo_tops(&mut canvas, ctx, t)?,
        ("helicity", _) => helicity(&mut canvas, ctx, t, helicity_sum)?,
        ("mcape", _) => cape_map(&mut canvas, ctx, t, false)?,
        ("mcin", _) => cape_map(&mut canvas, ctx, t, true)?,
        ("1hr_precip", _) => precip_hourly(&mut canvas, ctx, t)?,
        ("total_precip", _) => precip_total(&mut canvas, ctx, t)?,
        ("1hr_snowfall", _) => snowfall_hourly(&mut canvas, ctx, t)?,
        ("snowfall", _) => snowfall_total(&mut canvas, ctx, t)?,
        ("cloudcover", _) => cloud_cover(&mut canvas, ctx, t)?,
        ("afwarain", _) => rain_total(&mut canvas, ctx, t)?,
        ("afwasnow", _) => snow_total_ratio(&mut canvas, ctx, t)?,
        ("afwasnow_k", _) => snow_total_kuchera(&mut canvas, ctx, t)?,
        ("afwafrz", _) => freezing_rain_total(&mut canvas, ctx, t)?,
        ("afwaslt", _) => ice_total(&mut canvas, ctx, t)?,
        ("ptype", _) => precip_type(&mut canvas, ctx, t)?,
        ("stargazing", _) => stargazing(&mut canvas, ctx, t)?,
        (name, Some(level)) if name.starts_with("1hr_temp_c_") => {
            upper_temp_change(&mut canvas, ctx, t, level)?
        }
        (name, Some(level)) if name.starts_with("temp_") => upper_temp(&mut canvas, ctx, t, level)?,
        (name, Some(level)) if name.starts_with("te_") => {
            upper_theta_e(&mut canvas, ctx, t, level)?
        }
        (name, Some(level)) if name.starts_with("rh_") => {
            upper_humidity(&mut canvas, ctx, t, level)?
        }
        (name, Some(level)) if name.starts_with("wind_") => upper_wind(&mut canvas, ctx, t, level)?,
        (name, Some(level)) if name.starts_with("heights_") => {
            upper_heights(&mut canvas, ctx, t, level)?
        }
        _ => unconfigured(&mut canvas, ctx, spec, t)?,
    };
    finish_map(canvas, ctx, t, finish)
}

/// Layers shared by every product, drawn over whatever the product
/// branch painted.
struct Finish {
    field: Grid2,
    title: String,
    label: String,
    colorbar: Colorbar,
    airports: bool,
    maxmin: bool,
    note: Option<Note>,
}

enum Colorbar {
    Ramp(ColorRamp, ValueScale),
    Category(Vec<Color>, Vec<&'static str>),
}

struct Note {
    lines: &'static [&'static str],
    color: Color,
    centered: bool,
}

impl Note {
    fn lower_left(lines: &'static [&'static str], color: Color) -> Self {
        Note { lines, color, centered: false }
    }

    fn centered(lines: &'static [&'static str], color: Color) -> Self {
        Note { lines, color, centered: true }
    }
}

fn finish_map(mut canvas: MapCanvas, ctx: &RunContext, t: usize, finish: Finish) -> Result<Vec<u8>> {
    canvas.draw_graticule(
        &ctx.lat,
        &ctx.lon,
        &LineStyle::dashed(Color::rgba(128, 128, 128, 128), 1.0),
        &TextStyle::new(12.0, Color::BLACK),
    );
    if finish.airports {
        draw_airport_values(&mut canvas, ctx, &finish.field);
    }
    if finish.maxmin {
        draw_extremes(&mut canvas, &finish.field);
    }
    match &finish.colorbar {
        Colorbar::Ramp(colors, scale) => {
            let ticks = nice_ticks(scale.min(), scale.max(), 8);
            canvas.draw_colorbar(colors, scale, &ticks, &finish.label);
        }
        Colorbar::Category(colors, labels) => {
            canvas.draw_category_colorbar(colors, labels);
        }
    }
    let valid = format!("Valid: {}", ctx.valid_label(t));
    let init = format!("Init: {}", ctx.init_label());
    canvas.draw_title(&[&finish.title, &valid, &init]);
    canvas.draw_run_tag(&ctx.run_tag());
    if let Some(note) = &finish.note {
        draw_note(&mut canvas, note);
    }
    Ok(canvas.into_png()?)
}

/// Sampled field value over each configured airport, boxed so it stays
/// readable on a busy fill.
pub(crate) fn draw_airport_values(canvas: &mut MapCanvas, ctx: &RunContext, field: &Grid2) {
    let backing = Color::rgba(255, 255, 255, 51);
    for (airports, size) in [(&ctx.config.high_priority, 14.0), (&ctx.config.secondary, 12.0)] {
        let style = TextStyle::new(size, Color::BLACK);
        for airport in airports.iter() {
            let (j, i) = ctx.airport_index(airport);
            let value = field.get(j, i);
            if !value.is_finite() {
                continue;
            }
            let text = format!("{value:.1}");
            let (px, py) = canvas.grid_to_px(i as f32, j as f32);
            let x = px - measure_text(&text, size) / 2.0;
            draw_text_boxed(canvas.pixmap_mut(), x, py - size - 4.0, &text, &style, backing);
        }
    }
}

/// Field extremes in the plot's southeast corner. An all-zero field
/// draws nothing, and a zero minimum is left off.
pub(crate) fn draw_extremes(canvas: &mut MapCanvas, field: &Grid2) {
    let max = field.max_value().unwrap_or(0.0);
    if max == 0.0 || !max.is_finite() {
        return;
    }
    let mut text = format!("Max: {max:.1}");
    let min = field.min_value().unwrap_or(0.0);
    if min != 0.0 {
        text.push_str(&format!("  Min: {min:.1}"));
    }
    let style = TextStyle::new(12.0, Color::BLACK);
    let (px, py) = canvas.grid_to_px((field.nx() - 1) as f32, 0.0);
    let x = px - measure_text(&text, style.size) - 8.0;
    draw_text_boxed(
        canvas.pixmap_mut(),
        x,
        py - style.size - 10.0,
        &text,
        &style,
        Color::rgba(255, 255, 255, 153),
    );
}

fn draw_note(canvas: &mut MapCanvas, note: &Note) {
    let style = TextStyle::new(13.0, note.color);
    let backing = Color::rgba(255, 255, 255, 153);
    let line_h = style.size + 6.0;
    if note.centered {
        let cx = canvas.width() as f32 / 2.0;
        let mut y = canvas.height() as f32 / 2.0 - line_h * note.lines.len() as f32 / 2.0;
        for line in note.lines {
            let x = cx - measure_text(line, style.size) / 2.0;
            draw_text_boxed(canvas.pixmap_mut(), x, y, line, &style, backing);
            y += line_h;
        }
    } else {
        let (x0, y_bottom) = canvas.grid_to_px(0.0, 0.0);
        let mut y = y_bottom - 12.0 - line_h * note.lines.len() as f32;
        for line in note.lines {
            draw_text_boxed(canvas.pixmap_mut(), x0 + 10.0, y, line, &style, backing);
            y += line_h;
        }
    }
}

fn titled(ctx: &RunContext, t: usize, text: impl Into<String>) -> String {
    format!("{} - Hour {}", text.into(), ctx.forecast_hour(t))
}

fn surface_barbs(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<()> {
    let u = ctx.wrf.field2("U10", t)?;
    let v = ctx.wrf.field2("V10", t)?;
    canvas.draw_barbs(&u, &v, BARB_SPACING, BARB_SIZE, Color::BLACK, 1.0);
    Ok(())
}

fn level_winds(ctx: &RunContext, t: usize, level: f64) -> Result<(Grid2, Grid2)> {
    let pressure = diag::pressure(&ctx.wrf, t)?;
    let u = ctx.wrf.field3("U", t)?.interp_to_level(&pressure, level)?;
    let v = ctx.wrf.field3("V", t)?.interp_to_level(&pressure, level)?;
    Ok((u, v))
}

fn level_barbs(canvas: &mut MapCanvas, ctx: &RunContext, t: usize, level: f64) -> Result<()> {
    let (u, v) = level_winds(ctx, t, level)?;
    canvas.draw_barbs(&u, &v, BARB_SPACING, BARB_SIZE, Color::BLACK, 1.0);
    Ok(())
}

/// Field difference against the previous timestep; zero everywhere on
/// hour 0, which has nothing to diff against.
fn change_since_previous(ctx: &RunContext, name: &str, t: usize) -> Result<Grid2> {
    let now = ctx.wrf.field2(name, t)?;
    if t == 0 {
        return Ok(Grid2::filled(now.ny(), now.nx(), 0.0));
    }
    let prev = ctx.wrf.field2(name, t - 1)?;
    Ok(now.zip_map(&prev, |a, b| a - b)?)
}

/// Hourly bucket from a run-accumulated field. Hour 0 keeps the raw
/// accumulation, which starts the run at zero anyway.
fn accumulation_step(ctx: &RunContext, name: &str, t: usize) -> Result<Grid2> {
    let now = ctx.wrf.field2(name, t)?;
    if t == 0 {
        return Ok(now);
    }
    let prev = ctx.wrf.field2(name, t - 1)?;
    Ok(now.zip_map(&prev, |a, b| a - b)?)
}

/// Hide trace amounts so the background shows through the fill.
pub(crate) fn mask_at_or_below(grid: &Grid2, cutoff: f64) -> Grid2 {
    grid.map(|v| if v <= cutoff { f64::NAN } else { v })
}

fn field_range(field: &Grid2) -> (f64, f64) {
    (
        field.min_value().unwrap_or(0.0),
        field.max_value().unwrap_or(1.0),
    )
}

/// Piecewise remap of a ramp so its midpoint lands on `center` rather
/// than halfway between `min` and `max`.
fn two_slope(base: &ColorRamp, min: f64, center: f64, max: f64) -> ColorRamp {
    let c = ((center - min) / (max - min)).clamp(0.0, 1.0);
    let stops: Vec<(f64, Color)> = (0..=32)
        .map(|k| {
            let s = k as f64 / 32.0;
            let t = if s <= 0.5 {
                s * 2.0 * c
            } else {
                c + (s - 0.5) * 2.0 * (1.0 - c)
            };
            (t, base.at(s))
        })
        .collect();
    ColorRamp::new(&stops)
}

fn temperature(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = ctx.wrf.field2("T2", t)?.map(kelvin_to_fahrenheit);
    let colors = ramp("nipy_spectral")?.clone();
    let scale = ValueScale::Bands { min: -10.0, max: 110.0, step: 5.0 };
    canvas.fill_field(&field, &colors, &scale);
    let smoothed = smooth2d(&field, 4, 2.0);
    canvas.draw_contours(&smoothed, &[32.0], 1, &LineStyle::dashed(FREEZING_LINE, 1.4));
    surface_barbs(canvas, ctx, t)?;
    Ok(Finish {
        title: titled(ctx, t, "2m Temperature (°F) (32°F Dashed)"),
        label: "Temp (°F)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn temp_change(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = change_since_previous(ctx, "T2", t)?.map(celsius_delta_to_fahrenheit);
    let colors = ramp("coolwarm")?.clone();
    let scale = ValueScale::Range { min: -10.0, max: 10.0 };
    canvas.fill_field(&field, &colors, &scale);
    surface_barbs(canvas, ctx, t)?;
    Ok(Finish {
        title: titled(ctx, t, "1 Hour 2m Temp Change (°F)"),
        label: "Temperature Change (°F)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: (t == 0).then(|| Note::centered(FIRST_HOUR_NOTE, Color::BLACK)),
    })
}

fn dewpoint(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = diag::td2(&ctx.wrf, t)?.map(celsius_to_fahrenheit);
    let colors = ramp("brbg")?.clone();
    let scale = ValueScale::Bands { min: 10.0, max: 85.0, step: 5.0 };
    canvas.fill_field(&field, &colors, &scale);
    surface_barbs(canvas, ctx, t)?;
    Ok(Finish {
        title: titled(ctx, t, "2m Dewpoint (°F)"),
        label: "Dewpoint (°F)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn dewpoint_change(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = if t == 0 {
        let now = diag::td2(&ctx.wrf, t)?;
        Grid2::filled(now.ny(), now.nx(), 0.0)
    } else {
        let now = diag::td2(&ctx.wrf, t)?;
        let prev = diag::td2(&ctx.wrf, t - 1)?;
        now.zip_map(&prev, |a, b| celsius_delta_to_fahrenheit(a - b))?
    };
    let colors = ramp("brbg")?.clone();
    let scale = ValueScale::Range { min: -20.0, max: 20.0 };
    canvas.fill_field(&field, &colors, &scale);
    surface_barbs(canvas, ctx, t)?;
    Ok(Finish {
        title: titled(ctx, t, "1 Hour 2m Dewpoint Change (°F)"),
        label: "Dewpoint Change (°F)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: (t == 0).then(|| Note::centered(FIRST_HOUR_NOTE, Color::BLACK)),
    })
}

fn humidity(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = diag::rh2(&ctx.wrf, t)?;
    let colors = ramp("brbg")?.clone();
    let scale = ValueScale::Bands { min: 0.0, max: 100.0, step: 5.0 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "2m Relative Humidity (%)"),
        label: "Relative Humidity (%)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn mslp(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = ctx.wrf.field2("AFWA_MSLP", t)?.map(pa_to_hpa);
    let colors = two_slope(ramp("bwr_r")?, 970.0, 1013.0, 1050.0);
    let scale = ValueScale::Range { min: 970.0, max: 1050.0 };
    canvas.fill_field(&field, &colors, &scale);
    let smoothed = smooth2d(&field, 8, 6.0);
    canvas.draw_contours(
        &smoothed,
        &contour_levels(960.0, 1060.0, 4.0),
        1,
        &LineStyle::solid(Color::BLACK, 1.2),
    );
    surface_barbs(canvas, ctx, t)?;
    Ok(Finish {
        title: titled(ctx, t, "MSLP (mb)"),
        label: "MSLP (mb)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn wind_speed(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let (speed, _) = diag::wspd_wdir10(&ctx.wrf, t)?;
    let field = speed.map(mps_to_mph);
    let colors = two_slope(ramp("ylorrd")?, 0.0, 30.0, 90.0);
    let scale = ValueScale::Range { min: 0.0, max: 90.0 };
    canvas.fill_field(&field, &colors, &scale);
    let u = ctx.wrf.field2("U10", t)?;
    let v = ctx.wrf.field2("V10", t)?;
    canvas.draw_barbs(&u, &v, BARB_SPACING, BARB_SIZE, Color::BLACK, 1.0);
    canvas.draw_streamlines(
        &u,
        &v,
        &StreamlineConfig::default(),
        &LineStyle::solid(Color::BLACK, 1.0),
    );
    Ok(Finish {
        title: titled(ctx, t, "10m Wind Speed (mph)"),
        label: "Wind Speed (mph)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn wind_gust(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = ctx.wrf.field2("WSPD10MAX", t)?.map(mps_to_mph);
    let colors = two_slope(ramp("ylorrd")?, 0.0, 50.0, 110.0);
    let scale = ValueScale::Range { min: 0.0, max: 110.0 };
    canvas.fill_field(&field, &colors, &scale);
    let u = ctx.wrf.field2("U10", t)?;
    let v = ctx.wrf.field2("V10", t)?;
    canvas.draw_barbs(&u, &v, BARB_SPACING, BARB_SIZE, Color::BLACK, 1.0);
    canvas.draw_streamlines(
        &u,
        &v,
        &StreamlineConfig::default(),
        &LineStyle::solid(Color::BLACK, 1.0),
    );
    Ok(Finish {
        title: titled(ctx, t, "10m Wind Gust (mph)"),
        label: "Wind Max (mph)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn reflectivity(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = ctx
        .wrf
        .field2("REFD_COM", t)?
        .map(|v| if v < 2.0 { f64::NAN } else { v });
    let colors = ramp("nws_reflectivity")?.clone();
    let scale = ValueScale::Bands { min: 0.0, max: 75.0, step: 5.0 };
    canvas.fill_field(&field, &colors, &scale);
    surface_barbs(canvas, ctx, t)?;
    Ok(Finish {
        title: titled(ctx, t, "Composite Reflectivity (dbZ)"),
        label: "Composite Reflectivity (dbZ)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

/// Not in the built-in table; renders when a config adds it back.
fn echo_tops(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = ctx.wrf.field2("ECHOTOP", t)?;
    let colors = ramp("cividis_r")?.clone();
    let scale = ValueScale::Range { min: 0.0, max: 50000.0 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Echo Tops (m)"),
        label: "Echo Tops (m)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn helicity(
    canvas: &mut MapCanvas,
    ctx: &RunContext,
    t: usize,
    running: &mut Option<Grid2>,
) -> Result<Finish> {
    let hourly = ctx.wrf.field2("UP_HELI_MAX", t)?;
    let field = match running.take() {
        Some(prev) => prev.zip_map(&hourly, |a, b| a + b)?,
        None => hourly,
    };
    *running = Some(field.clone());

    // Translucent reflectivity underlay, then the track bands on top.
    let refl = ctx
        .wrf
        .field2("REFD_COM", t)?
        .map(|v| if v < 2.0 { f64::NAN } else { v });
    let refl_scale = ValueScale::Bands { min: 0.0, max: 75.0, step: 5.0 };
    canvas.fill_field(&refl, &ramp("nws_reflectivity")?.with_alpha(77), &refl_scale);

    let codes = field.map(|v| {
        if v.is_nan() {
            return f64::NAN;
        }
        HELICITY_LEVELS.iter().filter(|&&lvl| v >= lvl).count() as f64
    });
    let bands: Vec<Color> = std::iter::once(Color::TRANSPARENT)
        .chain(HELICITY_COLORS.iter().map(|c| c.with_alpha(178)))
        .collect();
    canvas.fill_category(&codes, &bands);
    for (&level, &color) in HELICITY_LEVELS.iter().zip(HELICITY_COLORS.iter()) {
        canvas.draw_contours(&field, &[level], 1, &LineStyle::dashed(color, 1.2));
    }
    surface_barbs(canvas, ctx, t)?;
    Ok(Finish {
        title: titled(
            ctx,
            t,
            "Helicity Tracks (m^2/s^2) + Comp. Reflectivity (dbZ, transparent)",
        ),
        label: "Helicity m^2/s^2".to_string(),
        colorbar: Colorbar::Category(HELICITY_COLORS.to_vec(), HELICITY_LABELS.to_vec()),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn cape_map(canvas: &mut MapCanvas, ctx: &RunContext, t: usize, want_cin: bool) -> Result<Finish> {
    let (cape, cin) = diag::mcape_mcin(&ctx.wrf, t)?;
    let (field, title, label) = if want_cin {
        (cin, "Max CIN (MU 500m Parcel) (J/kg)", "CIN (J/kg)")
    } else {
        (cape, "Max CAPE (MU 500m Parcel) (J/kg)", "CAPE (J/kg)")
    };
    let colors = ramp("magma_r")?.clone();
    let scale = ValueScale::Range { min: 0.0, max: 6000.0 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, title),
        label: label.to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn precip_hourly(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = accumulation_step(ctx, "AFWA_TOTPRECIP", t)?.map(mm_to_inches);
    let colors = ramp("precipitation")?.clone();
    let scale = ValueScale::Bands { min: 0.0, max: 5.0, step: 0.1 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "1 Hour Precipitation (in)"),
        label: "1 Hour Rainfall (in)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn precip_total(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = ctx.wrf.field2("AFWA_TOTPRECIP", t)?.map(mm_to_inches);
    let colors = ramp("precipitation")?.clone();
    let scale = ValueScale::Bands { min: 0.0, max: 20.0, step: 0.25 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Total Precipitation (in)"),
        label: "Precipitation (in)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn snowfall_hourly(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = accumulation_step(ctx, "SNOWNC", t)?.map(mm_to_inches);
    let colors = two_slope(ramp("blues")?, 0.0, 0.3, 3.0);
    let scale = ValueScale::Range { min: 0.0, max: 3.0 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "1 Hour Accumulated Snowfall (in)"),
        label: "Accumulated Snowfall".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn snowfall_total(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = ctx.wrf.field2("SNOWNC", t)?.map(mm_to_inches);
    let colors = two_slope(ramp("blues")?, 0.0, 1.0, 10.0);
    let scale = ValueScale::Range { min: 0.0, max: 10.0 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Total Accumulated Snowfall (in)"),
        label: "Accumulated Snowfall (in)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn cloud_cover(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let (low, mid, high) = diag::cloudfrac(&ctx.wrf, t)?;
    let field = low
        .zip_map(&mid, |a, b| a + b)?
        .zip_map(&high, |ab, c| (ab + c) * 100.0)?;
    let colors = ramp("blues_r")?.clone();
    let scale = ValueScale::Range { min: 0.0, max: 100.0 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Cloud Cover"),
        label: "Cloud Fraction (%)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: false,
        maxmin: false,
        note: None,
    })
}

fn rain_total(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = mask_at_or_below(&ctx.wrf.field2("AFWA_RAIN", t)?.map(mm_to_inches), 0.01);
    let colors = ramp("greens")?.truncated(0.2, 1.0);
    let scale = ValueScale::Bands { min: 0.0, max: 10.0, step: 0.25 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Total Rainfall (in)"),
        label: "Rainfall (in)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn snow_total_ratio(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = mask_at_or_below(
        &ctx.wrf.field2("AFWA_SNOW", t)?.map(|v| mm_to_inches(v) * 10.0),
        0.01,
    );
    let colors = ramp("blues")?.truncated(0.2, 1.0);
    let scale = ValueScale::Bands { min: 0.0, max: 15.0, step: 0.25 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Total Snowfall (in) (10:1 ratio)"),
        label: "Snowfall (in)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn snow_total_kuchera(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let tc = diag::tc(&ctx.wrf, t)?;
    let pressure = diag::pressure(&ctx.wrf, t)?;
    let ratio = kuchera_ratio(&tc, &pressure);
    let snow = ctx.wrf.field2("AFWA_SNOW", t)?;
    let field = mask_at_or_below(&snow.zip_map(&ratio, |s, r| mm_to_inches(s) * r)?, 0.01);
    let colors = ramp("blues")?.truncated(0.2, 1.0);
    let scale = ValueScale::Bands { min: 0.0, max: 15.0, step: 0.25 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Total Snowfall (in) (Kuchera ratio)"),
        label: "Snowfall (in)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: Some(Note::lower_left(KUCHERA_NOTE, Color::rgb(255, 0, 0))),
    })
}

fn freezing_rain_total(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = mask_at_or_below(&ctx.wrf.field2("AFWA_FZRA", t)?.map(mm_to_inches), 0.01);
    let colors = ramp("rdpu")?.truncated(0.2, 1.0);
    let scale = ValueScale::Bands { min: 0.0, max: 3.0, step: 0.1 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Total Freezing Rain (in)"),
        label: "Freezing Rain (in)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn ice_total(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let field = mask_at_or_below(&ctx.wrf.field2("AFWA_ICE", t)?.map(mm_to_inches), 0.01);
    let colors = ramp("oranges")?.truncated(0.2, 1.0);
    let scale = ValueScale::Bands { min: 0.0, max: 3.0, step: 0.1 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Total Ice Fall (in) (liquid equiv.)"),
        label: "Ice Fall (in)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn precip_type(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let rain = accumulation_step(ctx, "AFWA_RAIN", t)?;
    let snow = accumulation_step(ctx, "AFWA_SNOW", t)?;
    let ice = accumulation_step(ctx, "AFWA_ICE", t)?;
    let fzra = accumulation_step(ctx, "AFWA_FZRA", t)?;
    let mut codes = Grid2::filled(rain.ny(), rain.nx(), 0.0);
    for j in 0..rain.ny() {
        for i in 0..rain.nx() {
            let code = ptype_code(rain.get(j, i), snow.get(j, i), ice.get(j, i), fzra.get(j, i));
            codes.set(j, i, code);
        }
    }
    canvas.fill_category(&codes, ptype_colors());
    Ok(Finish {
        title: titled(ctx, t, "Potential Precipitation Type and Intensity"),
        label: "Precipitation Type".to_string(),
        colorbar: Colorbar::Category(ptype_colors().to_vec(), PTYPE_LABELS.to_vec()),
        field: codes,
        airports: false,
        maxmin: false,
        note: Some(Note::lower_left(INTENSITY_NOTE, Color::rgb(255, 0, 0))),
    })
}

/// Composite category for the type mesh: dominant species times three
/// intensity steps, one-based, zero below the trace cutoff.
fn ptype_code(rain: f64, snow: f64, ice: f64, fzra: f64) -> f64 {
    let rates = [snow, ice, fzra, rain];
    let total: f64 = rates.iter().sum();
    if total.is_nan() {
        return f64::NAN;
    }
    if total < 0.1 {
        return 0.0;
    }
    let mut type_id = 0;
    for (k, &rate) in rates.iter().enumerate() {
        if rate > rates[type_id] {
            type_id = k;
        }
    }
    let intensity = if total >= 7.6 {
        2
    } else if total >= 2.5 {
        1
    } else {
        0
    };
    (type_id * 3 + intensity + 1) as f64
}

fn stargazing(canvas: &mut MapCanvas, ctx: &RunContext, t: usize) -> Result<Finish> {
    let (low, mid, high) = diag::cloudfrac(&ctx.wrf, t)?;
    let pwat = ctx.wrf.field2("AFWA_PWAT", t)?;
    let (u300, v300) = level_winds(ctx, t, 300.0)?;
    let (wspd10, _) = diag::wspd_wdir10(&ctx.wrf, t)?;
    let rh2 = diag::rh2(&ctx.wrf, t)?;

    let mut field = Grid2::filled(low.ny(), low.nx(), f64::NAN);
    for j in 0..low.ny() {
        for i in 0..low.nx() {
            let clear = (1.0 - low.get(j, i)) * (1.0 - mid.get(j, i)) * (1.0 - high.get(j, i));
            let wind300 = u300.get(j, i).hypot(v300.get(j, i));
            let value =
                stargazing_index(clear, pwat.get(j, i), wind300, wspd10.get(j, i), rh2.get(j, i));
            field.set(j, i, value);
        }
    }
    let colors = ramp("rdylgn")?.clone();
    let scale = ValueScale::Bands { min: 0.0, max: 105.0, step: 5.0 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, "Lobdell Stargazing Index (0-100)"),
        label: "Index (100=Clear/Dry)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: Some(Note::lower_left(STARGAZING_NOTE, Color::BLACK)),
    })
}

/// 0-100 score. Clear sky carries most of the weight, moisture and
/// upper-level wind the rest, with flat penalties for surface wind
/// over 8 m/s and surface RH over 85%.
fn stargazing_index(clear_sky: f64, pwat_mm: f64, wind_300: f64, wind_10m: f64, rh_2m: f64) -> f64 {
    let transparency = (1.0 - pwat_mm / 30.0).clamp(0.0, 1.0);
    let seeing = (1.0 - wind_300 / 70.0).clamp(0.0, 1.0);
    let mut index = clear_sky * 75.0 + transparency * 15.0 + seeing * 10.0;
    if wind_10m > 8.0 {
        index *= 0.7;
    }
    if rh_2m > 85.0 {
        index *= 0.7;
    }
    index.clamp(0.0, 100.0)
}

fn upper_temp(canvas: &mut MapCanvas, ctx: &RunContext, t: usize, level: f64) -> Result<Finish> {
    let pressure = diag::pressure(&ctx.wrf, t)?;
    let field = diag::tc(&ctx.wrf, t)?.interp_to_level(&pressure, level)?;
    let (min, max, freezing) = match level as i64 {
        925 | 850 => (-20.0, 40.0, true),
        700 => (-30.0, 30.0, false),
        500 => (-50.0, 20.0, false),
        300 => (-70.0, 0.0, false),
        _ => {
            let (lo, hi) = field_range(&field);
            (lo, hi, false)
        }
    };
    let colors = ramp("nipy_spectral")?.clone();
    let scale = ValueScale::Bands { min, max, step: 2.0 };
    canvas.fill_field(&field, &colors, &scale);
    let title = if freezing {
        let smoothed = smooth2d(&field, 4, 2.0);
        canvas.draw_contours(&smoothed, &[0.0], 1, &LineStyle::dashed(FREEZING_LINE, 1.4));
        titled(ctx, t, format!("{level:.0}mb Temp (°C) (0°C Dashed)"))
    } else {
        titled(ctx, t, format!("{level:.0}mb Temp (°C)"))
    };
    level_barbs(canvas, ctx, t, level)?;
    Ok(Finish {
        title,
        label: "Temp (°C)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn upper_temp_change(
    canvas: &mut MapCanvas,
    ctx: &RunContext,
    t: usize,
    level: f64,
) -> Result<Finish> {
    let pressure = diag::pressure(&ctx.wrf, t)?;
    let now = diag::tc(&ctx.wrf, t)?.interp_to_level(&pressure, level)?;
    let field = if t == 0 {
        Grid2::filled(now.ny(), now.nx(), 0.0)
    } else {
        let prev_pressure = diag::pressure(&ctx.wrf, t - 1)?;
        let prev = diag::tc(&ctx.wrf, t - 1)?.interp_to_level(&prev_pressure, level)?;
        now.zip_map(&prev, |a, b| a - b)?
    };
    let colors = ramp("coolwarm")?.clone();
    let scale = ValueScale::Range { min: -15.0, max: 15.0 };
    canvas.fill_field(&field, &colors, &scale);
    level_barbs(canvas, ctx, t, level)?;
    Ok(Finish {
        title: titled(ctx, t, format!("1-Hour {level:.0}mb Temp Change (°C)")),
        label: "Temperature Change (°C)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: (t == 0).then(|| Note::centered(FIRST_HOUR_NOTE, Color::BLACK)),
    })
}

fn upper_theta_e(canvas: &mut MapCanvas, ctx: &RunContext, t: usize, level: f64) -> Result<Finish> {
    let pressure = diag::pressure(&ctx.wrf, t)?;
    let field = diag::eth(&ctx.wrf, t)?.interp_to_level(&pressure, level)?;
    let scale = match level as i64 {
        925 | 850 => ValueScale::Bands { min: 270.0, max: 330.0, step: 2.0 },
        700 => ValueScale::Bands { min: 290.0, max: 350.0, step: 2.0 },
        _ => {
            let (lo, hi) = field_range(&field);
            ValueScale::Range { min: lo, max: hi }
        }
    };
    let colors = ramp("turbo")?.clone();
    canvas.fill_field(&field, &colors, &scale);
    level_barbs(canvas, ctx, t, level)?;
    Ok(Finish {
        title: titled(ctx, t, format!("{level:.0}mb Theta E (K)")),
        label: "Theta E (K)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn upper_humidity(
    canvas: &mut MapCanvas,
    ctx: &RunContext,
    t: usize,
    level: f64,
) -> Result<Finish> {
    let pressure = diag::pressure(&ctx.wrf, t)?;
    let field = diag::rh(&ctx.wrf, t)?.interp_to_level(&pressure, level)?;
    let colors = ramp("brbg")?.clone();
    let scale = ValueScale::Bands { min: 0.0, max: 100.0, step: 5.0 };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, format!("{level:.0}mb Relative Humidity (%)")),
        label: "Relative Humidity (%)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn upper_wind(canvas: &mut MapCanvas, ctx: &RunContext, t: usize, level: f64) -> Result<Finish> {
    let (u, v) = level_winds(ctx, t, level)?;
    let field = u.zip_map(&v, |a, b| mps_to_knots(a.hypot(b)))?;
    let colors = ramp("plasma")?.clone();
    let scale = ValueScale::Range { min: 0.0, max: 135.0 };
    canvas.fill_field(&field, &colors, &scale);
    canvas.draw_barbs(&u, &v, BARB_SPACING, BARB_SIZE, Color::BLACK, 1.0);
    canvas.draw_streamlines(
        &u,
        &v,
        &StreamlineConfig::default(),
        &LineStyle::solid(Color::BLACK, 1.0),
    );
    Ok(Finish {
        title: titled(ctx, t, format!("{level:.0}mb Wind Speed (kt)")),
        label: "Wind Speed (kt)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn upper_heights(canvas: &mut MapCanvas, ctx: &RunContext, t: usize, level: f64) -> Result<Finish> {
    let pressure = diag::pressure(&ctx.wrf, t)?;
    let field = diag::z(&ctx.wrf, t)?
        .interp_to_level(&pressure, level)?
        .map(|v| v / 10.0);
    let (min, max) = match level as i64 {
        700 => (250.0, 350.0),
        500 => (500.0, 600.0),
        _ => field_range(&field),
    };
    let colors = ramp("coolwarm")?.clone();
    let scale = ValueScale::Range { min, max };
    canvas.fill_field(&field, &colors, &scale);
    let smoothed = smooth2d(&field, 40, 6.0);
    canvas.draw_contours(
        &smoothed,
        &contour_levels(100.0, 1000.0, 5.0),
        1,
        &LineStyle::solid(Color::BLACK, 1.2),
    );
    level_barbs(canvas, ctx, t, level)?;
    Ok(Finish {
        title: titled(ctx, t, format!("{level:.0}mb Height (dam)")),
        label: "Height (dam)".to_string(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}

fn unconfigured(
    canvas: &mut MapCanvas,
    ctx: &RunContext,
    spec: &ProductSpec,
    t: usize,
) -> Result<Finish> {
    let field = ctx.wrf.field2(&spec.field, t)?;
    let (min, max) = field_range(&field);
    let colors = ramp("coolwarm")?.clone();
    let scale = ValueScale::Range { min, max };
    canvas.fill_field(&field, &colors, &scale);
    Ok(Finish {
        title: titled(ctx, t, format!("Unconfigured product: {}", spec.field)),
        label: spec.field.clone(),
        colorbar: Colorbar::Ramp(colors, scale),
        field,
        airports: true,
        maxmin: true,
        note: None,
    })
}
