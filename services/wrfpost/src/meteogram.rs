//! Station meteograms: temperature, dewpoint and sea level pressure
//! traces over the forecast period for every configured airport, with
//! a surface wind barb row along the bottom of the chart.

use std::fs;

use anyhow::{anyhow, Context, Result};
use tiny_skia::{Paint, Pixmap, Rect, Transform};
use tracing::{error, info, warn};

use renderer::barbs::draw_barb;
use renderer::chart::{draw_legend, format_tick, nice_ticks, Axis, ChartArea};
use renderer::contour::LineStyle;
use renderer::png;
use renderer::text::{
    draw_text, draw_text_centered, draw_text_halo, draw_text_rotated, measure_text, TextStyle,
};
use renderer::Color;
use wrf_common::units::{celsius_to_fahrenheit, kelvin_to_fahrenheit, pa_to_hpa};
use wrf_common::Grid2;
use wrf_decoder::diag;

use crate::context::RunContext;

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;
const CHART_X0: f32 = 70.0;
const CHART_Y0: f32 = 70.0;
const CHART_W: f32 = 820.0;
const CHART_H: f32 = 420.0;
const BARB_SIZE: f32 = 14.0;

const TEMP_COLOR: Color = Color::rgb(255, 0, 0);
const DEWP_COLOR: Color = Color::rgb(0, 128, 0);
const PRES_COLOR: Color = Color::rgb(0, 0, 255);

/// One set of surface grids per forecast timestep, shared by every
/// airport so the file is only decoded once.
struct StepGrids {
    t2: Grid2,
    td2: Grid2,
    mslp: Grid2,
    u10: Grid2,
    v10: Grid2,
}

/// Values sampled at one airport's grid point, hour 1 onward.
struct Series {
    timesteps: Vec<usize>,
    temp_f: Vec<f64>,
    dewp_f: Vec<f64>,
    pres_mb: Vec<f64>,
    wind_uv: Vec<(f64, f64)>,
}

pub fn run(ctx: &RunContext) -> Result<()> {
    if ctx.partial {
        warn!("partial run: meteograms need the full period, skipping");
        return Ok(());
    }
    if ctx.hours() < 2 {
        warn!("fewer than two timesteps, skipping meteograms");
        return Ok(());
    }

    let mut steps = Vec::with_capacity(ctx.hours() - 1);
    for t in 1..ctx.hours() {
        steps.push(StepGrids {
            t2: ctx.wrf.field2("T2", t)?,
            td2: diag::td2(&ctx.wrf, t)?,
            mslp: ctx.wrf.field2("AFWA_MSLP", t)?,
            u10: ctx.wrf.field2("U10", t)?,
            v10: ctx.wrf.field2("V10", t)?,
        });
    }

    for airport in ctx.config.all_airports() {
        if let Err(err) = plot_airport(ctx, &airport.id, ctx.airport_index(&airport), &steps) {
            error!(airport = %airport.id, error = %err, "meteogram failed");
        }
    }
    info!(airports = ctx.config.all_airports().len(), "meteograms written");
    Ok(())
}

fn plot_airport(
    ctx: &RunContext,
    airport_id: &str,
    (j, i): (usize, usize),
    steps: &[StepGrids],
) -> Result<()> {
    let series = sample_series(steps, j, i);
    let figure = draw_meteogram(ctx, airport_id, &series)?;

    let dir = ctx.ensure_dir(format!("meteogram/{airport_id}"))?;
    let path = dir.join("meteogram.png");
    fs::write(&path, png::encode(&figure)?).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn sample_series(steps: &[StepGrids], j: usize, i: usize) -> Series {
    let mut series = Series {
        timesteps: Vec::with_capacity(steps.len()),
        temp_f: Vec::with_capacity(steps.len()),
        dewp_f: Vec::with_capacity(steps.len()),
        pres_mb: Vec::with_capacity(steps.len()),
        wind_uv: Vec::with_capacity(steps.len()),
    };
    for (k, step) in steps.iter().enumerate() {
        series.timesteps.push(k + 1);
        series.temp_f.push(kelvin_to_fahrenheit(step.t2.get(j, i)));
        series.dewp_f.push(celsius_to_fahrenheit(step.td2.get(j, i)));
        series.pres_mb.push(pa_to_hpa(step.mslp.get(j, i)));
        series.wind_uv.push((step.u10.get(j, i), step.v10.get(j, i)));
    }
    series
}

fn draw_meteogram(ctx: &RunContext, airport_id: &str, series: &Series) -> Result<Pixmap> {
    let mut figure =
        Pixmap::new(WIDTH, HEIGHT).ok_or_else(|| anyhow!("meteogram figure allocation failed"))?;
    figure.fill(tiny_skia::Color::WHITE);

    let (t_lo, t_hi) = padded_range(series.temp_f.iter().chain(&series.dewp_f), 4.0)
        .ok_or_else(|| anyhow!("no finite temperature data at the station point"))?;
    let (p_lo, p_hi) = padded_range(series.pres_mb.iter(), 2.0)
        .ok_or_else(|| anyhow!("no finite pressure data at the station point"))?;

    let first = series.timesteps[0] as f64;
    let last = *series.timesteps.last().unwrap() as f64;
    // A single point still needs a non-degenerate axis.
    let x_hi = if last > first { last } else { first + 1.0 };

    let temp_area = ChartArea::new(
        CHART_X0,
        CHART_Y0,
        CHART_W,
        CHART_H,
        Axis::linear(first, x_hi),
        Axis::linear(t_lo, t_hi),
    );
    let pres_area = ChartArea::new(
        CHART_X0,
        CHART_Y0,
        CHART_W,
        CHART_H,
        Axis::linear(first, x_hi),
        Axis::linear(p_lo, p_hi),
    );

    let grid_style = LineStyle::solid(Color::rgb(176, 176, 176), 0.8);
    let hour_ticks: Vec<f64> = series.timesteps.iter().map(|&t| t as f64).collect();
    let temp_ticks = nice_ticks(t_lo, t_hi, 8);
    let pres_ticks = nice_ticks(p_lo, p_hi, 8);
    temp_area.grid_x(&mut figure, &hour_ticks, &grid_style);
    temp_area.grid_y(&mut figure, &temp_ticks, &grid_style);

    let freezing = series.temp_f.iter().any(|&v| v <= 32.0);
    if freezing && temp_area.y_axis.contains(32.0) {
        temp_area.polyline(
            &mut figure,
            &[(first, 32.0), (x_hi, 32.0)],
            &LineStyle::dashed(PRES_COLOR, 1.5),
        );
    }

    let temp_points: Vec<(f64, f64)> = hour_ticks.iter().copied().zip(series.temp_f.iter().copied()).collect();
    let dewp_points: Vec<(f64, f64)> = hour_ticks.iter().copied().zip(series.dewp_f.iter().copied()).collect();
    let pres_points: Vec<(f64, f64)> = hour_ticks.iter().copied().zip(series.pres_mb.iter().copied()).collect();
    temp_area.polyline(&mut figure, &temp_points, &LineStyle::solid(TEMP_COLOR, 1.5));
    temp_area.polyline(&mut figure, &dewp_points, &LineStyle::solid(DEWP_COLOR, 1.5));
    pres_area.polyline(&mut figure, &pres_points, &LineStyle::solid(PRES_COLOR, 1.5));

    // Barbs sit in a fixed row just above the bottom edge.
    let barb_y = CHART_Y0 + CHART_H - 18.0;
    for (&hour, &(u, v)) in hour_ticks.iter().zip(&series.wind_uv) {
        let (px, _) = temp_area.to_px(hour, t_lo);
        draw_barb(&mut figure, px, barb_y, u, v, BARB_SIZE, Color::BLACK, 1.0);
    }

    temp_area.frame(&mut figure, &LineStyle::solid(Color::BLACK, 1.0));

    let tick_style = TextStyle::new(12.0, Color::BLACK);
    temp_area.label_y_ticks(&mut figure, &temp_ticks, &tick_style, format_tick);
    for &t in &pres_ticks {
        if !pres_area.y_axis.contains(t) {
            continue;
        }
        let (_, py) = pres_area.to_px(first, t);
        draw_text(
            &mut figure,
            CHART_X0 + CHART_W + 6.0,
            py - tick_style.size * 0.5,
            &format_tick(t),
            &tick_style,
        );
    }
    label_hours(ctx, &mut figure, &temp_area, series, &tick_style);

    annotate_extremes(&mut figure, &temp_area, &hour_ticks, &series.temp_f, "F", TEMP_COLOR);
    annotate_extremes(&mut figure, &temp_area, &hour_ticks, &series.dewp_f, "F", DEWP_COLOR);
    annotate_extremes(&mut figure, &pres_area, &hour_ticks, &series.pres_mb, "mb", PRES_COLOR);

    let label_style = TextStyle::new(14.0, Color::BLACK);
    let left_label = "Temperature / Dewpoint (°F)";
    draw_text_rotated(
        &mut figure,
        18.0,
        CHART_Y0 + (CHART_H + measure_text(left_label, label_style.size)) / 2.0,
        -90.0,
        left_label,
        &label_style,
    );
    let right_label = "Pressure (mb)";
    draw_text_rotated(
        &mut figure,
        WIDTH as f32 - 34.0,
        CHART_Y0 + (CHART_H + measure_text(right_label, label_style.size)) / 2.0,
        -90.0,
        right_label,
        &label_style,
    );
    draw_text_centered(
        &mut figure,
        CHART_X0 + CHART_W / 2.0,
        HEIGHT as f32 - 52.0,
        "Forecast Hour",
        &label_style,
    );

    let title = format!(
        "WRF Meteogram for {} starting at {} UTC - Init: {}",
        airport_id.to_uppercase(),
        ctx.times[1].format("%Y-%m-%d %H:%M:%S"),
        ctx.times[0].format("%Y-%m-%d %H:%M:%S"),
    );
    draw_text_centered(&mut figure, WIDTH as f32 / 2.0, 16.0, &title, &TextStyle::bold(16.0, Color::BLACK));

    let mut entries: Vec<(&str, Color)> = vec![
        ("Temperature (°F)", TEMP_COLOR),
        ("Dewpoint (°F)", DEWP_COLOR),
    ];
    if freezing {
        entries.push(("Freezing (32°F)", PRES_COLOR));
    }
    entries.push(("Pressure (mb)", PRES_COLOR));
    let legend_style = TextStyle::new(12.0, Color::BLACK);
    draw_legend_boxed(&mut figure, CHART_X0 + 10.0, CHART_Y0 + 10.0, &entries, &legend_style);

    draw_text(
        &mut figure,
        8.0,
        HEIGHT as f32 - 20.0,
        &ctx.run_tag(),
        &TextStyle::new(12.0, Color::BLACK),
    );

    Ok(figure)
}

/// Valid-time labels under every nth hour tick, slanted so long runs
/// stay readable.
fn label_hours(
    ctx: &RunContext,
    figure: &mut Pixmap,
    area: &ChartArea,
    series: &Series,
    style: &TextStyle,
) {
    let stride = label_stride(series.timesteps.len());
    for (k, &t) in series.timesteps.iter().enumerate() {
        if k % stride != 0 {
            continue;
        }
        let label = ctx.times[t].format("%H UTC").to_string();
        let (px, _) = area.to_px(t as f64, area.y_axis.min);
        let py = area.y0 + area.height;
        // Slanted with the right end near the tick.
        let w = measure_text(&label, style.size);
        draw_text_rotated(
            figure,
            px - w * 0.707,
            py + 8.0 + w * 0.707,
            -45.0,
            &label,
            style,
        );
    }
}

/// Every hour up to a day, then thinned to keep at most 24 labels.
fn label_stride(points: usize) -> usize {
    points.div_ceil(24).max(1)
}

/// Annotate the maximum and minimum of a series next to the point
/// itself, haloed so the label survives crossing the other traces.
fn annotate_extremes(
    figure: &mut Pixmap,
    area: &ChartArea,
    hours: &[f64],
    values: &[f64],
    unit: &str,
    color: Color,
) {
    let style = TextStyle::new(14.0, color);
    if let Some((k, v)) = max_point(values) {
        place_annotation(figure, area, hours[k], v, &format!("{v:.1} {unit}"), &style, true);
    }
    if let Some((k, v)) = min_point(values) {
        place_annotation(figure, area, hours[k], v, &format!("{v:.1} {unit}"), &style, false);
    }
}

fn place_annotation(
    figure: &mut Pixmap,
    area: &ChartArea,
    x: f64,
    y: f64,
    text: &str,
    style: &TextStyle,
    above: bool,
) {
    let (px, py) = area.to_px(x, y);
    let w = measure_text(text, style.size);
    let mut tx = px + 6.0;
    if tx + w > area.x0 + area.width {
        tx = px - w - 6.0;
    }
    let ty = if above { py - 20.0 } else { py + 8.0 };
    draw_text_halo(figure, tx, ty, text, style, Color::BLACK);
}

fn max_point(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

fn min_point(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Finite-value range with a constant pad on both sides.
fn padded_range<'a>(values: impl Iterator<Item = &'a f64>, pad: f64) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if lo > hi {
        return None;
    }
    Some((lo - pad, hi + pad))
}

/// Legend with a translucent white backing, upper-left style.
fn draw_legend_boxed(
    figure: &mut Pixmap,
    x: f32,
    y: f32,
    entries: &[(&str, Color)],
    style: &TextStyle,
) {
    let row = style.size * 1.5;
    let swatch = style.size * 0.9;
    let widest = entries
        .iter()
        .map(|(label, _)| measure_text(label, style.size))
        .fold(0.0, f32::max);
    let w = swatch + style.size * 0.5 + widest + 12.0;
    let h = entries.len() as f32 * row + 6.0;
    if let Some(rect) = Rect::from_xywh(x - 6.0, y - 6.0, w, h) {
        let mut paint = Paint::default();
        paint.set_color(Color::rgba(255, 255, 255, 128).to_skia());
        figure.fill_rect(rect, &paint, Transform::identity(), None);
    }
    draw_legend(figure, x, y, entries, style);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_skip_non_finite_values() {
        let values = [f64::NAN, 3.0, 7.0, f64::NAN, 1.0];
        assert_eq!(max_point(&values), Some((2, 7.0)));
        assert_eq!(min_point(&values), Some((4, 1.0)));
        assert_eq!(max_point(&[f64::NAN]), None);
    }

    #[test]
    fn hour_labels_thin_out_on_long_runs() {
        assert_eq!(label_stride(1), 1);
        assert_eq!(label_stride(24), 1);
        assert_eq!(label_stride(25), 2);
        assert_eq!(label_stride(48), 2);
        assert_eq!(label_stride(49), 3);
        assert_eq!(label_stride(84), 4);
    }

    #[test]
    fn padded_range_ignores_gaps() {
        let values = [55.0, f64::NAN, 61.0, 58.0];
        assert_eq!(padded_range(values.iter(), 4.0), Some((51.0, 65.0)));
        assert_eq!(padded_range([f64::NAN].iter(), 4.0), None);
    }

    #[test]
    fn series_sampling_converts_units() {
        let steps = vec![StepGrids {
            t2: Grid2::filled(1, 1, 278.6),
            td2: Grid2::filled(1, 1, 0.9),
            mslp: Grid2::filled(1, 1, 101340.0),
            u10: Grid2::filled(1, 1, 3.0),
            v10: Grid2::filled(1, 1, -4.0),
        }];
        let series = sample_series(&steps, 0, 0);
        assert_eq!(series.timesteps, vec![1]);
        assert!((series.temp_f[0] - 41.81).abs() < 0.01);
        assert!((series.dewp_f[0] - 33.62).abs() < 0.01);
        assert!((series.pres_mb[0] - 1013.4).abs() < 1e-9);
        assert_eq!(series.wind_uv[0], (3.0, -4.0));
    }
}
