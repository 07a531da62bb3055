//! Upper air charts for the high priority airports: a Skew-T Log-P
//! diagram with a hodograph inset and a stability parameter block for
//! every forecast hour, plus a standalone hodograph.

use std::fs;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use metfor::{Celsius, HectoPascal, JpKg, Kelvin, Quantity};
use optional::Optioned;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Transform};
use tracing::{error, info};

use renderer::barbs::draw_barb;
use renderer::chart::Axis;
use renderer::color::ramp;
use renderer::contour::{stroke_polyline, LineStyle};
use renderer::png;
use renderer::text::{
    draw_text, draw_text_boxed, draw_text_centered, draw_text_halo, draw_text_right,
    draw_text_rotated, measure_text, TextStyle,
};
use renderer::Color;
use sounding::{
    indexes, lift_parcel, most_unstable_parcel, surface_parcel, AnalysisResult,
    ParcelAscentAnalysis, ParcelProfile, Sounding,
};
use wrf_common::units::mps_to_knots;
use wrf_common::Airport;
use wrf_decoder::diag;

use crate::context::RunContext;

const FIG_WIDTH: u32 = 1000;
const FIG_HEIGHT: u32 = 800;
const SKEW_X0: f32 = 70.0;
const SKEW_Y0: f32 = 80.0;
const SKEW_W: u32 = 600;
const SKEW_H: u32 = 660;

const INSET_X0: f32 = 706.0;
const INSET_Y0: f32 = 80.0;
const INSET_SIDE: u32 = 270;

const HODO_FIG: u32 = 600;
const HODO_PANEL: u32 = 460;

/// Maximum wind component shown on a hodograph, in knots.
const HODO_RANGE: f64 = 80.0;

const TEMP_COLOR: Color = Color::rgb(255, 0, 0);
const DEWP_COLOR: Color = Color::rgb(0, 128, 0);

pub fn run(ctx: &RunContext) -> Result<()> {
    for airport in &ctx.config.high_priority {
        let start = Instant::now();
        if let Err(err) = plot_airport(ctx, airport) {
            error!(airport = %airport.id, error = %err, "upper air plots failed");
            continue;
        }
        info!(
            airport = %airport.id,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "upper air plots written"
        );
    }
    Ok(())
}

fn plot_airport(ctx: &RunContext, airport: &Airport) -> Result<()> {
    let (j, i) = ctx.airport_index(airport);
    let dir = ctx.ensure_dir(format!("skewt/{}", airport.id))?;

    for t in 0..ctx.hours() {
        let snd = diag::column(&ctx.wrf, t, j, i)?;
        let f_hour = ctx.forecast_hour(t);

        let skew = draw_skewt_figure(ctx, &airport.id, t, &snd)?;
        let path = dir.join(format!("hour_{f_hour}.png"));
        fs::write(&path, png::encode(&skew)?)
            .with_context(|| format!("Failed to write {:?}", path))?;

        let hodo = draw_hodograph_figure(ctx, &airport.id, t, &snd)?;
        let path = dir.join(format!("hodograph_hour_{f_hour}.png"));
        fs::write(&path, png::encode(&hodo)?)
            .with_context(|| format!("Failed to write {:?}", path))?;
    }
    Ok(())
}

// ============================================================================
// Skew-T figure
// ============================================================================

fn draw_skewt_figure(
    ctx: &RunContext,
    airport_id: &str,
    t: usize,
    snd: &Sounding,
) -> Result<Pixmap> {
    let mut figure = Pixmap::new(FIG_WIDTH, FIG_HEIGHT)
        .ok_or_else(|| anyhow!("skew-t figure allocation failed"))?;
    figure.fill(tiny_skia::Color::WHITE);

    // Surface based ascent drives the parcel curve, shading and the
    // LCL/LFC markers; a failed analysis just leaves them off.
    let sb_ascent = surface_parcel(snd).and_then(|p| lift_parcel(p, snd)).ok();

    let panel = draw_skew_panel(snd, sb_ascent.as_ref())?;
    figure.draw_pixmap(
        SKEW_X0 as i32,
        SKEW_Y0 as i32,
        panel.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    draw_skew_frame(&mut figure);

    let inset = draw_hodograph_panel(
        &wind_trace(snd),
        INSET_SIDE,
        &HodographStyle {
            trace_width: 1.5,
            marker_size: 8.0,
            marker_alpha: 102,
        },
    )?;
    figure.draw_pixmap(
        INSET_X0 as i32,
        INSET_Y0 as i32,
        inset.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    frame_rect(
        &mut figure,
        INSET_X0,
        INSET_Y0,
        INSET_SIDE as f32,
        INSET_SIDE as f32,
    );
    let inset_cx = INSET_X0 + INSET_SIDE as f32 / 2.0;
    draw_text_centered(
        &mut figure,
        inset_cx,
        60.0,
        "Hodograph",
        &TextStyle::bold(13.0, Color::BLACK),
    );
    let small = TextStyle::new(11.0, Color::BLACK);
    draw_text_centered(
        &mut figure,
        inset_cx,
        INSET_Y0 + INSET_SIDE as f32 + 6.0,
        "U (knots)",
        &small,
    );
    draw_text_rotated(
        &mut figure,
        INSET_X0 - 24.0,
        INSET_Y0 + (INSET_SIDE as f32 + measure_text("V (knots)", small.size)) / 2.0,
        -90.0,
        "V (knots)",
        &small,
    );

    draw_parameter_block(&mut figure, snd, sb_ascent.as_ref());

    draw_text_centered(
        &mut figure,
        SKEW_X0 + SKEW_W as f32 / 2.0,
        60.0,
        "Skew-T Log-P",
        &TextStyle::bold(14.0, Color::BLACK),
    );
    draw_text_centered(
        &mut figure,
        400.0,
        14.0,
        &format!(
            "Upper Air Data for {} - Hour {}",
            airport_id.to_uppercase(),
            ctx.forecast_hour(t)
        ),
        &TextStyle::bold(17.0, Color::BLACK),
    );
    draw_text_centered(
        &mut figure,
        400.0,
        38.0,
        &format!("Valid: {} - Init: {}", ctx.valid_label(t), ctx.init_label()),
        &TextStyle::new(13.0, Color::BLACK),
    );
    draw_text(
        &mut figure,
        8.0,
        FIG_HEIGHT as f32 - 20.0,
        &ctx.run_tag(),
        &TextStyle::new(12.0, Color::BLACK),
    );

    Ok(figure)
}

/// Frame, tick labels and axis labels around the skew panel.
fn draw_skew_frame(figure: &mut Pixmap) {
    let (w, h) = (SKEW_W as f32, SKEW_H as f32);
    frame_rect(figure, SKEW_X0, SKEW_Y0, w, h);

    let transform = SkewTransform::new(w, h);
    let tick_style = TextStyle::new(12.0, Color::BLACK);
    for p in (1..=10).map(|k| k as f64 * 100.0) {
        let ypos = transform.p_axis.pos(p);
        let py = SKEW_Y0 + h * (1.0 - ypos as f32);
        draw_text_right(figure, SKEW_X0 - 6.0, py - 6.0, &format!("{p:.0}"), &tick_style);
    }
    for t in (-4..=4).map(|k| k as f64 * 10.0) {
        let px = SKEW_X0 + w * transform.t_axis.pos(t) as f32;
        draw_text_centered(figure, px, SKEW_Y0 + h + 6.0, &format!("{t:.0}"), &tick_style);
    }

    let label_style = TextStyle::new(14.0, Color::BLACK);
    draw_text_centered(
        figure,
        SKEW_X0 + w / 2.0,
        SKEW_Y0 + h + 24.0,
        "Temperature (°C)",
        &label_style,
    );
    draw_text_rotated(
        figure,
        14.0,
        SKEW_Y0 + (h + measure_text("Pressure (hPa)", label_style.size)) / 2.0,
        -90.0,
        "Pressure (hPa)",
        &label_style,
    );
}

/// Temperature skewed against log pressure. The bottom edge spans
/// -40..40 C and isotherms run at 45 degrees in pixel space.
struct SkewTransform {
    width: f32,
    height: f32,
    t_axis: Axis,
    p_axis: Axis,
}

impl SkewTransform {
    fn new(width: f32, height: f32) -> Self {
        SkewTransform {
            width,
            height,
            t_axis: Axis::linear(-40.0, 40.0),
            p_axis: Axis::log(1000.0, 100.0),
        }
    }

    /// Degrees of rightward shift over the full panel height.
    fn skew_amount(&self) -> f64 {
        let span = self.t_axis.max - self.t_axis.min;
        (self.height / self.width) as f64 * span
    }

    fn to_px(&self, t_c: f64, p_hpa: f64) -> (f32, f32) {
        let ypos = self.p_axis.pos(p_hpa);
        let x = self.t_axis.pos(t_c + ypos * self.skew_amount());
        (
            self.width * x as f32,
            self.height * (1.0 - ypos) as f32,
        )
    }
}

fn draw_skew_panel(snd: &Sounding, ascent: Option<&ParcelAscentAnalysis>) -> Result<Pixmap> {
    let mut panel =
        Pixmap::new(SKEW_W, SKEW_H).ok_or_else(|| anyhow!("skew panel allocation failed"))?;
    panel.fill(tiny_skia::Color::WHITE);
    let skew = SkewTransform::new(SKEW_W as f32, SKEW_H as f32);

    draw_isotherms(&mut panel, &skew);
    draw_dry_adiabats(&mut panel, &skew);
    draw_moist_adiabats(&mut panel, &skew);
    draw_mixing_lines(&mut panel, &skew);

    if let Some(ascent) = ascent {
        shade_cape(&mut panel, &skew, ascent.profile());
    }

    let env_t: Vec<(f64, f64)> = profile_points(snd, |row| row.temperature);
    let env_td: Vec<(f64, f64)> = profile_points(snd, |row| row.dew_point);
    stroke_data(&mut panel, &skew, &env_t, &LineStyle::solid(TEMP_COLOR, 2.0));
    stroke_data(&mut panel, &skew, &env_td, &LineStyle::solid(DEWP_COLOR, 2.0));

    if let Some(ascent) = ascent {
        draw_parcel_curve(&mut panel, &skew, ascent);
    }
    draw_surface_labels(&mut panel, &skew, snd);
    draw_profile_barbs(&mut panel, &skew, snd);

    Ok(panel)
}

/// Skewed isotherm grid every 10 C, with the freezing line dashed black.
fn draw_isotherms(panel: &mut Pixmap, skew: &SkewTransform) {
    let grid = LineStyle::solid(Color::rgba(128, 128, 128, 90), 1.0);
    let freezing = LineStyle::dashed(Color::BLACK, 1.5);
    let mut t = -100.0;
    while t <= 40.0 {
        let pts = [skew.to_px(t, 1000.0), skew.to_px(t, 100.0)];
        let style = if t == 0.0 { &freezing } else { &grid };
        stroke_polyline(panel, &pts, style);
        t += 10.0;
    }
}

fn draw_dry_adiabats(panel: &mut Pixmap, skew: &SkewTransform) {
    let style = LineStyle::dashed(Color::rgba(255, 0, 0, 64), 1.0);
    for theta_c in (-30..=170).step_by(10) {
        let theta = Kelvin::from(Celsius(theta_c as f64));
        let mut pts = Vec::new();
        let mut p = 1000.0;
        while p >= 100.0 {
            let t_k = metfor::temperature_from_theta(theta, HectoPascal(p));
            pts.push(skew.to_px(Celsius::from(t_k).unpack(), p));
            p -= 10.0;
        }
        stroke_polyline(panel, &pts, &style);
    }
}

fn draw_moist_adiabats(panel: &mut Pixmap, skew: &SkewTransform) {
    let style = LineStyle::dashed(Color::rgba(0, 0, 255, 64), 1.0);
    for t0 in (-20..=40).step_by(5) {
        let t0 = Celsius(t0 as f64);
        let Some(theta_e) = metfor::theta_e(t0, t0, HectoPascal(1000.0)) else {
            continue;
        };
        let mut pts = Vec::new();
        let mut p = 1000.0;
        while p >= 100.0 {
            match metfor::temperature_from_theta_e_saturated_and_pressure(HectoPascal(p), theta_e)
            {
                Some(t_c) => pts.push(skew.to_px(t_c.unpack(), p)),
                None => break,
            }
            p -= 10.0;
        }
        stroke_polyline(panel, &pts, &style);
    }
}

/// Constant mixing ratio lines from the surface up to 600 hPa.
fn draw_mixing_lines(panel: &mut Pixmap, skew: &SkewTransform) {
    const RATIOS: [f64; 8] = [0.001, 0.002, 0.004, 0.007, 0.010, 0.016, 0.024, 0.032];
    let style = LineStyle::dashed(Color::rgba(0, 128, 0, 100), 1.0);
    for mw in RATIOS {
        let mut pts = Vec::new();
        let mut p = 1000.0;
        while p >= 600.0 {
            match metfor::dew_point_from_p_and_mw(HectoPascal(p), mw) {
                Some(dp) => pts.push(skew.to_px(dp.unpack(), p)),
                None => break,
            }
            p -= 25.0;
        }
        stroke_polyline(panel, &pts, &style);
    }
}

/// (value C, pressure hPa) pairs for one profile variable.
fn profile_points(
    snd: &Sounding,
    pick: impl Fn(&sounding::DataRow) -> Optioned<Celsius>,
) -> Vec<(f64, f64)> {
    snd.bottom_up()
        .filter_map(|row| {
            let p = row.pressure.into_option()?;
            let v = pick(&row).into_option()?;
            Some((v.unpack(), p.unpack()))
        })
        .collect()
}

fn stroke_data(panel: &mut Pixmap, skew: &SkewTransform, points: &[(f64, f64)], style: &LineStyle) {
    let pts: Vec<(f32, f32)> = points.iter().map(|&(t, p)| skew.to_px(t, p)).collect();
    stroke_polyline(panel, &pts, style);
}

/// Translucent red fill between the parcel and environment curves where
/// the parcel is the warmer of the two.
fn shade_cape(panel: &mut Pixmap, skew: &SkewTransform, profile: &ParcelProfile) {
    let mut paint = Paint::default();
    paint.set_color(Color::rgba(255, 0, 0, 70).to_skia());
    paint.anti_alias = true;

    for k in 1..profile.pressure.len() {
        let p0 = profile.pressure[k - 1].unpack();
        let p1 = profile.pressure[k].unpack();
        let pt0 = profile.parcel_t[k - 1].unpack();
        let pt1 = profile.parcel_t[k].unpack();
        let et0 = profile.environment_t[k - 1].unpack();
        let et1 = profile.environment_t[k].unpack();
        if pt0 <= et0 || pt1 <= et1 {
            continue;
        }

        let corners = [
            skew.to_px(et0, p0),
            skew.to_px(pt0, p0),
            skew.to_px(pt1, p1),
            skew.to_px(et1, p1),
        ];
        let mut pb = PathBuilder::new();
        pb.move_to(corners[0].0, corners[0].1);
        for &(x, y) in &corners[1..] {
            pb.line_to(x, y);
        }
        pb.close();
        if let Some(path) = pb.finish() {
            panel.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

fn draw_parcel_curve(panel: &mut Pixmap, skew: &SkewTransform, ascent: &ParcelAscentAnalysis) {
    let profile = ascent.profile();
    let pts: Vec<(f32, f32)> = profile
        .pressure
        .iter()
        .zip(&profile.parcel_t)
        .map(|(p, t)| skew.to_px(t.unpack(), p.unpack()))
        .collect();
    stroke_polyline(panel, &pts, &LineStyle::solid(Color::BLACK, 2.0));

    let boxed = TextStyle::new(14.0, Color::BLACK);
    let backing = Color::rgba(255, 255, 255, 178);
    if let (Some(p), Some(t)) = (
        ascent.lcl_pressure().into_option(),
        ascent.lcl_temperature().into_option(),
    ) {
        let (px, py) = skew.to_px(t.unpack(), p.unpack());
        fill_dot(panel, px, py, 4.0, Color::BLACK);
        draw_text_boxed(panel, px + 8.0, py - 7.0, "LCL", &boxed, backing);
    }
    if let Some(p) = ascent.lfc_pressure().into_option() {
        if let Some(t) = profile_t_at(profile, p.unpack()) {
            let (px, py) = skew.to_px(t, p.unpack());
            ring_dot(panel, px, py, 4.0, Color::BLACK);
            draw_text_boxed(panel, px + 8.0, py - 7.0, "LFC", &boxed, backing);
        }
    }
}

/// Parcel temperature at a pressure, interpolated in log pressure.
fn profile_t_at(profile: &ParcelProfile, target: f64) -> Option<f64> {
    for k in 1..profile.pressure.len() {
        let p0 = profile.pressure[k - 1].unpack();
        let p1 = profile.pressure[k].unpack();
        if p0 <= p1 || target > p0 || target < p1 {
            continue;
        }
        let f = (p0.ln() - target.ln()) / (p0.ln() - p1.ln());
        let t0 = profile.parcel_t[k - 1].unpack();
        let t1 = profile.parcel_t[k].unpack();
        return Some(t0 + f * (t1 - t0));
    }
    None
}

/// Dots on the lowest level with haloed temperature readouts beside
/// them.
fn draw_surface_labels(panel: &mut Pixmap, skew: &SkewTransform, snd: &Sounding) {
    let Some((p, t, dp)) = snd.bottom_up().find_map(|row| {
        let p = row.pressure.into_option()?;
        let t = row.temperature.into_option()?;
        let dp = row.dew_point.into_option()?;
        Some((p.unpack(), t.unpack(), dp.unpack()))
    }) else {
        return;
    };

    let style_t = TextStyle::bold(16.0, TEMP_COLOR);
    let style_td = TextStyle::bold(16.0, DEWP_COLOR);
    let (tx, ty) = skew.to_px(t, p);
    let (dx, dy) = skew.to_px(dp, p);
    fill_dot(panel, tx, ty, 4.0, TEMP_COLOR);
    fill_dot(panel, dx, dy, 4.0, DEWP_COLOR);

    let t_text = format!("{t:.1}°C");
    let td_text = format!("{dp:.1}°C");
    draw_text_halo(panel, tx + 16.0, ty - style_t.size, &t_text, &style_t, Color::BLACK);
    draw_text_halo(
        panel,
        dx - 16.0 - measure_text(&td_text, style_td.size),
        dy - style_td.size,
        &td_text,
        &style_td,
        Color::BLACK,
    );
}

/// Wind barbs along the right edge, thinned so dense surface layers do
/// not overdraw each other.
fn draw_profile_barbs(panel: &mut Pixmap, skew: &SkewTransform, snd: &Sounding) {
    let x = SKEW_W as f32 - 30.0;
    let mut last_y = f32::INFINITY;
    for row in snd.bottom_up() {
        let (Some(p), Some(wind)) = (row.pressure.into_option(), row.wind.into_option()) else {
            continue;
        };
        let (_, py) = skew.to_px(0.0, p.unpack());
        if last_y - py < 12.0 {
            continue;
        }
        last_y = py;
        draw_barb(
            panel,
            x,
            py,
            wind.u.unpack(),
            wind.v.unpack(),
            14.0,
            Color::BLACK,
            1.0,
        );
    }
}

/// Stability parameters beside the skew panel, under the inset.
fn draw_parameter_block(figure: &mut Pixmap, snd: &Sounding, sb: Option<&ParcelAscentAnalysis>) {
    let mu = most_unstable_parcel(snd).and_then(|p| lift_parcel(p, snd)).ok();
    let (mucape, mucin) = ascent_energy(mu.as_ref());
    let (sbcape, sbcin) = ascent_energy(sb);

    let lines = [
        format!("MUCAPE: {mucape}"),
        format!("MUCIN: {mucin}"),
        format!("SBCAPE: {sbcape}"),
        format!("SBCIN: {sbcin}"),
        format!("K Index: {}", fmt_index(indexes::k_index(snd))),
        format!("Total Totals: {}", fmt_index(indexes::total_totals(snd))),
    ];
    let style = TextStyle::new(12.0, Color::BLACK);
    for (k, line) in lines.iter().enumerate() {
        draw_text_centered(figure, 830.0, 410.0 + k as f32 * 18.0, line, &style);
    }
}

fn ascent_energy(ascent: Option<&ParcelAscentAnalysis>) -> (String, String) {
    match ascent {
        Some(a) => (fmt_energy(a.cape()), fmt_energy(a.cin())),
        None => ("n/a".to_string(), "n/a".to_string()),
    }
}

fn fmt_energy(value: Optioned<JpKg>) -> String {
    match value.into_option() {
        Some(v) => format!("{:.1} J/kg", v.unpack()),
        None => "n/a".to_string(),
    }
}

fn fmt_index(value: AnalysisResult<f64>) -> String {
    match value {
        Ok(v) => format!("{v:.1}"),
        Err(_) => "n/a".to_string(),
    }
}

// ============================================================================
// Hodograph
// ============================================================================

/// Wind trace in hodograph units, surface first.
struct HodoPoint {
    u_kt: f64,
    v_kt: f64,
    p_hpa: f64,
    z_km: f64,
}

fn wind_trace(snd: &Sounding) -> Vec<HodoPoint> {
    snd.bottom_up()
        .filter_map(|row| {
            let p = row.pressure.into_option()?;
            let z = row.height.into_option()?;
            let wind = row.wind.into_option()?;
            Some(HodoPoint {
                u_kt: mps_to_knots(wind.u.unpack()),
                v_kt: mps_to_knots(wind.v.unpack()),
                p_hpa: p.unpack(),
                z_km: z.unpack() / 1000.0,
            })
        })
        .collect()
}

struct HodographStyle {
    trace_width: f32,
    marker_size: f32,
    marker_alpha: u8,
}

fn draw_hodograph_panel(
    trace: &[HodoPoint],
    side: u32,
    style: &HodographStyle,
) -> Result<Pixmap> {
    let mut panel =
        Pixmap::new(side, side).ok_or_else(|| anyhow!("hodograph panel allocation failed"))?;
    panel.fill(tiny_skia::Color::WHITE);

    let c = side as f32 / 2.0;
    let scale = side as f64 / (2.0 * HODO_RANGE);
    let to_px = |u: f64, v: f64| -> (f32, f32) {
        (c + (u * scale) as f32, c - (v * scale) as f32)
    };

    let axis_style = LineStyle::solid(Color::rgba(128, 128, 128, 128), 1.0);
    stroke_polyline(&mut panel, &[(0.0, c), (side as f32, c)], &axis_style);
    stroke_polyline(&mut panel, &[(c, 0.0), (c, side as f32)], &axis_style);

    // Speed rings every 10 kt, emphasized every 20.
    let light = LineStyle::dashed(Color::rgba(128, 128, 128, 50), 1.0);
    let heavy = LineStyle::solid(Color::rgba(128, 128, 128, 128), 1.5);
    for ring in 1..=8 {
        let r = (ring as f64 * 10.0 * scale) as f32;
        let style = if ring % 2 == 0 { &heavy } else { &light };
        stroke_polyline(&mut panel, &circle_points(c, c, r), style);
    }

    let ring_label = TextStyle::bold(10.0, Color::rgba(0, 0, 0, 77));
    for speed in [10.0, 30.0, 50.0, 70.0] {
        let (px, py) = to_px(speed, 0.0);
        draw_text(&mut panel, px + 2.0, py - 12.0, &format!("{speed:.0}"), &ring_label);
        let (px, py) = to_px(0.0, speed);
        draw_text(&mut panel, px + 2.0, py - 12.0, &format!("{speed:.0}"), &ring_label);
    }

    // Trace segments colored by pressure, dark aloft.
    let colors = ramp("plasma")?;
    for pair in trace.windows(2) {
        let t = ((pair[0].p_hpa - 100.0) / 900.0).clamp(0.0, 1.0);
        let seg = [
            to_px(pair[0].u_kt, pair[0].v_kt),
            to_px(pair[1].u_kt, pair[1].v_kt),
        ];
        stroke_polyline(
            &mut panel,
            &seg,
            &LineStyle::solid(colors.at(t), style.trace_width),
        );
    }

    // Height markers every kilometer up to 12 km.
    let marker = TextStyle::bold(
        style.marker_size,
        Color::rgba(255, 255, 255, style.marker_alpha),
    );
    let halo = Color::rgba(0, 0, 0, style.marker_alpha);
    for km in 1..=12 {
        let Some(point) = nearest_level(trace, km as f64) else {
            continue;
        };
        let (px, py) = to_px(point.u_kt, point.v_kt);
        let text = km.to_string();
        draw_text_halo(
            &mut panel,
            px - measure_text(&text, marker.size) / 2.0,
            py - marker.size / 2.0,
            &text,
            &marker,
            halo,
        );
    }

    Ok(panel)
}

fn nearest_level(trace: &[HodoPoint], km: f64) -> Option<&HodoPoint> {
    trace
        .iter()
        .min_by(|a, b| (a.z_km - km).abs().total_cmp(&(b.z_km - km).abs()))
}

fn draw_hodograph_figure(
    ctx: &RunContext,
    airport_id: &str,
    t: usize,
    snd: &Sounding,
) -> Result<Pixmap> {
    let mut figure = Pixmap::new(HODO_FIG, HODO_FIG)
        .ok_or_else(|| anyhow!("hodograph figure allocation failed"))?;
    figure.fill(tiny_skia::Color::WHITE);

    let x0 = (HODO_FIG - HODO_PANEL) as f32 / 2.0;
    let y0 = 70.0;
    let panel = draw_hodograph_panel(
        &wind_trace(snd),
        HODO_PANEL,
        &HodographStyle {
            trace_width: 2.0,
            marker_size: 15.0,
            marker_alpha: 204,
        },
    )?;
    figure.draw_pixmap(
        x0 as i32,
        y0 as i32,
        panel.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    frame_rect(&mut figure, x0, y0, HODO_PANEL as f32, HODO_PANEL as f32);

    let cx = HODO_FIG as f32 / 2.0;
    draw_text_centered(
        &mut figure,
        cx,
        14.0,
        &format!(
            "WRF Hodograph for {} - Hour {}",
            airport_id.to_uppercase(),
            ctx.forecast_hour(t)
        ),
        &TextStyle::bold(15.0, Color::BLACK),
    );
    draw_text_centered(
        &mut figure,
        cx,
        36.0,
        &format!("Valid: {} - Init: {}", ctx.valid_label(t), ctx.init_label()),
        &TextStyle::new(12.0, Color::BLACK),
    );

    let label_style = TextStyle::new(14.0, Color::BLACK);
    draw_text_centered(
        &mut figure,
        cx,
        y0 + HODO_PANEL as f32 + 16.0,
        "U (knots)",
        &label_style,
    );
    draw_text_rotated(
        &mut figure,
        20.0,
        y0 + (HODO_PANEL as f32 + measure_text("V (knots)", label_style.size)) / 2.0,
        -90.0,
        "V (knots)",
        &label_style,
    );

    Ok(figure)
}

// ============================================================================
// drawing primitives
// ============================================================================

fn frame_rect(pixmap: &mut Pixmap, x0: f32, y0: f32, w: f32, h: f32) {
    let pts = [
        (x0, y0),
        (x0 + w, y0),
        (x0 + w, y0 + h),
        (x0, y0 + h),
        (x0, y0),
    ];
    stroke_polyline(pixmap, &pts, &LineStyle::solid(Color::BLACK, 1.0));
}

fn circle_points(cx: f32, cy: f32, r: f32) -> Vec<(f32, f32)> {
    (0..=72)
        .map(|k| {
            let a = k as f32 / 72.0 * std::f32::consts::TAU;
            (cx + r * a.cos(), cy + r * a.sin())
        })
        .collect()
}

fn fill_dot(pixmap: &mut Pixmap, x: f32, y: f32, r: f32, color: Color) {
    let mut pb = PathBuilder::new();
    pb.push_circle(x, y, r);
    if let Some(path) = pb.finish() {
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// Open marker: white fill with a colored outline.
fn ring_dot(pixmap: &mut Pixmap, x: f32, y: f32, r: f32, color: Color) {
    fill_dot(pixmap, x, y, r, Color::WHITE);
    stroke_polyline(
        pixmap,
        &circle_points(x, y, r),
        &LineStyle::solid(color, 1.5),
    );
}
