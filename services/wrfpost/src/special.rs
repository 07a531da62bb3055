//! One-off figures outside the per-product loop: the full-run
//! temperature change map and the 2x2 cloud cover and precipitation
//! type composites.

use std::fs;

use anyhow::{anyhow, Context, Result};
use tiny_skia::{Paint, Pixmap, PixmapPaint, Rect, Transform};
use tracing::warn;

use renderer::chart::{format_tick, nice_ticks};
use renderer::color::ramp;
use renderer::contour::LineStyle;
use renderer::map::{composite_panels, MapCanvas, ValueScale};
use renderer::png;
use renderer::text::{draw_text, draw_text_centered, TextStyle};
use renderer::{Color, ColorRamp};
use wrf_common::units::{celsius_delta_to_fahrenheit, mm_to_inches};
use wrf_common::Grid2;
use wrf_decoder::diag;
use wrf_decoder::kuchera::kuchera_ratio;

use crate::context::RunContext;
use crate::weathermaps::{draw_airport_values, draw_extremes, mask_at_or_below};

const PANEL_WIDTH: u32 = 600;
const PANEL_HEIGHT: u32 = 500;
const HEADER: u32 = 76;
const FOOTER: u32 = 26;

pub fn run(ctx: &RunContext) -> Result<()> {
    if ctx.partial {
        warn!("partial run, skipping the full-run temperature change map");
    } else {
        run_span_change(ctx)?;
    }
    for t in 0..ctx.hours() {
        cloud_cover_panels(ctx, t)?;
        precip_type_panels(ctx, t)?;
    }
    Ok(())
}

/// 2m temperature change from the first timestep to the last, one
/// figure per run.
fn run_span_change(ctx: &RunContext) -> Result<()> {
    let last = ctx.hours() - 1;
    let start = ctx.wrf.field2("T2", 0)?;
    let end = ctx.wrf.field2("T2", last)?;
    let field = end.zip_map(&start, |a, b| celsius_delta_to_fahrenheit(a - b))?;

    let mut canvas = MapCanvas::new(1200, 1000, ctx.lat.ny(), ctx.lat.nx())?;
    let colors = ramp("coolwarm")?.clone();
    let scale = ValueScale::Range { min: -35.0, max: 35.0 };
    canvas.fill_field(&field, &colors, &scale);
    canvas.draw_graticule(
        &ctx.lat,
        &ctx.lon,
        &LineStyle::dashed(Color::rgba(128, 128, 128, 128), 1.0),
        &TextStyle::new(12.0, Color::BLACK),
    );
    draw_airport_values(&mut canvas, ctx, &field);
    draw_extremes(&mut canvas, &field);
    canvas.draw_colorbar(&colors, &scale, &nice_ticks(-35.0, 35.0, 8), "");
    let title = format!("Full Model/{} Hour 2m Temp Change (°F)", last);
    let valid = format!("Valid: {}", ctx.times[last].format("%Y-%m-%d %H:%M:%S"));
    let init = format!("Init: {}", ctx.init_label());
    canvas.draw_title(&[&title, &valid, &init]);
    canvas.draw_run_tag(&ctx.run_tag());

    let dir = ctx.ensure_dir("24hr_change")?;
    let path = dir.join("24hr_change.png");
    fs::write(&path, canvas.into_png()?).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Total plus low, mid, and high cloud fraction tiles around one
/// shared colorbar.
fn cloud_cover_panels(ctx: &RunContext, t: usize) -> Result<()> {
    let (low, mid, high) = diag::cloudfrac(&ctx.wrf, t)?;
    let low = low.map(|v| v * 100.0);
    let mid = mid.map(|v| v * 100.0);
    let high = high.map(|v| v * 100.0);
    let total = low.zip_map(&mid, |a, b| a + b)?.zip_map(&high, |ab, c| ab + c)?;

    let colors = ramp("blues_r")?.clone();
    let scale = ValueScale::Range { min: 0.0, max: 100.0 };
    let tiles: [(&Grid2, &str); 4] = [
        (&total, "Total Cloud Cover (%)"),
        (&low, "Low (%)"),
        (&mid, "Mid (%)"),
        (&high, "High (%)"),
    ];
    let mut canvases = Vec::with_capacity(tiles.len());
    for (field, title) in tiles {
        let mut panel = MapCanvas::panel(PANEL_WIDTH, PANEL_HEIGHT, ctx.lat.ny(), ctx.lat.nx())?;
        panel.fill_field(field, &colors, &scale);
        panel.draw_graticule(
            &ctx.lat,
            &ctx.lon,
            &LineStyle::dashed(Color::rgba(128, 128, 128, 90), 1.0),
            &TextStyle::new(10.0, Color::BLACK),
        );
        panel.draw_title(&[title]);
        canvases.push(panel);
    }
    let panels: Vec<&Pixmap> = canvases.iter().map(|c| c.pixmap()).collect();

    let f_hour = ctx.forecast_hour(t);
    let mut figure = compose_with_title(
        &panels,
        &format!("Cloud Cover - Hour {}", f_hour),
        &format!("Valid: {}", ctx.valid_label(t)),
        &format!("Init: {}", ctx.init_label()),
        &ctx.run_tag(),
    )?;
    draw_shared_colorbar(&mut figure, &colors, &scale, &nice_ticks(0.0, 100.0, 6));

    let dir = ctx.ensure_dir("4panel_cloudcover")?;
    let path = dir.join(format!("hour_{}.png", f_hour));
    fs::write(&path, png::encode(&figure)?).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Accumulated totals for each precipitation species, one tile each
/// with its own colorbar and max readout.
fn precip_type_panels(ctx: &RunContext, t: usize) -> Result<()> {
    let tc = diag::tc(&ctx.wrf, t)?;
    let pressure = diag::pressure(&ctx.wrf, t)?;
    let ratio = kuchera_ratio(&tc, &pressure);
    let rain = ctx.wrf.field2("AFWA_RAIN", t)?.map(mm_to_inches);
    let snow = ctx
        .wrf
        .field2("AFWA_SNOW", t)?
        .zip_map(&ratio, |s, r| mm_to_inches(s) * r)?;
    let fzra = ctx.wrf.field2("AFWA_FZRA", t)?.map(mm_to_inches);
    let ice = ctx.wrf.field2("AFWA_ICE", t)?.map(mm_to_inches);

    let tiles: [(&Grid2, &str, &str, f64, f64); 4] = [
        (&rain, "Rain Total (in)", "greens", 5.5, 0.25),
        (&snow, "Snowfall Total (in, Kuchera)", "blues", 15.25, 0.25),
        (&fzra, "Freezing Rain Total (in)", "rdpu", 3.1, 0.1),
        (&ice, "Ice Fall Total (in, liquid equiv.)", "oranges", 3.1, 0.1),
    ];
    let mut canvases = Vec::with_capacity(tiles.len());
    for (field, title, ramp_name, max, step) in tiles {
        let masked = mask_at_or_below(field, 0.01);
        let mut panel = MapCanvas::panel(PANEL_WIDTH, PANEL_HEIGHT, ctx.lat.ny(), ctx.lat.nx())?;
        let colors = ramp(ramp_name)?.truncated(0.2, 1.0);
        let scale = ValueScale::Bands { min: 0.0, max, step };
        panel.fill_field(&masked, &colors, &scale);
        panel.draw_graticule(
            &ctx.lat,
            &ctx.lon,
            &LineStyle::dashed(Color::rgba(128, 128, 128, 90), 1.0),
            &TextStyle::new(10.0, Color::BLACK),
        );
        panel.draw_colorbar(&colors, &scale, &nice_ticks(0.0, max, 5), "");
        if let Some(max_value) = masked.max_value() {
            if max_value != 0.0 {
                panel.draw_corner_note(&format!("Max: {max_value:.1}"));
            }
        }
        panel.draw_title(&[title]);
        canvases.push(panel);
    }
    let panels: Vec<&Pixmap> = canvases.iter().map(|c| c.pixmap()).collect();

    let f_hour = ctx.forecast_hour(t);
    let figure = compose_with_title(
        &panels,
        &format!("Precipitation Types - Hour {}", f_hour),
        &format!("Valid: {}", ctx.valid_label(t)),
        &format!("Init: {}", ctx.init_label()),
        &ctx.run_tag(),
    )?;

    let dir = ctx.ensure_dir("4panel_ptype")?;
    let path = dir.join(format!("hour_{}.png", f_hour));
    fs::write(&path, png::encode(&figure)?).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Tile pixmaps in a 2x2 grid under a bold three-line header, with the
/// run tag in a footer strip.
fn compose_with_title(
    panels: &[&Pixmap],
    title: &str,
    valid: &str,
    init: &str,
    run_tag: &str,
) -> Result<Pixmap> {
    let grid = composite_panels(panels, 2)?;
    let width = grid.width();
    let height = grid.height() + HEADER + FOOTER;
    let mut figure =
        Pixmap::new(width, height).ok_or_else(|| anyhow!("composite figure allocation failed"))?;
    figure.fill(tiny_skia::Color::WHITE);
    figure.draw_pixmap(
        0,
        HEADER as i32,
        grid.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    let cx = width as f32 / 2.0;
    draw_text_centered(&mut figure, cx, 10.0, title, &TextStyle::bold(22.0, Color::BLACK));
    let sub = TextStyle::new(14.0, Color::rgb(70, 70, 70));
    draw_text_centered(&mut figure, cx, 38.0, valid, &sub);
    draw_text_centered(&mut figure, cx, 56.0, init, &sub);
    draw_text(
        &mut figure,
        8.0,
        height as f32 - 20.0,
        run_tag,
        &TextStyle::new(12.0, Color::BLACK),
    );
    Ok(figure)
}

/// One colorbar for all four tiles, drawn down the composite's right
/// edge over the panel margins.
fn draw_shared_colorbar(
    figure: &mut Pixmap,
    colors: &ColorRamp,
    scale: &ValueScale,
    ticks: &[f64],
) {
    let bar_w = 18.0;
    let bar_x = figure.width() as f32 - 46.0;
    let bar_h = figure.height() as f32 * 0.62;
    let bar_y = (figure.height() as f32 - bar_h) / 2.0;

    let mut paint = Paint::default();
    paint.anti_alias = false;
    let rows = bar_h as i32;
    for row in 0..rows {
        let tpos = 1.0 - row as f64 / rows as f64;
        paint.set_color(colors.at(tpos).to_skia());
        if let Some(rect) = Rect::from_xywh(bar_x, bar_y + row as f32, bar_w, 1.0) {
            figure.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
    let style = TextStyle::new(11.0, Color::BLACK);
    for &tick in ticks {
        let tpos = scale.normalize(tick);
        if tpos.is_nan() {
            continue;
        }
        let y = bar_y + bar_h * (1.0 - tpos as f32) - style.size / 2.0;
        draw_text(figure, bar_x + bar_w + 4.0, y, &format_tick(tick), &style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_adds_header_and_footer_around_the_grid() {
        let tile = Pixmap::new(PANEL_WIDTH, PANEL_HEIGHT).unwrap();
        let figure = compose_with_title(
            &[&tile, &tile, &tile, &tile],
            "Cloud Cover - Hour 3",
            "Valid: 2024-11-02 09:00 UTC",
            "Init: 2024-11-02 06:00 UTC",
            "WRF Run 2024-11-02-06z",
        )
        .unwrap();
        assert_eq!(figure.width(), PANEL_WIDTH * 2);
        assert_eq!(figure.height(), PANEL_HEIGHT * 2 + HEADER + FOOTER);
    }
}
