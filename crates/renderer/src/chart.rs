//! Axes and plot-area primitives for line charts.
//!
//! Meteograms and sounding diagrams share these: an [`Axis`] maps data
//! values to a 0..1 position (linear or logarithmic), a [`ChartArea`]
//! places that inside a pixel rectangle with y flipped, and the drawing
//! helpers stroke frames, grids, series, and legends on a pixmap.

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::color::Color;
use crate::contour::{stroke_polyline, LineStyle};
use crate::text::{draw_text, draw_text_centered, draw_text_right, TextStyle};

/// One chart axis. `min` maps to position 0 and `max` to 1; a pressure
/// axis passes min=1050, max=100 so pressure decreases upward.
#[derive(Debug, Clone, Copy)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    log: bool,
}

impl Axis {
    pub fn linear(min: f64, max: f64) -> Self {
        Axis { min, max, log: false }
    }

    /// Logarithmic axis; both ends must be positive.
    pub fn log(min: f64, max: f64) -> Self {
        Axis { min, max, log: true }
    }

    /// Normalized position of `value` on the axis, unclamped.
    pub fn pos(&self, value: f64) -> f64 {
        if self.log {
            (value.ln() - self.min.ln()) / (self.max.ln() - self.min.ln())
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        let lo = self.min.min(self.max);
        let hi = self.min.max(self.max);
        (lo..=hi).contains(&value)
    }
}

/// Round tick positions covering [min, max], stepped 1/2/5 so that
/// roughly `target` ticks come back. Always returned in increasing
/// order even when the axis itself is inverted.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 || target == 0 {
        return Vec::new();
    }

    let raw_step = span / target as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let residual = raw_step / magnitude;
    let step = if residual < 1.5 {
        magnitude
    } else if residual < 3.5 {
        2.0 * magnitude
    } else if residual < 7.5 {
        5.0 * magnitude
    } else {
        10.0 * magnitude
    };

    let mut ticks = Vec::new();
    let mut v = (lo / step).ceil() * step;
    while v <= hi + step * 1e-9 {
        // Snap tiny float error so labels format cleanly.
        ticks.push((v / step).round() * step);
        v += step;
    }
    ticks
}

/// Label text for a tick value. Whole numbers drop the decimal.
pub fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-6 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// A pixel rectangle with data axes attached.
#[derive(Debug, Clone)]
pub struct ChartArea {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
    pub x_axis: Axis,
    pub y_axis: Axis,
}

impl ChartArea {
    pub fn new(x0: f32, y0: f32, width: f32, height: f32, x_axis: Axis, y_axis: Axis) -> Self {
        ChartArea {
            x0,
            y0,
            width,
            height,
            x_axis,
            y_axis,
        }
    }

    /// Data point to pixel. Pixel y grows downward while axis position
    /// grows upward, hence the flip.
    pub fn to_px(&self, x: f64, y: f64) -> (f32, f32) {
        let px = self.x0 + self.width * self.x_axis.pos(x) as f32;
        let py = self.y0 + self.height * (1.0 - self.y_axis.pos(y) as f32);
        (px, py)
    }

    /// Border rectangle.
    pub fn frame(&self, pixmap: &mut Pixmap, style: &LineStyle) {
        let pts = [
            (self.x0, self.y0),
            (self.x0 + self.width, self.y0),
            (self.x0 + self.width, self.y0 + self.height),
            (self.x0, self.y0 + self.height),
            (self.x0, self.y0),
        ];
        stroke_polyline(pixmap, &pts, style);
    }

    /// Vertical grid lines at the given x tick values.
    pub fn grid_x(&self, pixmap: &mut Pixmap, ticks: &[f64], style: &LineStyle) {
        for &t in ticks {
            if !self.x_axis.contains(t) {
                continue;
            }
            let (px, _) = self.to_px(t, self.y_axis.min);
            stroke_polyline(
                pixmap,
                &[(px, self.y0), (px, self.y0 + self.height)],
                style,
            );
        }
    }

    /// Horizontal grid lines at the given y tick values.
    pub fn grid_y(&self, pixmap: &mut Pixmap, ticks: &[f64], style: &LineStyle) {
        for &t in ticks {
            if !self.y_axis.contains(t) {
                continue;
            }
            let (_, py) = self.to_px(self.x_axis.min, t);
            stroke_polyline(
                pixmap,
                &[(self.x0, py), (self.x0 + self.width, py)],
                style,
            );
        }
    }

    /// Tick labels under the bottom edge.
    pub fn label_x_ticks(
        &self,
        pixmap: &mut Pixmap,
        ticks: &[f64],
        style: &TextStyle,
        format: impl Fn(f64) -> String,
    ) {
        for &t in ticks {
            if !self.x_axis.contains(t) {
                continue;
            }
            let (px, _) = self.to_px(t, self.y_axis.min);
            draw_text_centered(
                pixmap,
                px,
                self.y0 + self.height + style.size * 0.5,
                &format(t),
                style,
            );
        }
    }

    /// Tick labels left of the left edge, right-aligned.
    pub fn label_y_ticks(
        &self,
        pixmap: &mut Pixmap,
        ticks: &[f64],
        style: &TextStyle,
        format: impl Fn(f64) -> String,
    ) {
        for &t in ticks {
            if !self.y_axis.contains(t) {
                continue;
            }
            let (_, py) = self.to_px(self.x_axis.min, t);
            draw_text_right(
                pixmap,
                self.x0 - style.size * 0.5,
                py - style.size * 0.5,
                &format(t),
                style,
            );
        }
    }

    /// Stroke a data series. NaN values split the line into runs so
    /// gaps stay gaps instead of bridging across.
    pub fn polyline(&self, pixmap: &mut Pixmap, points: &[(f64, f64)], style: &LineStyle) {
        let mut run: Vec<(f32, f32)> = Vec::new();
        for &(x, y) in points {
            if x.is_nan() || y.is_nan() {
                if run.len() >= 2 {
                    stroke_polyline(pixmap, &run, style);
                }
                run.clear();
            } else {
                run.push(self.to_px(x, y));
            }
        }
        if run.len() >= 2 {
            stroke_polyline(pixmap, &run, style);
        }
    }

    /// Filled dot at a data point.
    pub fn marker(&self, pixmap: &mut Pixmap, x: f64, y: f64, radius: f32, color: Color) {
        if x.is_nan() || y.is_nan() {
            return;
        }
        let (px, py) = self.to_px(x, y);
        fill_circle(pixmap, px, py, radius, color);
    }
}

/// Color swatch rows with labels, top-left anchored at (x, y).
pub fn draw_legend(pixmap: &mut Pixmap, x: f32, y: f32, entries: &[(&str, Color)], style: &TextStyle) {
    let row = style.size * 1.5;
    let swatch = style.size * 0.9;
    for (idx, (label, color)) in entries.iter().enumerate() {
        let ry = y + idx as f32 * row;
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        if let Some(rect) = tiny_skia::Rect::from_xywh(x, ry, swatch, swatch) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
        draw_text(pixmap, x + swatch + style.size * 0.5, ry, label, style);
    }
}

fn fill_circle(pixmap: &mut Pixmap, x: f32, y: f32, radius: f32, color: Color) {
    let mut pb = PathBuilder::new();
    pb.push_circle(x, y, radius);
    if let Some(path) = pb.finish() {
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_axis_pos() {
        let axis = Axis::linear(0.0, 10.0);
        assert!((axis.pos(0.0)).abs() < 1e-12);
        assert!((axis.pos(5.0) - 0.5).abs() < 1e-12);
        assert!((axis.pos(10.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_axis() {
        // Pressure style: 1050 at the bottom, 100 at the top.
        let axis = Axis::linear(1050.0, 100.0);
        assert!(axis.pos(1050.0).abs() < 1e-12);
        assert!((axis.pos(100.0) - 1.0).abs() < 1e-12);
        assert!(axis.pos(575.0) > 0.0 && axis.pos(575.0) < 1.0);
    }

    #[test]
    fn test_log_axis_midpoint() {
        let axis = Axis::log(100.0, 1000.0);
        // Geometric midpoint sits at position 0.5.
        let mid = (100.0_f64 * 1000.0).sqrt();
        assert!((axis.pos(mid) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_nice_ticks_step_selection() {
        let ticks = nice_ticks(0.0, 100.0, 5);
        assert_eq!(ticks, vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);

        let ticks = nice_ticks(0.0, 1.0, 5);
        assert!((ticks[1] - ticks[0] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_nice_ticks_inverted_and_degenerate() {
        assert_eq!(nice_ticks(100.0, 0.0, 5), nice_ticks(0.0, 100.0, 5));
        assert!(nice_ticks(5.0, 5.0, 5).is_empty());
        assert!(nice_ticks(f64::NAN, 1.0, 5).is_empty());
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(20.0), "20");
        assert_eq!(format_tick(-5.0), "-5");
        assert_eq!(format_tick(2.5), "2.5");
    }

    #[test]
    fn test_to_px_flips_y() {
        let area = ChartArea::new(
            10.0,
            10.0,
            100.0,
            100.0,
            Axis::linear(0.0, 10.0),
            Axis::linear(0.0, 10.0),
        );
        let (_, y_low) = area.to_px(0.0, 0.0);
        let (_, y_high) = area.to_px(0.0, 10.0);
        assert!((y_low - 110.0).abs() < 1e-3);
        assert!((y_high - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_polyline_splits_on_nan() {
        let mut pixmap = Pixmap::new(120, 120).unwrap();
        pixmap.fill(tiny_skia::Color::WHITE);
        let area = ChartArea::new(
            10.0,
            10.0,
            100.0,
            100.0,
            Axis::linear(0.0, 10.0),
            Axis::linear(0.0, 10.0),
        );
        let pts = [
            (0.0, 5.0),
            (2.0, 5.0),
            (f64::NAN, f64::NAN),
            (8.0, 5.0),
            (10.0, 5.0),
        ];
        area.polyline(&mut pixmap, &pts, &LineStyle::solid(Color::BLACK, 1.0));
        // The midpoint of the gap stays white.
        let (gx, gy) = area.to_px(5.0, 5.0);
        let px = pixmap.pixel(gx as u32, gy as u32).unwrap();
        assert_eq!(px.red(), 255);
    }
}
