//! Map canvas for gridded forecast imagery.
//!
//! A [`MapCanvas`] owns the pixmap and the layout: a plot rectangle
//! holding the model grid (row 0 at the south edge, drawn at the
//! bottom), margins for the title block, colorbar, and annotations.
//! Layers are painted in call order, so a product builds up as
//! fill, contours, barbs, graticule, then labels.

use tiny_skia::{Pixmap, PixmapPaint, PremultipliedColorU8, Transform};

use wrf_common::grid::Grid2;

use crate::barbs::{barb_positions, draw_barb};
use crate::color::{Color, ColorRamp};
use crate::contour::{field_contours, stroke_contours, stroke_polyline, LineStyle};
use crate::error::{RenderError, RenderResult};
use crate::png;
use crate::streamline::{trace_streamlines, StreamlineConfig};
use crate::text::{
    draw_text, draw_text_boxed, draw_text_halo, draw_text_right, draw_text_rotated, measure_text,
    TextStyle,
};

const TITLE_SIZE: f32 = 22.0;
const SUBTITLE_SIZE: f32 = 13.0;
const TICK_SIZE: f32 = 12.0;
const TAG_SIZE: f32 = 11.0;

/// How field values map onto a color ramp.
#[derive(Debug, Clone, Copy)]
pub enum ValueScale {
    /// Continuous: linear between min and max, clamped.
    Range { min: f64, max: f64 },
    /// Discrete bands: values snap down to multiples of `step` before
    /// normalizing, giving the stepped filled-contour look.
    Bands { min: f64, max: f64, step: f64 },
}

impl ValueScale {
    pub fn min(&self) -> f64 {
        match *self {
            ValueScale::Range { min, .. } | ValueScale::Bands { min, .. } => min,
        }
    }

    pub fn max(&self) -> f64 {
        match *self {
            ValueScale::Range { max, .. } | ValueScale::Bands { max, .. } => max,
        }
    }

    /// Normalized 0..1 position for a value; NaN passes through.
    pub fn normalize(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NAN;
        }
        let (min, max, snapped) = match *self {
            ValueScale::Range { min, max } => (min, max, value),
            ValueScale::Bands { min, max, step } => {
                let s = if step > 0.0 {
                    min + ((value - min) / step).floor() * step
                } else {
                    value
                };
                (min, max, s)
            }
        };
        if (max - min).abs() < f64::EPSILON {
            return 0.5;
        }
        ((snapped - min) / (max - min)).clamp(0.0, 1.0)
    }
}

/// Pixel margins around the plot rectangle.
#[derive(Debug, Clone, Copy)]
struct Margins {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

const FULL_MARGINS: Margins = Margins {
    left: 70.0,
    right: 110.0,
    top: 90.0,
    bottom: 50.0,
};

// Panels in a 2x2 composite carry their own small title and colorbar.
const PANEL_MARGINS: Margins = Margins {
    left: 46.0,
    right: 96.0,
    top: 56.0,
    bottom: 36.0,
};

pub struct MapCanvas {
    pixmap: Pixmap,
    x0: f32,
    y0: f32,
    plot_w: f32,
    plot_h: f32,
    ny: usize,
    nx: usize,
}

impl MapCanvas {
    /// Full-size product canvas with room for a three-line title,
    /// colorbar, and axis labels.
    pub fn new(width: u32, height: u32, ny: usize, nx: usize) -> RenderResult<Self> {
        Self::with_margins(width, height, ny, nx, FULL_MARGINS)
    }

    /// Reduced-margin canvas for one tile of a composite figure.
    pub fn panel(width: u32, height: u32, ny: usize, nx: usize) -> RenderResult<Self> {
        Self::with_margins(width, height, ny, nx, PANEL_MARGINS)
    }

    fn with_margins(
        width: u32,
        height: u32,
        ny: usize,
        nx: usize,
        margins: Margins,
    ) -> RenderResult<Self> {
        let plot_w = width as f32 - margins.left - margins.right;
        let plot_h = height as f32 - margins.top - margins.bottom;
        if plot_w < 1.0 || plot_h < 1.0 || ny < 2 || nx < 2 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let mut pixmap =
            Pixmap::new(width, height).ok_or(RenderError::InvalidDimensions { width, height })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        Ok(MapCanvas {
            pixmap,
            x0: margins.left,
            y0: margins.top,
            plot_w,
            plot_h,
            ny,
            nx,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Grid (i, j) to pixel. Column i spans the plot width; row j runs
    /// south to north, so it flips onto the downward pixel axis.
    pub fn grid_to_px(&self, i: f32, j: f32) -> (f32, f32) {
        let px = self.x0 + self.plot_w * i / (self.nx - 1) as f32;
        let py = self.y0 + self.plot_h * (1.0 - j / (self.ny - 1) as f32);
        (px, py)
    }

    fn grid_transform(&self) -> impl Fn(f32, f32) -> (f32, f32) {
        let (x0, y0, w, h) = (self.x0, self.y0, self.plot_w, self.plot_h);
        let nx = (self.nx - 1) as f32;
        let ny = (self.ny - 1) as f32;
        move |i, j| (x0 + w * i / nx, y0 + h * (1.0 - j / ny))
    }

    /// Pixel center back to fractional grid (j, i).
    fn px_to_grid(&self, px: f32, py: f32) -> (f64, f64) {
        let i = ((px + 0.5 - self.x0) / self.plot_w) as f64 * (self.nx - 1) as f64;
        let j = (1.0 - (py + 0.5 - self.y0) / self.plot_h) as f64 * (self.ny - 1) as f64;
        (j, i)
    }

    /// Shade the plot area from a scalar field. Missing values leave
    /// the background untouched; translucent ramp colors blend over
    /// whatever is already painted.
    pub fn fill_field(&mut self, grid: &Grid2, ramp: &ColorRamp, scale: &ValueScale) {
        if grid.ny() != self.ny || grid.nx() != self.nx {
            tracing::warn!(
                grid_ny = grid.ny(),
                grid_nx = grid.nx(),
                canvas_ny = self.ny,
                canvas_nx = self.nx,
                "field shape does not match canvas, skipping fill"
            );
            return;
        }
        let (px0, py0, px1, py1) = self.plot_px_bounds();
        for py in py0..py1 {
            for px in px0..px1 {
                let (j, i) = self.px_to_grid(px as f32, py as f32);
                let v = grid.sample(j, i);
                let color = ramp.at(scale.normalize(v));
                self.blend_pixel(px, py, color);
            }
        }
    }

    /// Shade from a grid of category codes indexing into `colors`.
    /// Nearest-neighbor lookup keeps category edges crisp. Codes
    /// outside the palette and fully transparent entries are skipped.
    pub fn fill_category(&mut self, codes: &Grid2, colors: &[Color]) {
        if codes.ny() != self.ny || codes.nx() != self.nx {
            tracing::warn!("category grid shape does not match canvas, skipping fill");
            return;
        }
        let (px0, py0, px1, py1) = self.plot_px_bounds();
        for py in py0..py1 {
            for px in px0..px1 {
                let (j, i) = self.px_to_grid(px as f32, py as f32);
                let (jn, in_) = (j.round() as isize, i.round() as isize);
                if jn < 0 || in_ < 0 || jn >= self.ny as isize || in_ >= self.nx as isize {
                    continue;
                }
                let code = codes.get(jn as usize, in_ as usize);
                if code.is_nan() || code < 0.0 {
                    continue;
                }
                if let Some(&color) = colors.get(code as usize) {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Contour a field and stroke the lines.
    pub fn draw_contours(
        &mut self,
        grid: &Grid2,
        levels: &[f64],
        smoothing_passes: u32,
        style: &LineStyle,
    ) {
        let contours = field_contours(grid, levels, smoothing_passes);
        let to_px = self.grid_transform();
        stroke_contours(&mut self.pixmap, &contours, to_px, style);
    }

    /// Contours with the level value drawn at each line's midpoint,
    /// haloed so it reads over the fill.
    pub fn draw_labeled_contours(
        &mut self,
        grid: &Grid2,
        levels: &[f64],
        smoothing_passes: u32,
        style: &LineStyle,
        label_size: f32,
    ) {
        let contours = field_contours(grid, levels, smoothing_passes);
        {
            let to_px = self.grid_transform();
            stroke_contours(&mut self.pixmap, &contours, to_px, style);
        }
        let text_style = TextStyle::new(label_size, style.color);
        let to_px = self.grid_transform();
        for contour in &contours {
            if contour.points.len() < 8 {
                continue;
            }
            let mid = contour.points[contour.points.len() / 2];
            let (px, py) = to_px(mid.x, mid.y);
            let label = if contour.level.fract().abs() < 1e-9 {
                format!("{:.0}", contour.level)
            } else {
                format!("{:.1}", contour.level)
            };
            let x = px - measure_text(&label, label_size) / 2.0;
            let y = py - label_size / 2.0;
            draw_text_halo(&mut self.pixmap, x, y, &label, &text_style, Color::WHITE);
        }
    }

    /// Wind barbs on a regular pixel lattice, sampling u/v at each
    /// anchor.
    pub fn draw_barbs(
        &mut self,
        u: &Grid2,
        v: &Grid2,
        spacing: f32,
        size: f32,
        color: Color,
        stroke_width: f32,
    ) {
        if u.ny() != self.ny || u.nx() != self.nx || v.ny() != self.ny || v.nx() != self.nx {
            tracing::warn!("wind component shape does not match canvas, skipping barbs");
            return;
        }
        for (ox, oy) in barb_positions(self.plot_w, self.plot_h, spacing) {
            let px = self.x0 + ox;
            let py = self.y0 + oy;
            let (j, i) = self.px_to_grid(px, py);
            let uu = u.sample(j, i);
            let vv = v.sample(j, i);
            draw_barb(&mut self.pixmap, px, py, uu, vv, size, color, stroke_width);
        }
    }

    /// Streamlines traced through the wind field, with a small
    /// arrowhead at each line's midpoint.
    pub fn draw_streamlines(
        &mut self,
        u: &Grid2,
        v: &Grid2,
        config: &StreamlineConfig,
        style: &LineStyle,
    ) {
        if u.ny() != self.ny || u.nx() != self.nx {
            tracing::warn!("wind component shape does not match canvas, skipping streamlines");
            return;
        }
        let lines = trace_streamlines(u, v, config);
        let to_px = self.grid_transform();
        for line in &lines {
            let pts: Vec<(f32, f32)> = line.iter().map(|&(i, j)| to_px(i, j)).collect();
            stroke_polyline(&mut self.pixmap, &pts, style);
            self.draw_arrowhead(&pts, style);
        }
    }

    fn draw_arrowhead(&mut self, pts: &[(f32, f32)], style: &LineStyle) {
        if pts.len() < 4 {
            return;
        }
        let m = pts.len() / 2;
        let (x0, y0) = pts[m - 1];
        let (x1, y1) = pts[m];
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len = dx.hypot(dy);
        if len < 1e-3 {
            return;
        }
        let (ux, uy) = (dx / len, dy / len);
        let size = (style.width * 4.0).max(5.0);
        // Two strokes swept back from the tip at about 30 degrees.
        let (c, s) = (0.866f32, 0.5f32);
        let left = (x1 - (ux * c - uy * s) * size, y1 - (ux * s + uy * c) * size);
        let right = (x1 - (ux * c + uy * s) * size, y1 - (-ux * s + uy * c) * size);
        stroke_polyline(&mut self.pixmap, &[left, (x1, y1), right], style);
    }

    /// Latitude/longitude lines at round degree intervals, labeled on
    /// the west and south edges.
    pub fn draw_graticule(
        &mut self,
        lat: &Grid2,
        lon: &Grid2,
        line_style: &LineStyle,
        text_style: &TextStyle,
    ) {
        if lat.ny() != self.ny || lat.nx() != self.nx || lon.ny() != self.ny || lon.nx() != self.nx {
            tracing::warn!("coordinate grid shape does not match canvas, skipping graticule");
            return;
        }

        if let (Some(lo), Some(hi)) = (lat.min_value(), lat.max_value()) {
            let levels = graticule_levels(lo, hi);
            let contours = field_contours(lat, &levels, 0);
            let to_px = self.grid_transform();
            stroke_contours(&mut self.pixmap, &contours, to_px, line_style);
            for &level in &levels {
                if let Some(j) = edge_crossing((0..self.ny).map(|j| lat.get(j, 0)), level) {
                    let (_, py) = self.grid_to_px(0.0, j);
                    draw_text_right(
                        &mut self.pixmap,
                        self.x0 - 4.0,
                        py - text_style.size / 2.0,
                        &lat_label(level),
                        text_style,
                    );
                }
            }
        }

        if let (Some(lo), Some(hi)) = (lon.min_value(), lon.max_value()) {
            let levels = graticule_levels(lo, hi);
            let contours = field_contours(lon, &levels, 0);
            let to_px = self.grid_transform();
            stroke_contours(&mut self.pixmap, &contours, to_px, line_style);
            for &level in &levels {
                if let Some(i) = edge_crossing((0..self.nx).map(|i| lon.get(0, i)), level) {
                    let (px, _) = self.grid_to_px(i, 0.0);
                    let label = lon_label(level);
                    draw_text(
                        &mut self.pixmap,
                        px - measure_text(&label, text_style.size) / 2.0,
                        self.y0 + self.plot_h + 6.0,
                        &label,
                        text_style,
                    );
                }
            }
        }
    }

    /// Vertical colorbar to the right of the plot with tick labels and
    /// a rotated unit caption.
    pub fn draw_colorbar(&mut self, ramp: &ColorRamp, scale: &ValueScale, ticks: &[f64], label: &str) {
        let bar_x = (self.x0 + self.plot_w + 16.0).round();
        let bar_w = 20.0;
        let bar_y = self.y0;
        let bar_h = self.plot_h;
        let (min, max) = (scale.min(), scale.max());

        for row in 0..bar_h as i32 {
            let t = 1.0 - (row as f64 + 0.5) / bar_h as f64;
            let v = min + (max - min) * t;
            let color = ramp.at(scale.normalize(v));
            for col in 0..bar_w as i32 {
                self.blend_pixel(bar_x as i32 + col, bar_y as i32 + row, color);
            }
        }

        let frame = LineStyle::solid(Color::BLACK, 1.0);
        stroke_polyline(
            &mut self.pixmap,
            &[
                (bar_x, bar_y),
                (bar_x + bar_w, bar_y),
                (bar_x + bar_w, bar_y + bar_h),
                (bar_x, bar_y + bar_h),
                (bar_x, bar_y),
            ],
            &frame,
        );

        let tick_style = TextStyle::new(TICK_SIZE, Color::BLACK);
        let span = max - min;
        for &tick in ticks {
            if span.abs() < f64::EPSILON {
                break;
            }
            let pos = ((tick - min) / span).clamp(0.0, 1.0);
            let ty = bar_y + bar_h * (1.0 - pos as f32);
            stroke_polyline(&mut self.pixmap, &[(bar_x + bar_w, ty), (bar_x + bar_w + 4.0, ty)], &frame);
            draw_text(
                &mut self.pixmap,
                bar_x + bar_w + 7.0,
                ty - TICK_SIZE / 2.0,
                &format_level(tick),
                &tick_style,
            );
        }

        if !label.is_empty() {
            let cap_style = TextStyle::new(TICK_SIZE, Color::BLACK);
            let cx = bar_x + bar_w + 52.0;
            let cy = bar_y + bar_h / 2.0 + measure_text(label, TICK_SIZE) / 2.0;
            draw_text_rotated(&mut self.pixmap, cx, cy, -90.0, label, &cap_style);
        }
    }

    /// Discrete colorbar: one swatch per category with its label.
    pub fn draw_category_colorbar(&mut self, colors: &[Color], labels: &[&str]) {
        if colors.is_empty() {
            return;
        }
        let bar_x = (self.x0 + self.plot_w + 16.0).round();
        let bar_w = 20.0;
        let bar_y = self.y0;
        let cell_h = self.plot_h / colors.len() as f32;
        let frame = LineStyle::solid(Color::BLACK, 1.0);
        let tick_style = TextStyle::new(TICK_SIZE, Color::BLACK);

        for (idx, &color) in colors.iter().enumerate() {
            // Category 0 at the bottom, matching the value axis.
            let top = bar_y + cell_h * (colors.len() - 1 - idx) as f32;
            for row in 0..cell_h.ceil() as i32 {
                for col in 0..bar_w as i32 {
                    self.blend_pixel(bar_x as i32 + col, top as i32 + row, color);
                }
            }
            if let Some(label) = labels.get(idx) {
                draw_text(
                    &mut self.pixmap,
                    bar_x + bar_w + 7.0,
                    top + cell_h / 2.0 - TICK_SIZE / 2.0,
                    label,
                    &tick_style,
                );
            }
        }
        stroke_polyline(
            &mut self.pixmap,
            &[
                (bar_x, bar_y),
                (bar_x + bar_w, bar_y),
                (bar_x + bar_w, bar_y + self.plot_h),
                (bar_x, bar_y + self.plot_h),
                (bar_x, bar_y),
            ],
            &frame,
        );
    }

    /// Title block above the plot: first line bold, the rest smaller
    /// and gray.
    pub fn draw_title(&mut self, lines: &[&str]) {
        let mut y = 10.0;
        for (idx, line) in lines.iter().enumerate() {
            if idx == 0 {
                let style = TextStyle::bold(TITLE_SIZE, Color::BLACK);
                draw_text(&mut self.pixmap, self.x0, y, line, &style);
                y += TITLE_SIZE + 6.0;
            } else {
                let style = TextStyle::new(SUBTITLE_SIZE, Color::rgb(90, 90, 90));
                draw_text(&mut self.pixmap, self.x0, y, line, &style);
                y += SUBTITLE_SIZE + 4.0;
            }
        }
    }

    /// Small attribution line under the plot's southwest corner.
    pub fn draw_run_tag(&mut self, text: &str) {
        let style = TextStyle::new(TAG_SIZE, Color::rgb(120, 120, 120));
        draw_text(
            &mut self.pixmap,
            self.x0,
            self.y0 + self.plot_h + 6.0 + TICK_SIZE + 4.0,
            text,
            &style,
        );
    }

    /// Boxed note inside the plot's northeast corner, e.g. the field
    /// extremes.
    pub fn draw_corner_note(&mut self, text: &str) {
        let style = TextStyle::new(SUBTITLE_SIZE, Color::BLACK);
        let w = measure_text(text, SUBTITLE_SIZE);
        draw_text_boxed(
            &mut self.pixmap,
            self.x0 + self.plot_w - w - 10.0,
            self.y0 + 10.0,
            text,
            &style,
            Color::rgba(255, 255, 255, 210),
        );
    }

    pub fn into_png(self) -> RenderResult<Vec<u8>> {
        png::encode(&self.pixmap)
    }

    fn plot_px_bounds(&self) -> (i32, i32, i32, i32) {
        (
            self.x0.round() as i32,
            self.y0.round() as i32,
            (self.x0 + self.plot_w).round() as i32,
            (self.y0 + self.plot_h).round() as i32,
        )
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        if color.a == 0 {
            return;
        }
        let w = self.pixmap.width() as i32;
        let h = self.pixmap.height() as i32;
        if x < 0 || y < 0 || x >= w || y >= h {
            return;
        }
        let idx = (y * w + x) as usize;
        let pixels = self.pixmap.pixels_mut();
        let d = pixels[idx];
        // The canvas starts opaque and every write keeps it opaque, so
        // premultiplied and straight values coincide here.
        let dst = Color::rgb(d.red(), d.green(), d.blue());
        let out = color.over(dst);
        if let Some(p) = PremultipliedColorU8::from_rgba(out.r, out.g, out.b, 255) {
            pixels[idx] = p;
        }
    }
}

/// Lay panel pixmaps out in a grid, `cols` across. All panels must
/// share the first panel's dimensions.
pub fn composite_panels(panels: &[&Pixmap], cols: u32) -> RenderResult<Pixmap> {
    if panels.is_empty() || cols == 0 {
        return Err(RenderError::InvalidDimensions { width: 0, height: 0 });
    }
    let cell_w = panels[0].width();
    let cell_h = panels[0].height();
    let rows = (panels.len() as u32 + cols - 1) / cols;
    let width = cell_w * cols;
    let height = cell_h * rows;
    let mut out =
        Pixmap::new(width, height).ok_or(RenderError::InvalidDimensions { width, height })?;
    out.fill(tiny_skia::Color::WHITE);
    let paint = PixmapPaint::default();
    for (idx, panel) in panels.iter().enumerate() {
        let col = idx as u32 % cols;
        let row = idx as u32 / cols;
        out.draw_pixmap(
            (col * cell_w) as i32,
            (row * cell_h) as i32,
            panel.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }
    Ok(out)
}

/// Degree lines for a coordinate span: the largest round step giving
/// at most eight lines.
fn graticule_levels(min: f64, max: f64) -> Vec<f64> {
    let span = max - min;
    let step = [0.25, 0.5, 1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .find(|s| span / s <= 8.0)
        .unwrap_or(10.0);
    let mut levels = Vec::new();
    let mut v = (min / step).ceil() * step;
    while v <= max {
        levels.push(v);
        v += step;
    }
    levels
}

/// Fractional index where a monotonic edge profile crosses `level`.
fn edge_crossing(values: impl Iterator<Item = f64>, level: f64) -> Option<f32> {
    let vals: Vec<f64> = values.collect();
    for k in 0..vals.len().saturating_sub(1) {
        let (a, b) = (vals[k], vals[k + 1]);
        if a.is_nan() || b.is_nan() || a == b {
            continue;
        }
        if (a - level) * (b - level) <= 0.0 {
            return Some(k as f32 + ((level - a) / (b - a)) as f32);
        }
    }
    None
}

fn lat_label(deg: f64) -> String {
    let hemi = if deg < 0.0 { "S" } else { "N" };
    format!("{}°{}", format_level(deg.abs()), hemi)
}

fn lon_label(deg: f64) -> String {
    let hemi = if deg < 0.0 { "W" } else { "E" };
    format!("{}°{}", format_level(deg.abs()), hemi)
}

fn format_level(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ramp;

    fn gradient_grid(ny: usize, nx: usize) -> Grid2 {
        let mut g = Grid2::filled(ny, nx, 0.0);
        for j in 0..ny {
            for i in 0..nx {
                g.set(j, i, (j + i) as f64);
            }
        }
        g
    }

    #[test]
    fn test_canvas_rejects_degenerate_sizes() {
        assert!(MapCanvas::new(10, 10, 50, 50).is_err());
        assert!(MapCanvas::new(800, 600, 1, 50).is_err());
        assert!(MapCanvas::new(800, 600, 50, 50).is_ok());
    }

    #[test]
    fn test_value_scale_range_clamps() {
        let scale = ValueScale::Range { min: 0.0, max: 10.0 };
        assert!((scale.normalize(5.0) - 0.5).abs() < 1e-12);
        assert_eq!(scale.normalize(-5.0), 0.0);
        assert_eq!(scale.normalize(15.0), 1.0);
        assert!(scale.normalize(f64::NAN).is_nan());
    }

    #[test]
    fn test_value_scale_bands_snap() {
        let scale = ValueScale::Bands { min: 0.0, max: 100.0, step: 10.0 };
        // 37 snaps down to the 30 band.
        assert!((scale.normalize(37.0) - 0.3).abs() < 1e-12);
        assert!((scale.normalize(39.9) - 0.3).abs() < 1e-12);
        assert!((scale.normalize(40.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_fill_field_paints_plot_area() {
        let grid = gradient_grid(20, 20);
        let mut canvas = MapCanvas::new(400, 360, 20, 20).unwrap();
        let ramp = ramp("turbo").unwrap();
        canvas.fill_field(&grid, ramp, &ValueScale::Range { min: 0.0, max: 38.0 });
        let (px, py) = canvas.grid_to_px(10.0, 10.0);
        let p = canvas.pixmap().pixel(px as u32, py as u32).unwrap();
        // Center of a turbo-shaded gradient is not white.
        assert!(p.red() != 255 || p.green() != 255 || p.blue() != 255);
    }

    #[test]
    fn test_fill_field_shape_mismatch_is_noop() {
        let grid = gradient_grid(10, 10);
        let mut canvas = MapCanvas::new(400, 360, 20, 20).unwrap();
        let ramp = ramp("turbo").unwrap();
        canvas.fill_field(&grid, ramp, &ValueScale::Range { min: 0.0, max: 20.0 });
        let (px, py) = canvas.grid_to_px(10.0, 10.0);
        let p = canvas.pixmap().pixel(px as u32, py as u32).unwrap();
        assert_eq!((p.red(), p.green(), p.blue()), (255, 255, 255));
    }

    #[test]
    fn test_fill_category_uses_nearest() {
        let mut codes = Grid2::filled(20, 20, 0.0);
        for j in 0..20 {
            for i in 10..20 {
                codes.set(j, i, 1.0);
            }
        }
        let palette = [Color::TRANSPARENT, Color::rgb(255, 0, 0)];
        let mut canvas = MapCanvas::new(400, 360, 20, 20).unwrap();
        canvas.fill_category(&codes, &palette);
        let (px, py) = canvas.grid_to_px(15.0, 10.0);
        let p = canvas.pixmap().pixel(px as u32, py as u32).unwrap();
        assert_eq!((p.red(), p.green(), p.blue()), (255, 0, 0));
        // Transparent category leaves the background.
        let (px, py) = canvas.grid_to_px(3.0, 10.0);
        let p = canvas.pixmap().pixel(px as u32, py as u32).unwrap();
        assert_eq!((p.red(), p.green(), p.blue()), (255, 255, 255));
    }

    #[test]
    fn test_grid_to_px_flips_rows() {
        let canvas = MapCanvas::new(400, 360, 20, 20).unwrap();
        let (_, py_south) = canvas.grid_to_px(0.0, 0.0);
        let (_, py_north) = canvas.grid_to_px(0.0, 19.0);
        assert!(py_south > py_north, "row 0 is the south edge and draws lower");
    }

    #[test]
    fn test_colorbar_and_decorations() {
        let mut canvas = MapCanvas::new(500, 400, 20, 20).unwrap();
        let ramp = ramp("coolwarm").unwrap();
        let scale = ValueScale::Range { min: -20.0, max: 110.0 };
        canvas.draw_colorbar(ramp, &scale, &[-20.0, 0.0, 50.0, 110.0], "°F");
        canvas.draw_title(&["2m Temperature", "Hour 12", "Init 2025-01-15 06Z"]);
        canvas.draw_run_tag("d01 run 2025-01-15_06_00_00");
        canvas.draw_corner_note("Max: 87.3°F");
        let png = canvas.into_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_composite_panels_dimensions() {
        let mut panels = Vec::new();
        for _ in 0..4 {
            let mut p = Pixmap::new(100, 80).unwrap();
            p.fill(tiny_skia::Color::WHITE);
            panels.push(p);
        }
        let refs: Vec<&Pixmap> = panels.iter().collect();
        let out = composite_panels(&refs, 2).unwrap();
        assert_eq!((out.width(), out.height()), (200, 160));
        assert!(composite_panels(&[], 2).is_err());
    }

    #[test]
    fn test_graticule_levels_step() {
        let levels = graticule_levels(30.2, 36.8);
        assert!(levels.len() <= 8);
        assert!(levels.contains(&31.0));
        // Wide spans move to a coarser step.
        let wide = graticule_levels(-120.0, -70.0);
        assert!(wide.len() <= 8);
        assert!(wide.iter().all(|v| v % 10.0 == 0.0));
    }

    #[test]
    fn test_edge_crossing() {
        let j = edge_crossing([30.0, 31.0, 32.0].into_iter(), 31.5).unwrap();
        assert!((j - 1.5).abs() < 1e-6);
        assert!(edge_crossing([30.0, 31.0].into_iter(), 35.0).is_none());
    }

    #[test]
    fn test_hemisphere_labels() {
        assert_eq!(lat_label(33.0), "33°N");
        assert_eq!(lat_label(-12.5), "12.5°S");
        assert_eq!(lon_label(-83.0), "83°W");
    }
}
