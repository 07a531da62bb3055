//! Stroke-segment text rendering.
//!
//! Every glyph is a set of line segments in a unit cell (x 0..0.6,
//! y 0..1, y down), stroked with round caps at the requested size.
//! Lowercase input renders as reduced-height capitals. No font assets.

use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::color::Color;

/// Horizontal advance per character, as a fraction of the glyph height.
const ADVANCE: f32 = 0.78;
/// Height scale for lowercase characters.
const SMALL_CAP_SCALE: f32 = 0.72;

type Seg = ((f32, f32), (f32, f32));

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Glyph cell height in pixels.
    pub size: f32,
    pub color: Color,
    pub bold: bool,
}

impl TextStyle {
    pub fn new(size: f32, color: Color) -> Self {
        Self {
            size,
            color,
            bold: false,
        }
    }

    pub fn bold(size: f32, color: Color) -> Self {
        Self {
            size,
            color,
            bold: true,
        }
    }

    fn stroke_width(&self) -> f32 {
        if self.bold {
            self.size * 0.15
        } else {
            self.size * 0.09
        }
    }
}

/// Width in pixels of `text` at the given size.
pub fn measure_text(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * ADVANCE
}

/// Draw text with its top-left corner at (x, y).
pub fn draw_text(pixmap: &mut Pixmap, x: f32, y: f32, text: &str, style: &TextStyle) {
    draw_glyphs(pixmap, x, y, 0.0, text, style);
}

/// Draw text centered horizontally on `cx`.
pub fn draw_text_centered(pixmap: &mut Pixmap, cx: f32, y: f32, text: &str, style: &TextStyle) {
    let x = cx - measure_text(text, style.size) / 2.0;
    draw_glyphs(pixmap, x, y, 0.0, text, style);
}

/// Draw text ending at `x_right` (right-aligned tick labels).
pub fn draw_text_right(pixmap: &mut Pixmap, x_right: f32, y: f32, text: &str, style: &TextStyle) {
    let x = x_right - measure_text(text, style.size);
    draw_glyphs(pixmap, x, y, 0.0, text, style);
}

/// Draw text rotated by `angle_deg` (clockwise) about its anchor.
pub fn draw_text_rotated(
    pixmap: &mut Pixmap,
    x: f32,
    y: f32,
    angle_deg: f32,
    text: &str,
    style: &TextStyle,
) {
    draw_glyphs(pixmap, x, y, angle_deg.to_radians(), text, style);
}

/// Draw text over a translucent backing rectangle.
pub fn draw_text_boxed(
    pixmap: &mut Pixmap,
    x: f32,
    y: f32,
    text: &str,
    style: &TextStyle,
    background: Color,
) {
    let pad = style.size * 0.25;
    let w = measure_text(text, style.size) + 2.0 * pad;
    let h = style.size + 2.0 * pad;
    if let Some(rect) = tiny_skia::Rect::from_xywh(x - pad, y - pad, w, h) {
        let mut paint = Paint::default();
        paint.set_color(background.to_skia());
        paint.anti_alias = true;
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }
    draw_glyphs(pixmap, x, y, 0.0, text, style);
}

/// Draw text with offset understrokes in the halo color, so annotations
/// stay readable over a busy field.
pub fn draw_text_halo(
    pixmap: &mut Pixmap,
    x: f32,
    y: f32,
    text: &str,
    style: &TextStyle,
    halo: Color,
) {
    let halo_style = TextStyle {
        color: halo,
        ..*style
    };
    let d = (style.size * 0.08).max(1.0);
    for (dx, dy) in [(-d, 0.0), (d, 0.0), (0.0, -d), (0.0, d)] {
        draw_glyphs(pixmap, x + dx, y + dy, 0.0, text, &halo_style);
    }
    draw_glyphs(pixmap, x, y, 0.0, text, style);
}

fn draw_glyphs(
    pixmap: &mut Pixmap,
    x: f32,
    y: f32,
    angle_rad: f32,
    text: &str,
    style: &TextStyle,
) {
    let size = style.size;
    let advance = size * ADVANCE;
    let (sin_a, cos_a) = angle_rad.sin_cos();
    // Rotate a cell-local offset about the text anchor.
    let place = |dx: f32, dy: f32| -> (f32, f32) {
        (x + dx * cos_a - dy * sin_a, y + dx * sin_a + dy * cos_a)
    };

    let mut paint = Paint::default();
    paint.set_color(style.color.to_skia());
    paint.anti_alias = true;

    let mut stroke = Stroke::default();
    stroke.width = style.stroke_width();
    stroke.line_cap = LineCap::Round;
    stroke.line_join = LineJoin::Round;

    let mut pb = PathBuilder::new();
    let mut pen = 0.0f32;

    for ch in text.chars() {
        if ch == ' ' {
            pen += advance;
            continue;
        }
        let (scale, y_off) = if ch.is_ascii_lowercase() {
            (SMALL_CAP_SCALE, size * (1.0 - SMALL_CAP_SCALE))
        } else {
            (1.0, 0.0)
        };
        // Keep reduced glyphs centered in their cell.
        let x_off = pen + 0.3 * size * (1.0 - scale);

        for &((x1, y1), (x2, y2)) in glyph(ch.to_ascii_uppercase()) {
            let (ax, ay) = place(x_off + x1 * size * scale, y_off + y1 * size * scale);
            let (bx, by) = place(x_off + x2 * size * scale, y_off + y2 * size * scale);
            pb.move_to(ax, ay);
            pb.line_to(bx, by);
        }
        pen += advance;
    }

    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

/// Segment list for one glyph. Unknown characters render as nothing.
fn glyph(ch: char) -> &'static [Seg] {
    match ch {
        '0' => &[
            ((0.0, 0.0), (0.6, 0.0)),
            ((0.6, 0.0), (0.6, 1.0)),
            ((0.6, 1.0), (0.0, 1.0)),
            ((0.0, 1.0), (0.0, 0.0)),
        ],
        '1' => &[((0.15, 0.15), (0.3, 0.0)), ((0.3, 0.0), (0.3, 1.0))],
        '2' => &[
            ((0.0, 0.12), (0.15, 0.0)),
            ((0.15, 0.0), (0.45, 0.0)),
            ((0.45, 0.0), (0.6, 0.12)),
            ((0.6, 0.12), (0.6, 0.38)),
            ((0.6, 0.38), (0.0, 1.0)),
            ((0.0, 1.0), (0.6, 1.0)),
        ],
        '3' => &[
            ((0.0, 0.0), (0.6, 0.0)),
            ((0.6, 0.0), (0.6, 1.0)),
            ((0.0, 1.0), (0.6, 1.0)),
            ((0.2, 0.5), (0.6, 0.5)),
        ],
        '4' => &[
            ((0.45, 0.0), (0.0, 0.65)),
            ((0.0, 0.65), (0.6, 0.65)),
            ((0.45, 0.0), (0.45, 1.0)),
        ],
        '5' => &[
            ((0.6, 0.0), (0.0, 0.0)),
            ((0.0, 0.0), (0.0, 0.45)),
            ((0.0, 0.45), (0.45, 0.45)),
            ((0.45, 0.45), (0.6, 0.6)),
            ((0.6, 0.6), (0.6, 0.85)),
            ((0.6, 0.85), (0.45, 1.0)),
            ((0.45, 1.0), (0.1, 1.0)),
            ((0.1, 1.0), (0.0, 0.9)),
        ],
        '6' => &[
            ((0.55, 0.0), (0.2, 0.0)),
            ((0.2, 0.0), (0.0, 0.3)),
            ((0.0, 0.3), (0.0, 0.85)),
            ((0.0, 0.85), (0.15, 1.0)),
            ((0.15, 1.0), (0.45, 1.0)),
            ((0.45, 1.0), (0.6, 0.85)),
            ((0.6, 0.85), (0.6, 0.6)),
            ((0.6, 0.6), (0.45, 0.5)),
            ((0.45, 0.5), (0.0, 0.5)),
        ],
        '7' => &[((0.0, 0.0), (0.6, 0.0)), ((0.6, 0.0), (0.2, 1.0))],
        '8' => &[
            ((0.0, 0.0), (0.6, 0.0)),
            ((0.6, 0.0), (0.6, 1.0)),
            ((0.6, 1.0), (0.0, 1.0)),
            ((0.0, 1.0), (0.0, 0.0)),
            ((0.0, 0.5), (0.6, 0.5)),
        ],
        '9' => &[
            ((0.6, 0.5), (0.15, 0.5)),
            ((0.15, 0.5), (0.0, 0.35)),
            ((0.0, 0.35), (0.0, 0.15)),
            ((0.0, 0.15), (0.15, 0.0)),
            ((0.15, 0.0), (0.45, 0.0)),
            ((0.45, 0.0), (0.6, 0.15)),
            ((0.6, 0.15), (0.6, 0.7)),
            ((0.6, 0.7), (0.3, 1.0)),
        ],
        'A' => &[
            ((0.0, 1.0), (0.3, 0.0)),
            ((0.3, 0.0), (0.6, 1.0)),
            ((0.12, 0.62), (0.48, 0.62)),
        ],
        'B' => &[
            ((0.0, 0.0), (0.0, 1.0)),
            ((0.0, 0.0), (0.45, 0.0)),
            ((0.45, 0.0), (0.55, 0.1)),
            ((0.55, 0.1), (0.55, 0.4)),
            ((0.55, 0.4), (0.45, 0.5)),
            ((0.0, 0.5), (0.45, 0.5)),
            ((0.45, 0.5), (0.6, 0.62)),
            ((0.6, 0.62), (0.6, 0.88)),
            ((0.6, 0.88), (0.45, 1.0)),
            ((0.0, 1.0), (0.45, 1.0)),
        ],
        'C' => &[
            ((0.6, 0.12), (0.45, 0.0)),
            ((0.45, 0.0), (0.15, 0.0)),
            ((0.15, 0.0), (0.0, 0.15)),
            ((0.0, 0.15), (0.0, 0.85)),
            ((0.0, 0.85), (0.15, 1.0)),
            ((0.15, 1.0), (0.45, 1.0)),
            ((0.45, 1.0), (0.6, 0.88)),
        ],
        'D' => &[
            ((0.0, 0.0), (0.0, 1.0)),
            ((0.0, 0.0), (0.4, 0.0)),
            ((0.4, 0.0), (0.6, 0.2)),
            ((0.6, 0.2), (0.6, 0.8)),
            ((0.6, 0.8), (0.4, 1.0)),
            ((0.0, 1.0), (0.4, 1.0)),
        ],
        'E' => &[
            ((0.0, 0.0), (0.0, 1.0)),
            ((0.0, 0.0), (0.6, 0.0)),
            ((0.0, 0.5), (0.45, 0.5)),
            ((0.0, 1.0), (0.6, 1.0)),
        ],
        'F' => &[
            ((0.0, 0.0), (0.0, 1.0)),
            ((0.0, 0.0), (0.6, 0.0)),
            ((0.0, 0.5), (0.45, 0.5)),
        ],
        'G' => &[
            ((0.6, 0.12), (0.45, 0.0)),
            ((0.45, 0.0), (0.15, 0.0)),
            ((0.15, 0.0), (0.0, 0.15)),
            ((0.0, 0.15), (0.0, 0.85)),
            ((0.0, 0.85), (0.15, 1.0)),
            ((0.15, 1.0), (0.45, 1.0)),
            ((0.45, 1.0), (0.6, 0.85)),
            ((0.6, 0.85), (0.6, 0.55)),
            ((0.6, 0.55), (0.35, 0.55)),
        ],
        'H' => &[
            ((0.0, 0.0), (0.0, 1.0)),
            ((0.6, 0.0), (0.6, 1.0)),
            ((0.0, 0.5), (0.6, 0.5)),
        ],
        'I' => &[
            ((0.15, 0.0), (0.45, 0.0)),
            ((0.3, 0.0), (0.3, 1.0)),
            ((0.15, 1.0), (0.45, 1.0)),
        ],
        'J' => &[
            ((0.6, 0.0), (0.6, 0.85)),
            ((0.6, 0.85), (0.45, 1.0)),
            ((0.45, 1.0), (0.15, 1.0)),
            ((0.15, 1.0), (0.0, 0.85)),
        ],
        'K' => &[
            ((0.0, 0.0), (0.0, 1.0)),
            ((0.6, 0.0), (0.0, 0.55)),
            ((0.2, 0.4), (0.6, 1.0)),
        ],
        'L' => &[((0.0, 0.0), (0.0, 1.0)), ((0.0, 1.0), (0.6, 1.0))],
        'M' => &[
            ((0.0, 1.0), (0.0, 0.0)),
            ((0.0, 0.0), (0.3, 0.45)),
            ((0.3, 0.45), (0.6, 0.0)),
            ((0.6, 0.0), (0.6, 1.0)),
        ],
        'N' => &[
            ((0.0, 1.0), (0.0, 0.0)),
            ((0.0, 0.0), (0.6, 1.0)),
            ((0.6, 1.0), (0.6, 0.0)),
        ],
        'O' => &[
            ((0.15, 0.0), (0.45, 0.0)),
            ((0.45, 0.0), (0.6, 0.15)),
            ((0.6, 0.15), (0.6, 0.85)),
            ((0.6, 0.85), (0.45, 1.0)),
            ((0.45, 1.0), (0.15, 1.0)),
            ((0.15, 1.0), (0.0, 0.85)),
            ((0.0, 0.85), (0.0, 0.15)),
            ((0.0, 0.15), (0.15, 0.0)),
        ],
        'P' => &[
            ((0.0, 0.0), (0.0, 1.0)),
            ((0.0, 0.0), (0.45, 0.0)),
            ((0.45, 0.0), (0.6, 0.12)),
            ((0.6, 0.12), (0.6, 0.38)),
            ((0.6, 0.38), (0.45, 0.5)),
            ((0.0, 0.5), (0.45, 0.5)),
        ],
        'Q' => &[
            ((0.15, 0.0), (0.45, 0.0)),
            ((0.45, 0.0), (0.6, 0.15)),
            ((0.6, 0.15), (0.6, 0.85)),
            ((0.6, 0.85), (0.45, 1.0)),
            ((0.45, 1.0), (0.15, 1.0)),
            ((0.15, 1.0), (0.0, 0.85)),
            ((0.0, 0.85), (0.0, 0.15)),
            ((0.0, 0.15), (0.15, 0.0)),
            ((0.35, 0.7), (0.6, 1.0)),
        ],
        'R' => &[
            ((0.0, 0.0), (0.0, 1.0)),
            ((0.0, 0.0), (0.45, 0.0)),
            ((0.45, 0.0), (0.6, 0.12)),
            ((0.6, 0.12), (0.6, 0.38)),
            ((0.6, 0.38), (0.45, 0.5)),
            ((0.0, 0.5), (0.45, 0.5)),
            ((0.25, 0.5), (0.6, 1.0)),
        ],
        'S' => &[
            ((0.6, 0.12), (0.45, 0.0)),
            ((0.45, 0.0), (0.15, 0.0)),
            ((0.15, 0.0), (0.0, 0.12)),
            ((0.0, 0.12), (0.0, 0.38)),
            ((0.0, 0.38), (0.15, 0.5)),
            ((0.15, 0.5), (0.45, 0.5)),
            ((0.45, 0.5), (0.6, 0.62)),
            ((0.6, 0.62), (0.6, 0.88)),
            ((0.6, 0.88), (0.45, 1.0)),
            ((0.45, 1.0), (0.15, 1.0)),
            ((0.15, 1.0), (0.0, 0.88)),
        ],
        'T' => &[((0.0, 0.0), (0.6, 0.0)), ((0.3, 0.0), (0.3, 1.0))],
        'U' => &[
            ((0.0, 0.0), (0.0, 0.85)),
            ((0.0, 0.85), (0.15, 1.0)),
            ((0.15, 1.0), (0.45, 1.0)),
            ((0.45, 1.0), (0.6, 0.85)),
            ((0.6, 0.85), (0.6, 0.0)),
        ],
        'V' => &[((0.0, 0.0), (0.3, 1.0)), ((0.3, 1.0), (0.6, 0.0))],
        'W' => &[
            ((0.0, 0.0), (0.12, 1.0)),
            ((0.12, 1.0), (0.3, 0.5)),
            ((0.3, 0.5), (0.48, 1.0)),
            ((0.48, 1.0), (0.6, 0.0)),
        ],
        'X' => &[((0.0, 0.0), (0.6, 1.0)), ((0.6, 0.0), (0.0, 1.0))],
        'Y' => &[
            ((0.0, 0.0), (0.3, 0.45)),
            ((0.6, 0.0), (0.3, 0.45)),
            ((0.3, 0.45), (0.3, 1.0)),
        ],
        'Z' => &[
            ((0.0, 0.0), (0.6, 0.0)),
            ((0.6, 0.0), (0.0, 1.0)),
            ((0.0, 1.0), (0.6, 1.0)),
        ],
        '.' => &[((0.28, 0.92), (0.32, 0.98))],
        ',' => &[((0.32, 0.88), (0.24, 1.08))],
        ':' => &[((0.28, 0.3), (0.32, 0.36)), ((0.28, 0.75), (0.32, 0.81))],
        '(' => &[
            ((0.45, 0.0), (0.25, 0.25)),
            ((0.25, 0.25), (0.25, 0.75)),
            ((0.25, 0.75), (0.45, 1.0)),
        ],
        ')' => &[
            ((0.15, 0.0), (0.35, 0.25)),
            ((0.35, 0.25), (0.35, 0.75)),
            ((0.35, 0.75), (0.15, 1.0)),
        ],
        '%' => &[
            ((0.0, 1.0), (0.6, 0.0)),
            ((0.05, 0.05), (0.22, 0.05)),
            ((0.22, 0.05), (0.22, 0.28)),
            ((0.22, 0.28), (0.05, 0.28)),
            ((0.05, 0.28), (0.05, 0.05)),
            ((0.38, 0.72), (0.55, 0.72)),
            ((0.55, 0.72), (0.55, 0.95)),
            ((0.55, 0.95), (0.38, 0.95)),
            ((0.38, 0.95), (0.38, 0.72)),
        ],
        '/' => &[((0.0, 1.0), (0.6, 0.0))],
        '+' => &[((0.3, 0.2), (0.3, 0.8)), ((0.0, 0.5), (0.6, 0.5))],
        '-' => &[((0.05, 0.5), (0.55, 0.5))],
        '=' => &[((0.05, 0.38), (0.55, 0.38)), ((0.05, 0.62), (0.55, 0.62))],
        '°' => &[
            ((0.15, 0.0), (0.45, 0.0)),
            ((0.45, 0.0), (0.45, 0.3)),
            ((0.45, 0.3), (0.15, 0.3)),
            ((0.15, 0.3), (0.15, 0.0)),
        ],
        '*' => &[
            ((0.3, 0.08), (0.3, 0.52)),
            ((0.1, 0.18), (0.5, 0.42)),
            ((0.5, 0.18), (0.1, 0.42)),
        ],
        '_' => &[((0.0, 1.0), (0.6, 1.0))],
        '\'' => &[((0.3, 0.0), (0.3, 0.2))],
        '^' => &[((0.12, 0.22), (0.3, 0.0)), ((0.3, 0.0), (0.48, 0.22))],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_scales_with_length() {
        let one = measure_text("A", 10.0);
        let five = measure_text("ABCDE", 10.0);
        assert!((five - 5.0 * one).abs() < 1e-5);
        assert!(measure_text("", 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_every_needed_glyph_has_segments() {
        let needed = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.,:()%/+-=°*_'^";
        for ch in needed.chars() {
            assert!(!glyph(ch).is_empty(), "no segments for {ch:?}");
        }
    }

    #[test]
    fn test_unknown_glyph_is_empty() {
        assert!(glyph('~').is_empty());
        assert!(glyph('@').is_empty());
    }

    #[test]
    fn test_draw_text_marks_pixels() {
        let mut pixmap = Pixmap::new(100, 30).unwrap();
        pixmap.fill(tiny_skia::Color::WHITE);
        draw_text(
            &mut pixmap,
            4.0,
            4.0,
            "HELLO 42",
            &TextStyle::new(16.0, Color::BLACK),
        );
        let touched = pixmap
            .pixels()
            .iter()
            .filter(|p| p.red() < 200)
            .count();
        assert!(touched > 50, "expected dark strokes, got {touched} pixels");
    }
}
