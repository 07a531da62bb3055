//! Wind barb rendering as stroked paths.
//!
//! Barbs follow the standard staff/feather convention: half barb 5 kt,
//! full barb 10 kt, flag 50 kt, drawn from the u/v components in m/s.

use std::f64::consts::PI;

use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::color::Color;

/// Half barb increment (5 kt) in m/s.
pub const HALF_BARB_MS: f64 = 2.57222;
/// Full barb increment (10 kt) in m/s.
pub const FULL_BARB_MS: f64 = 5.14444;
/// Flag increment (50 kt) in m/s.
pub const FLAG_MS: f64 = 25.7222;

/// Convert u/v wind components (m/s) to speed (m/s) and direction
/// (radians FROM which the wind blows, math convention: 0 = East,
/// π/2 = North, normalized to [0, 2π)).
pub fn uv_to_speed_direction(u: f64, v: f64) -> (f64, f64) {
    let speed = u.hypot(v);
    let mut direction = (-v).atan2(-u);
    if direction < 0.0 {
        direction += 2.0 * PI;
    }
    (speed, direction)
}

/// Decompose a speed into (flags, full barbs, half barb present).
///
/// The speed is rounded to the nearest half-barb increment first, so
/// 4.9 m/s draws as 10 kt rather than 5.
pub fn barb_counts(speed_ms: f64) -> (u32, u32, bool) {
    let half_units = (speed_ms / HALF_BARB_MS).round() as u32;
    let flags = half_units / 10;
    let fulls = (half_units % 10) / 2;
    let half = half_units % 2 == 1;
    (flags, fulls, half)
}

/// Barb anchor positions on a fixed pixel grid, offset half a step so
/// the lattice is centered.
pub fn barb_positions(width: f32, height: f32, spacing: f32) -> Vec<(f32, f32)> {
    let mut positions = Vec::new();
    if spacing <= 0.0 {
        return positions;
    }
    let mut y = spacing / 2.0;
    while y < height {
        let mut x = spacing / 2.0;
        while x < width {
            positions.push((x, y));
            x += spacing;
        }
        y += spacing;
    }
    positions
}

/// Draw one wind barb with its station point at (x, y).
///
/// The staff points into the wind (toward the direction it blows from);
/// feathers sit on the clockwise side, northern hemisphere style. Below
/// half an increment a small calm circle is drawn instead.
pub fn draw_barb(
    pixmap: &mut Pixmap,
    x: f32,
    y: f32,
    u: f64,
    v: f64,
    size: f32,
    color: Color,
    stroke_width: f32,
) {
    if u.is_nan() || v.is_nan() {
        return;
    }

    let (speed, direction) = uv_to_speed_direction(u, v);
    let (flags, fulls, half) = barb_counts(speed);

    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;

    let mut stroke = Stroke::default();
    stroke.width = stroke_width;
    stroke.line_cap = LineCap::Round;
    stroke.line_join = LineJoin::Round;

    if flags == 0 && fulls == 0 && !half {
        let mut pb = PathBuilder::new();
        pb.push_circle(x, y, size * 0.12);
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
        return;
    }

    // Screen-space staff direction (y down): math angle with the sign
    // of the y component flipped.
    let dir = ((direction.cos()) as f32, (-direction.sin()) as f32);
    // Feathers: staff direction rotated 60° clockwise on screen.
    let feather = rotate(dir, 60.0_f32.to_radians());

    let tip = (x + dir.0 * size, y + dir.1 * size);
    let spacing = size * 0.16;
    let flag_depth = size * 0.28;

    let mut pb = PathBuilder::new();
    pb.move_to(x, y);
    pb.line_to(tip.0, tip.1);

    let mut along = 0.0f32; // distance back from the tip along the staff
    let mut flag_pb = PathBuilder::new();

    for _ in 0..flags {
        let outer = point_on_staff(tip, dir, along);
        let inner = point_on_staff(tip, dir, along + flag_depth);
        let apex = (
            outer.0 + feather.0 * size * 0.45,
            outer.1 + feather.1 * size * 0.45,
        );
        flag_pb.move_to(outer.0, outer.1);
        flag_pb.line_to(apex.0, apex.1);
        flag_pb.line_to(inner.0, inner.1);
        flag_pb.close();
        along += flag_depth + spacing * 0.5;
    }

    for _ in 0..fulls {
        let base = point_on_staff(tip, dir, along);
        pb.move_to(base.0, base.1);
        pb.line_to(
            base.0 + feather.0 * size * 0.45,
            base.1 + feather.1 * size * 0.45,
        );
        along += spacing;
    }

    if half {
        // A lone half barb sits one step in from the tip.
        if flags == 0 && fulls == 0 {
            along += spacing;
        }
        let base = point_on_staff(tip, dir, along);
        pb.move_to(base.0, base.1);
        pb.line_to(
            base.0 + feather.0 * size * 0.24,
            base.1 + feather.1 * size * 0.24,
        );
    }

    if let Some(path) = flag_pb.finish() {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

fn point_on_staff(tip: (f32, f32), dir: (f32, f32), back: f32) -> (f32, f32) {
    (tip.0 - dir.0 * back, tip.1 - dir.1 * back)
}

/// Rotate a screen-space vector clockwise by `angle` radians.
fn rotate(v: (f32, f32), angle: f32) -> (f32, f32) {
    let (sin_a, cos_a) = angle.sin_cos();
    (v.0 * cos_a - v.1 * sin_a, v.0 * sin_a + v.1 * cos_a)
}
