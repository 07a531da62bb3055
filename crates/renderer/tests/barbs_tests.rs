//! Tests for wind barb decomposition and drawing.

use std::f64::consts::PI;

use renderer::barbs::{
    barb_counts, barb_positions, draw_barb, uv_to_speed_direction, FLAG_MS, FULL_BARB_MS,
    HALF_BARB_MS,
};
use renderer::color::Color;
use tiny_skia::Pixmap;

// ============================================================================
// uv_to_speed_direction tests
// ============================================================================

#[test]
fn test_cardinal_directions() {
    // Direction is where the wind blows FROM, math convention.
    let (_, north) = uv_to_speed_direction(0.0, -10.0);
    assert!((north - PI / 2.0).abs() < 1e-6);

    let (_, south) = uv_to_speed_direction(0.0, 10.0);
    assert!((south - 3.0 * PI / 2.0).abs() < 1e-6);

    let (_, east) = uv_to_speed_direction(-10.0, 0.0);
    assert!(east.abs() < 1e-6);

    let (_, west) = uv_to_speed_direction(10.0, 0.0);
    assert!((west - PI).abs() < 1e-6);
}

#[test]
fn test_speed_magnitude() {
    let (speed, _) = uv_to_speed_direction(3.0, 4.0);
    assert!((speed - 5.0).abs() < 1e-9);
}

// ============================================================================
// barb_counts tests
// ============================================================================

#[test]
fn test_standard_decompositions() {
    // (flags, fulls, half) per speed.
    assert_eq!(barb_counts(0.0), (0, 0, false));
    assert_eq!(barb_counts(HALF_BARB_MS), (0, 0, true));
    assert_eq!(barb_counts(FULL_BARB_MS), (0, 1, false));
    assert_eq!(barb_counts(2.0 * FULL_BARB_MS + HALF_BARB_MS), (0, 2, true));
    assert_eq!(barb_counts(FLAG_MS), (1, 0, false));
    assert_eq!(barb_counts(2.0 * FLAG_MS + 2.0 * FULL_BARB_MS), (2, 2, false));
}

#[test]
fn test_rounds_to_nearest_half_unit() {
    // Just under a threshold rounds up.
    assert_eq!(barb_counts(HALF_BARB_MS * 0.9), (0, 0, true));
    // Well under rounds down to calm.
    assert_eq!(barb_counts(HALF_BARB_MS * 0.4), (0, 0, false));
}

// ============================================================================
// barb_positions tests
// ============================================================================

#[test]
fn test_positions_form_offset_lattice() {
    let positions = barb_positions(300.0, 200.0, 100.0);
    assert_eq!(positions.len(), 6);
    assert_eq!(positions[0], (50.0, 50.0));
    assert!(positions.iter().all(|&(x, y)| x < 300.0 && y < 200.0));
}

#[test]
fn test_positions_degenerate_inputs() {
    assert!(barb_positions(100.0, 100.0, 0.0).is_empty());
    assert!(barb_positions(100.0, 100.0, -5.0).is_empty());
    assert!(barb_positions(10.0, 10.0, 50.0).is_empty());
}

// ============================================================================
// draw_barb tests
// ============================================================================

fn dark_pixels(pixmap: &Pixmap) -> usize {
    pixmap.pixels().iter().filter(|p| p.red() < 128).count()
}

#[test]
fn test_calm_draws_small_circle() {
    let mut pixmap = Pixmap::new(60, 60).unwrap();
    pixmap.fill(tiny_skia::Color::WHITE);
    draw_barb(&mut pixmap, 30.0, 30.0, 0.1, 0.1, 24.0, Color::BLACK, 1.2);
    let marks = dark_pixels(&pixmap);
    assert!(marks > 0 && marks < 120, "calm circle should be small, got {}", marks);
}

#[test]
fn test_stronger_wind_draws_more_ink() {
    let mut light = Pixmap::new(80, 80).unwrap();
    light.fill(tiny_skia::Color::WHITE);
    draw_barb(&mut light, 40.0, 40.0, 0.0, -FULL_BARB_MS, 28.0, Color::BLACK, 1.2);

    let mut strong = Pixmap::new(80, 80).unwrap();
    strong.fill(tiny_skia::Color::WHITE);
    draw_barb(&mut strong, 40.0, 40.0, 0.0, -(FLAG_MS + 2.0 * FULL_BARB_MS), 28.0, Color::BLACK, 1.2);

    assert!(dark_pixels(&strong) > dark_pixels(&light));
}

#[test]
fn test_north_wind_staff_points_up() {
    let mut pixmap = Pixmap::new(80, 80).unwrap();
    pixmap.fill(tiny_skia::Color::WHITE);
    draw_barb(&mut pixmap, 40.0, 60.0, 0.0, -FULL_BARB_MS, 30.0, Color::BLACK, 1.2);

    // All ink sits at or above the station row.
    let w = pixmap.width() as usize;
    for (idx, p) in pixmap.pixels().iter().enumerate() {
        if p.red() < 128 {
            let y = idx / w;
            assert!(y <= 62, "north wind barb should extend upward, found ink at y={}", y);
        }
    }
}

#[test]
fn test_nan_components_draw_nothing() {
    let mut pixmap = Pixmap::new(60, 60).unwrap();
    pixmap.fill(tiny_skia::Color::WHITE);
    draw_barb(&mut pixmap, 30.0, 30.0, f64::NAN, 5.0, 24.0, Color::BLACK, 1.2);
    assert_eq!(dark_pixels(&pixmap), 0);
}
