//! Tests for contour extraction and stroking.

use renderer::color::Color;
use renderer::contour::{
    connect_segments, contour_levels, field_contours, march_squares, smooth_contour, stroke_contours,
    LineStyle,
};
use tiny_skia::Pixmap;
use wrf_common::grid::Grid2;

/// Radial bump peaking at the grid center.
fn bump_grid(n: usize) -> Grid2 {
    let mut g = Grid2::filled(n, n, 0.0);
    let c = (n - 1) as f64 / 2.0;
    for j in 0..n {
        for i in 0..n {
            let d = ((j as f64 - c).powi(2) + (i as f64 - c).powi(2)).sqrt();
            g.set(j, i, 100.0 - d * 10.0);
        }
    }
    g
}

// ============================================================================
// contour_levels tests
// ============================================================================

#[test]
fn test_contour_levels_basic() {
    let levels = contour_levels(0.0, 100.0, 10.0);
    assert_eq!(
        levels,
        vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]
    );
}

#[test]
fn test_contour_levels_offset_start() {
    // Range doesn't start on an interval multiple.
    let levels = contour_levels(3.0, 27.0, 5.0);
    assert_eq!(levels, vec![5.0, 10.0, 15.0, 20.0, 25.0]);
}

#[test]
fn test_contour_levels_negative_range() {
    let levels = contour_levels(-20.0, 20.0, 10.0);
    assert_eq!(levels, vec![-20.0, -10.0, 0.0, 10.0, 20.0]);
}

#[test]
fn test_contour_levels_invalid() {
    assert!(contour_levels(0.0, 100.0, 0.0).is_empty());
    assert!(contour_levels(0.0, 100.0, -10.0).is_empty());
    assert!(contour_levels(100.0, 0.0, 10.0).is_empty());
}

// ============================================================================
// march_squares tests
// ============================================================================

#[test]
fn test_march_squares_flat_field() {
    let g = Grid2::filled(4, 4, 1.0);
    assert!(march_squares(&g, 5.0).is_empty());
}

#[test]
fn test_march_squares_saddle_cell() {
    // High corners on one diagonal: the ambiguous cases yield two
    // segments in a single cell.
    let g = Grid2::new(2, 2, vec![10.0, 0.0, 0.0, 10.0]).unwrap();
    let segments = march_squares(&g, 5.0);
    assert_eq!(segments.len(), 2);
}

#[test]
fn test_march_squares_skips_nan_cells() {
    let mut g = bump_grid(8);
    for j in 0..8 {
        g.set(j, 3, f64::NAN);
    }
    // Cells touching the NaN column contribute nothing.
    for segment in march_squares(&g, 50.0) {
        for p in [segment.start, segment.end] {
            assert!(p.x <= 2.0 || p.x >= 4.0, "segment at x={} crosses NaN column", p.x);
        }
    }
}

// ============================================================================
// connect_segments / smooth_contour tests
// ============================================================================

#[test]
fn test_bump_produces_closed_ring() {
    let g = bump_grid(11);
    let contours = connect_segments(march_squares(&g, 60.0));
    assert_eq!(contours.len(), 1);
    let ring = &contours[0];
    assert!(ring.closed);

    // Every ring vertex sits near the d = 4 circle around the center.
    for p in &ring.points {
        let d = ((p.x - 5.0).powi(2) + (p.y - 5.0).powi(2)).sqrt();
        assert!((d - 4.0).abs() < 0.8, "vertex off the level circle: d={}", d);
    }
}

#[test]
fn test_smoothing_preserves_closure_and_endpoints() {
    let g = bump_grid(11);
    let contours = connect_segments(march_squares(&g, 60.0));
    let smoothed = smooth_contour(&contours[0], 2);
    assert!(smoothed.closed);
    assert!(smoothed.points.len() > contours[0].points.len());

    // An open line across the grid keeps its first and last points.
    let ramp = Grid2::new(3, 3, (0..9).map(|v| v as f64).collect()).unwrap();
    let open = connect_segments(march_squares(&ramp, 3.5));
    assert!(!open.is_empty());
    let line = &open[0];
    assert!(!line.closed);
    let smoothed = smooth_contour(line, 3);
    assert_eq!(smoothed.points.first(), line.points.first());
    assert_eq!(smoothed.points.last(), line.points.last());
}

// ============================================================================
// field_contours / stroke_contours tests
// ============================================================================

#[test]
fn test_field_contours_records_levels() {
    let g = bump_grid(11);
    let contours = field_contours(&g, &[40.0, 60.0, 80.0], 1);
    assert!(contours.len() >= 3);
    for c in &contours {
        assert!([40.0, 60.0, 80.0].contains(&c.level));
        assert!(c.points.len() >= 2);
    }
}

#[test]
fn test_stroke_contours_marks_pixels() {
    let g = bump_grid(11);
    let contours = field_contours(&g, &[60.0], 1);
    let mut pixmap = Pixmap::new(110, 110).unwrap();
    pixmap.fill(tiny_skia::Color::WHITE);
    stroke_contours(
        &mut pixmap,
        &contours,
        |i, j| (i * 10.0, 100.0 - j * 10.0),
        &LineStyle::solid(Color::BLACK, 1.5),
    );
    let dark = pixmap.pixels().iter().filter(|p| p.red() < 100).count();
    assert!(dark > 50, "ring should leave a visible trail, got {} dark pixels", dark);
}

#[test]
fn test_dashed_stroke_covers_less_than_solid() {
    let g = bump_grid(11);
    let contours = field_contours(&g, &[60.0], 0);

    let mut solid = Pixmap::new(110, 110).unwrap();
    solid.fill(tiny_skia::Color::WHITE);
    stroke_contours(
        &mut solid,
        &contours,
        |i, j| (i * 10.0, 100.0 - j * 10.0),
        &LineStyle::solid(Color::BLACK, 1.5),
    );

    let mut dashed = Pixmap::new(110, 110).unwrap();
    dashed.fill(tiny_skia::Color::WHITE);
    stroke_contours(
        &mut dashed,
        &contours,
        |i, j| (i * 10.0, 100.0 - j * 10.0),
        &LineStyle::dashed(Color::BLACK, 1.5),
    );

    let count = |p: &Pixmap| p.pixels().iter().filter(|px| px.red() < 100).count();
    assert!(count(&dashed) < count(&solid));
}
