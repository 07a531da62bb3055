//! Contour line (isoline) generation using marching squares.
//!
//! Contours are traced in grid index space (x along columns, y along
//! rows); callers map points into pixel coordinates when stroking, so
//! the same machinery serves maps, graticules, and chart overlays.

use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};
use wrf_common::Grid2;

use crate::color::Color;

/// A point in 2D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A line segment between two points.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// A complete contour polyline at one level.
#[derive(Debug, Clone)]
pub struct Contour {
    pub level: f64,
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Line styling for stroked contours and polylines.
#[derive(Debug, Clone, Copy)]
pub struct LineStyle {
    pub color: Color,
    pub width: f32,
    pub dashed: bool,
}

impl LineStyle {
    pub fn solid(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            dashed: false,
        }
    }

    pub fn dashed(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            dashed: true,
        }
    }
}

/// Generate evenly spaced levels covering [min, max].
pub fn contour_levels(min: f64, max: f64, interval: f64) -> Vec<f64> {
    if interval <= 0.0 || max <= min {
        return vec![];
    }
    let start = (min / interval).ceil() * interval;
    let mut levels = Vec::new();
    let mut level = start;
    while level <= max {
        levels.push(level);
        level += interval;
    }
    levels
}

/// Extract raw segments for one level. Cells touching a NaN corner are
/// skipped, so masked regions simply end the lines.
pub fn march_squares(grid: &Grid2, level: f64) -> Vec<Segment> {
    let (ny, nx) = (grid.ny(), grid.nx());
    if ny < 2 || nx < 2 {
        return vec![];
    }

    let mut segments = Vec::new();

    for j in 0..(ny - 1) {
        for i in 0..(nx - 1) {
            let bl = grid.get(j, i);
            let br = grid.get(j, i + 1);
            let tl = grid.get(j + 1, i);
            let tr = grid.get(j + 1, i + 1);

            if bl.is_nan() || br.is_nan() || tl.is_nan() || tr.is_nan() {
                continue;
            }

            let mut cell_index = 0u8;
            if bl >= level {
                cell_index |= 1;
            }
            if br >= level {
                cell_index |= 2;
            }
            if tr >= level {
                cell_index |= 4;
            }
            if tl >= level {
                cell_index |= 8;
            }

            segments.extend(cell_segments(
                cell_index, i as f32, j as f32, bl, br, tr, tl, level,
            ));
        }
    }

    segments
}

/// Marching squares lookup: connect edge crossings for one cell.
/// Corner order is bottom-left, bottom-right, top-right, top-left with
/// y increasing toward the top row.
#[allow(clippy::too_many_arguments)]
fn cell_segments(
    cell_index: u8,
    x: f32,
    y: f32,
    bl: f64,
    br: f64,
    tr: f64,
    tl: f64,
    level: f64,
) -> Vec<Segment> {
    let bottom = interpolate_edge(x, y, x + 1.0, y, bl, br, level);
    let right = interpolate_edge(x + 1.0, y, x + 1.0, y + 1.0, br, tr, level);
    let top = interpolate_edge(x, y + 1.0, x + 1.0, y + 1.0, tl, tr, level);
    let left = interpolate_edge(x, y, x, y + 1.0, bl, tl, level);

    match cell_index {
        0 | 15 => vec![],
        1 | 14 => vec![Segment {
            start: left,
            end: bottom,
        }],
        2 | 13 => vec![Segment {
            start: bottom,
            end: right,
        }],
        3 | 12 => vec![Segment {
            start: left,
            end: right,
        }],
        4 | 11 => vec![Segment {
            start: right,
            end: top,
        }],
        5 => vec![
            Segment {
                start: left,
                end: bottom,
            },
            Segment {
                start: right,
                end: top,
            },
        ],
        6 | 9 => vec![Segment {
            start: bottom,
            end: top,
        }],
        7 | 8 => vec![Segment {
            start: left,
            end: top,
        }],
        10 => vec![
            Segment {
                start: bottom,
                end: right,
            },
            Segment {
                start: left,
                end: top,
            },
        ],
        _ => vec![],
    }
}

fn interpolate_edge(x1: f32, y1: f32, x2: f32, y2: f32, v1: f64, v2: f64, level: f64) -> Point {
    if (v2 - v1).abs() < 1e-9 {
        return Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }
    let t = (((level - v1) / (v2 - v1)) as f32).clamp(0.0, 1.0);
    Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

/// Chain unordered segments into continuous polylines.
pub fn connect_segments(segments: Vec<Segment>) -> Vec<Contour> {
    if segments.is_empty() {
        return vec![];
    }

    let mut contours = Vec::new();
    let mut used = vec![false; segments.len()];
    let epsilon = 0.001f32;

    for start_idx in 0..segments.len() {
        if used[start_idx] {
            continue;
        }

        let mut points = vec![segments[start_idx].start, segments[start_idx].end];
        used[start_idx] = true;

        let mut changed = true;
        while changed {
            changed = false;
            let current_end = *points.last().unwrap();

            for (i, seg) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }
                let dist_start = (seg.start.x - current_end.x).hypot(seg.start.y - current_end.y);
                let dist_end = (seg.end.x - current_end.x).hypot(seg.end.y - current_end.y);

                if dist_start < epsilon {
                    points.push(seg.end);
                    used[i] = true;
                    changed = true;
                    break;
                } else if dist_end < epsilon {
                    points.push(seg.start);
                    used[i] = true;
                    changed = true;
                    break;
                }
            }
        }

        let first = points[0];
        let last = *points.last().unwrap();
        let closed = (first.x - last.x).hypot(first.y - last.y) < epsilon;

        if points.len() >= 2 {
            contours.push(Contour {
                level: 0.0,
                points,
                closed,
            });
        }
    }

    contours
}

/// Chaikin corner cutting. Open contours keep their endpoints.
pub fn smooth_contour(contour: &Contour, iterations: u32) -> Contour {
    if iterations == 0 || contour.points.len() < 3 {
        return contour.clone();
    }

    let mut points = contour.points.clone();

    for _ in 0..iterations {
        let mut new_points = Vec::with_capacity(points.len() * 2);

        for i in 0..points.len() {
            let p1 = points[i];
            let p2 = if contour.closed {
                points[(i + 1) % points.len()]
            } else if i + 1 < points.len() {
                points[i + 1]
            } else {
                break;
            };

            new_points.push(Point::new(
                0.75 * p1.x + 0.25 * p2.x,
                0.75 * p1.y + 0.25 * p2.y,
            ));
            new_points.push(Point::new(
                0.25 * p1.x + 0.75 * p2.x,
                0.25 * p1.y + 0.75 * p2.y,
            ));
        }

        if !contour.closed && !points.is_empty() {
            new_points.insert(0, points[0]);
            if let Some(&last) = points.last() {
                new_points.push(last);
            }
        }

        points = new_points;
    }

    Contour {
        level: contour.level,
        points,
        closed: contour.closed,
    }
}

/// March, chain, and smooth: the full pipeline for a set of levels.
pub fn field_contours(grid: &Grid2, levels: &[f64], smoothing_passes: u32) -> Vec<Contour> {
    let mut all = Vec::new();
    for &level in levels {
        let segments = march_squares(grid, level);
        let mut contours = connect_segments(segments);
        for contour in &mut contours {
            contour.level = level;
            if smoothing_passes > 0 {
                *contour = smooth_contour(contour, smoothing_passes);
            }
        }
        all.extend(contours);
    }
    all
}

/// Stroke contours onto a pixmap, mapping each grid-space point through
/// `to_px`.
pub fn stroke_contours<F>(pixmap: &mut Pixmap, contours: &[Contour], to_px: F, style: &LineStyle)
where
    F: Fn(f32, f32) -> (f32, f32),
{
    for contour in contours {
        if contour.points.len() < 2 {
            continue;
        }
        let pts: Vec<(f32, f32)> = contour.points.iter().map(|p| to_px(p.x, p.y)).collect();
        stroke_path(pixmap, &pts, contour.closed, style);
    }
}

/// Stroke an open polyline in pixel coordinates.
pub fn stroke_polyline(pixmap: &mut Pixmap, points: &[(f32, f32)], style: &LineStyle) {
    stroke_path(pixmap, points, false, style);
}

fn stroke_path(pixmap: &mut Pixmap, points: &[(f32, f32)], closed: bool, style: &LineStyle) {
    if points.len() < 2 {
        return;
    }

    let mut paint = Paint::default();
    paint.set_color(style.color.to_skia());
    paint.anti_alias = true;

    let mut stroke = Stroke::default();
    stroke.width = style.width;
    stroke.line_cap = LineCap::Round;
    stroke.line_join = LineJoin::Round;
    if style.dashed {
        stroke.dash = StrokeDash::new(vec![style.width * 4.0, style.width * 3.0], 0.0);
    }

    let mut pb = PathBuilder::new();
    pb.move_to(points[0].0, points[0].1);
    for &(x, y) in &points[1..] {
        pb.line_to(x, y);
    }
    if closed {
        pb.close();
    }

    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(ny: usize, nx: usize, data: Vec<f64>) -> Grid2 {
        Grid2::new(ny, nx, data).unwrap()
    }

    #[test]
    fn test_contour_levels() {
        assert_eq!(contour_levels(0.0, 20.0, 5.0), vec![0.0, 5.0, 10.0, 15.0, 20.0]);
        assert_eq!(contour_levels(2.0, 18.0, 5.0), vec![5.0, 10.0, 15.0]);
        assert!(contour_levels(0.0, 10.0, 0.0).is_empty());
        assert!(contour_levels(10.0, 0.0, 5.0).is_empty());
    }

    #[test]
    fn test_march_squares_flat() {
        let g = grid(3, 3, vec![5.0; 9]);
        assert!(march_squares(&g, 5.0).is_empty());
    }

    #[test]
    fn test_march_squares_peak() {
        let g = grid(
            3,
            3,
            vec![0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0],
        );
        let segments = march_squares(&g, 5.0);
        assert!(!segments.is_empty());
        let contours = connect_segments(segments);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].closed, "ring around a peak should close");
    }

    #[test]
    fn test_march_squares_skips_nan_cells() {
        let g = grid(
            3,
            3,
            vec![0.0, 0.0, 0.0, 0.0, f64::NAN, 0.0, 10.0, 10.0, 10.0],
        );
        // Cells touching the NaN center produce nothing; only the top
        // edge between rows 1 and 2 can carry a crossing, and both of
        // its cells touch NaN too.
        assert!(march_squares(&g, 5.0).is_empty());
    }

    #[test]
    fn test_interpolate_edge_midpoint() {
        let p = interpolate_edge(0.0, 0.0, 1.0, 0.0, 0.0, 10.0, 5.0);
        assert!((p.x - 0.5).abs() < 0.01);
        assert!(p.y.abs() < 0.01);
    }

    #[test]
    fn test_smooth_contour_keeps_endpoints() {
        let contour = Contour {
            level: 0.0,
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(5.0, 5.0),
                Point::new(10.0, 0.0),
            ],
            closed: false,
        };
        let smoothed = smooth_contour(&contour, 2);
        assert!(smoothed.points.len() > contour.points.len());
        assert_eq!(smoothed.points[0], contour.points[0]);
        assert_eq!(*smoothed.points.last().unwrap(), *contour.points.last().unwrap());
    }

    #[test]
    fn test_field_contours_sets_levels() {
        let g = grid(
            3,
            3,
            vec![0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0],
        );
        let contours = field_contours(&g, &[3.0, 7.0], 1);
        assert!(contours.iter().any(|c| (c.level - 3.0).abs() < 1e-9));
        assert!(contours.iter().any(|c| (c.level - 7.0).abs() < 1e-9));
    }
}
