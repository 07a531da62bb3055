//! Streamline tracing over a u/v wind field.
//!
//! Traces midpoint-method (RK2) integral curves in grid coordinates
//! from a lattice of seed points, in both directions. Output polylines
//! are in fractional grid coordinates; the caller maps them to pixels.

use wrf_common::grid::Grid2;

/// Tracing parameters. `seed_stride` is the seed lattice spacing in
/// grid cells, `step` the integration step in cells.
#[derive(Debug, Clone)]
pub struct StreamlineConfig {
    pub seed_stride: usize,
    pub step: f32,
    pub max_steps: usize,
    /// Stop tracing below this speed (m/s). Keeps lines out of calm
    /// regions where direction is noise.
    pub min_speed: f64,
}

impl Default for StreamlineConfig {
    fn default() -> Self {
        StreamlineConfig {
            seed_stride: 6,
            step: 0.4,
            max_steps: 400,
            min_speed: 0.5,
        }
    }
}

/// Trace streamlines over the wind field. Points are (i, j) fractional
/// grid coordinates with j increasing toward the north row.
pub fn trace_streamlines(u: &Grid2, v: &Grid2, config: &StreamlineConfig) -> Vec<Vec<(f32, f32)>> {
    let mut lines = Vec::new();
    if u.ny() != v.ny() || u.nx() != v.nx() || config.seed_stride == 0 {
        return lines;
    }

    let mut j = config.seed_stride / 2;
    while j < u.ny() {
        let mut i = config.seed_stride / 2;
        while i < u.nx() {
            let line = trace_from(u, v, i as f32, j as f32, config);
            if line.len() > 4 {
                lines.push(line);
            }
            i += config.seed_stride;
        }
        j += config.seed_stride;
    }
    lines
}

/// Trace a single line through (i0, j0), extending both downstream and
/// upstream so seeds sit mid-line rather than always at a tail.
fn trace_from(u: &Grid2, v: &Grid2, i0: f32, j0: f32, config: &StreamlineConfig) -> Vec<(f32, f32)> {
    let forward = integrate(u, v, i0, j0, config.step, config);
    let backward = integrate(u, v, i0, j0, -config.step, config);

    let mut line: Vec<(f32, f32)> = backward.into_iter().rev().collect();
    line.push((i0, j0));
    line.extend(forward);
    line
}

fn integrate(
    u: &Grid2,
    v: &Grid2,
    i0: f32,
    j0: f32,
    step: f32,
    config: &StreamlineConfig,
) -> Vec<(f32, f32)> {
    let mut points = Vec::new();
    let (mut i, mut j) = (i0, j0);

    for _ in 0..config.max_steps {
        let Some((di, dj)) = unit_velocity(u, v, i, j, config.min_speed) else {
            break;
        };
        // Midpoint method: sample again half a step along.
        let mi = i + di * step * 0.5;
        let mj = j + dj * step * 0.5;
        let Some((di, dj)) = unit_velocity(u, v, mi, mj, config.min_speed) else {
            break;
        };
        i += di * step;
        j += dj * step;
        if !in_bounds(u, i, j) {
            break;
        }
        points.push((i, j));
    }
    points
}

/// Normalized flow direction at a fractional grid point, or None when
/// out of bounds, NaN, or below the speed floor. The j component is
/// v as-is: row 0 is the south edge, so northward flow increases j.
fn unit_velocity(u: &Grid2, v: &Grid2, i: f32, j: f32, min_speed: f64) -> Option<(f32, f32)> {
    if !in_bounds(u, i, j) {
        return None;
    }
    let uu = u.sample(j as f64, i as f64);
    let vv = v.sample(j as f64, i as f64);
    if uu.is_nan() || vv.is_nan() {
        return None;
    }
    let speed = uu.hypot(vv);
    if speed < min_speed.max(1e-6) {
        return None;
    }
    Some(((uu / speed) as f32, (vv / speed) as f32))
}

fn in_bounds(grid: &Grid2, i: f32, j: f32) -> bool {
    i >= 0.0 && j >= 0.0 && i <= (grid.nx() - 1) as f32 && j <= (grid.ny() - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_westerly(ny: usize, nx: usize) -> (Grid2, Grid2) {
        (Grid2::filled(ny, nx, 10.0), Grid2::filled(ny, nx, 0.0))
    }

    #[test]
    fn test_uniform_flow_traces_straight_lines() {
        let (u, v) = uniform_westerly(20, 40);
        let lines = trace_streamlines(&u, &v, &StreamlineConfig::default());
        assert!(!lines.is_empty());
        for line in &lines {
            let j0 = line[0].1;
            for &(_, j) in line {
                assert!((j - j0).abs() < 0.01, "westerly flow should hold j constant");
            }
            // i must be monotonic along the line.
            for w in line.windows(2) {
                assert!(w[1].0 > w[0].0);
            }
        }
    }

    #[test]
    fn test_calm_field_traces_nothing() {
        let u = Grid2::filled(20, 20, 0.1);
        let v = Grid2::filled(20, 20, 0.0);
        let config = StreamlineConfig {
            min_speed: 0.5,
            ..StreamlineConfig::default()
        };
        assert!(trace_streamlines(&u, &v, &config).is_empty());
    }

    #[test]
    fn test_nan_pocket_stops_lines() {
        let (mut u, v) = uniform_westerly(20, 40);
        for j in 0..20 {
            for i in 20..24 {
                u.set(j, i, f64::NAN);
            }
        }
        let lines = trace_streamlines(&u, &v, &StreamlineConfig::default());
        for line in &lines {
            for &(i, _) in line {
                assert!(!(20.0..23.0).contains(&i) || i < 20.0);
            }
        }
    }

    #[test]
    fn test_mismatched_grids_yield_nothing() {
        let u = Grid2::filled(10, 10, 5.0);
        let v = Grid2::filled(12, 10, 5.0);
        assert!(trace_streamlines(&u, &v, &StreamlineConfig::default()).is_empty());
    }
}
