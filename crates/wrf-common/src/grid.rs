//! Gridded field containers for WRF model output.
//!
//! Fields are stored row-major with row 0 at the southern edge, matching
//! the (south_north, west_east) ordering of the source files. Missing
//! values are NaN in-band.

use crate::error::{CommonError, CommonResult};

/// A single horizontal field, row-major (ny rows of nx values).
#[derive(Debug, Clone)]
pub struct Grid2 {
    ny: usize,
    nx: usize,
    data: Vec<f64>,
}

impl Grid2 {
    /// Wrap a row-major value buffer, checking the shape.
    pub fn new(ny: usize, nx: usize, data: Vec<f64>) -> CommonResult<Self> {
        if data.len() != ny * nx {
            return Err(CommonError::ShapeMismatch {
                expected: ny * nx,
                actual: data.len(),
            });
        }
        Ok(Self { ny, nx, data })
    }

    /// A grid of one repeated value.
    pub fn filled(ny: usize, nx: usize, value: f64) -> Self {
        Self {
            ny,
            nx,
            data: vec![value; ny * nx],
        }
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Value at row j, column i.
    #[inline]
    pub fn get(&self, j: usize, i: usize) -> f64 {
        self.data[j * self.nx + i]
    }

    #[inline]
    pub fn set(&mut self, j: usize, i: usize, value: f64) {
        self.data[j * self.nx + i] = value;
    }

    /// Apply a function to every value.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Grid2 {
        Grid2 {
            ny: self.ny,
            nx: self.nx,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two same-shaped grids pointwise.
    pub fn zip_map(&self, other: &Grid2, f: impl Fn(f64, f64) -> f64) -> CommonResult<Grid2> {
        if self.ny != other.ny || self.nx != other.nx {
            return Err(CommonError::DimensionMismatch {
                a_ny: self.ny,
                a_nx: self.nx,
                b_ny: other.ny,
                b_nx: other.nx,
            });
        }
        Ok(Grid2 {
            ny: self.ny,
            nx: self.nx,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Maximum finite value, if any.
    pub fn max_value(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    /// Minimum finite value, if any.
    pub fn min_value(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
    }

    /// Bilinear sample at fractional grid coordinates (row j, column i).
    /// Returns NaN outside the grid or next to missing values.
    pub fn sample(&self, j: f64, i: f64) -> f64 {
        if j < 0.0 || i < 0.0 || j > (self.ny - 1) as f64 || i > (self.nx - 1) as f64 {
            return f64::NAN;
        }
        let j0 = j.floor() as usize;
        let i0 = i.floor() as usize;
        let j1 = (j0 + 1).min(self.ny - 1);
        let i1 = (i0 + 1).min(self.nx - 1);
        let fj = j - j0 as f64;
        let fi = i - i0 as f64;

        let v00 = self.get(j0, i0);
        let v01 = self.get(j0, i1);
        let v10 = self.get(j1, i0);
        let v11 = self.get(j1, i1);

        let top = v00 * (1.0 - fi) + v01 * fi;
        let bottom = v10 * (1.0 - fi) + v11 * fi;
        top * (1.0 - fj) + bottom * fj
    }

    /// Nearest grid indices (j, i) to a lat/lon point given the model's
    /// coordinate arrays. Squared-distance scan; adequate for the small
    /// domains these products cover.
    pub fn nearest_index(lat: &Grid2, lon: &Grid2, target_lat: f64, target_lon: f64) -> (usize, usize) {
        let mut best = (0usize, 0usize);
        let mut best_d = f64::INFINITY;
        for j in 0..lat.ny {
            for i in 0..lat.nx {
                let dlat = lat.get(j, i) - target_lat;
                let dlon = lon.get(j, i) - target_lon;
                let d = dlat * dlat + dlon * dlon;
                if d < best_d {
                    best_d = d;
                    best = (j, i);
                }
            }
        }
        best
    }
}

/// Apply a 5-point smoother `passes` times.
///
/// Each pass replaces interior points with
/// `(cw*c + n + s + e + w) / (cw + 4)`; edge rows and columns pass
/// through unchanged. Matches the smoothing the map products expect for
/// their overlay contours.
pub fn smooth2d(grid: &Grid2, passes: usize, center_weight: f64) -> Grid2 {
    let mut cur = grid.clone();
    if grid.ny < 3 || grid.nx < 3 {
        return cur;
    }
    for _ in 0..passes {
        let mut next = cur.clone();
        for j in 1..grid.ny - 1 {
            for i in 1..grid.nx - 1 {
                let c = cur.get(j, i);
                let n = cur.get(j + 1, i);
                let s = cur.get(j - 1, i);
                let e = cur.get(j, i + 1);
                let w = cur.get(j, i - 1);
                next.set(j, i, (center_weight * c + n + s + e + w) / (center_weight + 4.0));
            }
        }
        cur = next;
    }
    cur
}

/// A vertical stack of horizontal fields, level-major (nz slabs of ny*nx).
#[derive(Debug, Clone)]
pub struct Grid3 {
    nz: usize,
    ny: usize,
    nx: usize,
    data: Vec<f64>,
}

impl Grid3 {
    pub fn new(nz: usize, ny: usize, nx: usize, data: Vec<f64>) -> CommonResult<Self> {
        if data.len() != nz * ny * nx {
            return Err(CommonError::ShapeMismatch {
                expected: nz * ny * nx,
                actual: data.len(),
            });
        }
        Ok(Self { nz, ny, nx, data })
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn get(&self, k: usize, j: usize, i: usize) -> f64 {
        self.data[(k * self.ny + j) * self.nx + i]
    }

    /// Copy of one level as a Grid2.
    pub fn level(&self, k: usize) -> Grid2 {
        let start = k * self.ny * self.nx;
        Grid2 {
            ny: self.ny,
            nx: self.nx,
            data: self.data[start..start + self.ny * self.nx].to_vec(),
        }
    }

    /// The vertical column at (j, i), bottom level first.
    pub fn column(&self, j: usize, i: usize) -> Vec<f64> {
        (0..self.nz).map(|k| self.get(k, j, i)).collect()
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Grid3 {
        Grid3 {
            nz: self.nz,
            ny: self.ny,
            nx: self.nx,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two same-shaped stacks pointwise.
    pub fn zip_map(&self, other: &Grid3, f: impl Fn(f64, f64) -> f64) -> CommonResult<Grid3> {
        if self.nz != other.nz || self.ny != other.ny || self.nx != other.nx {
            return Err(CommonError::ShapeMismatch {
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }
        Ok(Grid3 {
            nz: self.nz,
            ny: self.ny,
            nx: self.nx,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Interpolate this field to a constant pressure surface.
    ///
    /// `pressure` holds hPa on the same levels. Each column is scanned for
    /// the pair of model levels bracketing `level`; the value is linear in
    /// pressure between them, NaN where the level lies outside the column.
    pub fn interp_to_level(&self, pressure: &Grid3, level: f64) -> CommonResult<Grid2> {
        if self.nz != pressure.nz || self.ny != pressure.ny || self.nx != pressure.nx {
            return Err(CommonError::ShapeMismatch {
                expected: self.data.len(),
                actual: pressure.data.len(),
            });
        }
        let mut out = Grid2::filled(self.ny, self.nx, f64::NAN);
        for j in 0..self.ny {
            for i in 0..self.nx {
                for k in 0..self.nz - 1 {
                    let p0 = pressure.get(k, j, i);
                    let p1 = pressure.get(k + 1, j, i);
                    if !p0.is_finite() || !p1.is_finite() {
                        continue;
                    }
                    if (p0 - level) * (p1 - level) <= 0.0 && p0 != p1 {
                        let w = (level - p0) / (p1 - p0);
                        let v0 = self.get(k, j, i);
                        let v1 = self.get(k + 1, j, i);
                        out.set(j, i, v0 + (v1 - v0) * w);
                        break;
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_grid(ny: usize, nx: usize) -> Grid2 {
        let data = (0..ny * nx).map(|v| v as f64).collect();
        Grid2::new(ny, nx, data).unwrap()
    }

    #[test]
    fn test_shape_check() {
        assert!(Grid2::new(2, 3, vec![0.0; 5]).is_err());
        assert!(Grid2::new(2, 3, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn test_zip_map_dimension_mismatch() {
        let a = Grid2::filled(2, 2, 1.0);
        let b = Grid2::filled(3, 2, 1.0);
        assert!(a.zip_map(&b, |x, y| x + y).is_err());
    }

    #[test]
    fn test_smooth2d_preserves_constant_field() {
        let g = Grid2::filled(8, 8, 5.0);
        let s = smooth2d(&g, 10, 2.0);
        for &v in s.values() {
            assert!((v - 5.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_smooth2d_reduces_spike() {
        let mut g = Grid2::filled(5, 5, 0.0);
        g.set(2, 2, 100.0);
        let s = smooth2d(&g, 1, 2.0);
        assert!(s.get(2, 2) < 100.0);
        assert!(s.get(2, 1) > 0.0);
    }

    #[test]
    fn test_bilinear_sample() {
        let g = ramp_grid(2, 2); // [[0,1],[2,3]]
        assert!((g.sample(0.5, 0.5) - 1.5).abs() < 1e-12);
        assert!((g.sample(0.0, 1.0) - 1.0).abs() < 1e-12);
        assert!(g.sample(-0.1, 0.0).is_nan());
    }

    #[test]
    fn test_interp_to_level_midpoint() {
        // Two levels: 1000 hPa with value 10, 900 hPa with value 20.
        let p = Grid3::new(2, 1, 1, vec![1000.0, 900.0]).unwrap();
        let f = Grid3::new(2, 1, 1, vec![10.0, 20.0]).unwrap();
        let out = f.interp_to_level(&p, 950.0).unwrap();
        assert!((out.get(0, 0) - 15.0).abs() < 1e-12);
        // Outside the column is missing.
        let out = f.interp_to_level(&p, 850.0).unwrap();
        assert!(out.get(0, 0).is_nan());
    }

    #[test]
    fn test_nearest_index() {
        // 3x3 grid, lat rows 30/31/32, lon cols -85/-84/-83.
        let lat = Grid2::new(3, 3, vec![30.0; 3].into_iter().chain(vec![31.0; 3]).chain(vec![32.0; 3]).collect()).unwrap();
        let lon = Grid2::new(3, 3, (0..3).flat_map(|_| vec![-85.0, -84.0, -83.0]).collect()).unwrap();
        assert_eq!(Grid2::nearest_index(&lat, &lon, 31.1, -83.9), (1, 1));
        assert_eq!(Grid2::nearest_index(&lat, &lon, 29.0, -86.0), (0, 0));
    }

    #[test]
    fn test_min_max_skip_nan() {
        let g = Grid2::new(1, 3, vec![f64::NAN, 2.0, -4.0]).unwrap();
        assert_eq!(g.max_value(), Some(2.0));
        assert_eq!(g.min_value(), Some(-4.0));
        let empty = Grid2::new(1, 1, vec![f64::NAN]).unwrap();
        assert_eq!(empty.max_value(), None);
    }
}
