//! Kuchera snow-to-liquid ratio.

use wrf_common::{Grid2, Grid3};

/// Ratio cutoff between the warm and cold branches, °C.
const THRESHOLD: f64 = -1.99;

/// Snow ratio keyed off the warmest temperature in each column.
///
/// `tc` in °C and `pressure` in hPa on the same levels. Only levels at
/// or below 500 hPa height (p >= 500) are considered. Columns warmer
/// than the threshold take the steeper branch; the result is clamped to
/// 0..30 and NaN where the column has no usable temperature.
pub fn kuchera_ratio(tc: &Grid3, pressure: &Grid3) -> Grid2 {
    let (ny, nx) = (tc.ny(), tc.nx());
    let mut out = Grid2::filled(ny, nx, f64::NAN);
    for j in 0..ny {
        for i in 0..nx {
            let mut t_max = f64::NEG_INFINITY;
            for k in 0..tc.nz() {
                if pressure.get(k, j, i) >= 500.0 {
                    let v = tc.get(k, j, i);
                    if v.is_finite() && v > t_max {
                        t_max = v;
                    }
                }
            }
            if !t_max.is_finite() {
                continue;
            }
            let ratio = if t_max > THRESHOLD {
                12.0 + 2.0 * (THRESHOLD - t_max)
            } else {
                12.0 + (THRESHOLD - t_max)
            };
            out.set(j, i, ratio.clamp(0.0, 30.0));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_grids(temps: &[f64], pres: &[f64]) -> (Grid3, Grid3) {
        let nz = temps.len();
        let tc = Grid3::new(nz, 1, 1, temps.to_vec()).unwrap();
        let p = Grid3::new(nz, 1, 1, pres.to_vec()).unwrap();
        (tc, p)
    }

    #[test]
    fn test_cold_column_boosts_ratio() {
        let (tc, p) = column_grids(&[-5.0, -12.0, -20.0], &[950.0, 700.0, 520.0]);
        let r = kuchera_ratio(&tc, &p);
        // t_max = -5, below threshold: 12 + (-1.99 + 5)
        assert!((r.get(0, 0) - 15.01).abs() < 1e-9);
    }

    #[test]
    fn test_warm_column_shrinks_ratio() {
        let (tc, p) = column_grids(&[2.0, -4.0], &[1000.0, 800.0]);
        let r = kuchera_ratio(&tc, &p);
        // t_max = 2, above threshold: 12 + 2*(-1.99 - 2)
        assert!((r.get(0, 0) - 4.02).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_is_clamped() {
        let (tc, p) = column_grids(&[10.0], &[1000.0]);
        assert_eq!(kuchera_ratio(&tc, &p).get(0, 0), 0.0);
        let (tc, p) = column_grids(&[-40.0], &[1000.0]);
        assert_eq!(kuchera_ratio(&tc, &p).get(0, 0), 30.0);
    }

    #[test]
    fn test_levels_above_500_are_ignored() {
        // The 8 degree reading sits above the 500 hPa surface.
        let (tc, p) = column_grids(&[-10.0, 8.0], &[900.0, 400.0]);
        let r = kuchera_ratio(&tc, &p);
        assert!((r.get(0, 0) - (12.0 + (-1.99 + 10.0))).abs() < 1e-9);
    }

    #[test]
    fn test_all_missing_column_is_nan() {
        let (tc, p) = column_grids(&[f64::NAN, f64::NAN], &[900.0, 600.0]);
        assert!(kuchera_ratio(&tc, &p).get(0, 0).is_nan());
    }
}
