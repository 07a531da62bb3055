//! Linear interpolation through the profiles, with pressure as the
//! vertical coordinate.

use crate::{
    error::{AnalysisError, AnalysisResult},
    sounding::{DataRow, Sounding},
};
use itertools::Itertools;
use metfor::{HectoPascal, Quantity, WindUV};
use optional::Optioned;
use std::ops::Sub;

/// Interpolate a full data row at the target pressure.
///
/// Pressure must decrease monotonically through the profile, which always
/// holds for a model column. Targets outside the profile are an error
/// rather than an extrapolation.
pub fn linear_interpolate_sounding(
    snd: &Sounding,
    tgt_p: HectoPascal,
) -> AnalysisResult<DataRow> {
    let pressure: &[Optioned<HectoPascal>] = snd.pressure_profile();

    enum BracketType {
        Bracket(usize, usize),
        EndEquals(usize),
    }

    let make_bracket = |pnt_0: (usize, HectoPascal), pnt_1: (usize, HectoPascal)| {
        let (i0, p0) = pnt_0;
        let (i1, p1) = pnt_1;

        debug_assert!(p0 > p1);
        if p0 > tgt_p && p1 < tgt_p {
            Some(BracketType::Bracket(i0, i1))
        } else if (p0 - tgt_p).unpack().abs() < f64::EPSILON {
            Some(BracketType::EndEquals(i0))
        } else if (p1 - tgt_p).unpack().abs() < f64::EPSILON {
            Some(BracketType::EndEquals(i1))
        } else {
            None
        }
    };

    pressure
        .iter()
        .enumerate()
        // Skip levels with missing pressure so a gap does not break the
        // bracket search.
        .filter_map(|(i, p_opt)| p_opt.map(|p_val| (i, p_val)))
        .tuple_windows::<(_, _)>()
        .filter_map(|(pnt_0, pnt_1)| make_bracket(pnt_0, pnt_1))
        .next()
        .and_then(|bracket| match bracket {
            BracketType::Bracket(i0, i1) => {
                let row0 = snd.data_row(i0)?;
                let row1 = snd.data_row(i1)?;
                linear_interp_data_rows(row0, row1, tgt_p)
            }
            BracketType::EndEquals(i) => snd.data_row(i),
        })
        .ok_or(AnalysisError::InterpolationError)
}

/// Interpolate between two values of any quantity pair.
#[inline]
pub(crate) fn linear_interp<X, Y>(x_val: X, x1: X, x2: X, y1: Y, y2: Y) -> Y
where
    X: Sub<X> + Copy + std::fmt::Debug + PartialEq,
    <X as Sub<X>>::Output: Quantity,
    Y: Quantity + Sub<Y>,
    <Y as Sub<Y>>::Output: Quantity,
{
    debug_assert_ne!(x1, x2);

    let run = (x2 - x1).unpack();
    let rise = (y2 - y1).unpack();
    let dx = (x_val - x1).unpack();

    Y::pack(y1.unpack() + dx * (rise / run))
}

fn linear_interp_data_rows(
    row0: DataRow,
    row1: DataRow,
    tgt_p: HectoPascal,
) -> Option<DataRow> {
    let p0 = row0.pressure.into_option()?;
    let p1 = row1.pressure.into_option()?;

    let run = (p1 - p0).unpack();
    let dp = (tgt_p - p0).unpack();

    let mut result = DataRow {
        pressure: Optioned::from(tgt_p),
        ..DataRow::default()
    };

    result.temperature = eval_linear_interp(row0.temperature, row1.temperature, run, dp);
    result.dew_point = eval_linear_interp(row0.dew_point, row1.dew_point, run, dp);
    result.height = eval_linear_interp(row0.height, row1.height, run, dp);

    // Winds interpolate componentwise.
    if let (Some(w0), Some(w1)) = (row0.wind.into_option(), row1.wind.into_option()) {
        let frac = dp / run;
        let u = w0.u + (w1.u - w0.u) * frac;
        let v = w0.v + (w1.v - w0.v) * frac;
        result.wind = Optioned::from(WindUV { u, v });
    }

    Some(result)
}

fn eval_linear_interp<Y>(low: Optioned<Y>, high: Optioned<Y>, run: f64, dp: f64) -> Optioned<Y>
where
    Y: Quantity + optional::Noned,
{
    if low.is_some() && high.is_some() {
        let (below, above) = (low.unpack().unpack(), high.unpack().unpack());
        Optioned::from(Y::pack(below + dp * (above - below) / run))
    } else {
        Optioned::default()
    }
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use metfor::{Celsius, Meters, MetersPSec};
    use optional::some;

    fn test_sounding() -> Sounding {
        let pressure = vec![1000.0, 850.0, 700.0]
            .into_iter()
            .map(HectoPascal)
            .map(some)
            .collect();
        let temperature = vec![20.0, 12.0, 2.0]
            .into_iter()
            .map(Celsius)
            .map(some)
            .collect();
        let height = vec![100.0, 1500.0, 3100.0]
            .into_iter()
            .map(Meters)
            .map(some)
            .collect();
        let wind = vec![0.0, 10.0, 20.0]
            .into_iter()
            .map(|u| {
                some(WindUV {
                    u: MetersPSec(u),
                    v: MetersPSec(0.0),
                })
            })
            .collect();

        Sounding::new()
            .with_pressure_profile(pressure)
            .with_temperature_profile(temperature)
            .with_height_profile(height)
            .with_wind_profile(wind)
    }

    #[test]
    fn test_exact_level_returns_the_row() {
        let snd = test_sounding();
        let row = linear_interpolate_sounding(&snd, HectoPascal(850.0)).unwrap();
        assert_eq!(row.temperature.unpack(), Celsius(12.0));
        assert_eq!(row.height.unpack(), Meters(1500.0));
    }

    #[test]
    fn test_midpoint_interpolates() {
        let snd = test_sounding();
        let row = linear_interpolate_sounding(&snd, HectoPascal(775.0)).unwrap();
        assert!((row.temperature.unpack().unpack() - 7.0).abs() < 1e-9);
        assert!((row.height.unpack().unpack() - 2300.0).abs() < 1e-9);
        let wind = row.wind.unpack();
        assert!((wind.u.unpack() - 15.0).abs() < 1e-9);
        assert!(wind.v.unpack().abs() < 1e-9);
    }

    #[test]
    fn test_outside_profile_is_an_error() {
        let snd = test_sounding();
        assert_eq!(
            linear_interpolate_sounding(&snd, HectoPascal(1100.0)),
            Err(AnalysisError::InterpolationError)
        );
        assert_eq!(
            linear_interpolate_sounding(&snd, HectoPascal(500.0)),
            Err(AnalysisError::InterpolationError)
        );
    }

    #[test]
    fn test_linear_interp_values() {
        let v = linear_interp(
            HectoPascal(900.0),
            HectoPascal(1000.0),
            HectoPascal(800.0),
            Meters(0.0),
            Meters(2000.0),
        );
        assert!((v.unpack() - 1000.0).abs() < 1e-9);
    }
}
