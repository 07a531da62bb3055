//! Stability indexes computed from the environmental profile alone.

use crate::{
    error::{AnalysisError, AnalysisResult},
    interpolation::linear_interpolate_sounding,
    sounding::Sounding,
};
use metfor::{Celsius, HectoPascal};

/// K index, in the conventional dimensionless form.
///
/// Combines the 850-500 hPa lapse rate with low and mid level moisture.
/// Values above about 30 favor widespread thunderstorms.
pub fn k_index(snd: &Sounding) -> AnalysisResult<f64> {
    let row850 = linear_interpolate_sounding(snd, HectoPascal(850.0))?;
    let row700 = linear_interpolate_sounding(snd, HectoPascal(700.0))?;
    let row500 = linear_interpolate_sounding(snd, HectoPascal(500.0))?;

    let Celsius(t850) = row850.temperature.ok_or(AnalysisError::NotEnoughData)?;
    let Celsius(td850) = row850.dew_point.ok_or(AnalysisError::NotEnoughData)?;
    let Celsius(t700) = row700.temperature.ok_or(AnalysisError::NotEnoughData)?;
    let Celsius(td700) = row700.dew_point.ok_or(AnalysisError::NotEnoughData)?;
    let Celsius(t500) = row500.temperature.ok_or(AnalysisError::NotEnoughData)?;

    Ok(t850 - t500 + td850 - (t700 - td700))
}

/// Total totals index: the sum of the vertical and cross totals.
pub fn total_totals(snd: &Sounding) -> AnalysisResult<f64> {
    let row850 = linear_interpolate_sounding(snd, HectoPascal(850.0))?;
    let row500 = linear_interpolate_sounding(snd, HectoPascal(500.0))?;

    let Celsius(t850) = row850.temperature.ok_or(AnalysisError::NotEnoughData)?;
    let Celsius(td850) = row850.dew_point.ok_or(AnalysisError::NotEnoughData)?;
    let Celsius(t500) = row500.temperature.ok_or(AnalysisError::NotEnoughData)?;

    Ok(t850 + td850 - 2.0 * t500)
}
