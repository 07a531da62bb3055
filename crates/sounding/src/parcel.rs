//! Parcels and how to pick them out of a sounding.

use crate::{
    error::{AnalysisError, AnalysisResult},
    sounding::Sounding,
};
use itertools::izip;
use metfor::{self, Celsius, HectoPascal, Kelvin, Quantity};

/// The starting point of an ascent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parcel {
    /// Temperature in C.
    pub temperature: Celsius,
    /// Dew point in C.
    pub dew_point: Celsius,
    /// Pressure in hPa.
    pub pressure: HectoPascal,
}

impl Parcel {
    /// Potential temperature of the parcel.
    pub fn theta(&self) -> Kelvin {
        metfor::theta(self.pressure, self.temperature)
    }

    /// Equivalent potential temperature of the parcel.
    pub fn theta_e(&self) -> AnalysisResult<Kelvin> {
        metfor::theta_e(self.temperature, self.dew_point, self.pressure)
            .ok_or(AnalysisError::MetForError)
    }

    /// Mixing ratio of the parcel in kg/kg.
    pub fn mixing_ratio(&self) -> AnalysisResult<f64> {
        metfor::mixing_ratio(self.dew_point, self.pressure).ok_or(AnalysisError::MetForError)
    }

    /// Virtual temperature of the parcel.
    pub fn virtual_temperature(&self) -> AnalysisResult<Kelvin> {
        metfor::virtual_temperature(self.temperature, self.dew_point, self.pressure)
            .ok_or(AnalysisError::MetForError)
    }
}

/// The parcel at the lowest level with complete data.
pub fn surface_parcel(snd: &Sounding) -> AnalysisResult<Parcel> {
    snd.bottom_up()
        .filter_map(|row| {
            let pressure = row.pressure.into_option()?;
            let temperature = row.temperature.into_option()?;
            let dew_point = row.dew_point.into_option()?;
            Some(Parcel {
                temperature,
                dew_point,
                pressure,
            })
        })
        .next()
        .ok_or(AnalysisError::NotEnoughData)
}

/// A mean-layer parcel for the lowest 100 hPa.
///
/// The mean is taken over potential temperature and mixing ratio, then
/// converted back to a temperature and dew point at the bottom pressure.
pub fn mixed_layer_parcel(snd: &Sounding) -> AnalysisResult<Parcel> {
    let press = snd.pressure_profile();
    let t = snd.temperature_profile();
    let dp = snd.dew_point_profile();

    if press.is_empty() || t.is_empty() || dp.is_empty() {
        return Err(AnalysisError::MissingProfile);
    }

    let bottom_p = press
        .iter()
        .filter_map(|p| p.into_option())
        .next()
        .ok_or(AnalysisError::NotEnoughData)?;

    let (sum_theta, sum_mw, count) = izip!(press, t, dp)
        .filter_map(|(p, t, dp)| {
            if p.is_some() && t.is_some() && dp.is_some() {
                Some((p.unpack(), t.unpack(), dp.unpack()))
            } else {
                None
            }
        })
        .take_while(|&(p, _, _)| p >= bottom_p - HectoPascal(100.0))
        .filter_map(|(p, t, dp)| {
            let theta = metfor::theta(p, t);
            metfor::mixing_ratio(dp, p).map(|mw| (theta, mw))
        })
        .fold((0.0, 0.0, 0.0), |(sum_theta, sum_mw, count), (theta, mw)| {
            (sum_theta + theta.unpack(), sum_mw + mw, count + 1.0)
        });

    if count == 0.0 {
        return Err(AnalysisError::NotEnoughData);
    }

    let temperature = Celsius::from(metfor::temperature_from_theta(
        Kelvin(sum_theta / count),
        bottom_p,
    ));
    let dew_point = metfor::dew_point_from_p_and_mw(bottom_p, sum_mw / count)
        .ok_or(AnalysisError::MetForError)?;

    Ok(Parcel {
        temperature,
        dew_point,
        pressure: bottom_p,
    })
}

/// The parcel with the highest equivalent potential temperature in the
/// lowest 300 hPa of the sounding.
pub fn most_unstable_parcel(snd: &Sounding) -> AnalysisResult<Parcel> {
    let press = snd.pressure_profile();
    let t = snd.temperature_profile();
    let dp = snd.dew_point_profile();

    if press.is_empty() || t.is_empty() || dp.is_empty() {
        return Err(AnalysisError::MissingProfile);
    }

    let bottom_p = press
        .iter()
        .filter_map(|p| p.into_option())
        .next()
        .ok_or(AnalysisError::NotEnoughData)?;
    let top_p = bottom_p - HectoPascal(300.0);

    izip!(press, t, dp)
        .filter_map(|(p, t, dp)| {
            if p.is_some() && t.is_some() && dp.is_some() {
                Some((p.unpack(), t.unpack(), dp.unpack()))
            } else {
                None
            }
        })
        .take_while(|&(p, _, _)| p >= top_p)
        .filter_map(|(pressure, temperature, dew_point)| {
            metfor::theta_e(temperature, dew_point, pressure).map(|theta_e| {
                (
                    theta_e,
                    Parcel {
                        temperature,
                        dew_point,
                        pressure,
                    },
                )
            })
        })
        .fold(None::<(Kelvin, Parcel)>, |best, (theta_e, parcel)| {
            match best {
                Some((best_theta_e, _)) if best_theta_e >= theta_e => best,
                _ => Some((theta_e, parcel)),
            }
        })
        .map(|(_, parcel)| parcel)
        .ok_or(AnalysisError::NotEnoughData)
}
