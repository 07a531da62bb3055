//! Container for one vertical profile.

use metfor::{Celsius, HectoPascal, Meters, MetersPSec, WindUV};
use optional::Optioned;

/// A single model column, ordered bottom up.
///
/// The upper air variables are stored in parallel vectors. A profile that
/// was never supplied has length zero rather than being full of missing
/// values.
#[derive(Clone, Debug, Default)]
pub struct Sounding {
    elevation: Optioned<Meters>,
    pressure: Vec<Optioned<HectoPascal>>,
    temperature: Vec<Optioned<Celsius>>,
    dew_point: Vec<Optioned<Celsius>>,
    height: Vec<Optioned<Meters>>,
    wind: Vec<Optioned<WindUV<MetersPSec>>>,
}

/// A copy of one level of the sounding.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DataRow {
    /// Pressure in hPa.
    pub pressure: Optioned<HectoPascal>,
    /// Temperature in C.
    pub temperature: Optioned<Celsius>,
    /// Dew point in C.
    pub dew_point: Optioned<Celsius>,
    /// Geopotential height in meters.
    pub height: Optioned<Meters>,
    /// Wind components in m/s.
    pub wind: Optioned<WindUV<MetersPSec>>,
}

impl Sounding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method for the terrain elevation at the column.
    pub fn with_elevation<T>(mut self, elevation: T) -> Self
    where
        Optioned<Meters>: From<T>,
    {
        self.elevation = Optioned::from(elevation);
        self
    }

    pub fn elevation(&self) -> Optioned<Meters> {
        self.elevation
    }

    /// Builder method for the pressure profile, ordered bottom up.
    pub fn with_pressure_profile(self, profile: Vec<Optioned<HectoPascal>>) -> Self {
        Self {
            pressure: profile,
            ..self
        }
    }

    pub fn pressure_profile(&self) -> &[Optioned<HectoPascal>] {
        &self.pressure
    }

    /// Builder method for the temperature profile.
    pub fn with_temperature_profile(self, profile: Vec<Optioned<Celsius>>) -> Self {
        Self {
            temperature: profile,
            ..self
        }
    }

    pub fn temperature_profile(&self) -> &[Optioned<Celsius>] {
        &self.temperature
    }

    /// Builder method for the dew point profile.
    pub fn with_dew_point_profile(self, profile: Vec<Optioned<Celsius>>) -> Self {
        Self {
            dew_point: profile,
            ..self
        }
    }

    pub fn dew_point_profile(&self) -> &[Optioned<Celsius>] {
        &self.dew_point
    }

    /// Builder method for the geopotential height profile.
    pub fn with_height_profile(self, profile: Vec<Optioned<Meters>>) -> Self {
        Self {
            height: profile,
            ..self
        }
    }

    pub fn height_profile(&self) -> &[Optioned<Meters>] {
        &self.height
    }

    /// Builder method for the wind profile.
    pub fn with_wind_profile(self, profile: Vec<Optioned<WindUV<MetersPSec>>>) -> Self {
        Self {
            wind: profile,
            ..self
        }
    }

    pub fn wind_profile(&self) -> &[Optioned<WindUV<MetersPSec>>] {
        &self.wind
    }

    /// Copy one level out of the profiles.
    ///
    /// Profiles shorter than the pressure profile yield missing values for
    /// their fields.
    pub fn data_row(&self, idx: usize) -> Option<DataRow> {
        if idx >= self.pressure.len() {
            return None;
        }

        Some(DataRow {
            pressure: self.pressure.get(idx).copied().unwrap_or_default(),
            temperature: self.temperature.get(idx).copied().unwrap_or_default(),
            dew_point: self.dew_point.get(idx).copied().unwrap_or_default(),
            height: self.height.get(idx).copied().unwrap_or_default(),
            wind: self.wind.get(idx).copied().unwrap_or_default(),
        })
    }

    /// Iterate the data rows from the lowest level up.
    pub fn bottom_up(&self) -> impl Iterator<Item = DataRow> + '_ {
        (0..self.pressure.len()).filter_map(move |idx| self.data_row(idx))
    }
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use optional::some;

    fn small_sounding() -> Sounding {
        let pressure = vec![1000.0, 925.0, 850.0]
            .into_iter()
            .map(HectoPascal)
            .map(some)
            .collect();
        let temperature = vec![20.0, 16.0, 12.0]
            .into_iter()
            .map(Celsius)
            .map(some)
            .collect();

        Sounding::new()
            .with_pressure_profile(pressure)
            .with_temperature_profile(temperature)
            .with_elevation(Meters(270.0))
    }

    #[test]
    fn test_data_row_copies_level() {
        let snd = small_sounding();

        let row = snd.data_row(1).unwrap();
        assert_eq!(row.pressure.unpack(), HectoPascal(925.0));
        assert_eq!(row.temperature.unpack(), Celsius(16.0));
        assert!(row.dew_point.is_none());
        assert!(row.wind.is_none());

        assert!(snd.data_row(3).is_none());
    }

    #[test]
    fn test_bottom_up_starts_at_the_surface() {
        let snd = small_sounding();

        let rows: Vec<_> = snd.bottom_up().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].pressure.unpack(), HectoPascal(1000.0));
        assert_eq!(rows[2].pressure.unpack(), HectoPascal(850.0));
    }

    #[test]
    fn test_unset_profiles_are_empty() {
        let snd = Sounding::new();
        assert!(snd.pressure_profile().is_empty());
        assert!(snd.wind_profile().is_empty());
        assert!(snd.elevation().is_none());
        assert!(snd.bottom_up().next().is_none());
    }
}
