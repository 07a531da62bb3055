//! Unit conversions used across the forecast products.

/// 2m temperature fields arrive in Kelvin.
pub fn kelvin_to_fahrenheit(k: f64) -> f64 {
    (k - 273.15) * 9.0 / 5.0 + 32.0
}

pub fn kelvin_to_celsius(k: f64) -> f64 {
    k - 273.15
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Temperature differences scale without the offset.
pub fn celsius_delta_to_fahrenheit(dc: f64) -> f64 {
    dc * 9.0 / 5.0
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / 25.4
}

pub fn pa_to_hpa(pa: f64) -> f64 {
    pa / 100.0
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps * 2.23694
}

pub fn mps_to_knots(mps: f64) -> f64 {
    mps * 1.944
}

const CARDINALS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-sector compass label for a meteorological direction in degrees.
/// North spans 348.75..11.25; each sector is 22.5 degrees wide.
pub fn deg_to_cardinal(deg: f64) -> &'static str {
    let deg = deg.rem_euclid(360.0);
    let sector = ((deg + 11.25) / 22.5).floor() as usize % 16;
    CARDINALS[sector]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelvin_to_fahrenheit() {
        assert!((kelvin_to_fahrenheit(273.15) - 32.0).abs() < 1e-9);
        assert!((kelvin_to_fahrenheit(300.0) - 80.33).abs() < 0.01);
    }

    #[test]
    fn test_precip_and_pressure() {
        assert!((mm_to_inches(25.4) - 1.0).abs() < 1e-12);
        assert!((pa_to_hpa(101325.0) - 1013.25).abs() < 1e-9);
    }

    #[test]
    fn test_wind_speed() {
        assert!((mps_to_mph(10.0) - 22.3694).abs() < 1e-9);
        assert!((mps_to_knots(10.0) - 19.44).abs() < 1e-9);
    }

    #[test]
    fn test_cardinal_bucket_boundaries() {
        assert_eq!(deg_to_cardinal(0.0), "N");
        assert_eq!(deg_to_cardinal(348.75), "N");
        assert_eq!(deg_to_cardinal(11.24), "N");
        assert_eq!(deg_to_cardinal(11.25), "NNE");
        assert_eq!(deg_to_cardinal(33.75), "NE");
        assert_eq!(deg_to_cardinal(90.0), "E");
        assert_eq!(deg_to_cardinal(168.75), "S");
        assert_eq!(deg_to_cardinal(180.0), "S");
        assert_eq!(deg_to_cardinal(270.0), "W");
        assert_eq!(deg_to_cardinal(326.25), "NNW");
        assert_eq!(deg_to_cardinal(348.74), "NNW");
        assert_eq!(deg_to_cardinal(360.0), "N");
        assert_eq!(deg_to_cardinal(-10.0), "N");
    }
}
