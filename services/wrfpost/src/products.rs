//! The product table: output folder name to source field.
//!
//! A trailing `_<level>mb` on a product name selects interpolation of
//! the 3-D field to that pressure level; everything else about a
//! product's styling lives in `weathermaps`.

use serde::Deserialize;

/// One row of the product table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductSpec {
    /// Output folder name, e.g. `temperature` or `rh_700mb`.
    pub name: String,
    /// Source field, either a wrfout variable or a derived name the
    /// decoder knows (`td2`, `rh2`, `cloudfrac`, ...).
    pub field: String,
}

impl ProductSpec {
    pub fn new(name: &str, field: &str) -> Self {
        ProductSpec {
            name: name.to_string(),
            field: field.to_string(),
        }
    }

    /// Pressure level in hPa when the name ends in `_<level>mb`.
    pub fn level(&self) -> Option<f64> {
        let stem = self.name.strip_suffix("mb")?;
        let digits = &stem[stem.rfind('_')? + 1..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// The built-in table, in output order. The order matters: it is the
/// order products render in and the order `metadata.json` lists them.
pub fn builtin_products() -> Vec<ProductSpec> {
    [
        ("temperature", "T2"),
        ("1hr_temp_c", "T2"),
        ("dewp", "td2"),
        ("1hr_dewp_c", "td2"),
        ("rh", "rh2"),
        ("pressure", "AFWA_MSLP"),
        ("wind", "wspd_wdir10"),
        ("wind_gust", "WSPD10MAX"),
        ("comp_reflectivity", "REFD_COM"),
        ("helicity", "UP_HELI_MAX"),
        ("mcape", "cape_2d"),
        ("mcin", "cape_2d"),
        ("1hr_precip", "AFWA_TOTPRECIP"),
        ("total_precip", "AFWA_TOTPRECIP"),
        ("1hr_snowfall", "SNOWNC"),
        ("snowfall", "SNOWNC"),
        ("cloudcover", "cloudfrac"),
        ("temp_925mb", "tc"),
        ("temp_850mb", "tc"),
        ("temp_700mb", "tc"),
        ("temp_500mb", "tc"),
        ("temp_300mb", "tc"),
        ("te_925mb", "eth"),
        ("te_850mb", "eth"),
        ("te_700mb", "eth"),
        ("1hr_temp_c_850mb", "tc"),
        ("rh_925mb", "rh"),
        ("rh_850mb", "rh"),
        ("rh_700mb", "rh"),
        ("rh_500mb", "rh"),
        ("rh_300mb", "rh"),
        ("wind_925mb", "ua"),
        ("wind_850mb", "ua"),
        ("wind_700mb", "ua"),
        ("wind_500mb", "ua"),
        ("wind_300mb", "ua"),
        ("heights_700mb", "z"),
        ("heights_500mb", "z"),
        ("afwasnow", "AFWA_SNOW"),
        ("afwasnow_k", "AFWA_SNOW"),
        ("afwarain", "AFWA_RAIN"),
        ("afwafrz", "AFWA_FZRA"),
        ("afwaslt", "AFWA_ICE"),
        ("ptype", "AFWA_SNOW"),
        ("stargazing", "cloudfrac"),
    ]
    .iter()
    .map(|(name, field)| ProductSpec::new(name, field))
    .collect()
}
