//! Model run time handling.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::{CommonError, CommonResult};

/// WRF encodes timestamps as `YYYY-MM-DD_HH:MM:SS`.
const WRF_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// The model run's initialization time, decoded from the file's
/// `START_DATE` attribute. Derives the run directory key and the
/// formatted labels the products stamp on their output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunInit {
    pub init: DateTime<Utc>,
}

impl RunInit {
    /// Parse a `START_DATE` attribute value.
    pub fn parse(start_date: &str) -> CommonResult<Self> {
        let naive = NaiveDateTime::parse_from_str(start_date, WRF_TIME_FORMAT)
            .map_err(|_| CommonError::InvalidInitTime(start_date.to_string()))?;
        Ok(Self {
            init: Utc.from_utc_datetime(&naive),
        })
    }

    /// Directory key for this run: the START_DATE string with colons
    /// replaced by underscores (`2025-03-13_21_00_00`).
    pub fn run_key(&self) -> String {
        self.init
            .format(WRF_TIME_FORMAT)
            .to_string()
            .replace(':', "_")
    }

    /// Init label stamped on titles (`2025-03-13 21:00 UTC`).
    pub fn init_label(&self) -> String {
        self.init.format("%Y-%m-%d %H:%M UTC").to_string()
    }

    /// Rounded hour offset of a valid time from the init time.
    pub fn forecast_hour(&self, valid: DateTime<Utc>) -> i64 {
        let secs = (valid - self.init).num_seconds() as f64;
        (secs / 3600.0).round() as i64
    }
}

/// Parse one entry of the `Times` character array.
pub fn parse_wrf_time(s: &str) -> CommonResult<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim_end_matches('\0').trim(), WRF_TIME_FORMAT)
        .map_err(|_| CommonError::InvalidInitTime(s.to_string()))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Valid-time label stamped on titles (`2025-03-13 22:00 UTC`).
pub fn valid_label(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Domain identifier from a wrfout file name: the second underscore-
/// separated token (`wrfout_d01_2025-...` yields `d01`).
pub fn domain_from_filename(path: &Path) -> CommonResult<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CommonError::BadDomain(path.display().to_string()))?;
    name.split('_')
        .nth(1)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CommonError::BadDomain(name.to_string()))
}
