//! wrfout file access.

use std::path::Path;
use std::sync::Once;

use chrono::{DateTime, Utc};
use tracing::debug;

use wrf_common::{time, Grid2, Grid3, RunInit};

use crate::error::{DecodeError, DecodeResult};

/// Disable HDF5's automatic error printing.
///
/// Probing a variable for attributes it does not carry makes the HDF5
/// library dump its internal error stack to stderr even though the call
/// returns a usable "not found". One pass over a wrfout file probes
/// hundreds of attributes, so the handler is switched off once up front.
fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and passing null handlers
        // is the documented way to disable automatic error reporting
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An open wrfout file.
///
/// Field readers hand out [`Grid2`]/[`Grid3`] with row 0 at the southern
/// edge, matching the file's (south_north, west_east) layout. Staggered
/// variables are averaged onto mass points on read.
pub struct WrfFile {
    file: netcdf::File,
}

impl WrfFile {
    /// Open a wrfout file for reading.
    pub fn open(path: impl AsRef<Path>) -> DecodeResult<Self> {
        silence_hdf5_errors();
        let path = path.as_ref();
        let file = netcdf::open(path)?;
        debug!(path = %path.display(), "opened wrfout file");
        Ok(Self { file })
    }

    /// The decoded `Times` axis, one UTC timestamp per output step.
    pub fn times(&self) -> DecodeResult<Vec<DateTime<Utc>>> {
        let var = self.variable("Times")?;
        let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if dims.len() != 2 {
            return Err(DecodeError::ShapeMismatch {
                name: "Times".to_string(),
                expected: "(Time, DateStrLen)".to_string(),
                actual: dims,
            });
        }
        let width = dims[1];
        let bytes = var.get_values::<u8, _>(..)?;
        let mut out = Vec::with_capacity(dims[0]);
        for chunk in bytes.chunks(width) {
            let s = std::str::from_utf8(chunk)
                .map_err(|_| DecodeError::BadTimes(format!("{chunk:?}")))?;
            let t = time::parse_wrf_time(s).map_err(|_| DecodeError::BadTimes(s.to_string()))?;
            out.push(t);
        }
        if out.is_empty() {
            return Err(DecodeError::BadTimes("no entries".to_string()));
        }
        Ok(out)
    }

    /// The run's init time, from the global `START_DATE` attribute.
    pub fn start_date(&self) -> DecodeResult<RunInit> {
        let attr =
            self.file
                .attribute("START_DATE")
                .ok_or_else(|| DecodeError::MissingAttribute {
                    name: "START_DATE".to_string(),
                })?;
        match attr.value()? {
            netcdf::AttributeValue::Str(s) => Ok(RunInit::parse(&s)?),
            other => Err(DecodeError::BadTimes(format!(
                "START_DATE is not a string: {other:?}"
            ))),
        }
    }

    /// Latitude of each mass point, degrees north.
    pub fn lat(&self) -> DecodeResult<Grid2> {
        self.field2("XLAT", 0)
    }

    /// Longitude of each mass point, degrees east.
    pub fn lon(&self) -> DecodeResult<Grid2> {
        self.field2("XLONG", 0)
    }

    /// One time step of a 2-D surface variable.
    pub fn field2(&self, name: &str, t: usize) -> DecodeResult<Grid2> {
        let var = self.variable(name)?;
        let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if dims.len() != 3 {
            return Err(DecodeError::ShapeMismatch {
                name: name.to_string(),
                expected: "(Time, south_north, west_east)".to_string(),
                actual: dims,
            });
        }
        let raw = var.get_values::<f32, _>((t, .., ..))?;
        let values = unpack(&var, raw);
        Ok(Grid2::new(dims[1], dims[2], values)?)
    }

    /// One time step of a 3-D variable, destaggered to mass points.
    ///
    /// A dimension named `*_stag` marks the staggered axis; adjacent
    /// values along it are averaged, so the result always comes out on
    /// the (bottom_top, south_north, west_east) grid.
    pub fn field3(&self, name: &str, t: usize) -> DecodeResult<Grid3> {
        let var = self.variable(name)?;
        let dims = var.dimensions();
        if dims.len() != 4 {
            let actual = dims.iter().map(|d| d.len()).collect();
            return Err(DecodeError::ShapeMismatch {
                name: name.to_string(),
                expected: "(Time, bottom_top, south_north, west_east)".to_string(),
                actual,
            });
        }
        let mut shape = [dims[1].len(), dims[2].len(), dims[3].len()];
        let stag_axis = (1..4)
            .find(|&d| dims[d].name().ends_with("_stag"))
            .map(|d| d - 1);
        let raw = var.get_values::<f32, _>((t, .., .., ..))?;
        let mut values = unpack(&var, raw);
        if let Some(axis) = stag_axis {
            values = destagger(&values, shape, axis);
            shape[axis] -= 1;
        }
        Ok(Grid3::new(shape[0], shape[1], shape[2], values)?)
    }

    fn variable(&self, name: &str) -> DecodeResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| DecodeError::MissingVariable {
                name: name.to_string(),
            })
    }
}

/// Apply scale/offset and map the declared fill value to NaN.
fn unpack(var: &netcdf::Variable, raw: Vec<f32>) -> Vec<f64> {
    let scale = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);
    let fill = get_f32_attr(var, "_FillValue");
    raw.into_iter()
        .map(|v| {
            if Some(v) == fill || !v.is_finite() {
                f64::NAN
            } else {
                v as f64 * scale + offset
            }
        })
        .collect()
}

/// Average adjacent values along `axis` (0 = level, 1 = row, 2 = column).
fn destagger(values: &[f64], shape: [usize; 3], axis: usize) -> Vec<f64> {
    let [_, ny, nx] = shape;
    let mut out_shape = shape;
    out_shape[axis] -= 1;
    let [oz, oy, ox] = out_shape;
    let idx = |k: usize, j: usize, i: usize| (k * ny + j) * nx + i;
    let mut out = Vec::with_capacity(oz * oy * ox);
    for k in 0..oz {
        for j in 0..oy {
            for i in 0..ox {
                let (a, b) = match axis {
                    0 => (idx(k, j, i), idx(k + 1, j, i)),
                    1 => (idx(k, j, i), idx(k, j + 1, i)),
                    _ => (idx(k, j, i), idx(k, j, i + 1)),
                };
                out.push((values[a] + values[b]) / 2.0);
            }
        }
    }
    out
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}
