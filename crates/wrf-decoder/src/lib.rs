//! wrfout NetCDF access and the derived fields the products consume.
//!
//! [`WrfFile`] wraps one model output file: the decoded time axis, the
//! coordinate arrays, and per-step 2-D and 3-D fields (destaggered on
//! read, declared fill values mapped to NaN). [`diag`] computes the
//! quantities the product modules ask for by name, [`kuchera`] the snow
//! ratio some precipitation products apply.

pub mod diag;
pub mod error;
pub mod file;
pub mod kuchera;

pub use error::{DecodeError, DecodeResult};
pub use file::WrfFile;
