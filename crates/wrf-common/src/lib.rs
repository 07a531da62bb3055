//! Common types and utilities shared across the wrf-products workspace.

pub mod error;
pub mod grid;
pub mod locations;
pub mod time;
pub mod units;

pub use error::{CommonError, CommonResult};
pub use grid::{smooth2d, Grid2, Grid3};
pub use locations::Airport;
pub use time::RunInit;
