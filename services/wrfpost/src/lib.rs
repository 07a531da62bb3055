//! Batch post-processor for WRF model output.
//!
//! One invocation takes one wrfout NetCDF file and writes a directory
//! tree of forecast products under `OUTPUT_DIR/<run>/<domain>/`: map
//! imagery for every configured product and timestep, Skew-T and
//! hodograph figures, meteograms, and plain-text point forecasts.
//!
//! The pipeline is sequential and best-effort: each product, airport,
//! and timestep is wrapped in a guard that logs failures and moves on,
//! so one bad field never sinks the rest of the run.

pub mod config;
pub mod context;
pub mod driver;
pub mod meteogram;
pub mod products;
pub mod skewt;
pub mod special;
pub mod textgen;
pub mod weathermaps;

pub use config::PipelineConfig;
pub use driver::{run, RunFlags, RunOptions};
