//! Shared per-run state handed to every product module.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use wrf_common::time::valid_label;
use wrf_common::{Airport, Grid2, RunInit};
use wrf_decoder::{diag, WrfFile};

use crate::config::PipelineConfig;

/// Everything a product module needs: the open file, the decoded time
/// axis, the coordinate arrays, and where output goes.
pub struct RunContext {
    pub wrf: WrfFile,
    pub run: RunInit,
    pub domain: String,
    pub times: Vec<DateTime<Utc>>,
    pub lat: Grid2,
    pub lon: Grid2,
    /// `OUTPUT_DIR/<run_key>/<domain>`.
    pub out_dir: PathBuf,
    pub config: PipelineConfig,
    pub partial: bool,
}

impl RunContext {
    pub fn hours(&self) -> usize {
        self.times.len()
    }

    pub fn forecast_hour(&self, t: usize) -> i64 {
        self.run.forecast_hour(self.times[t])
    }

    /// `2025-03-13 22:00 UTC` for the timestep's valid time.
    pub fn valid_label(&self, t: usize) -> String {
        valid_label(self.times[t])
    }

    pub fn init_label(&self) -> String {
        self.run.init_label()
    }

    /// Attribution line stamped on every figure.
    pub fn run_tag(&self) -> String {
        format!("WRF Run {}", self.run.run_key())
    }

    /// Nearest grid indices (j, i) for an airport.
    pub fn airport_index(&self, airport: &Airport) -> (usize, usize) {
        diag::ll_to_xy(&self.lat, &self.lon, airport.lat, airport.lon)
    }

    /// Output directory for one product (or airport) subtree, created
    /// on demand.
    pub fn ensure_dir(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = self.out_dir.join(relative.as_ref());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        Ok(dir)
    }
}
