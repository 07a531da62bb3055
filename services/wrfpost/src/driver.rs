//! Run orchestration.
//!
//! Opens the wrfout, writes `metadata.json`, then walks the enabled
//! modules in a fixed order. A module failure is logged and the run
//! moves on; only setup (open, metadata) is fatal.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use wrf_common::time::domain_from_filename;
use wrf_decoder::WrfFile;

use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::{meteogram, skewt, special, textgen, weathermaps};

pub struct RunOptions {
    pub wrf_file: PathBuf,
    pub output_dir: PathBuf,
    /// Digit string disabling modules, e.g. "45" turns off meteogram
    /// and skewt. "0" (or empty) runs everything.
    pub run_flags: String,
    pub partial: bool,
    pub config: Option<PathBuf>,
}

/// Which modules this run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunFlags {
    pub textgen: bool,
    pub weathermaps: bool,
    pub special: bool,
    pub meteogram: bool,
    pub skewt: bool,
}

impl RunFlags {
    /// Each digit 1..5 in the string disables one module.
    pub fn parse(flags: &str) -> Self {
        RunFlags {
            textgen: !flags.contains('1'),
            weathermaps: !flags.contains('2'),
            special: !flags.contains('3'),
            meteogram: !flags.contains('4'),
            skewt: !flags.contains('5'),
        }
    }

    fn enabled(&self) -> Vec<&'static str> {
        let table = [
            ("textgen", self.textgen),
            ("weathermaps", self.weathermaps),
            ("special", self.special),
            ("meteogram", self.meteogram),
            ("skewt", self.skewt),
        ];
        table
            .iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| *name)
            .collect()
    }
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    init_time: String,
    domain: &'a str,
    forecast_hours: usize,
    products: Vec<&'a str>,
    in_progress: bool,
}

/// Process one wrfout file. Returns the run's output directory.
pub fn run(options: &RunOptions) -> Result<PathBuf> {
    let started = Instant::now();
    let flags = RunFlags::parse(&options.run_flags);

    let config = match &options.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let wrf = WrfFile::open(&options.wrf_file)
        .with_context(|| format!("Failed to open wrfout {:?}", options.wrf_file))?;
    let run_init = wrf.start_date().context("Failed to read START_DATE")?;
    let domain = domain_from_filename(&options.wrf_file)
        .context("Failed to derive domain from the file name")?;
    let times = wrf.times().context("Failed to decode the Times array")?;
    anyhow::ensure!(!times.is_empty(), "wrfout has no timesteps");
    let lat = wrf.lat().context("Failed to read XLAT")?;
    let lon = wrf.lon().context("Failed to read XLONG")?;

    let out_dir = options.output_dir.join(run_init.run_key()).join(&domain);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

    info!(
        run = %run_init.run_key(),
        domain = %domain,
        hours = times.len(),
        partial = options.partial,
        modules = ?flags.enabled(),
        "processing run"
    );

    let ctx = RunContext {
        wrf,
        run: run_init,
        domain,
        times,
        lat,
        lon,
        out_dir,
        config,
        partial: options.partial,
    };

    write_metadata(&ctx)?;

    if flags.textgen {
        run_module(&ctx, "textgen", textgen::run);
    }
    if flags.weathermaps {
        run_module(&ctx, "weathermaps", weathermaps::run);
    }
    if flags.special {
        run_module(&ctx, "special", special::run);
    }
    if flags.meteogram {
        run_module(&ctx, "meteogram", meteogram::run);
    }
    if flags.skewt {
        run_module(&ctx, "skewt", skewt::run);
    }

    info!(
        run = %ctx.run.run_key(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "run finished"
    );
    Ok(ctx.out_dir)
}

fn run_module(ctx: &RunContext, name: &str, body: fn(&RunContext) -> Result<()>) {
    let started = Instant::now();
    match body(ctx) {
        Ok(()) => info!(
            module = name,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "module finished"
        ),
        Err(err) => error!(module = name, error = %err, "module failed"),
    }
}

/// Written before any product so the site can list the run while it is
/// still rendering.
fn write_metadata(ctx: &RunContext) -> Result<()> {
    let metadata = RunMetadata {
        init_time: ctx.times[0].format("%Y-%m-%d %H:%M:%S").to_string(),
        domain: &ctx.domain,
        forecast_hours: ctx.hours(),
        products: ctx
            .config
            .products
            .iter()
            .map(|p| p.name.as_str())
            .collect(),
        in_progress: ctx.partial,
    };
    let path = ctx.out_dir.join("metadata.json");
    let json = serde_json::to_string_pretty(&metadata)
        .context("Failed to serialize run metadata")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write metadata to {:?}", path))?;
    info!(path = %path.display(), "metadata written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_enables_everything() {
        let flags = RunFlags::parse("0");
        assert!(flags.textgen && flags.weathermaps && flags.special);
        assert!(flags.meteogram && flags.skewt);
    }

    #[test]
    fn digits_disable_modules() {
        let flags = RunFlags::parse("145");
        assert!(!flags.textgen);
        assert!(flags.weathermaps);
        assert!(flags.special);
        assert!(!flags.meteogram);
        assert!(!flags.skewt);
        assert_eq!(flags.enabled(), vec!["weathermaps", "special"]);
    }

    #[test]
    fn empty_string_enables_everything() {
        let flags = RunFlags::parse("");
        assert_eq!(flags.enabled().len(), 5);
    }
}
