//! Plain-text point forecasts, one file per airport.

use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use wrf_common::units::{
    celsius_to_fahrenheit, deg_to_cardinal, kelvin_to_fahrenheit, mps_to_mph, pa_to_hpa,
};
use wrf_common::Grid2;
use wrf_decoder::diag;

use crate::context::RunContext;

struct HourFields {
    valid: DateTime<Utc>,
    timestep: usize,
    t2: Grid2,
    td2: Grid2,
    wspd: Grid2,
    wdir: Grid2,
    mslp: Grid2,
}

pub fn run(ctx: &RunContext) -> Result<()> {
    if ctx.partial {
        warn!("partial run: text forecasts need a full run, skipping");
        return Ok(());
    }
    if ctx.hours() < 2 {
        warn!("fewer than two timesteps, skipping text forecasts");
        return Ok(());
    }

    // Each field is read once per timestep and shared by every airport.
    let mut steps = Vec::with_capacity(ctx.hours() - 1);
    for t in 1..ctx.hours() {
        let (wspd, wdir) = diag::wspd_wdir10(&ctx.wrf, t)?;
        steps.push(HourFields {
            valid: ctx.times[t],
            timestep: t,
            t2: ctx.wrf.field2("T2", t)?,
            td2: diag::td2(&ctx.wrf, t)?,
            wspd,
            wdir,
            mslp: ctx.wrf.field2("AFWA_MSLP", t)?,
        });
    }

    for airport in ctx.config.all_airports() {
        if let Err(err) = write_forecast(ctx, &airport.id, ctx.airport_index(&airport), &steps) {
            error!(airport = %airport.id, error = %err, "text forecast failed");
        }
    }
    info!(airports = ctx.config.all_airports().len(), "text forecasts written");
    Ok(())
}

fn write_forecast(
    ctx: &RunContext,
    airport_id: &str,
    (j, i): (usize, usize),
    steps: &[HourFields],
) -> Result<()> {
    let mut lines = vec![
        format!(
            "WRF {} - Init: {} - Text Forecast for {}",
            ctx.run.run_key(),
            ctx.times[0].format("%Y-%m-%d %H:%M:%S"),
            airport_id.to_uppercase()
        ),
        format!("Forecast Start Time: {}", ctx.valid_label(1)),
        "UTC (Fcst) Hr | Temp | Dewp | Wind (dir) | Pressure".to_string(),
    ];
    for step in steps {
        lines.push(format_row(step, j, i));
    }

    let dir = ctx.ensure_dir(format!("text/{airport_id}"))?;
    let path = dir.join("forecast.txt");
    fs::write(&path, lines.join("\n") + "\n")
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn format_row(step: &HourFields, j: usize, i: usize) -> String {
    let t_f = kelvin_to_fahrenheit(step.t2.get(j, i));
    let td_f = celsius_to_fahrenheit(step.td2.get(j, i));
    let wspd_mph = mps_to_mph(step.wspd.get(j, i));
    let wdir = step.wdir.get(j, i);
    let mslp_mb = pa_to_hpa(step.mslp.get(j, i));
    format!(
        "{} ({:02}) | {:.1} F | {:.1} F | {:.1} mph {} | {:.1} mb",
        step.valid.format("%H UTC"),
        step.timestep,
        t_f,
        td_f,
        wspd_mph,
        deg_to_cardinal(wdir),
        mslp_mb
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn one_cell(value: f64) -> Grid2 {
        Grid2::filled(1, 1, value)
    }

    #[test]
    fn row_converts_and_formats() {
        let step = HourFields {
            valid: Utc.with_ymd_and_hms(2025, 3, 13, 22, 0, 0).unwrap(),
            timestep: 1,
            t2: one_cell(278.6),         // 41.8 F
            td2: one_cell(0.9),          // 33.6 F
            wspd: one_cell(3.889),       // 8.7 mph
            wdir: one_cell(330.0),       // NNW
            mslp: one_cell(101340.0),    // 1013.4 mb
        };
        assert_eq!(
            format_row(&step, 0, 0),
            "22 UTC (01) | 41.8 F | 33.6 F | 8.7 mph NNW | 1013.4 mb"
        );
    }

    #[test]
    fn timestep_is_zero_padded() {
        let step = HourFields {
            valid: Utc.with_ymd_and_hms(2025, 3, 14, 2, 0, 0).unwrap(),
            timestep: 5,
            t2: one_cell(273.15),
            td2: one_cell(0.0),
            wspd: one_cell(0.0),
            wdir: one_cell(0.0),
            mslp: one_cell(100000.0),
        };
        let row = format_row(&step, 0, 0);
        assert!(row.starts_with("02 UTC (05) | "), "row was {row}");
        assert!(row.contains("| 0.0 mph N |"));
    }
}
