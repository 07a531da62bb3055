//! End to end runs of the pipeline against a synthetic wrfout file.

use std::fs;
use std::path::{Path, PathBuf};

use test_utils::{scratch_dir, scratch_wrfout, WrfoutSpec};
use walkdir::WalkDir;
use wrfpost::{run, RunOptions};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Two airports and a cross-section of the product families: a plain
/// surface fill, wind, an hourly difference, the category renderers,
/// and one pressure-level product.
fn write_test_config(dir: &Path) -> PathBuf {
    let path = dir.join("pipeline.yaml");
    fs::write(
        &path,
        "airports:\n\
         \x20 high_priority:\n\
         \x20   - { id: aaa, lat: 34.0, lon: -84.0 }\n\
         \x20 secondary:\n\
         \x20   - { id: bbb, lat: 33.5, lon: -83.0 }\n\
         products:\n\
         \x20 - { name: temperature, field: T2 }\n\
         \x20 - { name: wind, field: wspd_wdir10 }\n\
         \x20 - { name: 1hr_precip, field: AFWA_TOTPRECIP }\n\
         \x20 - { name: helicity, field: UP_HELI_MAX }\n\
         \x20 - { name: ptype, field: AFWA_SNOW }\n\
         \x20 - { name: rh_700mb, field: rh }\n",
    )
    .unwrap();
    path
}

fn pipeline_spec() -> WrfoutSpec {
    WrfoutSpec::default().with_grid(8, 24, 30)
}

#[test]
fn full_run_writes_every_product_family() {
    let spec = pipeline_spec();
    let (in_dir, wrf_path) = scratch_wrfout(&spec);
    let out_base = scratch_dir();
    let config = write_test_config(in_dir.path());

    let out_dir = run(&RunOptions {
        wrf_file: wrf_path,
        output_dir: out_base.path().to_path_buf(),
        run_flags: "0".to_string(),
        partial: false,
        config: Some(config),
    })
    .unwrap();

    assert_eq!(
        out_dir,
        out_base.path().join("2025-03-13_21_00_00").join("d01")
    );

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("metadata.json")).unwrap()).unwrap();
    assert_eq!(metadata["init_time"], "2025-03-13 21:00:00");
    assert_eq!(metadata["domain"], "d01");
    assert_eq!(metadata["forecast_hours"], 4);
    assert_eq!(metadata["in_progress"], false);
    assert_eq!(metadata["products"].as_array().unwrap().len(), 6);
    assert_eq!(metadata["products"][0], "temperature");

    // Hourly maps for every configured product.
    let products = ["temperature", "wind", "1hr_precip", "helicity", "ptype", "rh_700mb"];
    for product in products {
        for hour in 0..4 {
            let path = out_dir.join(product).join(format!("hour_{hour}.png"));
            assert!(path.exists(), "missing {path:?}");
        }
    }

    // Text forecasts for both airports, one row per hour from hour 1.
    let text = fs::read_to_string(out_dir.join("text/aaa/forecast.txt")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("WRF 2025-03-13_21_00_00 - Init: 2025-03-13 21:00:00"));
    assert!(lines[0].ends_with("Text Forecast for AAA"));
    assert_eq!(lines[2], "UTC (Fcst) Hr | Temp | Dewp | Wind (dir) | Pressure");
    assert!(lines[3].starts_with("22 UTC (01) | "), "row was {}", lines[3]);
    assert!(out_dir.join("text/bbb/forecast.txt").exists());

    // One-off figures.
    assert!(out_dir.join("24hr_change/24hr_change.png").exists());
    for hour in 0..4 {
        assert!(out_dir
            .join(format!("4panel_cloudcover/hour_{hour}.png"))
            .exists());
        assert!(out_dir.join(format!("4panel_ptype/hour_{hour}.png")).exists());
    }

    // Meteograms cover all airports; upper air only the high priority
    // table.
    assert!(out_dir.join("meteogram/aaa/meteogram.png").exists());
    assert!(out_dir.join("meteogram/bbb/meteogram.png").exists());
    for hour in 0..4 {
        assert!(out_dir.join(format!("skewt/aaa/hour_{hour}.png")).exists());
        assert!(out_dir
            .join(format!("skewt/aaa/hodograph_hour_{hour}.png"))
            .exists());
    }
    assert!(!out_dir.join("skewt/bbb").exists());

    // Every image written is a real PNG.
    let mut pngs = 0;
    for entry in WalkDir::new(&out_dir) {
        let entry = entry.unwrap();
        if entry.path().extension().is_some_and(|e| e == "png") {
            let bytes = fs::read(entry.path()).unwrap();
            assert_eq!(bytes[..8], PNG_MAGIC, "bad header in {:?}", entry.path());
            pngs += 1;
        }
    }
    assert_eq!(pngs, 24 + 9 + 2 + 8);
}

#[test]
fn partial_run_holds_back_full_period_products() {
    let spec = pipeline_spec().with_times(1);
    let (in_dir, wrf_path) = scratch_wrfout(&spec);
    let out_base = scratch_dir();
    let config = write_test_config(in_dir.path());

    let out_dir = run(&RunOptions {
        wrf_file: wrf_path,
        output_dir: out_base.path().to_path_buf(),
        run_flags: "0".to_string(),
        partial: true,
        config: Some(config),
    })
    .unwrap();

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("metadata.json")).unwrap()).unwrap();
    assert_eq!(metadata["forecast_hours"], 1);
    assert_eq!(metadata["in_progress"], true);

    // Instantaneous maps still render.
    for product in ["temperature", "wind", "helicity", "rh_700mb"] {
        assert!(out_dir.join(product).join("hour_0.png").exists());
    }
    // Difference-based products and full-period output wait for the
    // complete file.
    assert!(!out_dir.join("1hr_precip").exists());
    assert!(!out_dir.join("ptype").exists());
    assert!(!out_dir.join("text").exists());
    assert!(!out_dir.join("meteogram").exists());
    assert!(!out_dir.join("24hr_change").exists());

    // Per-hour composites and upper air plots do not need the full run.
    assert!(out_dir.join("4panel_cloudcover/hour_0.png").exists());
    assert!(out_dir.join("4panel_ptype/hour_0.png").exists());
    assert!(out_dir.join("skewt/aaa/hour_0.png").exists());
    assert!(out_dir.join("skewt/aaa/hodograph_hour_0.png").exists());
}

#[test]
fn run_flags_disable_modules() {
    let spec = pipeline_spec().with_times(2);
    let (in_dir, wrf_path) = scratch_wrfout(&spec);
    let out_base = scratch_dir();
    let config = write_test_config(in_dir.path());

    let out_dir = run(&RunOptions {
        wrf_file: wrf_path,
        output_dir: out_base.path().to_path_buf(),
        run_flags: "245".to_string(),
        partial: false,
        config: Some(config),
    })
    .unwrap();

    assert!(out_dir.join("text/aaa/forecast.txt").exists());
    assert!(out_dir.join("24hr_change/24hr_change.png").exists());
    assert!(!out_dir.join("temperature").exists());
    assert!(!out_dir.join("meteogram").exists());
    assert!(!out_dir.join("skewt").exists());
}
