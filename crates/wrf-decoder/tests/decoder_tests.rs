//! Decoding a synthetic wrfout file with known analytic fields.

use chrono::{TimeZone, Utc};
use metfor::Quantity;
use test_utils::{assert_approx_eq, scratch_wrfout, WrfoutSpec};
use wrf_decoder::{diag, DecodeError, WrfFile};

fn small_spec() -> WrfoutSpec {
    WrfoutSpec::default().with_times(2).with_grid(8, 10, 12)
}

// ============================================================================
// file access
// ============================================================================

#[test]
fn test_times_axis_decodes_hourly() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let times = wrf.times().unwrap();
    assert_eq!(times.len(), 2);
    assert_eq!(times[0], Utc.with_ymd_and_hms(2025, 3, 13, 21, 0, 0).unwrap());
    assert_eq!(times[1], Utc.with_ymd_and_hms(2025, 3, 13, 22, 0, 0).unwrap());
}

#[test]
fn test_start_date_attribute() {
    let (_dir, path) = scratch_wrfout(&small_spec());
    let wrf = WrfFile::open(&path).unwrap();

    let run = wrf.start_date().unwrap();
    assert_eq!(run.run_key(), "2025-03-13_21_00_00");
    assert_eq!(run.init_label(), "2025-03-13 21:00 UTC");
}

#[test]
fn test_missing_variable_is_reported_by_name() {
    let (_dir, path) = scratch_wrfout(&small_spec());
    let wrf = WrfFile::open(&path).unwrap();

    match wrf.field2("NO_SUCH_FIELD", 0) {
        Err(DecodeError::MissingVariable { name }) => assert_eq!(name, "NO_SUCH_FIELD"),
        other => panic!("expected MissingVariable, got {other:?}"),
    }
}

#[test]
fn test_surface_fields_match_the_formulas() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let t2 = wrf.field2("T2", 1).unwrap();
    assert_eq!((t2.ny(), t2.nx()), (10, 12));
    for &(j, i) in &[(0, 0), (3, 7), (9, 11)] {
        assert_approx_eq!(t2.get(j, i), spec.t2(1, j, i), 1e-3);
    }

    let lat = wrf.lat().unwrap();
    let lon = wrf.lon().unwrap();
    assert_approx_eq!(lat.get(4, 0), spec.lat(4), 1e-4);
    assert_approx_eq!(lon.get(0, 9), spec.lon(9), 1e-4);
}

#[test]
fn test_fill_values_become_nan() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let refl = wrf.field2("REFD_COM", 0).unwrap();
    assert!(refl.get(0, 0).is_nan());
    assert_approx_eq!(refl.get(5, 6), spec.reflectivity(5, 6), 1e-3);
}

#[test]
fn test_staggered_winds_land_on_mass_points() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let u = wrf.field3("U", 0).unwrap();
    let v = wrf.field3("V", 0).unwrap();
    assert_eq!((u.nz(), u.ny(), u.nx()), (8, 10, 12));
    assert_eq!((v.nz(), v.ny(), v.nx()), (8, 10, 12));
    assert_approx_eq!(u.get(2, 4, 5), spec.u_mass(2, 5), 1e-4);
    assert_approx_eq!(v.get(3, 6, 1), spec.v_mass(3, 6), 1e-4);
}

// ============================================================================
// derived fields
// ============================================================================

#[test]
fn test_pressure_and_temperature_diagnostics() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let p = diag::pressure(&wrf, 0).unwrap();
    let tk = diag::tk(&wrf, 0).unwrap();
    let tc = diag::tc(&wrf, 0).unwrap();
    for k in 0..8 {
        assert_approx_eq!(p.get(k, 2, 3), spec.pressure_pa(k) / 100.0, 0.02);
        assert_approx_eq!(tk.get(k, 2, 3), spec.tk(k), 0.05);
        assert_approx_eq!(tc.get(k, 2, 3), spec.tk(k) - 273.15, 0.05);
    }
}

#[test]
fn test_height_comes_from_destaggered_geopotential() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let z = diag::z(&wrf, 0).unwrap();
    for k in 0..8 {
        assert_approx_eq!(z.get(k, 0, 0), spec.z_mass(k), 0.05);
    }
}

#[test]
fn test_moisture_diagnostics_are_physical() {
    let (_dir, path) = scratch_wrfout(&small_spec());
    let wrf = WrfFile::open(&path).unwrap();

    let tc = diag::tc(&wrf, 0).unwrap();
    let td = diag::td(&wrf, 0).unwrap();
    let rh = diag::rh(&wrf, 0).unwrap();
    for k in 0..8 {
        for &(j, i) in &[(0, 0), (5, 5), (9, 11)] {
            let t = tc.get(k, j, i);
            let d = td.get(k, j, i);
            let h = rh.get(k, j, i);
            assert!(d <= t + 0.01, "td {d} above tc {t} at level {k}");
            assert!((0.0..=100.0).contains(&h), "rh {h} at level {k}");
        }
    }

    let rh2 = diag::rh2(&wrf, 0).unwrap();
    let td2 = diag::td2(&wrf, 0).unwrap();
    assert!(rh2.get(3, 3) > 0.0 && rh2.get(3, 3) <= 100.0);
    assert!(td2.get(3, 3) < 20.0);
}

#[test]
fn test_theta_e_exceeds_plain_temperature() {
    let (_dir, path) = scratch_wrfout(&small_spec());
    let wrf = WrfFile::open(&path).unwrap();

    let eth = diag::eth(&wrf, 0).unwrap();
    let tk = diag::tk(&wrf, 0).unwrap();
    // Latent heat always pushes theta-e above the dry temperature.
    for k in 0..8 {
        assert!(eth.get(k, 4, 4) > tk.get(k, 4, 4));
    }
}

#[test]
fn test_surface_wind_speed_and_direction() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let (wspd, wdir) = diag::wspd_wdir10(&wrf, 0).unwrap();
    let (j, i) = (4, 6);
    let expect = spec.u10(i).hypot(spec.v10(j));
    assert_approx_eq!(wspd.get(j, i), expect, 1e-3);
    let d = wdir.get(j, i);
    assert!((0.0..360.0).contains(&d));
    // u > 0, v < 0 at this point: wind out of the northwest quadrant.
    assert!((270.0..360.0).contains(&d), "direction {d}");
}

#[test]
fn test_cloud_fractions_stay_in_range() {
    let (_dir, path) = scratch_wrfout(&small_spec());
    let wrf = WrfFile::open(&path).unwrap();

    let (low, mid, high) = diag::cloudfrac(&wrf, 0).unwrap();
    for grid in [&low, &mid, &high] {
        for &v in grid.values() {
            assert!((0.0..=1.0).contains(&v), "fraction {v}");
        }
    }
    // The moist mid-levels of the synthetic profile carry cloud.
    assert!(mid.get(5, 5) > 0.0);
}

#[test]
fn test_column_sounding_has_all_profiles() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let snd = diag::column(&wrf, 0, 3, 4).unwrap();
    assert_eq!(snd.pressure_profile().len(), 8);
    assert_eq!(snd.wind_profile().len(), 8);

    let bottom = snd.data_row(0).unwrap();
    assert!(bottom.pressure.is_some());
    assert_approx_eq!(bottom.pressure.unpack().unpack(), 1000.0, 0.1);
    assert!(bottom.temperature.is_some());
    assert!(bottom.height.is_some());
}

#[test]
fn test_most_unstable_cape_of_a_stable_profile() {
    let (_dir, path) = scratch_wrfout(&small_spec());
    let wrf = WrfFile::open(&path).unwrap();

    let (cape, cin) = diag::mcape_mcin(&wrf, 0).unwrap();
    for &(j, i) in &[(0, 0), (4, 7), (9, 11)] {
        let c = cape.get(j, i);
        let n = cin.get(j, i);
        assert!(c.is_finite() && c >= 0.0, "cape {c}");
        assert!(n.is_finite() && n <= 0.0, "cin {n}");
    }
}

#[test]
fn test_ll_to_xy_recovers_grid_indices() {
    let spec = small_spec();
    let (_dir, path) = scratch_wrfout(&spec);
    let wrf = WrfFile::open(&path).unwrap();

    let lat = wrf.lat().unwrap();
    let lon = wrf.lon().unwrap();
    assert_eq!(diag::ll_to_xy(&lat, &lon, spec.lat(4), spec.lon(7)), (4, 7));
    // Off-grid points snap to the nearest corner.
    assert_eq!(diag::ll_to_xy(&lat, &lon, 0.0, -120.0), (0, 0));
}
