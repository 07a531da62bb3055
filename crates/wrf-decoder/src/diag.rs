//! Derived fields.
//!
//! Functions are named after the getvar vocabulary the product recipes
//! were written against: `tk`, `td2`, `rh`, `eth`, `cloudfrac` and so
//! on. Each one reads what it needs from the file for a single time
//! step and returns plain grids with NaN marking missing data.

use metfor::{Celsius, HectoPascal, Meters, MetersPSec, Quantity, WindUV};
use optional::{none, some, Optioned};
use sounding::{lift_parcel, most_unstable_parcel, Sounding};
use wrf_common::{Grid2, Grid3};

use crate::error::DecodeResult;
use crate::file::WrfFile;

/// Gravity, for geopotential height.
const G: f64 = 9.81;
/// Rd/cp in the Poisson conversion from potential temperature.
const RD_OVER_CP: f64 = 2.0 / 7.0;

/// Full pressure in hPa: perturbation plus base state.
pub fn pressure(wrf: &WrfFile, t: usize) -> DecodeResult<Grid3> {
    let p = wrf.field3("P", t)?;
    let pb = wrf.field3("PB", t)?;
    Ok(p.zip_map(&pb, |a, b| (a + b) / 100.0)?)
}

/// Air temperature in K from perturbation potential temperature.
pub fn tk(wrf: &WrfFile, t: usize) -> DecodeResult<Grid3> {
    let theta = wrf.field3("T", t)?.map(|v| v + 300.0);
    let p = pressure(wrf, t)?;
    Ok(theta.zip_map(&p, |th, p_hpa| th * (p_hpa / 1000.0).powf(RD_OVER_CP))?)
}

/// Air temperature in °C.
pub fn tc(wrf: &WrfFile, t: usize) -> DecodeResult<Grid3> {
    Ok(tk(wrf, t)?.map(|v| v - 273.15))
}

/// Dew point in °C from the vapor mixing ratio.
pub fn td(wrf: &WrfFile, t: usize) -> DecodeResult<Grid3> {
    let qv = wrf.field3("QVAPOR", t)?;
    let p = pressure(wrf, t)?;
    Ok(qv.zip_map(&p, dew_point_c)?)
}

/// 2 m dew point in °C from Q2 and PSFC.
pub fn td2(wrf: &WrfFile, t: usize) -> DecodeResult<Grid2> {
    let q2 = wrf.field2("Q2", t)?;
    let psfc = wrf.field2("PSFC", t)?;
    Ok(q2.zip_map(&psfc, |qv, p_pa| dew_point_c(qv, p_pa / 100.0))?)
}

/// Relative humidity in percent, 3-D.
pub fn rh(wrf: &WrfFile, t: usize) -> DecodeResult<Grid3> {
    let qv = wrf.field3("QVAPOR", t)?;
    let p = pressure(wrf, t)?;
    let qvs = tk(wrf, t)?.zip_map(&p, saturation_mixing_ratio)?;
    Ok(qv.zip_map(&qvs, relative_humidity)?)
}

/// 2 m relative humidity in percent.
pub fn rh2(wrf: &WrfFile, t: usize) -> DecodeResult<Grid2> {
    let q2 = wrf.field2("Q2", t)?;
    let t2 = wrf.field2("T2", t)?;
    let psfc = wrf.field2("PSFC", t)?;
    let qvs = t2.zip_map(&psfc, |tk, p_pa| saturation_mixing_ratio(tk, p_pa / 100.0))?;
    Ok(q2.zip_map(&qvs, relative_humidity)?)
}

/// Equivalent potential temperature in K.
pub fn eth(wrf: &WrfFile, t: usize) -> DecodeResult<Grid3> {
    let p = pressure(wrf, t)?;
    let t_c = tc(wrf, t)?;
    let td_c = td(wrf, t)?;
    let (nz, ny, nx) = (p.nz(), p.ny(), p.nx());
    let mut data = Vec::with_capacity(nz * ny * nx);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let v = metfor::theta_e(
                    Celsius(t_c.get(k, j, i)),
                    Celsius(td_c.get(k, j, i)),
                    HectoPascal(p.get(k, j, i)),
                )
                .map(|th| th.unpack())
                .unwrap_or(f64::NAN);
                data.push(v);
            }
        }
    }
    Ok(Grid3::new(nz, ny, nx, data)?)
}

/// Geopotential height in meters on mass levels.
pub fn z(wrf: &WrfFile, t: usize) -> DecodeResult<Grid3> {
    let ph = wrf.field3("PH", t)?;
    let phb = wrf.field3("PHB", t)?;
    Ok(ph.zip_map(&phb, |a, b| (a + b) / G)?)
}

/// 10 m wind speed in m/s and meteorological direction in degrees.
pub fn wspd_wdir10(wrf: &WrfFile, t: usize) -> DecodeResult<(Grid2, Grid2)> {
    let u = wrf.field2("U10", t)?;
    let v = wrf.field2("V10", t)?;
    let speed = u.zip_map(&v, f64::hypot)?;
    let dir = u.zip_map(&v, |u, v| (270.0 - v.atan2(u).to_degrees()).rem_euclid(360.0))?;
    Ok((speed, dir))
}

/// Low, mid and high cloud fraction, each 0..1.
///
/// Per column: the maximum RH inside the layers bounded by 970, 800 and
/// 450 hPa, pushed through 4·RH/100 − 3 and clamped to 0..1.
pub fn cloudfrac(wrf: &WrfFile, t: usize) -> DecodeResult<(Grid2, Grid2, Grid2)> {
    let p = pressure(wrf, t)?;
    let relh = rh(wrf, t)?;
    let (ny, nx) = (p.ny(), p.nx());
    let mut low = Grid2::filled(ny, nx, 0.0);
    let mut mid = Grid2::filled(ny, nx, 0.0);
    let mut high = Grid2::filled(ny, nx, 0.0);
    for j in 0..ny {
        for i in 0..nx {
            let pres = p.column(j, i);
            let rhs = relh.column(j, i);
            let kclo = last_above(&pres, 970.0);
            let kcmi = last_above(&pres, 800.0).max(kclo);
            let kchi = last_above(&pres, 450.0).max(kcmi);
            low.set(j, i, band_fraction(&rhs[kclo..=kcmi]));
            mid.set(j, i, band_fraction(&rhs[kcmi..=kchi]));
            high.set(j, i, band_fraction(&rhs[kchi..]));
        }
    }
    Ok((low, mid, high))
}

/// Index of the last level with pressure above `thresh` hPa.
fn last_above(pres: &[f64], thresh: f64) -> usize {
    pres.iter().rposition(|&p| p > thresh).unwrap_or(0)
}

fn band_fraction(rhs: &[f64]) -> f64 {
    let max_rh = rhs
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);
    (4.0 * max_rh / 100.0 - 3.0).clamp(0.0, 1.0)
}

/// Most-unstable CAPE and CIN in J/kg, one value per column.
///
/// Columns whose parcel cannot be constructed or lifted stay at zero.
pub fn mcape_mcin(wrf: &WrfFile, t: usize) -> DecodeResult<(Grid2, Grid2)> {
    let p = pressure(wrf, t)?;
    let t_c = tc(wrf, t)?;
    let td_c = td(wrf, t)?;
    let height = z(wrf, t)?;
    let (ny, nx) = (p.ny(), p.nx());
    let mut cape = Grid2::filled(ny, nx, 0.0);
    let mut cin = Grid2::filled(ny, nx, 0.0);
    for j in 0..ny {
        for i in 0..nx {
            let snd = column_sounding(&p, &t_c, &td_c, &height, None, j, i);
            let analysis =
                most_unstable_parcel(&snd).and_then(|parcel| lift_parcel(parcel, &snd));
            if let Ok(a) = analysis {
                let c = a.cape().into_option().map(|v| v.unpack()).unwrap_or(0.0);
                let n = a.cin().into_option().map(|v| v.unpack()).unwrap_or(0.0);
                cape.set(j, i, c);
                cin.set(j, i, n);
            }
        }
    }
    Ok((cape, cin))
}

/// The full sounding for one grid column, bottom level first.
pub fn column(wrf: &WrfFile, t: usize, j: usize, i: usize) -> DecodeResult<Sounding> {
    let p = pressure(wrf, t)?;
    let t_c = tc(wrf, t)?;
    let td_c = td(wrf, t)?;
    let height = z(wrf, t)?;
    let u = wrf.field3("U", t)?;
    let v = wrf.field3("V", t)?;
    Ok(column_sounding(&p, &t_c, &td_c, &height, Some((&u, &v)), j, i))
}

/// Nearest grid point (row, column) to a lat/lon.
///
/// A squared-distance scan of the coordinate arrays rather than a map
/// projection inversion; the domains are small enough for that.
pub fn ll_to_xy(lat: &Grid2, lon: &Grid2, target_lat: f64, target_lon: f64) -> (usize, usize) {
    Grid2::nearest_index(lat, lon, target_lat, target_lon)
}

/// Dew point in °C from a vapor mixing ratio (kg/kg) and pressure (hPa).
///
/// Bolton's fit, inverted: e = qv·p/(ε+qv), Td = 243.5·ln(e/6.112) /
/// (17.67 − ln(e/6.112)).
fn dew_point_c(qv: f64, p_hpa: f64) -> f64 {
    let e = qv * p_hpa / (0.622 + qv);
    if !(e > 0.0) {
        return f64::NAN;
    }
    let l = (e / 6.112).ln();
    243.5 * l / (17.67 - l)
}

/// Saturation mixing ratio (kg/kg) at temperature (K) and pressure (hPa).
fn saturation_mixing_ratio(tk: f64, p_hpa: f64) -> f64 {
    let tc = tk - 273.15;
    let es = 6.112 * (17.67 * tc / (tc + 243.5)).exp();
    0.622 * es / (p_hpa - es)
}

/// Relative humidity in percent from actual and saturation mixing ratio,
/// capped at saturation.
fn relative_humidity(qv: f64, qvs: f64) -> f64 {
    if !(qvs > 0.0) {
        return f64::NAN;
    }
    (qv / qvs * 100.0).clamp(0.0, 100.0)
}

fn column_sounding(
    p: &Grid3,
    t_c: &Grid3,
    td_c: &Grid3,
    height: &Grid3,
    winds: Option<(&Grid3, &Grid3)>,
    j: usize,
    i: usize,
) -> Sounding {
    let pressure: Vec<Optioned<HectoPascal>> = p
        .column(j, i)
        .into_iter()
        .map(|v| if v.is_finite() { some(HectoPascal(v)) } else { none() })
        .collect();
    let temperature: Vec<Optioned<Celsius>> = t_c
        .column(j, i)
        .into_iter()
        .map(|v| if v.is_finite() { some(Celsius(v)) } else { none() })
        .collect();
    let dew_point: Vec<Optioned<Celsius>> = td_c
        .column(j, i)
        .into_iter()
        .map(|v| if v.is_finite() { some(Celsius(v)) } else { none() })
        .collect();
    let heights: Vec<Optioned<Meters>> = height
        .column(j, i)
        .into_iter()
        .map(|v| if v.is_finite() { some(Meters(v)) } else { none() })
        .collect();

    let mut snd = Sounding::new()
        .with_pressure_profile(pressure)
        .with_temperature_profile(temperature)
        .with_dew_point_profile(dew_point)
        .with_height_profile(heights);

    if let Some((u, v)) = winds {
        let wind: Vec<Optioned<WindUV<MetersPSec>>> = u
            .column(j, i)
            .into_iter()
            .zip(v.column(j, i))
            .map(|(uu, vv)| {
                if uu.is_finite() && vv.is_finite() {
                    some(WindUV {
                        u: MetersPSec(uu),
                        v: MetersPSec(vv),
                    })
                } else {
                    none()
                }
            })
            .collect();
        snd = snd.with_wind_profile(wind);
    }

    snd
}
