//! Synthetic wrfout files with a closed-form atmosphere.
//!
//! Every field is a simple function of its grid indices, linear along
//! any staggered axis, so destaggering and diagnostic formulas have
//! exact expected values. The methods on [`WrfoutSpec`] that mirror a
//! variable (`t2`, `u_mass`, `tk`, ...) are that ground truth.

use std::path::Path;

use chrono::{Duration, NaiveDateTime};

/// Gravity used to build the geopotential profile.
const G: f64 = 9.81;
/// Rd/cp exponent used to back out perturbation potential temperature.
const RD_OVER_CP: f64 = 2.0 / 7.0;

/// WRF timestamps are 19 characters: `YYYY-MM-DD_HH:MM:SS`.
const DATE_STR_LEN: usize = 19;
const TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Geopotential height spacing between staggered levels, in meters.
const LEVEL_DEPTH_M: f64 = 700.0;

/// Marker written into one cell of `REFD_COM`, declared as its
/// `_FillValue`, to exercise missing-data handling.
pub const FILL_VALUE: f32 = -9999.0;

/// Shape and start time of a synthetic wrfout file.
///
/// The default is a 4-step, 8-level, 30x40 grid initialized at
/// 2025-03-13 21 UTC. Write it with [`WrfoutSpec::write`] or through
/// [`crate::paths::scratch_wrfout`].
#[derive(Debug, Clone)]
pub struct WrfoutSpec {
    pub times: usize,
    pub nz: usize,
    pub ny: usize,
    pub nx: usize,
    pub start_date: String,
}

impl Default for WrfoutSpec {
    fn default() -> Self {
        Self {
            times: 4,
            nz: 8,
            ny: 30,
            nx: 40,
            start_date: "2025-03-13_21:00:00".to_string(),
        }
    }
}

impl WrfoutSpec {
    pub fn with_times(mut self, times: usize) -> Self {
        self.times = times;
        self
    }

    pub fn with_grid(mut self, nz: usize, ny: usize, nx: usize) -> Self {
        self.nz = nz;
        self.ny = ny;
        self.nx = nx;
        self
    }

    pub fn with_start(mut self, start_date: &str) -> Self {
        self.start_date = start_date.to_string();
        self
    }

    /// File name a real run of this spec would carry
    /// (`wrfout_d01_2025-03-13_21_00_00`).
    pub fn file_name(&self) -> String {
        format!("wrfout_d01_{}", self.start_date.replace(':', "_"))
    }

    /// The `Times` entries, one per step, hourly from the start date.
    pub fn time_strings(&self) -> Vec<String> {
        let start = self.parsed_start();
        (0..self.times)
            .map(|t| {
                (start + Duration::hours(t as i64))
                    .format(TIME_FORMAT)
                    .to_string()
            })
            .collect()
    }

    fn parsed_start(&self) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&self.start_date, TIME_FORMAT)
            .expect("start_date must look like 2025-03-13_21:00:00")
    }

    // Ground-truth formulas. Index order is (t, k, i, j) with i along
    // south_north and j along west_east.

    pub fn lat(&self, i: usize) -> f64 {
        33.0 + 0.1 * i as f64
    }

    pub fn lon(&self, j: usize) -> f64 {
        -85.0 + 0.1 * j as f64
    }

    /// 2 m temperature in K. Warms every step so hour-over-hour
    /// difference products have signal.
    pub fn t2(&self, t: usize, i: usize, j: usize) -> f64 {
        288.0 + 1.5 * t as f64 - 0.05 * i as f64 + 0.02 * j as f64
    }

    /// 2 m water vapor mixing ratio in kg/kg, uniform.
    pub fn q2(&self) -> f64 {
        0.008
    }

    /// Surface pressure in Pa.
    pub fn psfc(&self, i: usize) -> f64 {
        100_000.0 - 40.0 * i as f64
    }

    pub fn u10(&self, j: usize) -> f64 {
        3.0 + 0.1 * j as f64
    }

    pub fn v10(&self, i: usize) -> f64 {
        -2.0 + 0.1 * i as f64
    }

    pub fn wspd10max(&self, i: usize, j: usize) -> f64 {
        self.u10(j).hypot(self.v10(i)) + 2.0
    }

    /// Sea level pressure in Pa, falling northward and rising with time.
    pub fn mslp(&self, t: usize, i: usize) -> f64 {
        101_300.0 - 40.0 * i as f64 + 20.0 * t as f64
    }

    /// Accumulated precipitation in mm, growing linearly with time.
    pub fn total_precip(&self, t: usize, j: usize) -> f64 {
        t as f64 * (0.5 + j as f64 / self.nx as f64)
    }

    pub fn rain(&self, t: usize, j: usize) -> f64 {
        0.70 * self.total_precip(t, j)
    }

    pub fn snow(&self, t: usize, j: usize) -> f64 {
        0.20 * self.total_precip(t, j)
    }

    pub fn ice(&self, t: usize, j: usize) -> f64 {
        0.06 * self.total_precip(t, j)
    }

    pub fn fzra(&self, t: usize, j: usize) -> f64 {
        0.04 * self.total_precip(t, j)
    }

    pub fn pwat(&self) -> f64 {
        25.0
    }

    pub fn snownc(&self, t: usize) -> f64 {
        0.3 * t as f64
    }

    /// Composite reflectivity in dBZ: a Gaussian bump centered on the
    /// grid. The cell at `(0, 0, 0)` is overwritten with [`FILL_VALUE`].
    pub fn reflectivity(&self, i: usize, j: usize) -> f64 {
        45.0 * self.bump(i, j)
    }

    /// Updraft helicity in m2/s2, same bump scaled down.
    pub fn up_heli_max(&self, i: usize, j: usize) -> f64 {
        5.0 * self.bump(i, j)
    }

    fn bump(&self, i: usize, j: usize) -> f64 {
        let di = i as f64 - self.ny as f64 / 2.0;
        let dj = j as f64 - self.nx as f64 / 2.0;
        (-(di * di + dj * dj) / 50.0).exp()
    }

    /// Base-state pressure in Pa on mass level `k`, 1000 hPa at the
    /// bottom thinning to 200 hPa at the top.
    pub fn pressure_pa(&self, k: usize) -> f64 {
        100_000.0 - k as f64 * 80_000.0 / (self.nz - 1) as f64
    }

    /// Geopotential height of mass level `k` in meters.
    pub fn z_mass(&self, k: usize) -> f64 {
        LEVEL_DEPTH_M / 2.0 + LEVEL_DEPTH_M * k as f64
    }

    /// Air temperature in K on mass level `k`: 288 K at the surface
    /// with a 6.5 K/km lapse rate.
    pub fn tk(&self, k: usize) -> f64 {
        288.0 - 0.0065 * self.z_mass(k)
    }

    /// Water vapor mixing ratio in kg/kg, decaying with pressure.
    pub fn qvapor(&self, k: usize) -> f64 {
        0.008 * self.pressure_pa(k) / 100_000.0
    }

    /// Zonal wind destaggered to the mass point `(k, j)`.
    pub fn u_mass(&self, k: usize, j: usize) -> f64 {
        5.1 + 0.2 * j as f64 + 0.5 * k as f64
    }

    /// Meridional wind destaggered to the mass point `(k, i)`.
    pub fn v_mass(&self, k: usize, i: usize) -> f64 {
        -2.95 + 0.1 * i as f64 + 0.3 * k as f64
    }

    /// Write the file. Panics only on a malformed `start_date`.
    pub fn write(&self, path: &Path) -> Result<(), netcdf::Error> {
        let (nt, nz, ny, nx) = (self.times, self.nz, self.ny, self.nx);
        let mut file = netcdf::create(path)?;

        file.add_attribute("TITLE", "OUTPUT FROM WRF V4 MODEL")?;
        file.add_attribute("START_DATE", self.start_date.as_str())?;

        file.add_dimension("Time", nt)?;
        file.add_dimension("DateStrLen", DATE_STR_LEN)?;
        file.add_dimension("bottom_top", nz)?;
        file.add_dimension("bottom_top_stag", nz + 1)?;
        file.add_dimension("south_north", ny)?;
        file.add_dimension("south_north_stag", ny + 1)?;
        file.add_dimension("west_east", nx)?;
        file.add_dimension("west_east_stag", nx + 1)?;

        let mut stamps = Vec::with_capacity(nt * DATE_STR_LEN);
        for s in self.time_strings() {
            assert_eq!(s.len(), DATE_STR_LEN);
            stamps.extend_from_slice(s.as_bytes());
        }
        let mut times = file.add_variable::<u8>("Times", &["Time", "DateStrLen"])?;
        times.put_values(&stamps, ..)?;

        self.put_surface(&mut file, "XLAT", "degree_north", |_, i, _| self.lat(i))?;
        self.put_surface(&mut file, "XLONG", "degree_east", |_, _, j| self.lon(j))?;
        self.put_surface(&mut file, "T2", "K", |t, i, j| self.t2(t, i, j))?;
        self.put_surface(&mut file, "Q2", "kg kg-1", |_, _, _| self.q2())?;
        self.put_surface(&mut file, "PSFC", "Pa", |_, i, _| self.psfc(i))?;
        self.put_surface(&mut file, "U10", "m s-1", |_, _, j| self.u10(j))?;
        self.put_surface(&mut file, "V10", "m s-1", |_, i, _| self.v10(i))?;
        self.put_surface(&mut file, "WSPD10MAX", "m s-1", |_, i, j| {
            self.wspd10max(i, j)
        })?;
        self.put_surface(&mut file, "AFWA_MSLP", "Pa", |t, i, _| self.mslp(t, i))?;
        self.put_surface(&mut file, "AFWA_TOTPRECIP", "mm", |t, _, j| {
            self.total_precip(t, j)
        })?;
        self.put_surface(&mut file, "AFWA_RAIN", "mm", |t, _, j| self.rain(t, j))?;
        self.put_surface(&mut file, "AFWA_SNOW", "mm", |t, _, j| self.snow(t, j))?;
        self.put_surface(&mut file, "AFWA_ICE", "mm", |t, _, j| self.ice(t, j))?;
        self.put_surface(&mut file, "AFWA_FZRA", "mm", |t, _, j| self.fzra(t, j))?;
        self.put_surface(&mut file, "AFWA_PWAT", "kg m-2", |_, _, _| self.pwat())?;
        self.put_surface(&mut file, "SNOWNC", "mm", |t, _, _| self.snownc(t))?;
        self.put_surface(&mut file, "UP_HELI_MAX", "m2 s-2", |_, i, j| {
            self.up_heli_max(i, j)
        })?;

        // Reflectivity carries the fill marker in its first cell.
        let mut refl: Vec<f32> = Vec::with_capacity(nt * ny * nx);
        for _t in 0..nt {
            for i in 0..ny {
                for j in 0..nx {
                    refl.push(self.reflectivity(i, j) as f32);
                }
            }
        }
        refl[0] = FILL_VALUE;
        let mut var =
            file.add_variable::<f32>("REFD_COM", &["Time", "south_north", "west_east"])?;
        var.put_attribute("_FillValue", FILL_VALUE)?;
        var.put_attribute("units", "dBZ")?;
        var.put_values(&refl, ..)?;

        // Mass-level 3-D fields. The full pressure is carried in PB
        // with a zero perturbation, and likewise PHB carries all of
        // the geopotential.
        self.put_level(&mut file, "P", "Pa", nz, |_, _, _, _| 0.0)?;
        self.put_level(&mut file, "PB", "Pa", nz, |_, k, _, _| self.pressure_pa(k))?;
        self.put_level(&mut file, "T", "K", nz, |_, k, _, _| {
            self.tk(k) * (100_000.0 / self.pressure_pa(k)).powf(RD_OVER_CP) - 300.0
        })?;
        self.put_level(&mut file, "QVAPOR", "kg kg-1", nz, |_, k, _, _| {
            self.qvapor(k)
        })?;

        let mut ph: Vec<f32> = Vec::with_capacity(nt * (nz + 1) * ny * nx);
        let mut phb: Vec<f32> = Vec::with_capacity(nt * (nz + 1) * ny * nx);
        for _t in 0..nt {
            for ks in 0..=nz {
                for _cell in 0..ny * nx {
                    ph.push(0.0);
                    phb.push((G * LEVEL_DEPTH_M * ks as f64) as f32);
                }
            }
        }
        let dims = ["Time", "bottom_top_stag", "south_north", "west_east"];
        let mut var = file.add_variable::<f32>("PH", &dims)?;
        var.put_attribute("units", "m2 s-2")?;
        var.put_values(&ph, ..)?;
        let mut var = file.add_variable::<f32>("PHB", &dims)?;
        var.put_attribute("units", "m2 s-2")?;
        var.put_values(&phb, ..)?;

        // Winds, linear along their staggered axis so the destaggered
        // value is the formula at the midpoint.
        let mut u: Vec<f32> = Vec::with_capacity(nt * nz * ny * (nx + 1));
        for _t in 0..nt {
            for k in 0..nz {
                for _i in 0..ny {
                    for js in 0..=nx {
                        u.push((5.0 + 0.2 * js as f64 + 0.5 * k as f64) as f32);
                    }
                }
            }
        }
        let mut var =
            file.add_variable::<f32>("U", &["Time", "bottom_top", "south_north", "west_east_stag"])?;
        var.put_attribute("units", "m s-1")?;
        var.put_values(&u, ..)?;

        let mut v: Vec<f32> = Vec::with_capacity(nt * nz * (ny + 1) * nx);
        for _t in 0..nt {
            for k in 0..nz {
                for is in 0..=ny {
                    for _j in 0..nx {
                        v.push((-3.0 + 0.1 * is as f64 + 0.3 * k as f64) as f32);
                    }
                }
            }
        }
        let mut var =
            file.add_variable::<f32>("V", &["Time", "bottom_top", "south_north_stag", "west_east"])?;
        var.put_attribute("units", "m s-1")?;
        var.put_values(&v, ..)?;

        Ok(())
    }

    fn put_surface(
        &self,
        file: &mut netcdf::FileMut,
        name: &str,
        units: &str,
        f: impl Fn(usize, usize, usize) -> f64,
    ) -> Result<(), netcdf::Error> {
        let mut data: Vec<f32> = Vec::with_capacity(self.times * self.ny * self.nx);
        for t in 0..self.times {
            for i in 0..self.ny {
                for j in 0..self.nx {
                    data.push(f(t, i, j) as f32);
                }
            }
        }
        let mut var = file.add_variable::<f32>(name, &["Time", "south_north", "west_east"])?;
        var.put_attribute("units", units)?;
        var.put_values(&data, ..)?;
        Ok(())
    }

    fn put_level(
        &self,
        file: &mut netcdf::FileMut,
        name: &str,
        units: &str,
        nz: usize,
        f: impl Fn(usize, usize, usize, usize) -> f64,
    ) -> Result<(), netcdf::Error> {
        let mut data: Vec<f32> = Vec::with_capacity(self.times * nz * self.ny * self.nx);
        for t in 0..self.times {
            for k in 0..nz {
                for i in 0..self.ny {
                    for j in 0..self.nx {
                        data.push(f(t, k, i, j) as f32);
                    }
                }
            }
        }
        let mut var =
            file.add_variable::<f32>(name, &["Time", "bottom_top", "south_north", "west_east"])?;
        var.put_attribute("units", units)?;
        var.put_values(&data, ..)?;
        Ok(())
    }
}
