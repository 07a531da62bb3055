//! Lift a parcel and analyze the ascent.

use crate::{
    error::{AnalysisError, AnalysisResult},
    interpolation::{linear_interp, linear_interpolate_sounding},
    parcel::Parcel,
    sounding::{DataRow, Sounding},
};
use itertools::izip;
use metfor::{self, Celsius, CelsiusDiff, HectoPascal, JpKg, Kelvin, Meters, Quantity};
use optional::{none, some, Optioned};

/// Parallel profiles for a lifted parcel and its environment.
///
/// Both temperature profiles hold virtual temperatures, so the difference
/// between them is the buoyancy that CAPE and CIN integrate.
#[derive(Debug, Clone)]
pub struct ParcelProfile {
    /// Pressure levels of the ascent.
    pub pressure: Vec<HectoPascal>,
    /// Heights of the ascent levels.
    pub height: Vec<Meters>,
    /// Parcel virtual temperature at each level.
    pub parcel_t: Vec<Celsius>,
    /// Environment virtual temperature at each level.
    pub environment_t: Vec<Celsius>,
}

/// Everything worth keeping from lifting one parcel.
#[derive(Debug, Clone)]
pub struct ParcelAscentAnalysis {
    parcel: Parcel,
    profile: ParcelProfile,
    cape: Optioned<JpKg>,
    cin: Optioned<JpKg>,
    lcl_pressure: Optioned<HectoPascal>,
    lcl_temperature: Optioned<Celsius>,
    lfc_pressure: Optioned<HectoPascal>,
    el_pressure: Optioned<HectoPascal>,
}

impl ParcelAscentAnalysis {
    /// The parcel that was lifted.
    pub fn parcel(&self) -> &Parcel {
        &self.parcel
    }

    /// The parcel and environment profiles of the ascent.
    pub fn profile(&self) -> &ParcelProfile {
        &self.profile
    }

    /// Convective available potential energy.
    pub fn cape(&self) -> Optioned<JpKg> {
        self.cape
    }

    /// Convective inhibition, zero or negative.
    pub fn cin(&self) -> Optioned<JpKg> {
        self.cin
    }

    pub fn lcl_pressure(&self) -> Optioned<HectoPascal> {
        self.lcl_pressure
    }

    pub fn lcl_temperature(&self) -> Optioned<Celsius> {
        self.lcl_temperature
    }

    pub fn lfc_pressure(&self) -> Optioned<HectoPascal> {
        self.lfc_pressure
    }

    pub fn el_pressure(&self) -> Optioned<HectoPascal> {
        self.el_pressure
    }
}

/// Lift a parcel through the sounding.
///
/// Dry adiabatic ascent below the LCL, saturated ascent above it. Both the
/// parcel and environment profiles come out as virtual temperatures, and
/// the LFC/EL are found at their crossings by linear interpolation.
pub fn lift_parcel(parcel: Parcel, snd: &Sounding) -> AnalysisResult<ParcelAscentAnalysis> {
    // Find the LCL.
    let (lcl_pressure, lcl_temperature) = metfor::pressure_and_temperature_at_lcl(
        parcel.temperature,
        parcel.dew_point,
        parcel.pressure,
    )
    .ok_or(AnalysisError::MetForError)?;

    let lcl_temperature = Celsius::from(lcl_temperature);
    let lcl_env = linear_interpolate_sounding(snd, lcl_pressure)?;
    let lcl_height = lcl_env.height.ok_or(AnalysisError::InterpolationError)?;
    let lcl_env_temperature = lcl_env
        .temperature
        .ok_or(AnalysisError::InterpolationError)?;
    let lcl_env_dp = lcl_env.dew_point.ok_or(AnalysisError::InterpolationError)?;

    // The level to lift from.
    let (parcel_start_data, parcel) = find_parcel_start_data(snd, &parcel)?;

    // Parcel temperature for a target pressure, always as virtual
    // temperature: dry adiabatic below the LCL, saturated above it.
    let theta = parcel.theta();
    let theta_e = parcel.theta_e()?;
    let dry_mw = parcel.mixing_ratio()?;
    let calc_parcel_t = |tgt_pres| {
        if tgt_pres > lcl_pressure {
            let t_k = metfor::temperature_from_theta(theta, tgt_pres);
            metfor::virtual_temperature(
                t_k,
                metfor::dew_point_from_p_and_mw(tgt_pres, dry_mw)?,
                tgt_pres,
            )
            .map(Celsius::from)
        } else {
            metfor::temperature_from_theta_e_saturated_and_pressure(tgt_pres, theta_e)
                .and_then(|t_c| metfor::virtual_temperature(t_c, t_c, tgt_pres))
                .map(Celsius::from)
        }
    };

    let snd_pressure = snd.pressure_profile();
    let hgt = snd.height_profile();
    let env_t = snd.temperature_profile();
    let env_dp = snd.dew_point_profile();

    let mut lfc_pressure: Optioned<HectoPascal> = none();
    let mut el_pressure: Optioned<HectoPascal> = none();

    let mut pressure = Vec::with_capacity(snd_pressure.len() + 5);
    let mut height = Vec::with_capacity(snd_pressure.len() + 5);
    let mut parcel_t: Vec<Celsius> = Vec::with_capacity(snd_pressure.len() + 5);
    let mut environment_t: Vec<Celsius> = Vec::with_capacity(snd_pressure.len() + 5);

    // Scope to limit the closure borrows of the output vectors.
    {
        let mut add_row = |pp, hh, pcl_tt, env_tt| {
            pressure.push(pp);
            height.push(hh);
            parcel_t.push(pcl_tt);
            environment_t.push(env_tt);
        };

        // Start at the parcel level.
        let mut p0 = parcel.pressure;
        let mut h0 = parcel_start_data
            .height
            .ok_or(AnalysisError::InvalidInput)?;
        let mut pcl_t0 = parcel.virtual_temperature().map(Celsius::from)?;
        let mut env_t0 = {
            let t = parcel_start_data
                .temperature
                .ok_or(AnalysisError::InvalidInput)?;
            let dp = parcel_start_data
                .dew_point
                .ok_or(AnalysisError::InvalidInput)?;
            Celsius::from(
                metfor::virtual_temperature(t, dp, p0).ok_or(AnalysisError::MetForError)?,
            )
        };

        add_row(p0, h0, pcl_t0, env_t0);

        if pcl_t0 < env_t0 {
            el_pressure = some(p0);
        } else {
            lfc_pressure = some(p0);
        }

        let iter = izip!(snd_pressure, hgt, env_t, env_dp)
            // Remove levels with missing data and unpack the rest.
            .filter_map(|(p, h, t, dp)| {
                if p.is_some() && h.is_some() && t.is_some() && dp.is_some() {
                    Some((p.unpack(), h.unpack(), t.unpack(), dp.unpack()))
                } else {
                    None
                }
            })
            // Remove levels at or below the parcel.
            .filter(move |(p, _, _, _)| *p < p0)
            // Parcel virtual temperature at the level.
            .filter_map(|(p, h, t, dp)| calc_parcel_t(p).map(|pcl_vt| (p, h, t, dp, pcl_vt)))
            // Environment virtual temperature at the level.
            .filter_map(|(p, h, t, dp, pcl_vt)| {
                metfor::virtual_temperature(t, dp, p)
                    .map(|env_vt| (p, h, Celsius::from(env_vt), pcl_vt))
            });

        for (p, h, env_vt, pcl_vt) in iter {
            // Are we passing the LCL?
            let lcl_data = if p0 > lcl_pressure && p < lcl_pressure {
                Some((
                    lcl_pressure,
                    lcl_height,
                    Celsius::from(
                        metfor::virtual_temperature(
                            lcl_temperature,
                            lcl_temperature,
                            lcl_pressure,
                        )
                        .ok_or(AnalysisError::MetForError)?,
                    ),
                    Celsius::from(
                        metfor::virtual_temperature(
                            lcl_env_temperature,
                            lcl_env_dp,
                            lcl_pressure,
                        )
                        .ok_or(AnalysisError::MetForError)?,
                    ),
                ))
            } else {
                None
            };

            // Have the parcel and environment profiles crossed?
            let crossing_data =
                if (pcl_t0 < env_t0 && pcl_vt > env_vt) || (pcl_t0 > env_t0 && pcl_vt < env_vt) {
                    let tgt_pres =
                        linear_interp(CelsiusDiff(0.0), pcl_vt - env_vt, pcl_t0 - env_t0, p, p0);
                    let tgt_h = linear_interp(tgt_pres, p0, p, h0, h);
                    let tgt_t = linear_interp(tgt_pres, p0, p, env_t0, env_vt);

                    Some((tgt_pres, tgt_h, tgt_t))
                } else {
                    None
                };

            // Insert the special levels in pressure order.
            match (lcl_data, crossing_data) {
                (Some((lclp, lclh, lclpt, lclet)), Some((cp, ch, ct))) => {
                    if lclp > cp {
                        add_row(lclp, lclh, lclpt, lclet);
                        add_row(cp, ch, ct, ct);
                    } else {
                        add_row(cp, ch, ct, ct);
                        add_row(lclp, lclh, lclpt, lclet);
                    }
                }
                (Some((lclp, lclh, lclpt, lclet)), None) => add_row(lclp, lclh, lclpt, lclet),
                (None, Some((cp, ch, ct))) => add_row(cp, ch, ct, ct),
                (None, None) => {}
            }

            if let Some((tgt_pres, _, _)) = crossing_data {
                if pcl_t0 < env_t0 && pcl_vt > env_vt {
                    // Crossing into positive buoyancy. A previous "EL" below
                    // the LCL was dry and does not count.
                    if el_pressure.is_none() || el_pressure.unpack() > lcl_pressure {
                        lfc_pressure = some(tgt_pres);
                        el_pressure = none();
                    }
                } else if el_pressure.is_none() {
                    // Crossing into negative buoyancy.
                    el_pressure = some(tgt_pres);
                }
            }

            add_row(p, h, pcl_vt, env_vt);

            p0 = p;
            h0 = h;
            pcl_t0 = pcl_vt;
            env_t0 = env_vt;
        }
    }

    let profile = ParcelProfile {
        pressure,
        height,
        parcel_t,
        environment_t,
    };

    let lcl_pressure = some(lcl_pressure);
    let lcl_temperature = some(lcl_temperature);

    // An LFC is only meaningful with an EL above it.
    if lfc_pressure.is_some() && el_pressure.is_some() {
        if lfc_pressure < el_pressure {
            lfc_pressure = none();
            el_pressure = none();
        }
    } else {
        lfc_pressure = none();
        el_pressure = none();
    }

    let (cape, cin) = match cape_cin(&profile, lcl_pressure, lfc_pressure, el_pressure) {
        Ok((cape, cin)) => (some(cape), some(cin)),
        Err(_) => (none(), none()),
    };

    Ok(ParcelAscentAnalysis {
        parcel,
        profile,
        cape,
        cin,
        lcl_pressure,
        lcl_temperature,
        lfc_pressure,
        el_pressure,
    })
}

/// Find a level with complete data to start the ascent from.
///
/// If the sounding is missing data right at the parcel pressure, move the
/// parcel dry adiabatically to the lowest complete level and start there.
fn find_parcel_start_data(snd: &Sounding, parcel: &Parcel) -> AnalysisResult<(DataRow, Parcel)> {
    let good_row = |row: &DataRow| -> bool {
        row.temperature.is_some()
            && row.dew_point.is_some()
            && row.pressure.is_some()
            && row.height.is_some()
    };

    let first_guess = linear_interpolate_sounding(snd, parcel.pressure)?;
    if good_row(&first_guess) {
        return Ok((first_guess, *parcel));
    }

    let second_guess = snd
        .bottom_up()
        .find(good_row)
        .ok_or(AnalysisError::NotEnoughData)?;

    let pressure = second_guess.pressure.ok_or(AnalysisError::InvalidInput)?;
    let theta = parcel.theta();
    let temperature = Celsius::from(metfor::temperature_from_theta(theta, pressure));
    let mw = parcel.mixing_ratio()?;
    let dew_point =
        metfor::dew_point_from_p_and_mw(pressure, mw).ok_or(AnalysisError::MetForError)?;
    let new_parcel = Parcel {
        pressure,
        temperature,
        dew_point,
    };

    Ok((second_guess, new_parcel))
}

/// CAPE and CIN in J/kg by trapezoidal integration of the buoyancy.
///
/// CAPE only counts positive area above the LFC, CIN only negative area
/// below the EL. An EL at or below the LCL means no moist convection, so
/// both come back zero.
fn cape_cin(
    profile: &ParcelProfile,
    lcl: Optioned<HectoPascal>,
    lfc: Optioned<HectoPascal>,
    el: Optioned<HectoPascal>,
) -> AnalysisResult<(JpKg, JpKg)> {
    let (lfc, el) = if let (Some(lcl), Some(lfc), Some(el)) =
        (lcl.into_option(), lfc.into_option(), el.into_option())
    {
        if el < lcl {
            (lfc, el)
        } else {
            return Ok((JpKg(0.0), JpKg(0.0)));
        }
    } else {
        return Err(AnalysisError::NotEnoughData);
    };

    let (cape, cin) = izip!(
        &profile.pressure,
        &profile.height,
        &profile.parcel_t,
        &profile.environment_t
    )
    .take_while(|(&p, _, _, _)| p >= el)
    .fold(
        ((0.0, 0.0), Meters(f64::MAX), Kelvin(0.0), Kelvin(0.0)),
        |acc, (&p, &h, &pt, &et)| {
            let ((mut cape, mut cin), prev_h, prev_pt, prev_et) = acc;

            let (pt, et) = (Kelvin::from(pt), Kelvin::from(et));

            let dz = h - prev_h;
            if dz <= Meters(0.0) {
                // First level, nothing to integrate yet.
                return ((cape, cin), h, pt, et);
            }

            let buoyancy = ((pt - et).unpack() / et.unpack()
                + (prev_pt - prev_et).unpack() / prev_et.unpack())
                * dz.unpack();
            if buoyancy > 0.0 && p <= lfc {
                cape += buoyancy;
            } else if buoyancy < 0.0 {
                cin += buoyancy;
            }

            ((cape, cin), h, pt, et)
        },
    )
    .0;

    Ok((
        JpKg(cape / 2.0 * -metfor::g),
        JpKg(cin / 2.0 * -metfor::g),
    ))
}
