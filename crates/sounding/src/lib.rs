//! Parcel thermodynamics for model soundings.
//!
//! A [`Sounding`] holds one vertical column as parallel profiles of
//! metfor unit newtypes, with `Optioned` marking missing levels. On top
//! of that sit parcel constructors ([`surface_parcel`],
//! [`mixed_layer_parcel`], [`most_unstable_parcel`]), a parcel ascent
//! ([`lift_parcel`]) producing CAPE/CIN and the LCL/LFC/EL levels, and a
//! couple of classic stability indexes (`indexes`).

pub mod error;
pub mod indexes;
pub mod interpolation;
pub mod parcel;
pub mod parcel_profile;
mod sounding;

pub use crate::{
    error::{AnalysisError, AnalysisResult},
    parcel::{mixed_layer_parcel, most_unstable_parcel, surface_parcel, Parcel},
    parcel_profile::{lift_parcel, ParcelAscentAnalysis, ParcelProfile},
    sounding::{DataRow, Sounding},
};
