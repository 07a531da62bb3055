//! Figure rendering for forecast products.
//!
//! All drawing goes through tiny-skia pixmaps:
//! - Filled fields through a color ramp (map.rs)
//! - Contour lines via marching squares (contour.rs)
//! - Wind barbs and streamlines (barbs.rs, streamline.rs)
//! - Axis/series plotting for meteograms and soundings (chart.rs)
//! - Stroke-segment text, no font assets (text.rs)
//!
//! Output encoding is a hand-rolled PNG writer (png.rs): indexed color
//! when the image fits in a 256-entry palette, RGBA otherwise.

pub mod barbs;
pub mod chart;
pub mod color;
pub mod contour;
pub mod error;
pub mod map;
pub mod png;
pub mod streamline;
pub mod text;

pub use color::{Color, ColorRamp};
pub use error::{RenderError, RenderResult};
