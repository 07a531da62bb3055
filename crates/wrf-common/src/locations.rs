//! The fixed location table the point products iterate over.

use serde::{Deserialize, Serialize};

/// A named point location. The id doubles as the output folder name and
/// is uppercased for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airport {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl Airport {
    pub fn new(id: &str, lat: f64, lon: f64) -> Self {
        Self {
            id: id.to_string(),
            lat,
            lon,
        }
    }

    /// Display name for chart titles.
    pub fn label(&self) -> String {
        self.id.to_uppercase()
    }
}

/// Locations that get every point product, including the Skew-T set.
/// The Skew-T pass is by far the most expensive per site, so this list
/// stays short.
pub fn high_priority_airports() -> Vec<Airport> {
    vec![
        Airport::new("ahn", 33.95167820706025, -83.32489875559355),
        Airport::new("cni", 34.30887599509864, -84.4273590802223),
        Airport::new("ffc", 33.358755552804176, -84.5711101702346),
        Airport::new("mcn", 32.70076950826015, -83.64790511895201),
        Airport::new("csg", 32.51571975545047, -84.9392150850212),
        Airport::new("bmx", 33.17895986702925, -86.7823825539515),
        Airport::new("gsp", 34.883261598428625, -82.22035185765819),
        Airport::new("hun", 34.72526357496368, -86.64485933237611),
        Airport::new("tae", 30.394458005924445, -84.3398597480267),
        Airport::new("sav", 32.128213416567114, -81.19987457392587),
        Airport::new("ags", 33.369475015594105, -81.96517834789427),
    ]
}

/// Locations that get everything except the Skew-T set.
pub fn secondary_airports() -> Vec<Airport> {
    vec![
        Airport::new("atl", 33.6391621022899, -84.43061412634862),
        Airport::new("rmg", 34.35267229676656, -85.16328449820841),
        Airport::new("aby", 31.53370678927006, -84.18738548637639),
        Airport::new("vdi", 32.19211787190395, -82.36896971377632),
        Airport::new("avl", 35.437208530161925, -82.53944681688363),
        Airport::new("jax", 30.492570769985885, -81.68571176177561),
    ]
}
