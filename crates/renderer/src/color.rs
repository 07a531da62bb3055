//! Colors and color ramps for field rendering.
//!
//! Ramps are piecewise-linear gradients over stops in [0, 1], looked up
//! by name through [`ramp`]. The set covers every style the product
//! modules use, from the spectral temperature ramp to the categorical
//! precipitation-type palette.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{RenderError, RenderResult};

/// RGBA color, straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a `#RRGGBB` hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    /// Source-over composite of `self` onto an opaque `dst`.
    ///
    /// Canvases are opaque throughout, so the result stays opaque.
    pub fn over(self, dst: Color) -> Color {
        let sa = self.a as f32 / 255.0;
        let blend = |s: u8, d: u8| (s as f32 * sa + d as f32 * (1.0 - sa)).round() as u8;
        Color::rgb(
            blend(self.r, dst.r),
            blend(self.g, dst.g),
            blend(self.b, dst.b),
        )
    }
}

/// A single stop in a color ramp.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub position: f64,
    pub color: Color,
}

/// Piecewise-linear gradient over stops in [0, 1].
#[derive(Debug, Clone)]
pub struct ColorRamp {
    stops: Vec<ColorStop>,
}

impl ColorRamp {
    /// Build a ramp from (position, color) pairs. Stops are sorted by
    /// position; positions outside [0, 1] are clamped.
    pub fn new(stops: &[(f64, Color)]) -> Self {
        let mut stops: Vec<ColorStop> = stops
            .iter()
            .map(|&(position, color)| ColorStop {
                position: position.clamp(0.0, 1.0),
                color,
            })
            .collect();
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self { stops }
    }

    /// Build a ramp from evenly spaced colors.
    pub fn even(colors: &[Color]) -> Self {
        let n = colors.len();
        let stops: Vec<(f64, Color)> = colors
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let position = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                (position, c)
            })
            .collect();
        Self::new(&stops)
    }

    /// Color at normalized position `t`. Ends are clamped; NaN maps to
    /// transparent so masked grid cells drop out of the fill.
    pub fn at(&self, t: f64) -> Color {
        if t.is_nan() || self.stops.is_empty() {
            return Color::TRANSPARENT;
        }
        let t = t.clamp(0.0, 1.0);

        let first = self.stops[0];
        if t <= first.position {
            return first.color;
        }
        let last = self.stops[self.stops.len() - 1];
        if t >= last.position {
            return last.color;
        }

        for pair in self.stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t >= lo.position && t <= hi.position {
                let span = hi.position - lo.position;
                if span <= f64::EPSILON {
                    return hi.color;
                }
                let f = (t - lo.position) / span;
                let lerp = |a: u8, b: u8| (a as f64 + f * (b as f64 - a as f64)).round() as u8;
                return Color::rgba(
                    lerp(lo.color.r, hi.color.r),
                    lerp(lo.color.g, hi.color.g),
                    lerp(lo.color.b, hi.color.b),
                    lerp(lo.color.a, hi.color.a),
                );
            }
        }
        last.color
    }

    /// Color for `value` normalized over [min, max].
    pub fn sample(&self, value: f64, min: f64, max: f64) -> Color {
        if value.is_nan() {
            return Color::TRANSPARENT;
        }
        let range = max - min;
        if range.abs() < f64::EPSILON {
            return self.at(0.5);
        }
        self.at((value - min) / range)
    }

    pub fn reversed(&self) -> Self {
        let stops: Vec<(f64, Color)> = self
            .stops
            .iter()
            .rev()
            .map(|s| (1.0 - s.position, s.color))
            .collect();
        Self::new(&stops)
    }

    /// Same ramp with every stop's alpha replaced, for translucent
    /// underlay fills.
    pub fn with_alpha(&self, a: u8) -> Self {
        let stops: Vec<(f64, Color)> = self
            .stops
            .iter()
            .map(|s| (s.position, s.color.with_alpha(a)))
            .collect();
        Self::new(&stops)
    }

    /// Resample the ramp over the sub-range [start, end] of its domain.
    ///
    /// Used for the accumulation ramps, which start 20% in so the low
    /// end stays visible against a white background.
    pub fn truncated(&self, start: f64, end: f64) -> Self {
        const SAMPLES: usize = 17;
        let stops: Vec<(f64, Color)> = (0..SAMPLES)
            .map(|i| {
                let t = i as f64 / (SAMPLES - 1) as f64;
                (t, self.at(start + t * (end - start)))
            })
            .collect();
        Self::new(&stops)
    }
}

/// Categorical colors for the precipitation-type mesh: one entry per
/// code 0..=12 (none, then light/moderate/heavy of snow, ice, freezing
/// rain, rain).
pub fn ptype_colors() -> &'static [Color; 13] {
    const PTYPE: [Color; 13] = [
        Color::rgb(255, 255, 255), // none
        Color::rgb(135, 206, 235), // snow, light (skyblue)
        Color::rgb(0, 191, 255),   // snow, moderate (deepskyblue)
        Color::rgb(0, 0, 255),     // snow, heavy (blue)
        Color::rgb(255, 218, 185), // ice, light (peachpuff)
        Color::rgb(255, 165, 0),   // ice, moderate (orange)
        Color::rgb(255, 140, 0),   // ice, heavy (darkorange)
        Color::rgb(255, 182, 193), // freezing rain, light (lightpink)
        Color::rgb(255, 105, 180), // freezing rain, moderate (hotpink)
        Color::rgb(255, 20, 147),  // freezing rain, heavy (deeppink)
        Color::rgb(144, 238, 144), // rain, light (lightgreen)
        Color::rgb(0, 128, 0),     // rain, moderate (green)
        Color::rgb(0, 100, 0),     // rain, heavy (darkgreen)
    ];
    &PTYPE
}

/// Look up a named ramp from the static registry.
pub fn ramp(name: &str) -> RenderResult<&'static ColorRamp> {
    RAMPS
        .get(name)
        .ok_or_else(|| RenderError::UnknownRamp(name.to_string()))
}

static RAMPS: Lazy<HashMap<&'static str, ColorRamp>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("nipy_spectral", nipy_spectral());
    m.insert("coolwarm", coolwarm());

    let brbg = ColorRamp::even(&[
        Color::rgb(84, 48, 5),
        Color::rgb(140, 81, 10),
        Color::rgb(191, 129, 45),
        Color::rgb(223, 194, 125),
        Color::rgb(246, 232, 195),
        Color::rgb(245, 245, 245),
        Color::rgb(199, 234, 229),
        Color::rgb(128, 205, 193),
        Color::rgb(53, 151, 143),
        Color::rgb(1, 102, 94),
        Color::rgb(0, 60, 48),
    ]);
    m.insert("brbg_r", brbg.reversed());
    m.insert("brbg", brbg);

    m.insert(
        "ylorrd",
        ColorRamp::even(&[
            Color::rgb(255, 255, 204),
            Color::rgb(255, 237, 160),
            Color::rgb(254, 217, 118),
            Color::rgb(254, 178, 76),
            Color::rgb(253, 141, 60),
            Color::rgb(252, 78, 42),
            Color::rgb(227, 26, 28),
            Color::rgb(189, 0, 38),
            Color::rgb(128, 0, 38),
        ]),
    );

    m.insert("nws_reflectivity", nws_reflectivity());
    m.insert("precipitation", precipitation());

    m.insert(
        "greens",
        ColorRamp::even(&[
            Color::rgb(247, 252, 245),
            Color::rgb(229, 245, 224),
            Color::rgb(199, 233, 192),
            Color::rgb(161, 217, 155),
            Color::rgb(116, 196, 118),
            Color::rgb(65, 171, 93),
            Color::rgb(35, 139, 69),
            Color::rgb(0, 109, 44),
            Color::rgb(0, 68, 27),
        ]),
    );

    let blues = ColorRamp::even(&[
        Color::rgb(247, 251, 255),
        Color::rgb(222, 235, 247),
        Color::rgb(198, 219, 239),
        Color::rgb(158, 202, 225),
        Color::rgb(107, 174, 214),
        Color::rgb(66, 146, 198),
        Color::rgb(33, 113, 181),
        Color::rgb(8, 81, 156),
        Color::rgb(8, 48, 107),
    ]);
    m.insert("blues_r", blues.reversed());
    m.insert("blues", blues);

    m.insert(
        "rdpu",
        ColorRamp::even(&[
            Color::rgb(255, 247, 243),
            Color::rgb(253, 224, 221),
            Color::rgb(252, 197, 192),
            Color::rgb(250, 159, 181),
            Color::rgb(247, 104, 161),
            Color::rgb(221, 52, 151),
            Color::rgb(174, 1, 126),
            Color::rgb(122, 1, 119),
            Color::rgb(73, 0, 106),
        ]),
    );

    m.insert(
        "oranges",
        ColorRamp::even(&[
            Color::rgb(255, 245, 235),
            Color::rgb(254, 230, 206),
            Color::rgb(253, 208, 162),
            Color::rgb(253, 174, 107),
            Color::rgb(253, 141, 60),
            Color::rgb(241, 105, 19),
            Color::rgb(217, 72, 1),
            Color::rgb(166, 54, 3),
            Color::rgb(127, 39, 4),
        ]),
    );

    m.insert(
        "bwr_r",
        ColorRamp::even(&[
            Color::rgb(255, 0, 0),
            Color::rgb(255, 255, 255),
            Color::rgb(0, 0, 255),
        ]),
    );

    m.insert(
        "magma_r",
        ColorRamp::even(&[
            Color::rgb(0, 0, 4),
            Color::rgb(28, 16, 68),
            Color::rgb(79, 18, 123),
            Color::rgb(129, 37, 129),
            Color::rgb(181, 54, 122),
            Color::rgb(229, 80, 100),
            Color::rgb(251, 135, 97),
            Color::rgb(254, 194, 135),
            Color::rgb(252, 253, 191),
        ])
        .reversed(),
    );

    m.insert(
        "turbo",
        ColorRamp::even(&[
            Color::rgb(48, 18, 59),
            Color::rgb(69, 91, 205),
            Color::rgb(62, 155, 254),
            Color::rgb(24, 214, 203),
            Color::rgb(72, 248, 130),
            Color::rgb(164, 252, 60),
            Color::rgb(226, 220, 56),
            Color::rgb(254, 163, 49),
            Color::rgb(239, 89, 17),
            Color::rgb(194, 36, 3),
            Color::rgb(122, 4, 3),
        ]),
    );

    m.insert(
        "plasma",
        ColorRamp::even(&[
            Color::rgb(13, 8, 135),
            Color::rgb(84, 2, 163),
            Color::rgb(139, 10, 165),
            Color::rgb(185, 50, 137),
            Color::rgb(219, 92, 104),
            Color::rgb(244, 136, 73),
            Color::rgb(254, 188, 43),
            Color::rgb(240, 249, 33),
        ]),
    );

    m.insert(
        "rdylgn",
        ColorRamp::even(&[
            Color::rgb(165, 0, 38),
            Color::rgb(215, 48, 39),
            Color::rgb(244, 109, 67),
            Color::rgb(253, 174, 97),
            Color::rgb(254, 224, 139),
            Color::rgb(255, 255, 191),
            Color::rgb(217, 239, 139),
            Color::rgb(166, 217, 106),
            Color::rgb(102, 189, 99),
            Color::rgb(26, 152, 80),
            Color::rgb(0, 104, 55),
        ]),
    );

    m.insert(
        "cividis_r",
        ColorRamp::even(&[
            Color::rgb(0, 34, 78),
            Color::rgb(0, 46, 107),
            Color::rgb(42, 65, 108),
            Color::rgb(70, 84, 110),
            Color::rgb(94, 103, 114),
            Color::rgb(117, 122, 120),
            Color::rgb(142, 142, 120),
            Color::rgb(168, 163, 112),
            Color::rgb(196, 185, 97),
            Color::rgb(226, 208, 71),
            Color::rgb(254, 232, 37),
        ])
        .reversed(),
    );

    m
});

/// Spectral temperature ramp, stops every 0.05.
fn nipy_spectral() -> ColorRamp {
    ColorRamp::new(&[
        (0.00, Color::rgb(0, 0, 0)),
        (0.05, Color::rgb(119, 0, 136)),
        (0.10, Color::rgb(136, 0, 153)),
        (0.15, Color::rgb(0, 0, 170)),
        (0.20, Color::rgb(0, 0, 221)),
        (0.25, Color::rgb(0, 119, 221)),
        (0.30, Color::rgb(0, 153, 221)),
        (0.35, Color::rgb(0, 170, 170)),
        (0.40, Color::rgb(0, 170, 136)),
        (0.45, Color::rgb(0, 153, 0)),
        (0.50, Color::rgb(0, 187, 0)),
        (0.55, Color::rgb(0, 221, 0)),
        (0.60, Color::rgb(0, 255, 0)),
        (0.65, Color::rgb(187, 255, 0)),
        (0.70, Color::rgb(238, 238, 0)),
        (0.75, Color::rgb(255, 204, 0)),
        (0.80, Color::rgb(255, 153, 0)),
        (0.85, Color::rgb(255, 0, 0)),
        (0.90, Color::rgb(221, 0, 0)),
        (0.95, Color::rgb(204, 0, 0)),
        (1.00, Color::rgb(204, 204, 204)),
    ])
}

/// Diverging blue-white-red ramp for difference fields.
fn coolwarm() -> ColorRamp {
    ColorRamp::even(&[
        Color::rgb(59, 76, 192),
        Color::rgb(98, 130, 234),
        Color::rgb(141, 176, 254),
        Color::rgb(184, 208, 249),
        Color::rgb(221, 221, 221),
        Color::rgb(245, 196, 173),
        Color::rgb(244, 154, 123),
        Color::rgb(222, 96, 77),
        Color::rgb(180, 4, 38),
    ])
}

/// Classic radar reflectivity colors, 5..75 dBZ.
fn nws_reflectivity() -> ColorRamp {
    ColorRamp::even(&[
        Color::rgb(4, 233, 231),
        Color::rgb(1, 159, 244),
        Color::rgb(3, 0, 244),
        Color::rgb(2, 253, 2),
        Color::rgb(1, 197, 1),
        Color::rgb(0, 142, 0),
        Color::rgb(253, 248, 2),
        Color::rgb(229, 188, 0),
        Color::rgb(253, 149, 0),
        Color::rgb(253, 0, 0),
        Color::rgb(212, 0, 0),
        Color::rgb(188, 0, 0),
        Color::rgb(248, 0, 253),
        Color::rgb(152, 84, 198),
        Color::rgb(255, 255, 255),
    ])
}

/// Accumulated precipitation ramp: white through greens into
/// yellow/orange/red, purple at the extreme end.
fn precipitation() -> ColorRamp {
    ColorRamp::even(&[
        Color::rgb(255, 255, 255),
        Color::rgb(199, 233, 192),
        Color::rgb(161, 217, 155),
        Color::rgb(116, 196, 118),
        Color::rgb(49, 163, 84),
        Color::rgb(0, 109, 44),
        Color::rgb(255, 250, 138),
        Color::rgb(255, 204, 79),
        Color::rgb(254, 141, 60),
        Color::rgb(252, 78, 42),
        Color::rgb(214, 26, 28),
        Color::rgb(173, 0, 38),
        Color::rgb(112, 0, 38),
    ])
}
