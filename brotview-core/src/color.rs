use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::lerp;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGBA color with `f64` channels nominally in `[0, 255]`.
///
/// Interpolation never clamps; call [`Color::to_rgba8`] when writing to a
/// physical pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(255.0, 255.0, 255.0);
    pub const LIGHT_GRAY: Self = Self::rgb(200.0, 200.0, 200.0);
    pub const DARK_GRAY: Self = Self::rgb(100.0, 100.0, 100.0);
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 255.0);
    pub const YELLOW: Self = Self::rgb(255.0, 255.0, 0.0);
    pub const RED: Self = Self::rgb(255.0, 0.0, 0.0);
    pub const CYAN: Self = Self::rgb(0.0, 255.0, 255.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 255.0)
    }

    /// Channel-wise [`lerp`].
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            r: lerp(self.r, other.r, t),
            g: lerp(self.g, other.g, t),
            b: lerp(self.b, other.b, t),
            a: lerp(self.a, other.a, t),
        }
    }

    /// Round and clamp each channel into a byte.
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            channel_to_u8(self.r),
            channel_to_u8(self.g),
            channel_to_u8(self.b),
            channel_to_u8(self.a),
        ]
    }
}

#[inline]
fn channel_to_u8(v: f64) -> u8 {
    // NaN casts to 0.
    v.round().clamp(0.0, 255.0) as u8
}

// ---------------------------------------------------------------------------
// Color map
// ---------------------------------------------------------------------------

/// A control point of a [`ColorMap`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub x: f64,
    pub c: Color,
}

/// Piecewise-linear color ramp over `[first.x, last.x]`.
///
/// Holds at least two stops with finite, strictly increasing positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColorStop>", into = "Vec<ColorStop>")]
pub struct ColorMap {
    stops: Vec<ColorStop>,
}

impl ColorMap {
    pub fn new(stops: Vec<ColorStop>) -> crate::Result<Self> {
        if stops.len() < 2 {
            return Err(CoreError::InvalidColorMap {
                reason: format!("need at least 2 stops, got {}", stops.len()),
            });
        }
        if let Some(s) = stops.iter().find(|s| !s.x.is_finite()) {
            return Err(CoreError::InvalidColorMap {
                reason: format!("stop position must be finite, got {}", s.x),
            });
        }
        if let Some(pair) = stops.windows(2).find(|w| w[1].x <= w[0].x) {
            return Err(CoreError::InvalidColorMap {
                reason: format!(
                    "stop positions must strictly increase ({} then {})",
                    pair[0].x, pair[1].x
                ),
            });
        }
        Ok(Self { stops })
    }

    /// Build from `(position, color)` pairs.
    pub fn from_pairs(pairs: &[(f64, Color)]) -> crate::Result<Self> {
        Self::new(pairs.iter().map(|&(x, c)| ColorStop { x, c }).collect())
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    fn first(&self) -> &ColorStop {
        &self.stops[0]
    }

    fn last(&self) -> &ColorStop {
        &self.stops[self.stops.len() - 1]
    }

    /// Length of the weight domain, `last.x - first.x`. Always positive.
    pub fn period(&self) -> f64 {
        self.last().x - self.first().x
    }

    /// Clamped sampling: boundary colors outside the domain, linear
    /// interpolation between the bracketing stops inside it.
    pub fn sample(&self, x: f64) -> Color {
        let first = self.first();
        if x <= first.x {
            return first.c;
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if x <= hi.x {
                return lo.c.lerp(hi.c, (x - lo.x) / (hi.x - lo.x));
            }
        }
        self.last().c
    }

    /// Cyclic sampling: values past the last stop wrap back by whole periods
    /// into `(first.x, last.x]`, so unbounded weights produce repeating
    /// bands. Values below the first stop are clamped.
    pub fn sample_cyclic(&self, x: f64) -> Color {
        let last = self.last().x;
        if x > last {
            let period = self.period();
            let wraps = ((x - last) / period).ceil();
            return self.sample(x - wraps * period);
        }
        self.sample(x)
    }
}

impl TryFrom<Vec<ColorStop>> for ColorMap {
    type Error = CoreError;

    fn try_from(stops: Vec<ColorStop>) -> Result<Self, Self::Error> {
        Self::new(stops)
    }
}

impl From<ColorMap> for Vec<ColorStop> {
    fn from(map: ColorMap) -> Self {
        map.stops
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered set of named color maps. The first entry is the default.
#[derive(Debug, Clone)]
pub struct ColorMapRegistry {
    maps: Vec<(String, ColorMap)>,
}

impl ColorMapRegistry {
    /// Create a registry; fails when empty or when a name repeats.
    pub fn new(maps: Vec<(String, ColorMap)>) -> crate::Result<Self> {
        if maps.is_empty() {
            return Err(CoreError::InvalidColorMap {
                reason: "registry must contain at least one map".into(),
            });
        }
        for (i, (name, _)) in maps.iter().enumerate() {
            if maps[..i].iter().any(|(n, _)| n == name) {
                return Err(CoreError::InvalidColorMap {
                    reason: format!("duplicate map name {name:?}"),
                });
            }
        }
        Ok(Self { maps })
    }

    pub fn builtin() -> Self {
        Self {
            maps: vec![
                ("Black and white".to_string(), black_and_white()),
                ("Blue to green".to_string(), blue_to_green()),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&ColorMap> {
        self.maps.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(|(n, _)| n.as_str())
    }

    pub fn default_name(&self) -> &str {
        &self.maps[0].0
    }

    pub fn default_map(&self) -> &ColorMap {
        &self.maps[0].1
    }
}

impl Default for ColorMapRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn black_and_white() -> ColorMap {
    ColorMap {
        stops: vec![
            ColorStop { x: 0.0, c: Color::WHITE },
            ColorStop { x: 50.0, c: Color::LIGHT_GRAY },
            ColorStop { x: 500.0, c: Color::DARK_GRAY },
            ColorStop { x: 5000.0, c: Color::BLACK },
        ],
    }
}

fn blue_to_green() -> ColorMap {
    ColorMap {
        stops: vec![
            ColorStop { x: 0.0, c: Color::BLUE },
            ColorStop { x: 50.0, c: Color::YELLOW },
            ColorStop { x: 500.0, c: Color::RED },
            ColorStop { x: 5000.0, c: Color::CYAN },
        ],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
