use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::Vector;

/// Squared escape radius used everywhere: `|z|² ≥ 4` means `|z| ≥ 2`,
/// past which the orbit of `z ← z² + c` provably diverges.
pub const DIVERGENCE_LIMIT: f64 = 4.0;

/// The outcome of evaluating one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightedResult {
    /// The orbit stayed bounded for the whole iteration budget.
    Member,

    /// The orbit crossed the divergence limit on the zero-based iteration
    /// `iterations`. That index is the escape weight used for coloring.
    Escaped { iterations: u32 },
}

impl WeightedResult {
    /// `true` when the point is (assumed) inside the set.
    #[inline]
    pub fn is_member(&self) -> bool {
        matches!(self, Self::Member)
    }

    /// Ramp input: the escape iteration, or NaN for members.
    #[inline]
    pub fn weight(&self) -> f64 {
        match self {
            Self::Member => f64::NAN,
            Self::Escaped { iterations } => *iterations as f64,
        }
    }
}

/// Parameters controlling evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscapeParams {
    /// Iterations to try before declaring a point a member. Always `>= 1`.
    pub iteration_budget: u32,

    /// Squared-modulus threshold.
    pub divergence_limit: f64,
}

impl EscapeParams {
    pub const DEFAULT_ITERATION_BUDGET: u32 = 100;

    pub fn new(iteration_budget: u32) -> crate::Result<Self> {
        if iteration_budget < 1 {
            return Err(CoreError::InvalidIterationBudget(iteration_budget));
        }
        Ok(Self {
            iteration_budget,
            divergence_limit: DIVERGENCE_LIMIT,
        })
    }

    /// Check a value that did not come through [`EscapeParams::new`], such as
    /// one deserialized from disk.
    pub fn validate(&self) -> crate::Result<()> {
        if self.iteration_budget < 1 {
            return Err(CoreError::InvalidIterationBudget(self.iteration_budget));
        }
        if !(self.divergence_limit.is_finite() && self.divergence_limit > 0.0) {
            return Err(CoreError::InvalidDivergenceLimit(self.divergence_limit));
        }
        Ok(())
    }

    #[inline]
    pub fn evaluate(&self, c: Vector) -> WeightedResult {
        evaluate(c, self.iteration_budget, self.divergence_limit)
    }
}

impl Default for EscapeParams {
    fn default() -> Self {
        Self {
            iteration_budget: Self::DEFAULT_ITERATION_BUDGET,
            divergence_limit: DIVERGENCE_LIMIT,
        }
    }
}

/// Returns `true` if `c` lies inside the main cardioid.
#[inline]
fn in_cardioid(c: Vector) -> bool {
    let y2 = c.y * c.y;
    let q = (c.x - 0.25) * (c.x - 0.25) + y2;
    q * (q + (c.x - 0.25)) <= 0.25 * y2
}

/// Returns `true` if `c` lies inside the period-2 bulb.
#[inline]
fn in_period2_bulb(c: Vector) -> bool {
    (c.x + 1.0) * (c.x + 1.0) + c.y * c.y <= 0.0625
}

/// Iterate `z ← z² + c` from `z = 0` until `|z|² ≥ divergence_limit` or the
/// budget runs out.
///
/// This is the hot loop of the whole renderer: it runs once per pixel block
/// per pass and never allocates.
#[inline]
pub fn evaluate(c: Vector, iteration_budget: u32, divergence_limit: f64) -> WeightedResult {
    // Closed-form interior tests. Orbits starting there never diverge, so
    // only apply them while the limit is the standard one.
    if divergence_limit >= DIVERGENCE_LIMIT && (in_cardioid(c) || in_period2_bulb(c)) {
        return WeightedResult::Member;
    }

    let mut z = Vector::ZERO;
    for i in 0..iteration_budget {
        z = z.square() + c;
        if z.norm_sq() >= divergence_limit {
            return WeightedResult::Escaped { iterations: i };
        }
    }
    WeightedResult::Member
}
