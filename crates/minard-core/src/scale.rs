//! Value → visual scales: survivor count → stroke width, temperature →
//! vertical position in the band under the map.

use serde::{Deserialize, Serialize};

/// Stroke width range in points.
pub const MIN_LINEWIDTH: f64 = 0.5;
pub const MAX_LINEWIDTH: f64 = 12.0;

/// Square-root width scale: stroke *area* tracks survivor count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinewidthScale {
    pub min_width: f64,
    pub max_width: f64,
    /// Largest survivor count in the dataset.
    pub max_survivors: f64,
}

impl LinewidthScale {
    pub fn new(min_width: f64, max_width: f64, max_survivors: f64) -> Self {
        Self { min_width, max_width, max_survivors }
    }

    /// Scale with the default range and the maximum of `survivors`
    /// (missing values ignored).
    pub fn from_survivors(survivors: impl IntoIterator<Item = f64>) -> Self {
        let max = survivors
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(f64::NAN, f64::max);
        Self::new(MIN_LINEWIDTH, MAX_LINEWIDTH, max)
    }

    /// Width for a survivor count. The ratio to the maximum is clamped to
    /// [0, 1]; a missing count gives `NaN`; a non-positive or missing
    /// maximum gives the minimum width.
    pub fn width(&self, survivors: f64) -> f64 {
        if survivors.is_nan() {
            return f64::NAN;
        }
        if !(self.max_survivors > 0.0) {
            return self.min_width;
        }
        let ratio = (survivors / self.max_survivors).clamp(0.0, 1.0);
        self.min_width + (self.max_width - self.min_width) * ratio.sqrt()
    }

    /// Width of the segment between two route points: the width of their
    /// mean survivor count.
    pub fn segment_width(&self, a: f64, b: f64) -> f64 {
        self.width((a + b) / 2.0)
    }
}

/// Vertical offset of the band base below the lowest route latitude.
pub const BAND_OFFSET: f64 = 2.3;
/// Height of the band in latitude units.
pub const BAND_SPAN: f64 = 1.4;

/// Affine map of the temperature range onto `[base, base + span]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBand {
    pub base: f64,
    pub span: f64,
    pub t_min: f64,
    pub t_max: f64,
}

impl TemperatureBand {
    pub fn new(base: f64, span: f64, t_min: f64, t_max: f64) -> Self {
        Self { base, span, t_min, t_max }
    }

    /// Band whose base sits `offset` below `min_latitude`, covering the
    /// finite values of `temperatures`.
    pub fn below(
        min_latitude: f64,
        offset: f64,
        span: f64,
        temperatures: impl IntoIterator<Item = f64>,
    ) -> Self {
        let (t_min, t_max) = temperatures
            .into_iter()
            .filter(|t| t.is_finite())
            .fold((f64::NAN, f64::NAN), |(lo, hi), t| (lo.min(t), hi.max(t)));
        Self::new(min_latitude - offset, span, t_min, t_max)
    }

    /// True when the range has no extent (all values equal, or none).
    pub fn is_degenerate(&self) -> bool {
        !(self.t_max - self.t_min > 0.0)
    }

    pub fn midpoint(&self) -> f64 {
        self.base + self.span / 2.0
    }

    /// Vertical position of a temperature. A degenerate range maps every
    /// value to the band midpoint.
    pub fn to_y(&self, t: f64) -> f64 {
        if self.is_degenerate() {
            return if t.is_nan() { f64::NAN } else { self.midpoint() };
        }
        self.base + (t - self.t_min) / (self.t_max - self.t_min) * self.span
    }

    /// Inverse of [`to_y`](Self::to_y). A degenerate range inverts to `t_min`.
    pub fn invert(&self, y: f64) -> f64 {
        if self.is_degenerate() {
            return self.t_min;
        }
        self.t_min + (y - self.base) / self.span * (self.t_max - self.t_min)
    }
}
