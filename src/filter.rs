//! Exponential smoothing of echo durations.

use crate::config::DEFAULT_SMOOTHING;

/// Exponentially weighted moving average over echo durations.
///
/// The first sample seeds the output directly; every later sample is blended
/// in as `alpha * sample + (1 - alpha) * output`. Before the first sample the
/// output reads `0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoFilter {
    alpha: f64,
    output: f64,
    primed: bool,
}

impl EchoFilter {
    /// Filter with the default smoothing factor, usable in `const` context.
    pub(crate) const DEFAULT: Self = Self {
        alpha: DEFAULT_SMOOTHING,
        output: 0.0,
        primed: false,
    };

    /// Create a filter giving `alpha` weight to each new sample.
    /// `alpha` is clamped into (0, 1].
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_nan() {
            DEFAULT_SMOOTHING
        } else {
            alpha.clamp(f64::MIN_POSITIVE, 1.0)
        };
        Self {
            alpha,
            output: 0.0,
            primed: false,
        }
    }

    pub fn filter(&mut self, sample: f64) -> f64 {
        if !self.primed {
            self.output = sample;
            self.primed = true;
        } else {
            self.output = self.alpha * sample + (1.0 - self.alpha) * self.output;
        }
        self.output
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Whether at least one sample went through the filter.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn reset(&mut self) {
        self.output = 0.0;
        self.primed = false;
    }
}

impl Default for EchoFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}
