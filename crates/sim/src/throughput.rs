//! Smoothed updates-per-second meter.

use std::time::Duration;
use tracing::warn;

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateRate {
    decay: f64,
    per_sec: f64,
}

impl UpdateRate {
    /// `decay` in `[0, 1)` weights the previous estimate; 0 reports the last
    /// tick's instantaneous rate.
    #[must_use]
    pub fn new(decay: f64) -> Self {
        let clamped = if decay.is_finite() {
            decay.clamp(0.0, 0.999)
        } else {
            0.0
        };
        if (clamped - decay).abs() > f64::EPSILON || !decay.is_finite() {
            warn!("fps decay {decay} outside [0, 1); using {clamped}");
        }
        Self {
            decay: clamped,
            per_sec: 0.0,
        }
    }

    #[must_use]
    pub fn per_sec(&self) -> f64 {
        self.per_sec
    }

    #[must_use]
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Folds in `steps` updates performed over `elapsed`. Returns the new
    /// estimate, or `None` when the instantaneous rate is not finite (for
    /// example a zero elapsed time) and the estimate was left alone.
    pub fn record(&mut self, steps: u32, elapsed: Duration) -> Option<f64> {
        let instant = f64::from(steps) / elapsed.as_secs_f64();
        if !instant.is_finite() {
            return None;
        }
        self.per_sec = self.decay * self.per_sec + (1.0 - self.decay) * instant;
        Some(self.per_sec)
    }

    pub fn reset(&mut self) {
        self.per_sec = 0.0;
    }
}
