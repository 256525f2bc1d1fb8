use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::shared::constants::{THRESHOLD_MAX, THRESHOLD_MIN};

/// Live-adjustable proximity threshold shared across lanes.
///
/// Clones share one value: the presentation lane writes, the worker lane
/// reads on every evaluation. Stored as the `f64` bit pattern in an atomic.
#[derive(Clone, Debug)]
pub struct Threshold {
    bits: Arc<AtomicU64>,
}

impl Threshold {
    pub fn new(value: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(value.to_bits())),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Stores `value` clamped to `[THRESHOLD_MIN, THRESHOLD_MAX]` and returns
    /// what was stored. NaN is ignored and the current value kept.
    pub fn set_clamped(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.get();
        }
        let clamped = value.clamp(THRESHOLD_MIN, THRESHOLD_MAX);
        self.set(clamped);
        clamped
    }
}
