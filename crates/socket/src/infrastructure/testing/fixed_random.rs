//! Fixed random provider for deterministic testing.
//!
//! Returns values from a provided sequence, cycling if needed.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ports::outbound::RandomProvider;

#[derive(Debug)]
pub struct FixedRandom {
    values: Vec<f64>,
    index: AtomicUsize,
}

impl FixedRandom {
    /// Values are clamped into `[0, 1)`. An empty sequence always yields 0.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|v| v.clamp(0.0, 0.999_999))
                .collect(),
            index: AtomicUsize::new(0),
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomProvider for FixedRandom {
    fn random_f64(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let idx = self.index.fetch_add(1, Ordering::SeqCst);
        self.values[idx % self.values.len()]
    }
}
