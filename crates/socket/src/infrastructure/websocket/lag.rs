//! Ping/pong round-trip smoothing.

/// Samples above this are transport stalls, not lag.
pub const MAX_LAG_SAMPLE_MS: f64 = 10_000.0;

/// Pongs averaged plainly before switching to the decaying average.
const WARMUP_PONGS: u32 = 4;

const DECAY: f64 = 0.1;

/// Smoothed round-trip latency.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LagEstimate {
    average: f64,
    pong_count: u32,
}

impl LagEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one round-trip sample in and return the new average.
    pub fn record(&mut self, sample_ms: f64) -> f64 {
        let sample = sample_ms.clamp(0.0, MAX_LAG_SAMPLE_MS);
        self.pong_count += 1;
        let mix = if self.pong_count > WARMUP_PONGS {
            DECAY
        } else {
            1.0 / f64::from(self.pong_count)
        };
        self.average += mix * (sample - self.average);
        self.average
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn pong_count(&self) -> u32 {
        self.pong_count
    }

    /// Value reported to the server in lag pings: the average divided by ten.
    pub fn reported(&self) -> u64 {
        (self.average * 0.1).round() as u64
    }
}
