//! In-memory latency histogram for the estimator.
//! Records wall time of each valuation, from validated input to assembled report.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::error::{AppError, Result};

/// Upper tracking bound: 100 seconds.
const MAX_TRACKED_US: u64 = 100_000_000;

/// Shared latency stats. Handlers record, `/stats/latency` reads.
/// Values stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
    high_us: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencySnapshot {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub max_us: Option<u64>,
}

impl LatencyStats {
    /// Tracks 1us to 100s, 3 significant figures.
    pub fn new() -> Result<Self> {
        Self::with_bounds(MAX_TRACKED_US, 3)
    }

    pub fn with_bounds(high_us: u64, sigfig: u8) -> Result<Self> {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, high_us, sigfig)
            .map_err(|e| AppError::Config(format!("latency histogram: {e}")))?;
        Ok(Self {
            inner: Mutex::new(histogram),
            high_us,
        })
    }

    /// Out-of-range durations are clamped into the tracked window.
    pub fn record(&self, d: Duration) {
        let us = d.as_micros().clamp(1, u128::from(self.high_us)) as u64;
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us);
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let empty = LatencySnapshot {
            samples: 0,
            p50_us: None,
            p95_us: None,
            p99_us: None,
            max_us: None,
        };
        let Ok(h) = self.inner.lock() else {
            return empty;
        };
        if h.len() == 0 {
            return empty;
        }
        LatencySnapshot {
            samples: h.len(),
            p50_us: Some(h.value_at_quantile(0.5)),
            p95_us: Some(h.value_at_quantile(0.95)),
            p99_us: Some(h.value_at_quantile(0.99)),
            max_us: Some(h.max()),
        }
    }
}
