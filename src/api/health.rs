//! Shared health state for the /health endpoint.
//! Updated by the valuation handlers, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime counters. Not persisted across restarts.
#[derive(Default)]
pub struct HealthState {
    /// Valuations computed since start, quick and persisted flows combined.
    pub valuations_served: AtomicU64,
    /// Millisecond timestamp of the last valuation (0 = none).
    pub last_valuation_at_ms: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_valuation(&self, at_ms: u64) {
        self.valuations_served.fetch_add(1, Ordering::Relaxed);
        self.last_valuation_at_ms.store(at_ms, Ordering::Relaxed);
    }

    pub fn valuations_served(&self) -> u64 {
        self.valuations_served.load(Ordering::Relaxed)
    }

    /// `None` until the first valuation.
    pub fn last_valuation_at_ms(&self) -> Option<u64> {
        match self.last_valuation_at_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }
}
