use std::sync::Mutex;

use chrono::Datelike;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::types::{ValuationResult, VehicleDescriptor};
use crate::valuation::estimator;

enum RngSource {
    /// Fresh thread-local OS-seeded draws per call.
    Entropy,
    /// One shared generator; the lock is held for a single estimate only.
    Seeded(Mutex<StdRng>),
}

/// Entry point used by every request path. Owns the randomness source and reads the clock.
pub struct ValuationEngine {
    rng: RngSource,
}

impl ValuationEngine {
    pub fn from_entropy() -> Self {
        Self { rng: RngSource::Entropy }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: RngSource::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        match cfg.valuation_seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn is_seeded(&self) -> bool {
        matches!(self.rng, RngSource::Seeded(_))
    }

    pub fn value(&self, vehicle: &VehicleDescriptor) -> ValuationResult {
        self.value_at(vehicle, current_year())
    }

    pub fn value_at(&self, vehicle: &VehicleDescriptor, current_year: i32) -> ValuationResult {
        match &self.rng {
            RngSource::Entropy => estimator::estimate(vehicle, current_year, &mut rand::thread_rng()),
            RngSource::Seeded(rng) => {
                let mut rng = rng.lock().unwrap_or_else(|e| e.into_inner());
                estimator::estimate(vehicle, current_year, &mut *rng)
            }
        }
    }
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}
