use crate::error::{AppError, Result};

/// Default page size for admin listings.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Upper bound on any listing `limit` query param.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Minimum length for a VIN to be treated as present. No checksum is applied.
pub const VIN_MIN_LEN: usize = 17;

/// Oldest manufacturing year accepted by request validation.
pub const MIN_VEHICLE_YEAR: i32 = 1900;

/// Pricing constants for the estimator.
pub mod pricing {
    /// Depreciation per year of age.
    pub const AGE_DECAY_PER_YEAR: f64 = 0.05;
    /// Kilometres at which the mileage factor reaches its floor.
    pub const MILEAGE_DECAY_KM: f64 = 300_000.0;
    /// Both decay factors stop at half the base price.
    pub const DECAY_FLOOR: f64 = 0.5;

    pub const JITTER_MIN: f64 = 0.90;
    pub const JITTER_SPAN: f64 = 0.20;

    pub const VIN_PRICE_FACTOR: f64 = 1.03;

    pub const RANGE_LOW: f64 = 0.85;
    pub const RANGE_HIGH: f64 = 1.15;

    /// Cars younger than this are classified as declining.
    pub const NEW_CAR_MAX_AGE: i32 = 3;
}

/// Confidence score constants.
pub mod confidence {
    pub const BASE: f64 = 0.90;
    pub const PER_YEAR: f64 = 0.01;
    pub const MILEAGE_DIVISOR: f64 = 500_000.0;
    pub const VIN_BONUS: f64 = 0.08;
    pub const MIN: f64 = 0.60;
    pub const MAX: f64 = 0.95;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Fixed RNG seed for reproducible valuations (VALUATION_SEED). Unset = OS entropy.
    pub valuation_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let valuation_seed = match std::env::var("VALUATION_SEED") {
            Ok(s) if !s.trim().is_empty() => Some(s.trim().parse::<u64>().map_err(|_| {
                AppError::Config("VALUATION_SEED must be an unsigned integer".to_string())
            })?),
            _ => None,
        };

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "valuations.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            valuation_seed,
        })
    }
}
