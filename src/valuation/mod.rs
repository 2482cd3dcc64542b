pub mod engine;
pub mod estimator;
pub mod report;
pub mod validation;

pub use engine::ValuationEngine;
