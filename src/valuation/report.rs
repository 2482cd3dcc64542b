//! Human-readable report attached to every valuation: summary sentence,
//! synthetic comparable listings, demand rating and static market insights.

use rand::Rng;

use crate::types::{ComparableListing, MarketTrend, ReportData, VehicleDescriptor};
use crate::valuation::estimator::price_range;

/// Listing sites used as labels for the synthetic comparables, in output order.
pub const COMPARABLE_SOURCES: [&str; 3] = ["mobile.bg", "cars.bg", "Facebook Marketplace"];

pub const MARKET_INSIGHTS: [&str; 4] = [
    "Bulgarian buyers typically prioritize fuel efficiency and lower maintenance costs.",
    "Diesel engines remain popular in the Bulgarian market despite European trends.",
    "Models with good parts availability and service network command premium prices.",
    "Cars with service history from authorized dealers tend to sell faster.",
];

/// How each comparable listing deviates from the valued vehicle.
struct Perturbation {
    year: i32,
    mileage: i64,
    price: i64,
}

const PERTURBATIONS: [Perturbation; 3] = [
    Perturbation { year: -1, mileage: -15_000, price: 2_000 },
    Perturbation { year: 0, mileage: 20_000, price: -1_500 },
    Perturbation { year: 1, mileage: -30_000, price: 4_000 },
];

pub fn assemble<R: Rng + ?Sized>(
    vehicle: &VehicleDescriptor,
    estimated_value: i64,
    confidence: f64,
    market_trend: MarketTrend,
    rng: &mut R,
) -> ReportData {
    let range = price_range(estimated_value);
    ReportData {
        estimated_value,
        price_range: range,
        confidence,
        market_trend,
        analysis: analysis(vehicle, estimated_value, range.min, range.max),
        comparable_listings: comparable_listings(vehicle, estimated_value),
        market_demand: market_demand(rng),
        insights: MARKET_INSIGHTS.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn analysis(vehicle: &VehicleDescriptor, value: i64, min: i64, max: i64) -> String {
    format!(
        "This {} {} {} with {}km in {} condition is valued at approximately €{value}. \
         The value could range between €{min} and €{max} depending on specific factors \
         like exact trim level, service history, and local market conditions.",
        vehicle.year, vehicle.make, vehicle.model, vehicle.mileage, vehicle.condition,
    )
}

/// Exactly three listings. Perturbed mileage and price saturate at zero.
pub fn comparable_listings(vehicle: &VehicleDescriptor, value: i64) -> Vec<ComparableListing> {
    PERTURBATIONS
        .iter()
        .zip(COMPARABLE_SOURCES)
        .map(|(p, source)| {
            let mileage = (i64::from(vehicle.mileage) + p.mileage).max(0);
            ComparableListing {
                year: vehicle.year + p.year,
                make: vehicle.make.clone(),
                model: vehicle.model.clone(),
                mileage: u32::try_from(mileage).unwrap_or(u32::MAX),
                price: (value + p.price).max(0),
                source: source.to_string(),
            }
        })
        .collect()
}

/// Uniform integer rating in 5..=9.
pub fn market_demand<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(5..=9)
}
