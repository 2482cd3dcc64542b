use rand::Rng;

use crate::config::{confidence, pricing};
use crate::types::{Condition, MarketTrend, PriceRange, ValuationResult, VehicleDescriptor};
use crate::valuation::report;

/// Base price per lower-cased make, in euros.
const BASE_PRICES: &[(&str, u32)] = &[
    ("audi", 15_000),
    ("bmw", 17_000),
    ("mercedes", 18_000),
    ("volkswagen", 12_000),
    ("toyota", 13_000),
];

/// Price bucket for any make not listed in `BASE_PRICES`.
const OTHER_BASE_PRICE: u32 = 10_000;

/// Makes that hold their value on the local market once past the new-car window.
const RISING_MAKES: &[&str] = &["toyota", "volkswagen"];

pub fn base_price(make: &str) -> u32 {
    let key = make.to_lowercase();
    BASE_PRICES
        .iter()
        .find(|(m, _)| *m == key)
        .map_or(OTHER_BASE_PRICE, |&(_, price)| price)
}

pub fn condition_multiplier(condition: Condition) -> f64 {
    match condition {
        Condition::Excellent => 1.20,
        Condition::VeryGood => 1.10,
        Condition::Good => 1.00,
        Condition::Fair => 0.85,
        Condition::Poor => 0.70,
    }
}

/// Whole years since manufacture. Next model-year cars count as new (age 0).
pub fn vehicle_age(year: i32, current_year: i32) -> i32 {
    (current_year - year).max(0)
}

/// Linear 5%/year depreciation, floored at 50%, never above 1.0.
pub fn age_factor(age: i32) -> f64 {
    (1.0 - f64::from(age.max(0)) * pricing::AGE_DECAY_PER_YEAR).max(pricing::DECAY_FLOOR)
}

/// Linear decay reaching the 50% floor at 300,000 km.
pub fn mileage_factor(mileage: u32) -> f64 {
    (1.0 - f64::from(mileage) / pricing::MILEAGE_DECAY_KM).max(pricing::DECAY_FLOOR)
}

/// Pre-jitter estimate. Fully deterministic for a given vehicle and year.
pub fn base_estimate(vehicle: &VehicleDescriptor, current_year: i32) -> i64 {
    let age = vehicle_age(vehicle.year, current_year);
    let value = f64::from(base_price(&vehicle.make))
        * age_factor(age)
        * mileage_factor(vehicle.mileage)
        * condition_multiplier(vehicle.condition);
    value.round() as i64
}

/// First matching rule wins: young cars decline, a few makes rise, the rest are stable.
pub fn market_trend(make: &str, age: i32) -> MarketTrend {
    if age < pricing::NEW_CAR_MAX_AGE {
        return MarketTrend::Declining;
    }
    let key = make.to_lowercase();
    if RISING_MAKES.contains(&key.as_str()) {
        MarketTrend::Rising
    } else {
        MarketTrend::Stable
    }
}

/// Clamped but unrounded confidence.
pub fn confidence_score(age: i32, mileage: u32, has_vin: bool) -> f64 {
    let vin_bonus = if has_vin { confidence::VIN_BONUS } else { 0.0 };
    let raw = confidence::BASE
        - f64::from(age.max(0)) * confidence::PER_YEAR
        - f64::from(mileage) / confidence::MILEAGE_DIVISOR
        + vin_bonus;
    raw.clamp(confidence::MIN, confidence::MAX)
}

/// Fixed ±15% band around the final value.
pub fn price_range(value: i64) -> PriceRange {
    PriceRange {
        min: (value as f64 * pricing::RANGE_LOW).round() as i64,
        max: (value as f64 * pricing::RANGE_HIGH).round() as i64,
    }
}

/// Uniform multiplier in [0.90, 1.10).
pub fn jitter<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    pricing::JITTER_MIN + rng.gen::<f64>() * pricing::JITTER_SPAN
}

/// Price a vehicle. Randomness comes only from `rng`: the price jitter, then the demand rating.
pub fn estimate<R: Rng + ?Sized>(
    vehicle: &VehicleDescriptor,
    current_year: i32,
    rng: &mut R,
) -> ValuationResult {
    let age = vehicle_age(vehicle.year, current_year);
    let has_vin = vehicle.has_usable_vin();

    let base = base_estimate(vehicle, current_year);
    let trend = market_trend(&vehicle.make, age);
    let confidence = round2(confidence_score(age, vehicle.mileage, has_vin));

    let vin_factor = if has_vin { pricing::VIN_PRICE_FACTOR } else { 1.0 };
    let estimated_value = (base as f64 * jitter(rng) * vin_factor).round() as i64;

    let report_data = report::assemble(vehicle, estimated_value, confidence, trend, rng);

    ValuationResult {
        estimated_value,
        confidence,
        market_trend: trend,
        report_data,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const YEAR: i32 = 2025;

    fn vehicle(make: &str, year: i32, mileage: u32, condition: Condition) -> VehicleDescriptor {
        VehicleDescriptor {
            make: make.to_string(),
            model: "Model".to_string(),
            year,
            mileage,
            condition,
            vin: None,
        }
    }

    fn with_vin(mut v: VehicleDescriptor) -> VehicleDescriptor {
        v.vin = Some("WAUZZZ8K7JA123456".to_string());
        v
    }

    #[test]
    fn base_price_is_case_insensitive_with_fallback() {
        assert_eq!(base_price("Audi"), 15_000);
        assert_eq!(base_price("BMW"), 17_000);
        assert_eq!(base_price("mercedes"), 18_000);
        assert_eq!(base_price("VolksWagen"), 12_000);
        assert_eq!(base_price("toyota"), 13_000);
        assert_eq!(base_price("Lada"), 10_000);
        assert_eq!(base_price(""), 10_000);
    }

    #[test]
    fn decay_factors_hit_their_floor() {
        assert!((age_factor(0) - 1.0).abs() < 1e-12);
        assert!((age_factor(4) - 0.8).abs() < 1e-12);
        assert!((age_factor(10) - 0.5).abs() < 1e-12);
        assert!((age_factor(40) - 0.5).abs() < 1e-12);

        assert!((mileage_factor(0) - 1.0).abs() < 1e-12);
        assert!((mileage_factor(150_000) - 0.5).abs() < 1e-12);
        assert!((mileage_factor(300_000) - 0.5).abs() < 1e-12);
        assert!((mileage_factor(900_000) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn next_model_year_is_priced_as_new() {
        assert_eq!(vehicle_age(YEAR + 1, YEAR), 0);
        assert!((age_factor(-1) - 1.0).abs() < 1e-12);
        assert!((confidence_score(-1, 0, false) - confidence_score(0, 0, false)).abs() < 1e-12);

        for make in ["audi", "bmw", "mercedes", "volkswagen", "toyota", "other"] {
            let v = vehicle(make, YEAR + 1, 0, Condition::Good);
            assert!(
                base_estimate(&v, YEAR) <= i64::from(base_price(make)),
                "make={make}"
            );
        }
        let v = vehicle("audi", YEAR + 1, 0, Condition::Good);
        assert_eq!(base_estimate(&v, YEAR), 15_000);

        let r = estimate(&v, YEAR, &mut StdRng::seed_from_u64(4));
        assert_eq!(r.market_trend, MarketTrend::Declining);
        assert!(r.confidence <= 0.95);
    }

    #[test]
    fn base_estimate_matches_formula() {
        // 17000 * 0.8 (age 4) * 0.75 (75k km) * 1.1 = 11220
        let v = vehicle("bmw", YEAR - 4, 75_000, Condition::VeryGood);
        assert_eq!(base_estimate(&v, YEAR), 11_220);

        // Unknown make, floors on both factors, poor: 10000 * 0.5 * 0.5 * 0.7 = 1750
        let v = vehicle("Dacia", YEAR - 30, 500_000, Condition::Poor);
        assert_eq!(base_estimate(&v, YEAR), 1_750);
    }

    #[test]
    fn trend_rules_in_priority_order() {
        assert_eq!(market_trend("toyota", 1), MarketTrend::Declining);
        assert_eq!(market_trend("audi", 1), MarketTrend::Declining);
        assert_eq!(market_trend("Toyota", 5), MarketTrend::Rising);
        assert_eq!(market_trend("volkswagen", 3), MarketTrend::Rising);
        assert_eq!(market_trend("audi", 5), MarketTrend::Stable);
        assert_eq!(market_trend("other", 12), MarketTrend::Stable);
    }

    #[test]
    fn estimate_reports_trend_from_year() {
        let mut rng = StdRng::seed_from_u64(7);
        let r = estimate(&vehicle("toyota", YEAR - 1, 10_000, Condition::Good), YEAR, &mut rng);
        assert_eq!(r.market_trend, MarketTrend::Declining);
        let r = estimate(&vehicle("toyota", YEAR - 5, 10_000, Condition::Good), YEAR, &mut rng);
        assert_eq!(r.market_trend, MarketTrend::Rising);
        let r = estimate(&vehicle("audi", YEAR - 5, 10_000, Condition::Good), YEAR, &mut rng);
        assert_eq!(r.market_trend, MarketTrend::Stable);
    }

    #[test]
    fn confidence_stays_in_bounds() {
        for age in [0, 1, 5, 20, 100] {
            for mileage in [0, 50_000, 300_000, 2_000_000] {
                for has_vin in [false, true] {
                    let c = confidence_score(age, mileage, has_vin);
                    assert!((0.60..=0.95).contains(&c), "age={age} mileage={mileage} c={c}");
                }
            }
        }
        assert!((confidence_score(100, 2_000_000, false) - 0.60).abs() < 1e-12);
        assert!((confidence_score(0, 0, true) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn vin_adds_eight_points_of_confidence() {
        let without = confidence_score(5, 50_000, false);
        let with = confidence_score(5, 50_000, true);
        assert!((with - without - 0.08).abs() < 1e-9, "with={with} without={without}");

        let mut rng = StdRng::seed_from_u64(1);
        let plain = estimate(&vehicle("audi", YEAR - 5, 50_000, Condition::Good), YEAR, &mut rng);
        let mut rng = StdRng::seed_from_u64(1);
        let vin = estimate(
            &with_vin(vehicle("audi", YEAR - 5, 50_000, Condition::Good)),
            YEAR,
            &mut rng,
        );
        assert!((plain.confidence - 0.75).abs() < 1e-9);
        assert!((vin.confidence - 0.83).abs() < 1e-9);
    }

    #[test]
    fn vin_applies_price_bonus_after_jitter() {
        let v = vehicle("mercedes", YEAR - 6, 120_000, Condition::Good);
        let base = base_estimate(&v, YEAR) as f64;

        let mut rng = StdRng::seed_from_u64(99);
        let j = jitter(&mut rng);

        let mut rng = StdRng::seed_from_u64(99);
        let r = estimate(&with_vin(v), YEAR, &mut rng);
        assert_eq!(r.estimated_value, (base * j * 1.03).round() as i64);
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            let j = jitter(&mut rng);
            assert!((0.90..1.10).contains(&j), "j={j}");
        }
    }

    #[test]
    fn price_range_brackets_estimate() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let r = estimate(&vehicle("bmw", YEAR - 8, 140_000, Condition::Fair), YEAR, &mut rng);
            let range = r.report_data.price_range;
            assert!(range.min <= r.estimated_value && r.estimated_value <= range.max);
            assert_eq!(range, price_range(r.estimated_value));
        }
    }

    #[test]
    fn value_never_rises_with_mileage_or_age() {
        let mileages = [0, 25_000, 100_000, 150_000, 200_000, 400_000];
        let mut last = i64::MAX;
        for mileage in mileages {
            let mut rng = StdRng::seed_from_u64(42);
            let r = estimate(&vehicle("audi", YEAR - 4, mileage, Condition::Good), YEAR, &mut rng);
            assert!(r.estimated_value <= last, "mileage={mileage}");
            last = r.estimated_value;
        }

        let mut last = i64::MAX;
        for age in 0..20 {
            let mut rng = StdRng::seed_from_u64(42);
            let r = estimate(&vehicle("audi", YEAR - age, 60_000, Condition::Good), YEAR, &mut rng);
            assert!(r.estimated_value <= last, "age={age}");
            last = r.estimated_value;
        }
    }

    #[test]
    fn better_condition_prices_higher() {
        let values: Vec<i64> = Condition::ALL
            .into_iter()
            .map(|c| base_estimate(&vehicle("audi", YEAR - 5, 50_000, c), YEAR))
            .collect();
        for pair in values.windows(2) {
            assert!(pair[0] > pair[1], "{values:?}");
        }
    }

    #[test]
    fn report_mirrors_headline_figures() {
        let mut rng = StdRng::seed_from_u64(11);
        let r = estimate(&vehicle("volkswagen", YEAR - 7, 90_000, Condition::Excellent), YEAR, &mut rng);
        assert_eq!(r.report_data.estimated_value, r.estimated_value);
        assert_eq!(r.report_data.market_trend, r.market_trend);
        assert!((r.report_data.confidence - r.confidence).abs() < 1e-12);
        assert_eq!(r.report_data.comparable_listings.len(), 3);
    }

    #[test]
    fn seeded_estimates_are_reproducible() {
        let v = vehicle("bmw", YEAR - 3, 60_000, Condition::Good);
        let a = estimate(&v, YEAR, &mut StdRng::seed_from_u64(5));
        let b = estimate(&v, YEAR, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
