//! Humidity waste (merma) tests
//!
//! Step-function lookup over the waste bands and weight arithmetic

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{waste_percent_for, FactorCalculator, RuleBook};
use std::str::FromStr;
use std::sync::Arc;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn calculator() -> FactorCalculator {
    FactorCalculator::new(Arc::new(RuleBook::standard()))
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn soybean_band_lookup() {
        let waste = calculator().humidity_waste("SOYBEAN", dec("15.0"), dec("30000"));
        assert_eq!(waste.waste_percent, dec("2.25"));
        assert_eq!(waste.waste_kg, dec("675.00"));
        assert_eq!(waste.net_quantity_kg, dec("29325.00"));
        assert_eq!(waste.base_humidity, dec("13.5"));
        assert!(waste.requires_drying);
    }

    #[test]
    fn between_bands_uses_lower_band() {
        // 14.2 sits between the 14.0 and 14.5 bands
        let waste = calculator().humidity_waste("SOYBEAN", dec("14.2"), dec("1000"));
        assert_eq!(waste.waste_percent, dec("1.15"));
        assert_eq!(waste.waste_kg, dec("11.50"));
    }

    #[test]
    fn at_base_humidity_no_drying() {
        let waste = calculator().humidity_waste("SOYBEAN", dec("13.5"), dec("1000"));
        assert_eq!(waste.waste_percent, Decimal::ZERO);
        assert!(!waste.requires_drying);
    }

    #[test]
    fn above_base_below_first_band_requires_drying_without_waste() {
        let waste = calculator().humidity_waste("SOYBEAN", dec("13.55"), dec("1000"));
        assert_eq!(waste.waste_percent, Decimal::ZERO);
        assert_eq!(waste.waste_kg, Decimal::ZERO);
        assert!(waste.requires_drying);
    }

    #[test]
    fn above_every_band_uses_highest() {
        let waste = calculator().humidity_waste("CORN", dec("25.0"), dec("1000"));
        assert_eq!(waste.waste_percent, dec("6.60"));
        assert_eq!(waste.waste_kg, dec("66.00"));
    }

    #[test]
    fn waste_kg_rounds_half_up() {
        // 333 x 1.15% = 3.8295
        let waste = calculator().humidity_waste("SOYBEAN", dec("14.0"), dec("333"));
        assert_eq!(waste.waste_kg, dec("3.83"));
        assert_eq!(waste.net_quantity_kg, dec("329.17"));
    }

    #[test]
    fn empty_table_yields_zero() {
        assert_eq!(waste_percent_for(&[], dec("30")), Decimal::ZERO);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    fn grain_strategy() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("WHEAT"),
            Just("CORN"),
            Just("SOYBEAN"),
            Just("SORGHUM"),
            Just("SUNFLOWER"),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Net plus waste always equals gross
        #[test]
        fn prop_waste_balances(
            grain in grain_strategy(),
            humidity in (0i64..=300i64).prop_map(|n| Decimal::new(n, 1)),
            gross in (0i64..=10_000_000i64).prop_map(|n| Decimal::new(n, 2))
        ) {
            let waste = calculator().humidity_waste(grain, humidity, gross);
            prop_assert_eq!(waste.net_quantity_kg + waste.waste_kg, gross);
            prop_assert!(waste.waste_kg >= Decimal::ZERO);
            prop_assert!(waste.waste_kg <= gross);
        }

        /// Wetter grain never loses less weight
        #[test]
        fn prop_waste_is_monotonic(
            grain in grain_strategy(),
            low in (0i64..=300i64).prop_map(|n| Decimal::new(n, 1)),
            step in (0i64..=50i64).prop_map(|n| Decimal::new(n, 1))
        ) {
            let dry = calculator().humidity_waste(grain, low, dec("1000"));
            let wet = calculator().humidity_waste(grain, low + step, dec("1000"));
            prop_assert!(wet.waste_percent >= dry.waste_percent);
        }

        /// Drying is required exactly when humidity is above base
        #[test]
        fn prop_requires_drying_iff_above_base(
            grain in grain_strategy(),
            humidity in (0i64..=300i64).prop_map(|n| Decimal::new(n, 1))
        ) {
            let waste = calculator().humidity_waste(grain, humidity, dec("1000"));
            prop_assert_eq!(waste.requires_drying, humidity > waste.base_humidity);
        }
    }
}
