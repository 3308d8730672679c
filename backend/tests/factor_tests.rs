//! Factor calculator tests
//!
//! Worked settlement examples plus properties that must hold for every
//! analysis: factor range, clamping, determinism and audit trail shape.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    FactorCalculator, Grade, Measurements, QualityAnalysis, RuleBook, Severity, WarningCode,
};
use std::str::FromStr;
use std::sync::Arc;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn calculator() -> FactorCalculator {
    FactorCalculator::new(Arc::new(RuleBook::standard()))
}

fn analysis(measurements: Measurements) -> QualityAnalysis {
    QualityAnalysis::unattached(measurements)
}

// ============================================================================
// Worked examples
// ============================================================================

#[cfg(test)]
mod worked_examples {
    use super::*;

    #[test]
    fn soybean_wet_and_damaged_lot() {
        // 100 - 2.25 (humidity) - 1.00 (damaged) - 0.50 (foreign matter)
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("15.0")),
                damaged_grains: Some(dec("6.0")),
                foreign_matter: Some(dec("1.5")),
                ..Default::default()
            }),
            "SOYBEAN",
            Some(dec("30000")),
        );

        assert_eq!(result.final_factor, dec("96.25"));
        assert_eq!(result.humidity_factor_discount, dec("2.25"));
        assert_eq!(result.total_discount, dec("1.50"));
        assert_eq!(result.total_bonus, Decimal::ZERO);
        assert_eq!(result.humidity_waste.waste_percent, dec("2.25"));
        assert_eq!(result.humidity_waste.waste_kg, dec("675"));
        assert_eq!(result.humidity_waste.net_quantity_kg, dec("29325"));
        assert!(result.humidity_waste.requires_drying);
        assert!(result.out_of_tolerance);
        assert!(!result.out_of_standard);
        // Soybean tables carry no grade limits
        assert_eq!(result.grade, None);
        assert_eq!(result.discounts.len(), 2);
        assert!(!result.has_critical_warnings());
        assert_eq!(result.price_adjustment.percent, dec("-3.75"));
        assert_eq!(
            result.price_adjustment.adjusted_quantity_kg,
            Some(dec("28875"))
        );
    }

    #[test]
    fn discounts_are_itemized_in_table_order() {
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("13.0")),
                damaged_grains: Some(dec("6.0")),
                foreign_matter: Some(dec("1.5")),
                ..Default::default()
            }),
            "soja",
            None,
        );

        let parameters: Vec<&str> = result.discounts.iter().map(|d| d.parameter.as_str()).collect();
        assert_eq!(parameters, vec!["foreign_matter", "damaged_grains"]);
        let damaged = &result.discounts[1];
        assert_eq!(damaged.value, dec("6.0"));
        assert_eq!(damaged.tolerance, dec("5.0"));
        assert_eq!(damaged.rate, dec("1.0"));
        assert_eq!(damaged.amount, dec("1.00"));
    }

    #[test]
    fn wheat_bonuses_are_clamped_to_full_factor() {
        // +1.50 hectoliter weight, +4.00 protein, -0.50 foreign matter
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("13.0")),
                hectoliter_weight: Some(dec("82")),
                protein: Some(dec("13.0")),
                foreign_matter: Some(dec("0.70")),
                ..Default::default()
            }),
            "TRIGO",
            None,
        );

        assert_eq!(result.grain_type, "WHEAT");
        assert_eq!(result.total_bonus, dec("5.50"));
        assert_eq!(result.total_discount, dec("0.50"));
        assert_eq!(result.final_factor, dec("100"));
        assert_eq!(result.grade, Some(Grade::G2));

        let bonus_parameters: Vec<&str> =
            result.bonuses.iter().map(|b| b.parameter.as_str()).collect();
        assert_eq!(bonus_parameters, vec!["hectoliter_weight", "protein"]);
    }

    #[test]
    fn wheat_above_receiving_limit_is_out_of_standard() {
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("17.5")),
                ..Default::default()
            }),
            "WHEAT",
            Some(dec("10000")),
        );

        assert_eq!(result.final_factor, dec("96.50"));
        assert_eq!(result.grade, Some(Grade::OutOfStandard));
        assert!(result.out_of_standard);
        assert_eq!(result.humidity_waste.waste_percent, dec("3.90"));
        assert_eq!(result.humidity_waste.waste_kg, dec("390"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::AboveMaxHumidity && w.severity == Severity::Critical));
    }

    #[test]
    fn worst_grade_wins() {
        // Foreign matter grades G1, damaged grains grade G3
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("12.0")),
                foreign_matter: Some(dec("0.40")),
                damaged_grains: Some(dec("2.50")),
                ..Default::default()
            }),
            "WHEAT",
            None,
        );
        assert_eq!(result.grade, Some(Grade::G3));
        assert!(!result.out_of_standard);
    }

    #[test]
    fn beyond_standard_limit_is_critical() {
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("14.0")),
                foreign_matter: Some(dec("4.0")),
                ..Default::default()
            }),
            "CORN",
            None,
        );
        assert!(result.out_of_standard);
        assert_eq!(result.grade, Some(Grade::OutOfStandard));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::OutOfStandard && w.parameter == "foreign_matter"));
        assert_eq!(result.final_factor, dec("97.00"));
    }

    #[test]
    fn light_wheat_within_standard_is_graded() {
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("13.0")),
                hectoliter_weight: Some(dec("71")),
                ..Default::default()
            }),
            "WHEAT",
            None,
        );
        assert_eq!(result.grade, Some(Grade::G3));
        assert!(!result.out_of_standard);
        assert!(result
            .warnings
            .iter()
            .all(|w| w.severity == Severity::Warning));
    }

    #[test]
    fn wheat_below_hectoliter_standard_is_critical() {
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("13.0")),
                hectoliter_weight: Some(dec("69")),
                ..Default::default()
            }),
            "WHEAT",
            None,
        );
        assert_eq!(result.grade, Some(Grade::OutOfStandard));
        assert!(result.out_of_standard);
        assert!(result.warnings.iter().any(|w| w.code == WarningCode::OutOfStandard
            && w.parameter == "hectoliter_weight"
            && w.severity == Severity::Critical));
    }

    #[test]
    fn unknown_grain_uses_zero_effect_table() {
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("20.0")),
                damaged_grains: Some(dec("10.0")),
                ..Default::default()
            }),
            " barley ",
            Some(dec("5000")),
        );

        assert_eq!(result.grain_type, "BARLEY");
        assert_eq!(result.final_factor, dec("100"));
        assert_eq!(result.humidity_waste.waste_kg, Decimal::ZERO);
        assert!(!result.humidity_waste.requires_drying);
        assert!(result.discounts.is_empty());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::UnknownGrainType && w.severity == Severity::Warning));
    }

    #[test]
    fn missing_humidity_is_critical_but_not_fatal() {
        let result = calculator().calculate(
            &analysis(Measurements {
                damaged_grains: Some(dec("6.0")),
                ..Default::default()
            }),
            "SOYBEAN",
            Some(dec("1000")),
        );

        assert_eq!(result.final_factor, dec("99.00"));
        assert_eq!(result.humidity_waste.actual_humidity, Decimal::ZERO);
        assert!(result.has_critical_warnings());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::MissingHumidity));
    }

    #[test]
    fn invalid_reading_is_clamped_and_flagged() {
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("13.0")),
                damaged_grains: Some(dec("-3")),
                ..Default::default()
            }),
            "SOYBEAN",
            None,
        );
        assert_eq!(result.final_factor, dec("100"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::InvalidMeasurement && w.parameter == "damaged_grains"));
    }

    #[test]
    fn sunflower_uses_default_humidity_rate() {
        // No per-grain rate: 1.5 points per humidity point above 11.0
        let result = calculator().calculate(
            &analysis(Measurements {
                humidity: Some(dec("12.0")),
                ..Default::default()
            }),
            "GIRASOL",
            None,
        );
        assert_eq!(result.humidity_factor_discount, dec("1.50"));
        assert_eq!(result.final_factor, dec("98.50"));
    }

    #[test]
    fn result_carries_rule_book_version() {
        let result = calculator().calculate(&analysis(Measurements::default()), "CORN", None);
        assert_eq!(result.calculation_version, shared::STANDARD_RULES_VERSION);
        assert!(result.is_current(shared::STANDARD_RULES_VERSION));
        assert!(!result.is_current("2023.4"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Percent readings from 0.00 to 40.00
    fn percent_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=4000i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// Optional readings, including garbage outside the valid range
    fn reading_strategy() -> impl Strategy<Value = Option<Decimal>> {
        prop_oneof![
            Just(None),
            (-2000i64..=15000i64).prop_map(|n| Some(Decimal::new(n, 2))),
        ]
    }

    fn grain_strategy() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("WHEAT"),
            Just("CORN"),
            Just("SOYBEAN"),
            Just("SORGHUM"),
            Just("SUNFLOWER"),
            Just("maíz"),
            Just("barley"),
        ]
    }

    fn measurements_strategy() -> impl Strategy<Value = Measurements> {
        (
            reading_strategy(),
            reading_strategy(),
            reading_strategy(),
            reading_strategy(),
            reading_strategy(),
            reading_strategy(),
            reading_strategy(),
        )
            .prop_map(
                |(humidity, foreign, damaged, hectoliter, protein, broken, burnt)| Measurements {
                    humidity,
                    foreign_matter: foreign,
                    damaged_grains: damaged,
                    hectoliter_weight: hectoliter,
                    protein,
                    broken_grains: broken,
                    burnt_grains: burnt,
                    ..Default::default()
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Final factor is always within 0-100 with at most two decimals
        #[test]
        fn prop_factor_in_range(
            measurements in measurements_strategy(),
            grain in grain_strategy()
        ) {
            let result = calculator().calculate(&analysis(measurements), grain, None);
            prop_assert!(result.final_factor >= Decimal::ZERO);
            prop_assert!(result.final_factor <= Decimal::ONE_HUNDRED);
            prop_assert!(result.final_factor.scale() <= 2);
        }

        /// Final factor matches the clamped sum of its components
        #[test]
        fn prop_factor_matches_components(
            measurements in measurements_strategy(),
            grain in grain_strategy()
        ) {
            let result = calculator().calculate(&analysis(measurements), grain, None);
            let raw = result.base_factor + result.total_bonus
                - result.total_discount
                - result.humidity_factor_discount;
            let expected = shared::round2(shared::clamp(raw, Decimal::ZERO, Decimal::ONE_HUNDRED));
            prop_assert_eq!(result.final_factor, expected);
        }

        /// Audit trail starts at base, is numbered, and ends at the final factor
        #[test]
        fn prop_steps_end_at_final_factor(
            measurements in measurements_strategy(),
            grain in grain_strategy()
        ) {
            let result = calculator().calculate(&analysis(measurements), grain, None);
            let first = result.calculation_steps.first().unwrap();
            let last = result.calculation_steps.last().unwrap();
            prop_assert_eq!(first.factor_after, Decimal::ONE_HUNDRED);
            prop_assert_eq!(last.factor_after, result.final_factor);
            for (index, step) in result.calculation_steps.iter().enumerate() {
                prop_assert_eq!(step.step as usize, index + 1);
            }
        }

        /// Same input, same output
        #[test]
        fn prop_calculation_is_deterministic(
            measurements in measurements_strategy(),
            grain in grain_strategy(),
            quantity in (0i64..=5_000_000i64).prop_map(|n| Decimal::new(n, 2))
        ) {
            let a = analysis(measurements);
            let first = calculator().calculate(&a, grain, Some(quantity));
            let second = calculator().calculate(&a, grain, Some(quantity));
            prop_assert_eq!(first, second);
        }

        /// No grade without a parameter beyond tolerance
        #[test]
        fn prop_grade_requires_out_of_tolerance(
            measurements in measurements_strategy(),
            grain in grain_strategy()
        ) {
            let result = calculator().calculate(&analysis(measurements), grain, None);
            if !result.out_of_tolerance {
                prop_assert_eq!(result.grade, None);
            }
            prop_assert_eq!(
                result.out_of_standard,
                result.grade == Some(Grade::OutOfStandard)
            );
        }

        /// A lot at or below base humidity loses no weight
        #[test]
        fn prop_dry_lot_has_no_waste(
            humidity in percent_strategy(),
            gross in (0i64..=10_000_000i64).prop_map(|n| Decimal::new(n, 2)),
            grain in grain_strategy()
        ) {
            let book = RuleBook::standard();
            let base = book.base_humidity(grain);
            prop_assume!(humidity <= base);
            let waste = calculator().humidity_waste(grain, humidity, gross);
            prop_assert_eq!(waste.waste_kg, Decimal::ZERO);
            prop_assert_eq!(waste.net_quantity_kg, gross);
            prop_assert!(!waste.requires_drying);
        }
    }
}
