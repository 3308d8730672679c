//! Rule book tests
//!
//! Lookups, normalization and loading custom rule books from JSON

use rust_decimal::Decimal;
use shared::{
    FactorCalculator, GrainType, Measurements, QualityAnalysis, QualityParameter, RuleBook,
    RuleError, WarningCode,
};
use std::str::FromStr;
use std::sync::Arc;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const CUSTOM_BOOK: &str = r#"{
    "version": "2025.2-coop",
    "grains": [
        {
            "grain_type": "SOYBEAN",
            "base_humidity": "13.5",
            "humidity_factor_rate": "2.0",
            "humidity_waste_table": [
                {"humidity": "14.0", "waste_percent": "1.00"},
                {"humidity": "15.0", "waste_percent": "2.00"}
            ],
            "tolerances": [
                {
                    "parameter": "damaged_grains",
                    "direction": "max",
                    "tolerance": "4.0",
                    "discount_rate": "2.0",
                    "standard_limit": "8.0",
                    "grade_limits": ["5.0", "6.0", "8.0"]
                }
            ]
        }
    ]
}"#;

mod lookups {
    use super::*;

    #[test]
    fn lookups_normalize_grain_names() {
        let book = RuleBook::standard();
        assert_eq!(book.base_humidity("soybean"), dec("13.5"));
        assert_eq!(book.base_humidity("  Soja "), dec("13.5"));
        assert_eq!(book.base_humidity("MAÍZ"), dec("14.5"));
        assert_eq!(book.base_humidity("trigo pan"), dec("14.0"));
    }

    #[test]
    fn unknown_grain_yields_zero_effect_table() {
        let book = RuleBook::standard();
        let lookup = book.rules_for("quinoa");
        assert!(!lookup.is_known());
        assert!(book.humidity_waste_table("quinoa").is_empty());
        assert!(book.tolerance_table("quinoa").is_empty());
        assert_eq!(book.base_humidity("quinoa"), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn every_grain_has_an_ascending_waste_table() {
        let book = RuleBook::standard();
        assert_eq!(book.grain_types().count(), GrainType::ALL.len());
        for grain in GrainType::ALL {
            let table = book.humidity_waste_table(grain.as_str());
            assert!(!table.is_empty(), "{} has no waste table", grain);
            assert!(table.windows(2).all(|p| p[0].humidity < p[1].humidity));
            // Waste starts just above base humidity
            assert!(table[0].humidity > book.base_humidity(grain.as_str()));
        }
    }

    #[test]
    fn tolerance_table_exposes_rates() {
        let book = RuleBook::standard();
        let rules = book.rules(GrainType::Wheat).unwrap();
        let foreign = rules.tolerance(QualityParameter::ForeignMatter).unwrap();
        assert_eq!(foreign.tolerance, dec("0.20"));
        assert_eq!(foreign.discount_rate, dec("1.0"));
        assert_eq!(foreign.standard_limit, Some(dec("1.50")));
    }
}

mod loading {
    use super::*;

    #[test]
    fn custom_book_loads_and_drives_calculation() {
        let book = RuleBook::from_json(CUSTOM_BOOK).unwrap();
        assert_eq!(book.version, "2025.2-coop");

        let calculator = FactorCalculator::new(Arc::new(book));
        let result = calculator.calculate(
            &QualityAnalysis::unattached(Measurements {
                humidity: Some(dec("14.5")),
                damaged_grains: Some(dec("5.5")),
                ..Default::default()
            }),
            "SOYBEAN",
            Some(dec("1000")),
        );

        // 100 - (1.0 x 2.0) - (1.5 x 2.0)
        assert_eq!(result.final_factor, dec("95.00"));
        assert_eq!(result.humidity_waste.waste_percent, dec("1.00"));
        assert_eq!(result.humidity_waste.waste_kg, dec("10"));
        assert_eq!(result.grade, Some(shared::Grade::G2));
        assert_eq!(result.calculation_version, "2025.2-coop");
    }

    #[test]
    fn grain_missing_from_custom_book_is_unknown() {
        let book = RuleBook::from_json(CUSTOM_BOOK).unwrap();
        let calculator = FactorCalculator::new(Arc::new(book));
        let result = calculator.calculate(
            &QualityAnalysis::unattached(Measurements {
                humidity: Some(dec("18.0")),
                ..Default::default()
            }),
            "WHEAT",
            None,
        );
        assert_eq!(result.final_factor, dec("100"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::UnknownGrainType));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            RuleBook::from_json("{\"version\": 1"),
            Err(RuleError::Parse(_))
        ));
    }

    #[test]
    fn rejects_empty_version() {
        let json = CUSTOM_BOOK.replace("2025.2-coop", " ");
        assert!(matches!(
            RuleBook::from_json(&json),
            Err(RuleError::EmptyVersion)
        ));
    }

    #[test]
    fn rejects_unordered_waste_table() {
        let json = CUSTOM_BOOK.replace("\"humidity\": \"15.0\"", "\"humidity\": \"13.9\"");
        assert!(matches!(
            RuleBook::from_json(&json),
            Err(RuleError::UnorderedWasteTable(GrainType::Soybean))
        ));
    }

    #[test]
    fn rejects_negative_discount_rate() {
        let json = CUSTOM_BOOK.replace("\"discount_rate\": \"2.0\"", "\"discount_rate\": \"-2.0\"");
        assert!(matches!(
            RuleBook::from_json(&json),
            Err(RuleError::NegativeRate { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_grain() {
        let mut book = RuleBook::from_json(CUSTOM_BOOK).unwrap();
        book.grains.push(book.grains[0].clone());
        assert!(matches!(
            book.validate(),
            Err(RuleError::DuplicateGrain(GrainType::Soybean))
        ));
    }

    #[test]
    fn standard_book_round_trips_through_json() {
        let json = serde_json::to_string(&RuleBook::standard()).unwrap();
        assert_eq!(RuleBook::from_json(&json).unwrap(), RuleBook::standard());
    }
}
