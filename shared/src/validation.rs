//! Measurement validation for quality analyses
//!
//! Bad readings never abort a calculation: they are clamped into range and
//! reported as critical warnings so settlement processing can continue.

use rust_decimal::Decimal;

use crate::models::{Measurements, QualityParameter, QualityWarning, Severity, WarningCode};
use crate::types::clamp;

// ============================================================================
// Range checks
// ============================================================================

/// Validate a percentage of the sample (0-100)
pub fn validate_percentage(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

/// Validate hectoliter weight (kg/hl)
pub fn validate_hectoliter_weight(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err("Hectoliter weight must be between 0 and 100 kg/hl");
    }
    Ok(())
}

/// Validate a commercial factor (0-100 scale)
pub fn validate_factor(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err("Factor must be between 0 and 100");
    }
    Ok(())
}

/// Validate a factor recorded on a CTG document; these may exceed 100
pub fn validate_recorded_factor(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Recorded factor cannot be negative");
    }
    Ok(())
}

/// Validate a weighed quantity
pub fn validate_quantity_kg(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Sanitization
// ============================================================================

/// Measurements ready for calculation
#[derive(Debug, Clone)]
pub struct SanitizedMeasurements {
    /// Humidity, zero when missing
    pub humidity: Decimal,
    /// Readings clamped into their valid range
    pub values: Measurements,
    /// Critical warnings for every missing or out-of-range reading
    pub warnings: Vec<QualityWarning>,
}

/// Clamp every reading into range, treating missing humidity as zero
pub fn sanitize_measurements(measurements: &Measurements) -> SanitizedMeasurements {
    let mut warnings = Vec::new();
    let mut values = measurements.clone();

    let humidity = match measurements.humidity {
        Some(raw) => {
            if let Err(message) = validate_percentage(raw) {
                warnings.push(invalid("humidity", raw, message));
            }
            clamp(raw, Decimal::ZERO, Decimal::ONE_HUNDRED)
        }
        None => {
            warnings.push(QualityWarning::new(
                "humidity",
                WarningCode::MissingHumidity,
                Severity::Critical,
                "Humidity is missing; calculated with 0%",
            ));
            Decimal::ZERO
        }
    };
    values.humidity = Some(humidity);

    for parameter in QualityParameter::ALL {
        let Some(raw) = measurements.get(parameter) else {
            continue;
        };
        let check = if parameter.is_percentage() {
            validate_percentage(raw)
        } else {
            validate_hectoliter_weight(raw)
        };
        if let Err(message) = check {
            warnings.push(invalid(parameter.as_str(), raw, message));
            set(&mut values, parameter, clamp(raw, Decimal::ZERO, Decimal::ONE_HUNDRED));
        }
    }

    SanitizedMeasurements {
        humidity,
        values,
        warnings,
    }
}

fn invalid(parameter: &str, raw: Decimal, message: &str) -> QualityWarning {
    QualityWarning::new(
        parameter,
        WarningCode::InvalidMeasurement,
        Severity::Critical,
        format!("{}: {} (got {})", parameter, message, raw),
    )
}

fn set(values: &mut Measurements, parameter: QualityParameter, value: Decimal) {
    let slot = match parameter {
        QualityParameter::ForeignMatter => &mut values.foreign_matter,
        QualityParameter::DamagedGrains => &mut values.damaged_grains,
        QualityParameter::BrokenGrains => &mut values.broken_grains,
        QualityParameter::GreenGrains => &mut values.green_grains,
        QualityParameter::BurntGrains => &mut values.burnt_grains,
        QualityParameter::SproutedGrains => &mut values.sprouted_grains,
        QualityParameter::PestDamaged => &mut values.pest_damaged,
        QualityParameter::HectoliterWeight => &mut values.hectoliter_weight,
        QualityParameter::Protein => &mut values.protein,
    };
    *slot = Some(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn percentage_bounds() {
        assert!(validate_percentage(dec("0")).is_ok());
        assert!(validate_percentage(dec("100")).is_ok());
        assert!(validate_percentage(dec("-0.1")).is_err());
        assert!(validate_percentage(dec("100.1")).is_err());
    }

    #[test]
    fn recorded_factor_may_exceed_100() {
        assert!(validate_recorded_factor(dec("100.5")).is_ok());
        assert!(validate_recorded_factor(dec("-1")).is_err());
        assert!(validate_factor(dec("100.5")).is_err());
    }

    #[test]
    fn missing_humidity_is_critical_and_zero() {
        let sanitized = sanitize_measurements(&Measurements::default());
        assert_eq!(sanitized.humidity, Decimal::ZERO);
        assert_eq!(sanitized.warnings.len(), 1);
        assert_eq!(sanitized.warnings[0].code, WarningCode::MissingHumidity);
        assert!(sanitized.warnings[0].is_critical());
    }

    #[test]
    fn negative_readings_are_clamped() {
        let measurements = Measurements {
            humidity: Some(dec("-2")),
            damaged_grains: Some(dec("-1.5")),
            foreign_matter: Some(dec("0.4")),
            ..Default::default()
        };
        let sanitized = sanitize_measurements(&measurements);
        assert_eq!(sanitized.humidity, Decimal::ZERO);
        assert_eq!(sanitized.values.damaged_grains, Some(Decimal::ZERO));
        assert_eq!(sanitized.values.foreign_matter, Some(dec("0.4")));
        assert_eq!(sanitized.warnings.len(), 2);
        assert!(sanitized
            .warnings
            .iter()
            .all(|w| w.code == WarningCode::InvalidMeasurement && w.is_critical()));
    }

    #[test]
    fn valid_readings_produce_no_warnings() {
        let measurements = Measurements {
            humidity: Some(dec("13.0")),
            hectoliter_weight: Some(dec("78.5")),
            ..Default::default()
        };
        let sanitized = sanitize_measurements(&measurements);
        assert!(sanitized.warnings.is_empty());
        assert_eq!(
            sanitized.values,
            Measurements {
                humidity: Some(dec("13.0")),
                hectoliter_weight: Some(dec("78.5")),
                ..Default::default()
            }
        );
    }
}
