//! WebAssembly module for the grain settlement platform
//!
//! Provides client-side previews with the built-in rule tables:
//! - Quality factor calculation
//! - Humidity waste (merma)
//! - Discrepancy classification
//! - Grain name normalization

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use shared::calculation::{DiscrepancyThresholds, FactorCalculator};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::rules::*;
pub use shared::types::*;

fn calculator() -> FactorCalculator {
    FactorCalculator::new(Arc::new(RuleBook::standard()))
}

fn to_decimal(value: f64, name: &str) -> Result<Decimal, String> {
    Decimal::try_from(value).map_err(|_| format!("Invalid {}: {}", name, value))
}

fn js_error(message: String) -> JsValue {
    JsValue::from_str(&message)
}

/// Calculate a quality result from a measurements JSON object.
///
/// Returns the full result as JSON.
#[wasm_bindgen]
pub fn calculate_quality_factor(
    measurements_json: &str,
    grain_type: &str,
    quantity_kg: Option<f64>,
) -> Result<String, JsValue> {
    let measurements: Measurements = serde_json::from_str(measurements_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid measurements JSON: {}", e)))?;
    let quantity = quantity_kg
        .map(|q| to_decimal(q, "quantity"))
        .transpose()
        .map_err(js_error)?;

    let analysis = QualityAnalysis::unattached(measurements);
    let result = calculator().calculate(&analysis, grain_type, quantity);

    serde_json::to_string(&result).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Humidity waste preview as JSON
#[wasm_bindgen]
pub fn calculate_humidity_waste(
    grain_type: &str,
    humidity: f64,
    gross_kg: f64,
) -> Result<String, JsValue> {
    let waste = calculator().humidity_waste(
        grain_type,
        to_decimal(humidity, "humidity").map_err(js_error)?,
        to_decimal(gross_kg, "gross_kg").map_err(js_error)?,
    );
    serde_json::to_string(&waste).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Waste percent for a grain and humidity
#[wasm_bindgen]
pub fn humidity_waste_percent(grain_type: &str, humidity: f64) -> Result<f64, JsValue> {
    waste_percent(grain_type, humidity).map_err(js_error)
}

fn waste_percent(grain_type: &str, humidity: f64) -> Result<f64, String> {
    let humidity = to_decimal(humidity, "humidity")?;
    let percent = calculator()
        .humidity_waste(grain_type, humidity, Decimal::ZERO)
        .waste_percent;
    percent
        .to_f64()
        .ok_or_else(|| format!("Waste percent {} is not representable", percent))
}

/// Classify the difference between a recorded and a calculated factor.
///
/// Returns `None` when there is no recorded factor to compare against.
#[wasm_bindgen]
pub fn classify_discrepancy(
    original_factor: Option<f64>,
    calculated_factor: f64,
) -> Result<Option<String>, JsValue> {
    discrepancy_status(original_factor, calculated_factor).map_err(js_error)
}

fn discrepancy_status(
    original_factor: Option<f64>,
    calculated_factor: f64,
) -> Result<Option<String>, String> {
    let original = original_factor
        .map(|f| to_decimal(f, "original_factor"))
        .transpose()?;
    let calculated = to_decimal(calculated_factor, "calculated_factor")?;
    Ok(DiscrepancyThresholds::default()
        .detect(original, calculated)
        .map(|d| d.status.as_str().to_string()))
}

/// Canonical grain name, or `None` when the name is not recognized
#[wasm_bindgen]
pub fn normalize_grain_type(raw: &str) -> Option<String> {
    GrainType::parse(raw).map(|g| g.as_str().to_string())
}

/// Version tag of the bundled rule tables
#[wasm_bindgen]
pub fn rules_version() -> String {
    STANDARD_RULES_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(original: Option<f64>, calculated: f64) -> Option<String> {
        discrepancy_status(original, calculated).unwrap()
    }

    #[test]
    fn test_classify_discrepancy() {
        assert_eq!(status(Some(100.5), 99.3).as_deref(), Some("WARNING"));
        assert_eq!(status(Some(100.0), 97.5).as_deref(), Some("CRITICAL"));
        assert_eq!(status(Some(98.0), 98.3).as_deref(), Some("OK"));
        assert_eq!(status(None, 90.0), None);
    }

    #[test]
    fn test_classify_discrepancy_rejects_non_finite() {
        assert!(discrepancy_status(Some(f64::NAN), 99.0).is_err());
        assert!(discrepancy_status(Some(100.0), f64::INFINITY).is_err());
    }

    #[test]
    fn test_humidity_waste_percent() {
        assert!((waste_percent("soja", 15.0).unwrap() - 2.25).abs() < 0.0001);
        assert_eq!(waste_percent("soja", 13.0).unwrap(), 0.0);
        assert!(waste_percent("soja", f64::NAN).is_err());
    }

    #[test]
    fn test_normalize_grain_type() {
        assert_eq!(normalize_grain_type(" maíz "), Some("CORN".to_string()));
        assert_eq!(normalize_grain_type("barley"), None);
    }

    #[test]
    fn test_calculate_quality_factor() {
        let json = calculate_quality_factor(r#"{"humidity": "15.0"}"#, "SOYBEAN", Some(1000.0))
            .unwrap();
        let result: QualityResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result.final_factor, Decimal::new(9775, 2));
        assert_eq!(result.humidity_waste.waste_kg, Decimal::new(2250, 2));
    }
}
