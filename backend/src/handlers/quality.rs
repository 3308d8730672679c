//! HTTP handlers for quality calculation previews

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_factor, validate_percentage, validate_quantity_kg, validate_recorded_factor,
    Discrepancy, DiscrepancyThresholds, HumidityWaste, Measurements, QualityAnalysis,
    QualityResult,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::AppState;

/// Input for a factor preview
#[derive(Debug, Deserialize, Validate)]
pub struct CalculateQualityInput {
    #[validate(length(min = 1, max = 64))]
    pub grain_type: String,
    #[serde(default)]
    pub measurements: Measurements,
    pub quantity_kg: Option<Decimal>,
}

/// Input for a humidity waste preview
#[derive(Debug, Deserialize, Validate)]
pub struct HumidityWasteInput {
    #[validate(length(min = 1, max = 64))]
    pub grain_type: String,
    pub humidity: Decimal,
    pub gross_kg: Decimal,
}

/// Input for a discrepancy check
#[derive(Debug, Deserialize)]
pub struct DiscrepancyInput {
    pub original_factor: Option<Decimal>,
    pub calculated_factor: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DiscrepancyResponse {
    /// Absent when there is no recorded factor to compare against
    pub discrepancy: Option<Discrepancy>,
}

fn check(field: &str, result: Result<(), &'static str>) -> AppResult<()> {
    result.map_err(|message| AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
        message_es: format!("Valor inválido para {}", field),
    })
}

/// Calculate factor, grade and waste for one analysis without persisting
pub async fn calculate_quality(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CalculateQualityInput>,
) -> AppResult<Json<QualityResult>> {
    input.validate()?;
    if let Some(quantity) = input.quantity_kg {
        check("quantity_kg", validate_quantity_kg(quantity))?;
    }

    let analysis = QualityAnalysis::unattached(input.measurements);
    let result = state
        .calculator()
        .calculate(&analysis, &input.grain_type, input.quantity_kg);
    Ok(Json(result))
}

/// Humidity waste for a grain, humidity and gross weight
pub async fn humidity_waste(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<HumidityWasteInput>,
) -> AppResult<Json<HumidityWaste>> {
    input.validate()?;
    check("humidity", validate_percentage(input.humidity))?;
    check("gross_kg", validate_quantity_kg(input.gross_kg))?;

    let waste = state
        .calculator()
        .humidity_waste(&input.grain_type, input.humidity, input.gross_kg);
    Ok(Json(waste))
}

/// Compare a recorded factor with a calculated one
pub async fn check_discrepancy(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<DiscrepancyInput>,
) -> AppResult<Json<DiscrepancyResponse>> {
    let thresholds = state.config.discrepancy.thresholds();
    discrepancy_preview(&thresholds, &input).map(Json)
}

fn discrepancy_preview(
    thresholds: &DiscrepancyThresholds,
    input: &DiscrepancyInput,
) -> AppResult<DiscrepancyResponse> {
    check("calculated_factor", validate_factor(input.calculated_factor))?;
    if let Some(original) = input.original_factor {
        check("original_factor", validate_recorded_factor(original))?;
    }

    let discrepancy = thresholds.detect(input.original_factor, input.calculated_factor);
    Ok(DiscrepancyResponse { discrepancy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::DiscrepancyStatus;

    fn input(json: &str) -> DiscrepancyInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn recorded_factor_above_100_is_compared() {
        let response = discrepancy_preview(
            &DiscrepancyThresholds::default(),
            &input(r#"{"original_factor": "100.5", "calculated_factor": "99.3"}"#),
        )
        .unwrap();

        let discrepancy = response.discrepancy.unwrap();
        assert!(discrepancy.has_discrepancy);
        assert_eq!(discrepancy.status, DiscrepancyStatus::Warning);
        assert_eq!(discrepancy.difference, "-1.2".parse::<Decimal>().unwrap());
    }

    #[test]
    fn missing_recorded_factor_gives_no_discrepancy() {
        let response = discrepancy_preview(
            &DiscrepancyThresholds::default(),
            &input(r#"{"calculated_factor": "97"}"#),
        )
        .unwrap();
        assert!(response.discrepancy.is_none());
    }

    #[test]
    fn negative_recorded_factor_is_rejected() {
        let result = discrepancy_preview(
            &DiscrepancyThresholds::default(),
            &input(r#"{"original_factor": "-1", "calculated_factor": "97"}"#),
        );
        assert!(matches!(
            result,
            Err(AppError::Validation { ref field, .. }) if field == "original_factor"
        ));
    }

    #[test]
    fn calculated_factor_stays_on_the_0_to_100_scale() {
        let result = discrepancy_preview(
            &DiscrepancyThresholds::default(),
            &input(r#"{"original_factor": "100", "calculated_factor": "100.5"}"#),
        );
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
