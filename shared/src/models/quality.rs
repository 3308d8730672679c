//! Quality calculation results

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Commercial grade derived from the worst out-of-tolerance parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "G1")]
    G1,
    #[serde(rename = "G2")]
    G2,
    #[serde(rename = "G3")]
    G3,
    /// Beyond the last grade limit or a hard standard limit
    #[serde(rename = "out_of_standard")]
    OutOfStandard,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::G1 => "G1",
            Grade::G2 => "G2",
            Grade::G3 => "G3",
            Grade::OutOfStandard => "out_of_standard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "G1" => Some(Grade::G1),
            "G2" => Some(Grade::G2),
            "G3" => Some(Grade::G3),
            "out_of_standard" => Some(Grade::OutOfStandard),
            _ => None,
        }
    }

    /// Grade for a position in a grade-limit list (0 = G1)
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Grade::G1,
            1 => Grade::G2,
            2 => Grade::G3,
            _ => Grade::OutOfStandard,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::G1 => write!(f, "Grade 1"),
            Grade::G2 => write!(f, "Grade 2"),
            Grade::G3 => write!(f, "Grade 3"),
            Grade::OutOfStandard => write!(f, "Out of Standard"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    MissingHumidity,
    InvalidMeasurement,
    UnknownGrainType,
    AboveBaseHumidity,
    AboveMaxHumidity,
    OutOfTolerance,
    OutOfStandard,
}

/// Warning attached to a result; never aborts the calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityWarning {
    /// Parameter name, `humidity`, or `grain_type`
    pub parameter: String,
    pub code: WarningCode,
    pub severity: Severity,
    pub message: String,
}

impl QualityWarning {
    pub fn new(
        parameter: impl Into<String>,
        code: WarningCode,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            code,
            severity,
            message: message.into(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// One itemized bonus or discount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub parameter: String,
    /// Measured value
    pub value: Decimal,
    /// Tolerance (discounts) or bonus threshold (bonuses)
    pub tolerance: Decimal,
    /// Factor points per unit of deviation
    pub rate: Decimal,
    /// Factor points, always positive
    pub amount: Decimal,
}

/// One entry of the ordered audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationStep {
    pub step: u32,
    pub description: String,
    pub delta: Decimal,
    pub factor_after: Decimal,
}

/// Weight loss caused by humidity above base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumidityWaste {
    pub base_humidity: Decimal,
    pub actual_humidity: Decimal,
    pub waste_percent: Decimal,
    pub waste_kg: Decimal,
    pub net_quantity_kg: Decimal,
    pub requires_drying: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    /// `final_factor - 100`, applied to the lot price
    pub percent: Decimal,
    /// Quantity after applying the factor, when a quantity was supplied
    pub adjusted_quantity_kg: Option<Decimal>,
}

/// Output of the factor calculator for one (analysis, lot) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityResult {
    pub analysis_id: Uuid,
    pub ctg_entry_id: Uuid,
    /// Canonical grain name, or the cleaned-up input when the grain is unknown
    pub grain_type: String,
    pub base_factor: Decimal,
    pub final_factor: Decimal,
    pub grade: Option<Grade>,
    pub bonuses: Vec<Adjustment>,
    pub discounts: Vec<Adjustment>,
    pub total_bonus: Decimal,
    pub total_discount: Decimal,
    pub humidity_waste: HumidityWaste,
    pub humidity_factor_discount: Decimal,
    pub price_adjustment: PriceAdjustment,
    pub warnings: Vec<QualityWarning>,
    pub out_of_tolerance: bool,
    pub out_of_standard: bool,
    pub calculation_steps: Vec<CalculationStep>,
    pub calculation_version: String,
}

impl QualityResult {
    /// Whether this result was produced by the given rule-set revision
    pub fn is_current(&self, calculation_version: &str) -> bool {
        self.calculation_version == calculation_version
    }

    pub fn has_critical_warnings(&self) -> bool {
        self.warnings.iter().any(QualityWarning::is_critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyStatus {
    Ok,
    Warning,
    Critical,
}

impl DiscrepancyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyStatus::Ok => "OK",
            DiscrepancyStatus::Warning => "WARNING",
            DiscrepancyStatus::Critical => "CRITICAL",
        }
    }
}

/// Calculated factor compared with the previously recorded one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub original_factor: Decimal,
    pub calculated_factor: Decimal,
    /// `calculated_factor - original_factor`
    pub difference: Decimal,
    pub has_discrepancy: bool,
    pub status: DiscrepancyStatus,
}
