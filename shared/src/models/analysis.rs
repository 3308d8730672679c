//! Laboratory quality analysis records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Measured quality parameter with a tolerance rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityParameter {
    ForeignMatter,
    DamagedGrains,
    BrokenGrains,
    GreenGrains,
    BurntGrains,
    SproutedGrains,
    PestDamaged,
    HectoliterWeight,
    Protein,
}

impl QualityParameter {
    pub const ALL: [QualityParameter; 9] = [
        QualityParameter::ForeignMatter,
        QualityParameter::DamagedGrains,
        QualityParameter::BrokenGrains,
        QualityParameter::GreenGrains,
        QualityParameter::BurntGrains,
        QualityParameter::SproutedGrains,
        QualityParameter::PestDamaged,
        QualityParameter::HectoliterWeight,
        QualityParameter::Protein,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityParameter::ForeignMatter => "foreign_matter",
            QualityParameter::DamagedGrains => "damaged_grains",
            QualityParameter::BrokenGrains => "broken_grains",
            QualityParameter::GreenGrains => "green_grains",
            QualityParameter::BurntGrains => "burnt_grains",
            QualityParameter::SproutedGrains => "sprouted_grains",
            QualityParameter::PestDamaged => "pest_damaged",
            QualityParameter::HectoliterWeight => "hectoliter_weight",
            QualityParameter::Protein => "protein",
        }
    }

    /// Whether the measurement is a percentage of the sample (0-100)
    pub fn is_percentage(&self) -> bool {
        !matches!(self, QualityParameter::HectoliterWeight)
    }
}

impl std::fmt::Display for QualityParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw laboratory readings. Every field is optional because OCR may miss any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    /// Humidity (%)
    pub humidity: Option<Decimal>,
    /// Foreign matter (%)
    pub foreign_matter: Option<Decimal>,
    /// Damaged grains (%)
    pub damaged_grains: Option<Decimal>,
    /// Hectoliter weight (kg/hl)
    pub hectoliter_weight: Option<Decimal>,
    /// Protein (%)
    pub protein: Option<Decimal>,
    pub broken_grains: Option<Decimal>,
    pub green_grains: Option<Decimal>,
    pub burnt_grains: Option<Decimal>,
    pub sprouted_grains: Option<Decimal>,
    pub pest_damaged: Option<Decimal>,
}

impl Measurements {
    pub fn get(&self, parameter: QualityParameter) -> Option<Decimal> {
        match parameter {
            QualityParameter::ForeignMatter => self.foreign_matter,
            QualityParameter::DamagedGrains => self.damaged_grains,
            QualityParameter::BrokenGrains => self.broken_grains,
            QualityParameter::GreenGrains => self.green_grains,
            QualityParameter::BurntGrains => self.burnt_grains,
            QualityParameter::SproutedGrains => self.sprouted_grains,
            QualityParameter::PestDamaged => self.pest_damaged,
            QualityParameter::HectoliterWeight => self.hectoliter_weight,
            QualityParameter::Protein => self.protein,
        }
    }
}

/// One laboratory reading for one lot. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAnalysis {
    pub id: Uuid,
    pub ctg_entry_id: Uuid,
    pub analysis_date: NaiveDate,
    pub measurements: Measurements,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QualityAnalysis {
    /// Build an analysis that is not yet attached to a stored lot (previews)
    pub fn unattached(measurements: Measurements) -> Self {
        Self {
            id: Uuid::nil(),
            ctg_entry_id: Uuid::nil(),
            analysis_date: NaiveDate::default(),
            measurements,
            observations: None,
            created_at: DateTime::<Utc>::default(),
        }
    }
}

/// Most recent analysis by analysis date, then creation time.
///
/// Only the most recent revision is authoritative for calculation.
pub fn latest_analysis(analyses: &[QualityAnalysis]) -> Option<&QualityAnalysis> {
    analyses
        .iter()
        .max_by_key(|a| (a.analysis_date, a.created_at))
}
