//! Settlement (liquidation) aggregate and its CTG entries

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{latest_analysis, QualityAnalysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    PendingProcessing,
    Draft,
    Validated,
    NeedsReview,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::PendingProcessing => "pending_processing",
            SettlementStatus::Draft => "draft",
            SettlementStatus::Validated => "validated",
            SettlementStatus::NeedsReview => "needs_review",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending_processing" => Some(SettlementStatus::PendingProcessing),
            "draft" => Some(SettlementStatus::Draft),
            "validated" => Some(SettlementStatus::Validated),
            "needs_review" => Some(SettlementStatus::NeedsReview),
            _ => None,
        }
    }

    /// Status a recalculation leaves behind.
    ///
    /// A batch with unpersisted entries is never reported as validated.
    pub fn after_recalculation(has_discrepancy: bool, has_failures: bool) -> Self {
        if has_discrepancy || has_failures {
            SettlementStatus::NeedsReview
        } else {
            SettlementStatus::Validated
        }
    }
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One weighed delivery (lot) within a settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtgEntry {
    pub id: Uuid,
    pub settlement_id: Uuid,
    pub line_number: i32,
    pub ctg_number: String,
    pub gross_kg: Decimal,
    pub net_kg: Decimal,
    pub waste_kg: Option<Decimal>,
    /// Factor recorded on the original document, if any
    pub factor: Option<Decimal>,
    /// Analyses for this lot, any order
    #[serde(default)]
    pub analyses: Vec<QualityAnalysis>,
}

impl CtgEntry {
    pub fn latest_analysis(&self) -> Option<&QualityAnalysis> {
        latest_analysis(&self.analyses)
    }
}

/// Settlement aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    /// Tenant owning the document
    pub owner_id: Uuid,
    /// Grain name as printed on the document
    pub grain_type: String,
    pub settlement_date: NaiveDate,
    pub price_per_ton: Option<Decimal>,
    pub gross_kg: Decimal,
    pub net_kg: Decimal,
    pub total_amount: Option<Decimal>,
    pub status: SettlementStatus,
    pub entries: Vec<CtgEntry>,
}
