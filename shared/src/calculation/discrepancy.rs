//! Discrepancy detection between calculated and recorded factors

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Discrepancy, DiscrepancyStatus};
use crate::types::round2;

/// Severity thresholds in factor points.
///
/// Single definition shared by every caller; override through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyThresholds {
    /// Differences strictly above this are a discrepancy (WARNING)
    pub warning: Decimal,
    /// Differences strictly above this are CRITICAL
    pub critical: Decimal,
}

impl Default for DiscrepancyThresholds {
    fn default() -> Self {
        Self {
            warning: Decimal::new(5, 1),
            critical: Decimal::new(20, 1),
        }
    }
}

impl DiscrepancyThresholds {
    pub fn new(warning: Decimal, critical: Decimal) -> Self {
        Self { warning, critical }
    }

    pub fn classify(&self, difference: Decimal) -> DiscrepancyStatus {
        let abs_diff = difference.abs();
        if abs_diff > self.critical {
            DiscrepancyStatus::Critical
        } else if abs_diff > self.warning {
            DiscrepancyStatus::Warning
        } else {
            DiscrepancyStatus::Ok
        }
    }

    pub fn compare(&self, original_factor: Decimal, calculated_factor: Decimal) -> Discrepancy {
        let difference = round2(calculated_factor - original_factor);
        Discrepancy {
            original_factor,
            calculated_factor,
            difference,
            has_discrepancy: difference.abs() > self.warning,
            status: self.classify(difference),
        }
    }

    /// Compare against a recorded factor; no recorded factor means nothing to compare
    pub fn detect(
        &self,
        original_factor: Option<Decimal>,
        calculated_factor: Decimal,
    ) -> Option<Discrepancy> {
        original_factor.map(|original| self.compare(original, calculated_factor))
    }
}
