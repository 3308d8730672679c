//! Settlement recalculation orchestrator
//!
//! Recomputes every CTG entry of a settlement from its latest analysis,
//! upserts the results, compares against the recorded factors and moves the
//! settlement to `validated` or `needs_review`. Entry persistence runs with
//! bounded concurrency; the status update happens after every entry is done.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    CtgEntry, Discrepancy, DiscrepancyStatus, DiscrepancyThresholds, FactorCalculator, Grade,
    QualityResult, SettlementStatus,
};
use uuid::Uuid;

use crate::config::RecalculationConfig;
use crate::error::{AppError, AppResult};
use crate::store::{QualityResultRecord, SettlementStore};

pub const NO_ANALYSIS_REASON: &str = "No quality analysis";

#[derive(Debug, Clone, Copy)]
pub struct RecalculationOptions {
    pub max_concurrency: usize,
    pub persist_timeout: Duration,
}

impl Default for RecalculationOptions {
    fn default() -> Self {
        (&RecalculationConfig::default()).into()
    }
}

impl From<&RecalculationConfig> for RecalculationOptions {
    fn from(config: &RecalculationConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            persist_timeout: config.persist_timeout(),
        }
    }
}

/// Discrepancy on one entry
#[derive(Debug, Clone, Serialize)]
pub struct CtgDiscrepancy {
    pub ctg_entry_id: Uuid,
    pub ctg_number: String,
    pub line_number: i32,
    pub original_factor: Decimal,
    pub calculated_factor: Decimal,
    pub difference: Decimal,
    pub status: DiscrepancyStatus,
}

/// Per-entry summary of a persisted result
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub result_id: Uuid,
    pub ctg_entry_id: Uuid,
    pub analysis_id: Uuid,
    pub ctg_number: String,
    pub line_number: i32,
    pub final_factor: Decimal,
    pub grade: Option<Grade>,
    pub waste_percent: Decimal,
    pub waste_kg: Decimal,
    pub requires_drying: bool,
    pub out_of_standard: bool,
    pub warnings: usize,
    pub discrepancy: Option<Discrepancy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub ctg_entry_id: Uuid,
    pub ctg_number: String,
    pub line_number: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedEntry {
    pub ctg_entry_id: Uuid,
    pub ctg_number: String,
    pub line_number: i32,
    pub reason: String,
}

/// Outcome of one recalculation run
#[derive(Debug, Clone, Serialize)]
pub struct RecalculationReport {
    pub settlement_id: Uuid,
    pub total_ctgs: usize,
    pub recalculated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub discrepancies: Vec<CtgDiscrepancy>,
    pub results: Vec<EntrySummary>,
    pub skipped_entries: Vec<SkippedEntry>,
    pub failures: Vec<FailedEntry>,
    pub status: SettlementStatus,
    pub calculation_version: String,
}

/// Calculated entry waiting to be persisted
struct Pending {
    entry: CtgEntry,
    result: QualityResult,
    discrepancy: Option<Discrepancy>,
}

#[derive(Clone)]
pub struct RecalculationService {
    store: Arc<dyn SettlementStore>,
    calculator: FactorCalculator,
    thresholds: DiscrepancyThresholds,
    options: RecalculationOptions,
}

impl RecalculationService {
    pub fn new(
        store: Arc<dyn SettlementStore>,
        calculator: FactorCalculator,
        thresholds: DiscrepancyThresholds,
        options: RecalculationOptions,
    ) -> Self {
        Self {
            store,
            calculator,
            thresholds,
            options,
        }
    }

    /// Recalculate every entry of a settlement owned by `owner_id`.
    ///
    /// Only a failed load or status update is returned as an error; entries
    /// that cannot be persisted are listed in the report.
    pub async fn recalculate(
        &self,
        owner_id: Uuid,
        settlement_id: Uuid,
    ) -> AppResult<RecalculationReport> {
        let settlement = tokio::time::timeout(
            self.options.persist_timeout,
            self.store.load_settlement(owner_id, settlement_id),
        )
        .await
        .map_err(|_| AppError::PersistenceTimeout("loading settlement".to_string()))??
        .ok_or_else(|| AppError::NotFound("Settlement".to_string()))?;

        tracing::info!(
            settlement_id = %settlement.id,
            grain_type = %settlement.grain_type,
            entries = settlement.entries.len(),
            version = self.calculator.calculation_version(),
            "Recalculating settlement"
        );

        let mut skipped_entries = Vec::new();
        let mut pending = Vec::new();
        for entry in &settlement.entries {
            let Some(analysis) = entry.latest_analysis() else {
                tracing::debug!(ctg_number = %entry.ctg_number, "Skipping entry without analysis");
                skipped_entries.push(SkippedEntry {
                    ctg_entry_id: entry.id,
                    ctg_number: entry.ctg_number.clone(),
                    line_number: entry.line_number,
                    reason: NO_ANALYSIS_REASON.to_string(),
                });
                continue;
            };

            let result =
                self.calculator
                    .calculate(analysis, &settlement.grain_type, Some(entry.gross_kg));
            let discrepancy = self.thresholds.detect(entry.factor, result.final_factor);
            pending.push(Pending {
                entry: entry.clone(),
                result,
                discrepancy,
            });
        }

        let outcomes: Vec<(Pending, Result<QualityResultRecord, String>)> =
            stream::iter(pending)
                .map(|item| async move {
                    let persisted = self.persist(&item.entry, &item.result).await;
                    (item, persisted)
                })
                .buffer_unordered(self.options.max_concurrency.max(1))
                .collect()
                .await;

        let mut results = Vec::new();
        let mut discrepancies = Vec::new();
        let mut failures = Vec::new();
        for (item, persisted) in outcomes {
            let entry = &item.entry;
            if let Some(d) = item.discrepancy.as_ref().filter(|d| d.has_discrepancy) {
                discrepancies.push(CtgDiscrepancy {
                    ctg_entry_id: entry.id,
                    ctg_number: entry.ctg_number.clone(),
                    line_number: entry.line_number,
                    original_factor: d.original_factor,
                    calculated_factor: d.calculated_factor,
                    difference: d.difference,
                    status: d.status,
                });
            }

            match persisted {
                Ok(record) => results.push(EntrySummary {
                    result_id: record.id,
                    ctg_entry_id: entry.id,
                    analysis_id: item.result.analysis_id,
                    ctg_number: entry.ctg_number.clone(),
                    line_number: entry.line_number,
                    final_factor: item.result.final_factor,
                    grade: item.result.grade,
                    waste_percent: item.result.humidity_waste.waste_percent,
                    waste_kg: item.result.humidity_waste.waste_kg,
                    requires_drying: item.result.humidity_waste.requires_drying,
                    out_of_standard: item.result.out_of_standard,
                    warnings: item.result.warnings.len(),
                    discrepancy: item.discrepancy,
                }),
                Err(reason) => {
                    tracing::warn!(
                        settlement_id = %settlement.id,
                        ctg_number = %entry.ctg_number,
                        %reason,
                        "Failed to persist quality result"
                    );
                    failures.push(FailedEntry {
                        ctg_entry_id: entry.id,
                        ctg_number: entry.ctg_number.clone(),
                        line_number: entry.line_number,
                        reason,
                    });
                }
            }
        }

        results.sort_by_key(|r| r.line_number);
        discrepancies.sort_by_key(|d| d.line_number);
        failures.sort_by_key(|f| f.line_number);

        // Every entry future has completed at this point
        let status =
            SettlementStatus::after_recalculation(!discrepancies.is_empty(), !failures.is_empty());
        tokio::time::timeout(
            self.options.persist_timeout,
            self.store.update_settlement_status(settlement.id, status),
        )
        .await
        .map_err(|_| AppError::PersistenceTimeout("updating settlement status".to_string()))??;

        tracing::info!(
            settlement_id = %settlement.id,
            from = %settlement.status,
            to = %status,
            recalculated = results.len(),
            skipped = skipped_entries.len(),
            failed = failures.len(),
            discrepancies = discrepancies.len(),
            "Settlement recalculated"
        );

        Ok(RecalculationReport {
            settlement_id: settlement.id,
            total_ctgs: settlement.entries.len(),
            recalculated: results.len(),
            skipped: skipped_entries.len(),
            failed: failures.len(),
            discrepancies,
            results,
            skipped_entries,
            failures,
            status,
            calculation_version: self.calculator.calculation_version().to_string(),
        })
    }

    async fn persist(
        &self,
        entry: &CtgEntry,
        result: &QualityResult,
    ) -> Result<QualityResultRecord, String> {
        match tokio::time::timeout(
            self.options.persist_timeout,
            self.store.upsert_quality_result(entry, result),
        )
        .await
        {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "Persistence timed out after {} ms",
                self.options.persist_timeout.as_millis()
            )),
        }
    }
}
