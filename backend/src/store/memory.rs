//! In-memory settlement store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::{CtgEntry, QualityResult, Settlement, SettlementStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{QualityResultRecord, SettlementStore};
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct MemorySettlementStore {
    settlements: RwLock<HashMap<Uuid, Settlement>>,
    results: RwLock<HashMap<(Uuid, Uuid), QualityResultRecord>>,
}

impl MemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_settlement(&self, settlement: Settlement) {
        self.settlements
            .write()
            .await
            .insert(settlement.id, settlement);
    }

    pub async fn settlement_status(&self, settlement_id: Uuid) -> Option<SettlementStatus> {
        self.settlements
            .read()
            .await
            .get(&settlement_id)
            .map(|s| s.status)
    }

    pub async fn entry_waste_kg(&self, ctg_entry_id: Uuid) -> Option<Decimal> {
        self.settlements
            .read()
            .await
            .values()
            .flat_map(|s| s.entries.iter())
            .find(|e| e.id == ctg_entry_id)
            .and_then(|e| e.waste_kg)
    }

    pub async fn result_count(&self) -> usize {
        self.results.read().await.len()
    }
}

#[async_trait]
impl SettlementStore for MemorySettlementStore {
    async fn load_settlement(
        &self,
        owner_id: Uuid,
        settlement_id: Uuid,
    ) -> AppResult<Option<Settlement>> {
        let settlements = self.settlements.read().await;
        let Some(settlement) = settlements
            .get(&settlement_id)
            .filter(|s| s.owner_id == owner_id)
        else {
            return Ok(None);
        };

        let mut settlement = settlement.clone();
        settlement.entries.sort_by_key(|e| e.line_number);
        for entry in &mut settlement.entries {
            // Latest first
            entry.analyses.sort_by(|a, b| {
                (b.analysis_date, b.created_at).cmp(&(a.analysis_date, a.created_at))
            });
        }
        Ok(Some(settlement))
    }

    async fn upsert_quality_result(
        &self,
        entry: &CtgEntry,
        result: &QualityResult,
    ) -> AppResult<QualityResultRecord> {
        // Lock order: settlements, then results
        let mut settlements = self.settlements.write().await;
        let mut results = self.results.write().await;

        let stored_entry = settlements
            .get_mut(&entry.settlement_id)
            .and_then(|s| s.entries.iter_mut().find(|e| e.id == entry.id))
            .ok_or_else(|| AppError::NotFound("CTG entry".to_string()))?;
        stored_entry.waste_kg = Some(result.humidity_waste.waste_kg);

        let now = Utc::now();
        let key = (result.analysis_id, entry.id);
        let record = match results.get(&key) {
            Some(existing) => QualityResultRecord {
                result: result.clone(),
                ctg_number: entry.ctg_number.clone(),
                line_number: entry.line_number,
                updated_at: now,
                ..existing.clone()
            },
            None => QualityResultRecord {
                id: Uuid::new_v4(),
                analysis_id: result.analysis_id,
                ctg_entry_id: entry.id,
                ctg_number: entry.ctg_number.clone(),
                line_number: entry.line_number,
                result: result.clone(),
                created_at: now,
                updated_at: now,
            },
        };
        results.insert(key, record.clone());
        Ok(record)
    }

    async fn update_settlement_status(
        &self,
        settlement_id: Uuid,
        status: SettlementStatus,
    ) -> AppResult<()> {
        let mut settlements = self.settlements.write().await;
        let settlement = settlements
            .get_mut(&settlement_id)
            .ok_or_else(|| AppError::NotFound("Settlement".to_string()))?;
        settlement.status = status;
        Ok(())
    }

    async fn list_quality_results(
        &self,
        owner_id: Uuid,
        settlement_id: Uuid,
    ) -> AppResult<Vec<QualityResultRecord>> {
        let settlements = self.settlements.read().await;
        let Some(settlement) = settlements
            .get(&settlement_id)
            .filter(|s| s.owner_id == owner_id)
        else {
            return Err(AppError::NotFound("Settlement".to_string()));
        };

        let results = self.results.read().await;
        let mut records: Vec<QualityResultRecord> = results
            .values()
            .filter(|r| settlement.entries.iter().any(|e| e.id == r.ctg_entry_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (a.line_number, a.updated_at).cmp(&(b.line_number, b.updated_at))
        });
        Ok(records)
    }
}
