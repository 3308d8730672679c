//! Settlement persistence
//!
//! The recalculation orchestrator only talks to [`SettlementStore`]; the
//! PostgreSQL implementation backs the server and the in-memory one backs
//! tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{CtgEntry, QualityResult, Settlement, SettlementStatus};
use uuid::Uuid;

use crate::error::AppResult;

mod memory;
mod postgres;

pub use memory::MemorySettlementStore;
pub use postgres::PgSettlementStore;

/// A persisted quality result. Unique per `(analysis_id, ctg_entry_id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityResultRecord {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub ctg_entry_id: Uuid,
    pub ctg_number: String,
    pub line_number: i32,
    pub result: QualityResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Settlement with entries ordered by line number, each with its analyses
    /// (latest first). `None` when it does not exist for this owner.
    async fn load_settlement(
        &self,
        owner_id: Uuid,
        settlement_id: Uuid,
    ) -> AppResult<Option<Settlement>>;

    /// Insert or update the result for `(analysis_id, ctg_entry_id)` and store
    /// the entry's humidity waste, atomically.
    async fn upsert_quality_result(
        &self,
        entry: &CtgEntry,
        result: &QualityResult,
    ) -> AppResult<QualityResultRecord>;

    async fn update_settlement_status(
        &self,
        settlement_id: Uuid,
        status: SettlementStatus,
    ) -> AppResult<()>;

    /// Persisted results of a settlement ordered by line number
    async fn list_quality_results(
        &self,
        owner_id: Uuid,
        settlement_id: Uuid,
    ) -> AppResult<Vec<QualityResultRecord>>;
}
