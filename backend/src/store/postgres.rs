//! PostgreSQL settlement store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    CtgEntry, Measurements, QualityAnalysis, QualityResult, Settlement, SettlementStatus,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{QualityResultRecord, SettlementStore};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PgSettlementStore {
    db: PgPool,
}

impl PgSettlementStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Database row for a settlement
#[derive(Debug, sqlx::FromRow)]
struct SettlementRow {
    id: Uuid,
    owner_id: Uuid,
    grain_type: String,
    settlement_date: NaiveDate,
    price_per_ton: Option<Decimal>,
    gross_kg: Decimal,
    net_kg: Decimal,
    total_amount: Option<Decimal>,
    status: String,
}

/// Database row for a CTG entry
#[derive(Debug, sqlx::FromRow)]
struct CtgEntryRow {
    id: Uuid,
    settlement_id: Uuid,
    line_number: i32,
    ctg_number: String,
    gross_kg: Decimal,
    net_kg: Decimal,
    waste_kg: Option<Decimal>,
    factor: Option<Decimal>,
}

impl From<CtgEntryRow> for CtgEntry {
    fn from(row: CtgEntryRow) -> Self {
        CtgEntry {
            id: row.id,
            settlement_id: row.settlement_id,
            line_number: row.line_number,
            ctg_number: row.ctg_number,
            gross_kg: row.gross_kg,
            net_kg: row.net_kg,
            waste_kg: row.waste_kg,
            factor: row.factor,
            analyses: Vec::new(),
        }
    }
}

/// Database row for a quality analysis
#[derive(Debug, sqlx::FromRow)]
struct AnalysisRow {
    id: Uuid,
    ctg_entry_id: Uuid,
    analysis_date: NaiveDate,
    humidity: Option<Decimal>,
    foreign_matter: Option<Decimal>,
    damaged_grains: Option<Decimal>,
    hectoliter_weight: Option<Decimal>,
    protein: Option<Decimal>,
    broken_grains: Option<Decimal>,
    green_grains: Option<Decimal>,
    burnt_grains: Option<Decimal>,
    sprouted_grains: Option<Decimal>,
    pest_damaged: Option<Decimal>,
    observations: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for QualityAnalysis {
    fn from(row: AnalysisRow) -> Self {
        QualityAnalysis {
            id: row.id,
            ctg_entry_id: row.ctg_entry_id,
            analysis_date: row.analysis_date,
            measurements: Measurements {
                humidity: row.humidity,
                foreign_matter: row.foreign_matter,
                damaged_grains: row.damaged_grains,
                hectoliter_weight: row.hectoliter_weight,
                protein: row.protein,
                broken_grains: row.broken_grains,
                green_grains: row.green_grains,
                burnt_grains: row.burnt_grains,
                sprouted_grains: row.sprouted_grains,
                pest_damaged: row.pest_damaged,
            },
            observations: row.observations,
            created_at: row.created_at,
        }
    }
}

/// Database row for a quality result joined with its entry
#[derive(Debug, sqlx::FromRow)]
struct QualityResultRow {
    id: Uuid,
    analysis_id: Uuid,
    ctg_entry_id: Uuid,
    ctg_number: String,
    line_number: i32,
    detail: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QualityResultRow> for QualityResultRecord {
    type Error = AppError;

    fn try_from(row: QualityResultRow) -> Result<Self, Self::Error> {
        let result: QualityResult = serde_json::from_value(row.detail).map_err(|e| {
            AppError::Internal(format!("Corrupt quality result {}: {}", row.id, e))
        })?;
        Ok(QualityResultRecord {
            id: row.id,
            analysis_id: row.analysis_id,
            ctg_entry_id: row.ctg_entry_id,
            ctg_number: row.ctg_number,
            line_number: row.line_number,
            result,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl SettlementStore for PgSettlementStore {
    async fn load_settlement(
        &self,
        owner_id: Uuid,
        settlement_id: Uuid,
    ) -> AppResult<Option<Settlement>> {
        let Some(row) = sqlx::query_as::<_, SettlementRow>(
            r#"
            SELECT id, owner_id, grain_type, settlement_date, price_per_ton,
                   gross_kg, net_kg, total_amount, status
            FROM settlements
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(settlement_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        else {
            return Ok(None);
        };

        let status = SettlementStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown settlement status '{}'", row.status))
        })?;

        let mut entries: Vec<CtgEntry> = sqlx::query_as::<_, CtgEntryRow>(
            r#"
            SELECT id, settlement_id, line_number, ctg_number, gross_kg, net_kg,
                   waste_kg, factor
            FROM ctg_entries
            WHERE settlement_id = $1
            ORDER BY line_number
            "#,
        )
        .bind(settlement_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(CtgEntry::from)
        .collect();

        let entry_ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
        let analyses = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT id, ctg_entry_id, analysis_date, humidity, foreign_matter,
                   damaged_grains, hectoliter_weight, protein, broken_grains,
                   green_grains, burnt_grains, sprouted_grains, pest_damaged,
                   observations, created_at
            FROM quality_analyses
            WHERE ctg_entry_id = ANY($1)
            ORDER BY analysis_date DESC, created_at DESC
            "#,
        )
        .bind(&entry_ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_entry: HashMap<Uuid, Vec<QualityAnalysis>> = HashMap::new();
        for analysis in analyses {
            by_entry
                .entry(analysis.ctg_entry_id)
                .or_default()
                .push(analysis.into());
        }
        for entry in &mut entries {
            entry.analyses = by_entry.remove(&entry.id).unwrap_or_default();
        }

        Ok(Some(Settlement {
            id: row.id,
            owner_id: row.owner_id,
            grain_type: row.grain_type,
            settlement_date: row.settlement_date,
            price_per_ton: row.price_per_ton,
            gross_kg: row.gross_kg,
            net_kg: row.net_kg,
            total_amount: row.total_amount,
            status,
            entries,
        }))
    }

    async fn upsert_quality_result(
        &self,
        entry: &CtgEntry,
        result: &QualityResult,
    ) -> AppResult<QualityResultRecord> {
        let detail = serde_json::to_value(result).map_err(|e| AppError::Internal(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, QualityResultRow>(
            r#"
            WITH upserted AS (
                INSERT INTO quality_results (
                    analysis_id, ctg_entry_id, grain_type, final_factor, grade,
                    out_of_standard, detail, calculation_version
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (analysis_id, ctg_entry_id) DO UPDATE SET
                    grain_type = EXCLUDED.grain_type,
                    final_factor = EXCLUDED.final_factor,
                    grade = EXCLUDED.grade,
                    out_of_standard = EXCLUDED.out_of_standard,
                    detail = EXCLUDED.detail,
                    calculation_version = EXCLUDED.calculation_version,
                    updated_at = NOW()
                RETURNING id, analysis_id, ctg_entry_id, detail, created_at, updated_at
            )
            SELECT u.id, u.analysis_id, u.ctg_entry_id, c.ctg_number, c.line_number,
                   u.detail, u.created_at, u.updated_at
            FROM upserted u
            JOIN ctg_entries c ON c.id = u.ctg_entry_id
            "#,
        )
        .bind(result.analysis_id)
        .bind(entry.id)
        .bind(&result.grain_type)
        .bind(result.final_factor)
        .bind(result.grade.map(|g| g.as_str()))
        .bind(result.out_of_standard)
        .bind(&detail)
        .bind(&result.calculation_version)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE ctg_entries
            SET waste_kg = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(entry.id)
        .bind(result.humidity_waste.waste_kg)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    async fn update_settlement_status(
        &self,
        settlement_id: Uuid,
        status: SettlementStatus,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE settlements
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(settlement_id)
        .bind(status.as_str())
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("Settlement".to_string()));
        }
        Ok(())
    }

    async fn list_quality_results(
        &self,
        owner_id: Uuid,
        settlement_id: Uuid,
    ) -> AppResult<Vec<QualityResultRecord>> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM settlements WHERE id = $1 AND owner_id = $2)",
        )
        .bind(settlement_id)
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Settlement".to_string()));
        }

        let rows = sqlx::query_as::<_, QualityResultRow>(
            r#"
            SELECT r.id, r.analysis_id, r.ctg_entry_id, c.ctg_number, c.line_number,
                   r.detail, r.created_at, r.updated_at
            FROM quality_results r
            JOIN ctg_entries c ON c.id = r.ctg_entry_id
            WHERE c.settlement_id = $1
            ORDER BY c.line_number, r.updated_at
            "#,
        )
        .bind(settlement_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(QualityResultRecord::try_from).collect()
    }
}
