//! HTTP handlers for settlement recalculation and results

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::export::quality_results_to_csv;
use crate::services::recalculation::RecalculationReport;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub format: Option<String>, // "json" or "csv"
}

/// Recalculate every CTG entry of a settlement
pub async fn recalculate_settlement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(settlement_id): Path<Uuid>,
) -> AppResult<Json<RecalculationReport>> {
    let user = current_user.0;
    tracing::info!(
        user_id = %user.user_id,
        owner_id = %user.owner_id,
        %settlement_id,
        "Recalculation requested"
    );

    let report = state
        .recalculation_service()
        .recalculate(user.owner_id, settlement_id)
        .await?;
    Ok(Json(report))
}

/// Persisted quality results of a settlement
pub async fn list_quality_results(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(settlement_id): Path<Uuid>,
    Query(query): Query<ResultsQuery>,
) -> AppResult<Response> {
    let records = state
        .store
        .list_quality_results(current_user.0.owner_id, settlement_id)
        .await?;

    if query.format.as_deref() == Some("csv") {
        let csv = quality_results_to_csv(&records)?;
        let disposition = format!(
            "attachment; filename=\"quality_results_{}.csv\"",
            settlement_id
        );
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response());
    }

    Ok(Json(records).into_response())
}
