//! HTTP handlers exposing the loaded rule book

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use shared::{normalize_grain_name, GrainRules, GrainType};

use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Serialize)]
pub struct RuleBookSummary {
    pub version: String,
    pub grain_types: Vec<GrainType>,
}

#[derive(Serialize)]
pub struct GrainRulesResponse {
    pub grain_type: String,
    /// False when the name has no table and the zero-effect table applies
    pub known: bool,
    pub version: String,
    pub rules: GrainRules,
}

/// Rule book version and configured grains
pub async fn get_rule_book(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> Json<RuleBookSummary> {
    Json(RuleBookSummary {
        version: state.rules.version.clone(),
        grain_types: state.rules.grain_types().collect(),
    })
}

/// Rule table for one grain name
pub async fn get_grain_rules(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(grain): Path<String>,
) -> Json<GrainRulesResponse> {
    let lookup = state.rules.rules_for(&grain);
    Json(GrainRulesResponse {
        grain_type: lookup
            .grain_type
            .map(|g| g.as_str().to_string())
            .unwrap_or_else(|| normalize_grain_name(&grain)),
        known: lookup.is_known(),
        version: state.rules.version.clone(),
        rules: lookup.rules.clone(),
    })
}
