//! Route definitions for the grain settlement server

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - settlements
        .nest("/settlements", settlement_routes(state.clone()))
        // Protected routes - quality previews
        .nest("/quality", quality_routes(state.clone()))
        // Protected routes - rule tables
        .nest("/rules", rule_routes(state))
}

/// Settlement routes (protected)
fn settlement_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/:settlement_id/recalculate",
            post(handlers::recalculate_settlement),
        )
        .route(
            "/:settlement_id/quality-results",
            get(handlers::list_quality_results),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Quality calculation routes (protected)
fn quality_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/calculate", post(handlers::calculate_quality))
        .route("/humidity-waste", post(handlers::humidity_waste))
        .route("/discrepancy", post(handlers::check_discrepancy))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Rule book routes (protected)
fn rule_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_rule_book))
        .route("/:grain", get(handlers::get_grain_rules))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
