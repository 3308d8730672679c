//! Grain Settlement Engine - Backend
//!
//! Recalculates quality factors, humidity waste and discrepancies for grain
//! settlements and serves them over HTTP.

use std::sync::Arc;

use axum::{routing::get, Router};
use shared::{FactorCalculator, RuleBook};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{RecalculationOptions, RecalculationService};
use store::SettlementStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    /// Loaded once at startup, never mutated
    pub rules: Arc<RuleBook>,
    pub store: Arc<dyn SettlementStore>,
}

impl AppState {
    pub fn calculator(&self) -> FactorCalculator {
        FactorCalculator::new(self.rules.clone())
    }

    pub fn recalculation_service(&self) -> RecalculationService {
        RecalculationService::new(
            self.store.clone(),
            self.calculator(),
            self.config.discrepancy.thresholds(),
            RecalculationOptions::from(&self.config.recalculation),
        )
    }
}

/// Load the rule book from the configured JSON file, or the built-in tables
pub fn load_rule_book(config: &Config) -> AppResult<RuleBook> {
    match &config.rules.path {
        Some(path) => read_rule_book(path),
        None => {
            let book = RuleBook::standard();
            tracing::info!(version = %book.version, "Using built-in rule book");
            Ok(book)
        }
    }
}

fn read_rule_book(path: &str) -> AppResult<RuleBook> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| AppError::Configuration(format!("cannot read rule book {}: {}", path, e)))?;
    let book = RuleBook::from_json(&json)?;
    tracing::info!(path = %path, version = %book.version, "Loaded rule book");
    Ok(book)
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Grain Settlement Engine API v1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rule_book_file_is_a_configuration_error() {
        let path = std::env::temp_dir()
            .join(format!("gse-missing-{}.json", uuid::Uuid::new_v4()));
        let result = read_rule_book(&path.to_string_lossy());
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn malformed_rule_book_is_a_rules_error() {
        let path = std::env::temp_dir()
            .join(format!("gse-broken-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ not json").unwrap();

        let result = read_rule_book(&path.to_string_lossy());
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            result,
            Err(AppError::Rules(shared::RuleError::Parse(_)))
        ));
    }
}
