//! Configuration management for the grain settlement server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with GSE_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::DiscrepancyThresholds;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Grain rule tables
    #[serde(default)]
    pub rules: RulesConfig,

    /// Settlement recalculation tuning
    #[serde(default)]
    pub recalculation: RecalculationConfig,

    /// Discrepancy severity thresholds
    #[serde(default)]
    pub discrepancy: DiscrepancyConfig,

    /// Log output
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify JWT tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RulesConfig {
    /// JSON rule book; the built-in tables are used when absent
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecalculationConfig {
    /// Entries persisted concurrently per settlement
    pub max_concurrency: usize,

    /// Timeout for each persistence call, in milliseconds
    pub persist_timeout_ms: u64,
}

impl RecalculationConfig {
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }
}

impl Default for RecalculationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            persist_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscrepancyConfig {
    /// Differences above this many factor points are a discrepancy
    pub warning_threshold: Decimal,

    /// Differences above this many factor points are critical
    pub critical_threshold: Decimal,
}

impl Default for DiscrepancyConfig {
    fn default() -> Self {
        let thresholds = DiscrepancyThresholds::default();
        Self {
            warning_threshold: thresholds.warning,
            critical_threshold: thresholds.critical,
        }
    }
}

impl DiscrepancyConfig {
    pub fn thresholds(&self) -> DiscrepancyThresholds {
        DiscrepancyThresholds::new(self.warning_threshold, self.critical_threshold)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("GSE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("recalculation.max_concurrency", 8)?
            .set_default("recalculation.persist_timeout_ms", 5000)?
            .set_default("discrepancy.warning_threshold", "0.5")?
            .set_default("discrepancy.critical_threshold", "2.0")?
            .set_default("log.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (GSE_ prefix)
            .add_source(
                Environment::with_prefix("GSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.recalculation.max_concurrency == 0 {
            return Err(ConfigError::Message(
                "recalculation.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.discrepancy.warning_threshold > self.discrepancy.critical_threshold {
            return Err(ConfigError::Message(
                "discrepancy.warning_threshold must not exceed discrepancy.critical_threshold"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
