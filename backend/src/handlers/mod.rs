//! HTTP handlers

pub mod health;
pub mod quality;
pub mod rules;
pub mod settlement;

pub use health::health_check;
pub use quality::{calculate_quality, check_discrepancy, humidity_waste};
pub use rules::{get_grain_rules, get_rule_book};
pub use settlement::{list_quality_results, recalculate_settlement};
