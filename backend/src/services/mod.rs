//! Business logic services for the grain settlement server

pub mod export;
pub mod recalculation;

pub use recalculation::{
    RecalculationOptions, RecalculationReport, RecalculationService, NO_ANALYSIS_REASON,
};
