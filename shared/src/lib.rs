//! Shared types and the quality/settlement factor engine
//!
//! This crate is pure and I/O free: the backend persists what it computes and
//! the WASM module exposes it to the browser for previews.

pub mod calculation;
pub mod models;
pub mod rules;
pub mod types;
pub mod validation;

pub use calculation::*;
pub use models::*;
pub use rules::*;
pub use types::*;
pub use validation::*;
