//! Domain models for the grain settlement engine

mod analysis;
mod grain;
mod quality;
mod settlement;

pub use analysis::*;
pub use grain::*;
pub use quality::*;
pub use settlement::*;
