//! Quality/settlement factor engine
//!
//! Pure functions over a [`RuleBook`](crate::rules::RuleBook): humidity waste,
//! factor calculation and discrepancy detection.

mod discrepancy;
mod factor;
mod humidity;

pub use discrepancy::*;
pub use factor::*;
pub use humidity::*;
