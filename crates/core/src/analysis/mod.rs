//! Metric records and the aggregator that folds them into summaries.

mod aggregate;
mod types;

pub use aggregate::*;
pub use types::*;
