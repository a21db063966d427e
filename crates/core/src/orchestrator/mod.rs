//! Analysis orchestrator.
//!
//! Starts background runs for users and teams, drives the per-repository
//! pipeline, reports progress and commits results:
//! - **Users**: selected repositories are analyzed sequentially, or a
//!   cached run for the same selection is replayed
//! - **Teams**: the members' stored summaries are aggregated

mod runner;
mod subjects;
mod types;

pub use runner::AnalysisOrchestrator;
pub use types::{TriggerAccepted, TriggerRejected};
