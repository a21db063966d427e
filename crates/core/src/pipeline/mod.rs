//! Per-repository metric extraction.
//!
//! A [`Pipeline`] runs a fixed sequence of [`MetricStep`]s against one
//! repository. Steps share a [`ScratchContext`] that lives only for that
//! repository.

mod context;
pub mod parse;
mod prompts;
mod runner;
mod step;
pub mod steps;

pub use context::{ScratchContext, StepError};
pub use runner::Pipeline;
pub use step::MetricStep;
