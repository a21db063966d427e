//! In-flight progress of analysis runs.
//!
//! One fractional entry per subject, present only while a run for that
//! subject is executing. Observers can follow changes through
//! [`ProgressTracker::subscribe`].

mod tracker;

pub use tracker::*;
