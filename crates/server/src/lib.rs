//! HTTP surface of the repository analysis service.

pub mod api;
pub mod metrics;
pub mod state;
