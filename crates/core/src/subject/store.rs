//! Subject storage trait.

use thiserror::Error;

use crate::analysis::{RepositoryMetrics, SubjectMetricSummary};
use crate::github::RepositoryDescriptor;

use super::types::{
    AnalysisStatus, CachedRun, RepositorySelection, RunOutcome, SubjectRef, TeamRecord,
    UserRecord,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Persistent state of users and teams.
///
/// Every method is a single atomic update of one subject's document.
pub trait SubjectStore: Send + Sync {
    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Create the user, or refresh the repository listing of an existing one.
    fn upsert_user(
        &self,
        username: &str,
        repositories: &[RepositoryDescriptor],
    ) -> Result<UserRecord, StoreError>;

    /// Remove the user and its cached run.
    fn delete_user(&self, username: &str) -> Result<(), StoreError>;

    /// Replace the selection. The cached run survives only when its selection
    /// equals the new one; otherwise it is dropped together with the live
    /// metrics and summary.
    fn replace_selection(
        &self,
        username: &str,
        selection: &RepositorySelection,
    ) -> Result<UserRecord, StoreError>;

    fn get_status(&self, subject: &SubjectRef) -> Result<Option<AnalysisStatus>, StoreError>;

    fn set_status(&self, subject: &SubjectRef, status: AnalysisStatus) -> Result<(), StoreError>;

    /// Move the subject to `InProgress` unless it already is.
    ///
    /// Returns `false` when a run is already in progress.
    fn try_begin_run(&self, subject: &SubjectRef) -> Result<bool, StoreError>;

    fn replace_metrics(&self, username: &str, metrics: &RepositoryMetrics)
        -> Result<(), StoreError>;

    fn replace_summary(
        &self,
        subject: &SubjectRef,
        summary: &SubjectMetricSummary,
    ) -> Result<(), StoreError>;

    fn record_run_outcome(&self, username: &str, outcome: &RunOutcome) -> Result<(), StoreError>;

    fn get_cached_run(&self, username: &str) -> Result<Option<CachedRun>, StoreError>;

    fn store_cached_run(&self, username: &str, run: &CachedRun) -> Result<(), StoreError>;

    /// Back to `NotStarted` with no selection, metrics or summary. The cached
    /// run is kept.
    fn reset_user(&self, username: &str) -> Result<(), StoreError>;

    /// Fails with [`StoreError::Conflict`] when the name is taken.
    fn create_team(
        &self,
        name: &str,
        members: &[String],
        created_by: &str,
    ) -> Result<TeamRecord, StoreError>;

    fn get_team(&self, name: &str) -> Result<Option<TeamRecord>, StoreError>;

    fn delete_team(&self, name: &str) -> Result<(), StoreError>;

    /// Teams that list `username` as a member, by name.
    fn list_teams_for_user(&self, username: &str) -> Result<Vec<TeamRecord>, StoreError>;

    /// Back to `NotStarted` with no summary.
    fn reset_team(&self, name: &str) -> Result<(), StoreError>;

    /// Move every `InProgress` user and team to `Completed`.
    ///
    /// Returns how many subjects were released.
    fn release_interrupted_runs(&self) -> Result<usize, StoreError>;
}
