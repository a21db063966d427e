use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{RepositoryMetrics, SubjectMetricSummary};
use crate::github::RepositoryDescriptor;

/// Lifecycle of a subject's analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::NotStarted => "not_started",
            AnalysisStatus::InProgress => "in_progress",
            AnalysisStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(AnalysisStatus::NotStarted),
            "in_progress" => Ok(AnalysisStatus::InProgress),
            "completed" => Ok(AnalysisStatus::Completed),
            other => Err(format!("unknown analysis status: {other}")),
        }
    }
}

/// A user or a team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubjectRef {
    User(String),
    Team(String),
}

impl SubjectRef {
    pub fn user(name: impl Into<String>) -> Self {
        SubjectRef::User(name.into())
    }

    pub fn team(name: impl Into<String>) -> Self {
        SubjectRef::Team(name.into())
    }

    pub fn id(&self) -> &str {
        match self {
            SubjectRef::User(id) | SubjectRef::Team(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SubjectRef::User(_) => "user",
            SubjectRef::Team(_) => "team",
        }
    }

    /// Key under which progress is tracked. Users and teams live in separate namespaces.
    pub fn progress_key(&self) -> String {
        format!("{}:{}", self.kind(), self.id())
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Repository ids chosen for analysis. Compared as a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositorySelection(BTreeSet<u64>);

impl RepositorySelection {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, id: u64) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }
}

/// Snapshot of a finished run, reused when the same selection is analyzed again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRun {
    pub selection: RepositorySelection,
    pub metrics: RepositoryMetrics,
    pub summary: SubjectMetricSummary,
    pub created_at: DateTime<Utc>,
}

/// What happened during the most recent run of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repositories_requested: usize,
    pub repositories_completed: usize,
    pub from_cache: bool,
    /// Fault that stopped the repository loop early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn is_partial(&self) -> bool {
        self.error.is_some() || self.repositories_completed < self.repositories_requested
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub status: AnalysisStatus,
    /// Repositories known from the last GitHub listing, in listing order.
    pub github_repositories: Vec<RepositoryDescriptor>,
    pub selection: RepositorySelection,
    pub metrics: RepositoryMetrics,
    pub summary: Option<SubjectMetricSummary>,
    pub last_run: Option<RunOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Known repositories that are selected, in listing order.
    pub fn selected_repositories(&self) -> Vec<RepositoryDescriptor> {
        self.github_repositories
            .iter()
            .filter(|r| self.selection.contains(r.id))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    pub members: Vec<String>,
    pub status: AnalysisStatus,
    pub summary: Option<SubjectMetricSummary>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamRecord {
    pub fn has_member(&self, username: &str) -> bool {
        self.members.iter().any(|m| m == username)
    }
}
