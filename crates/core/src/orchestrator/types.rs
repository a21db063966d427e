//! Types for the analysis orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::subject::{StoreError, SubjectRef};

/// Why a run was not started.
#[derive(Debug, Error)]
pub enum TriggerRejected {
    #[error("{0} not found")]
    UnknownSubject(SubjectRef),

    #[error("No repositories selected")]
    NoRepositoriesSelected,

    #[error("An analysis is already in progress")]
    AlreadyInProgress,

    #[error("{0} is not a member of the team")]
    NotAMember(String),

    #[error("subject store error: {0}")]
    Store(#[from] StoreError),
}

/// Acknowledgment of a started run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerAccepted {
    pub run_id: String,
    pub subject: SubjectRef,
}
