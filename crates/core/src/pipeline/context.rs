use thiserror::Error;

/// Faults that abort the repository loop of a run.
///
/// Collaborator failures never show up here; fetchers and summarizers
/// degrade to empty values instead.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Scratch value {0} was not produced by an earlier step")]
    MissingContext(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Values handed from one step to a later step of the same repository.
///
/// A fresh context is created for every repository.
#[derive(Debug, Clone, Default)]
pub struct ScratchContext {
    directory_tree: Option<String>,
    file_contents: Option<String>,
    project_description: Option<String>,
}

impl ScratchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_directory_tree(&mut self, tree: String) {
        self.directory_tree = Some(tree);
    }

    pub fn directory_tree(&self) -> Result<&str, StepError> {
        self.directory_tree
            .as_deref()
            .ok_or(StepError::MissingContext("directory_tree"))
    }

    pub fn set_file_contents(&mut self, contents: String) {
        self.file_contents = Some(contents);
    }

    pub fn file_contents(&self) -> Result<&str, StepError> {
        self.file_contents
            .as_deref()
            .ok_or(StepError::MissingContext("file_contents"))
    }

    pub fn set_project_description(&mut self, description: String) {
        self.project_description = Some(description);
    }

    pub fn project_description(&self) -> Result<&str, StepError> {
        self.project_description
            .as_deref()
            .ok_or(StepError::MissingContext("project_description"))
    }
}
