use async_trait::async_trait;

use crate::analysis::StepOutput;
use crate::github::{AccessToken, RepositoryDescriptor};

use super::context::{ScratchContext, StepError};

/// One unit of metric extraction for a repository.
///
/// Steps may read scratch values written by earlier steps and write values
/// for later ones. Collaborator failures are absorbed into default output;
/// an `Err` means the run itself is broken and stops the repository loop.
#[async_trait]
pub trait MetricStep: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError>;
}
