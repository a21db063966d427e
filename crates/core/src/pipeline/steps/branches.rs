use std::sync::Arc;

use async_trait::async_trait;

use crate::analysis::StepOutput;
use crate::github::{AccessToken, RepositoryDescriptor, RepositoryFetcher};
use crate::pipeline::context::{ScratchContext, StepError};
use crate::pipeline::parse::commentary;
use crate::pipeline::prompts;
use crate::pipeline::step::MetricStep;
use crate::summarizer::Summarizer;

/// Commentary for repositories that never branched.
pub const SINGLE_BRANCH: &str = "Only Master/Main branch Exists";

/// Commentary on branch naming and count.
pub struct BranchesStep {
    fetcher: Arc<dyn RepositoryFetcher>,
    summarizer: Arc<dyn Summarizer>,
}

impl BranchesStep {
    pub fn new(fetcher: Arc<dyn RepositoryFetcher>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            fetcher,
            summarizer,
        }
    }
}

#[async_trait]
impl MetricStep for BranchesStep {
    fn name(&self) -> &'static str {
        "branches"
    }

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        _ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        let branches = self.fetcher.get_branches(repo, token).await;
        if branches.len() <= 1 {
            return Ok(StepOutput::Branches(SINGLE_BRANCH.to_string()));
        }

        let response = self.summarizer.complete(&prompts::branches(&branches)).await;
        Ok(StepOutput::Branches(commentary(&response)))
    }
}
