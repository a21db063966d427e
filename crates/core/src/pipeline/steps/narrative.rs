//! Steps that judge the project against its own description.

use std::sync::Arc;

use async_trait::async_trait;

use crate::analysis::StepOutput;
use crate::github::{AccessToken, RepositoryDescriptor, RepositoryFetcher};
use crate::pipeline::context::{ScratchContext, StepError};
use crate::pipeline::parse::commentary;
use crate::pipeline::prompts;
use crate::pipeline::step::MetricStep;
use crate::summarizer::Summarizer;

pub const NO_COMMITS: &str = "No commits found!";

pub const NO_README: &str = "No Readme content found!";

/// What the project is about, derived from the reviewed files.
pub struct DescriptionStep {
    summarizer: Arc<dyn Summarizer>,
}

impl DescriptionStep {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl MetricStep for DescriptionStep {
    fn name(&self) -> &'static str {
        "description"
    }

    async fn run(
        &self,
        _repo: &RepositoryDescriptor,
        _token: &AccessToken,
        ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        let prompt = prompts::description(ctx.file_contents()?);
        let description = commentary(&self.summarizer.complete(&prompt).await);
        ctx.set_project_description(description.clone());
        Ok(StepOutput::Description(description))
    }
}

/// Quality of the commit messages, oldest first.
pub struct CommitHistoryStep {
    fetcher: Arc<dyn RepositoryFetcher>,
    summarizer: Arc<dyn Summarizer>,
}

impl CommitHistoryStep {
    pub fn new(fetcher: Arc<dyn RepositoryFetcher>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            fetcher,
            summarizer,
        }
    }
}

#[async_trait]
impl MetricStep for CommitHistoryStep {
    fn name(&self) -> &'static str {
        "commit_history"
    }

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        let description = ctx.project_description()?;
        let mut messages = self.fetcher.get_commit_messages(repo, token).await;
        if messages.is_empty() {
            return Ok(StepOutput::CommitHistory(NO_COMMITS.to_string()));
        }

        messages.reverse();
        let prompt = prompts::commit_history(description, &messages.join("\n"));
        let response = self.summarizer.complete(&prompt).await;
        Ok(StepOutput::CommitHistory(commentary(&response)))
    }
}

/// Quality of the README against the project description.
pub struct ReadmeStep {
    fetcher: Arc<dyn RepositoryFetcher>,
    summarizer: Arc<dyn Summarizer>,
}

impl ReadmeStep {
    pub fn new(fetcher: Arc<dyn RepositoryFetcher>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            fetcher,
            summarizer,
        }
    }
}

#[async_trait]
impl MetricStep for ReadmeStep {
    fn name(&self) -> &'static str {
        "readme"
    }

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        let description = ctx.project_description()?;
        let Some(readme) = self.fetcher.get_readme(repo, token).await else {
            return Ok(StepOutput::Readme(NO_README.to_string()));
        };

        let response = self
            .summarizer
            .complete(&prompts::readme(description, &readme))
            .await;
        Ok(StepOutput::Readme(commentary(&response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::NO_COMMENTARY;
    use crate::testing::{fixtures, MockFetcher, MockRepository, MockSummarizer};

    fn described() -> ScratchContext {
        let mut ctx = ScratchContext::new();
        ctx.set_project_description("A tiny CLI.".into());
        ctx
    }

    async fn fetcher_with(data: MockRepository) -> Arc<MockFetcher> {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_repository_data(3, data).await;
        fetcher
    }

    #[tokio::test]
    async fn test_description_feeds_later_steps() {
        let summarizer = Arc::new(MockSummarizer::with_default("\"A tiny CLI.\""));
        let mut ctx = ScratchContext::new();
        ctx.set_file_contents("fn main() {}\n\n".into());

        let output = DescriptionStep::new(summarizer.clone())
            .run(&fixtures::repository(3, "cli", "alice"), &fixtures::token(), &mut ctx)
            .await
            .unwrap();

        assert_eq!(output, StepOutput::Description("A tiny CLI.".into()));
        assert_eq!(ctx.project_description().unwrap(), "A tiny CLI.");
        assert!(summarizer.prompts().await[0].ends_with("fn main() {}\n\n"));
    }

    #[tokio::test]
    async fn test_empty_description_uses_placeholder() {
        let summarizer = Arc::new(MockSummarizer::with_default(""));
        let mut ctx = ScratchContext::new();
        ctx.set_file_contents(String::new());

        let output = DescriptionStep::new(summarizer)
            .run(&fixtures::repository(3, "cli", "alice"), &fixtures::token(), &mut ctx)
            .await
            .unwrap();
        assert_eq!(output, StepOutput::Description(NO_COMMENTARY.into()));
    }

    #[tokio::test]
    async fn test_commits_sent_oldest_first() {
        let fetcher = fetcher_with(MockRepository {
            commits: vec!["third".into(), "second".into(), "first".into()],
            ..Default::default()
        })
        .await;
        let summarizer = Arc::new(MockSummarizer::with_default("\"Descriptive.\""));

        let output = CommitHistoryStep::new(fetcher, summarizer.clone())
            .run(
                &fixtures::repository(3, "cli", "alice"),
                &fixtures::token(),
                &mut described(),
            )
            .await
            .unwrap();

        assert_eq!(output, StepOutput::CommitHistory("Descriptive.".into()));
        let prompt = &summarizer.prompts().await[0];
        assert!(prompt.contains("A tiny CLI."));
        assert!(prompt.ends_with("first\nsecond\nthird"));
    }

    #[tokio::test]
    async fn test_no_commits_literal() {
        let fetcher = fetcher_with(MockRepository::default()).await;
        let summarizer = Arc::new(MockSummarizer::new());

        let output = CommitHistoryStep::new(fetcher, summarizer.clone())
            .run(
                &fixtures::repository(3, "cli", "alice"),
                &fixtures::token(),
                &mut described(),
            )
            .await
            .unwrap();

        assert_eq!(output, StepOutput::CommitHistory(NO_COMMITS.into()));
        assert_eq!(summarizer.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_readme_absent_literal() {
        let fetcher = fetcher_with(MockRepository::default()).await;
        let summarizer = Arc::new(MockSummarizer::new());

        let output = ReadmeStep::new(fetcher, summarizer.clone())
            .run(
                &fixtures::repository(3, "cli", "alice"),
                &fixtures::token(),
                &mut described(),
            )
            .await
            .unwrap();

        assert_eq!(output, StepOutput::Readme(NO_README.into()));
        assert_eq!(summarizer.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_readme_requires_description() {
        let fetcher = fetcher_with(MockRepository {
            readme: Some("# cli".into()),
            ..Default::default()
        })
        .await;
        let result = ReadmeStep::new(fetcher, Arc::new(MockSummarizer::new()))
            .run(
                &fixtures::repository(3, "cli", "alice"),
                &fixtures::token(),
                &mut ScratchContext::new(),
            )
            .await;
        assert!(matches!(
            result,
            Err(StepError::MissingContext("project_description"))
        ));
    }
}
