use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::analysis::StepOutput;
use crate::github::{AccessToken, RepositoryDescriptor, RepositoryFetcher};
use crate::pipeline::context::{ScratchContext, StepError};
use crate::pipeline::parse;
use crate::pipeline::prompts;
use crate::pipeline::step::MetricStep;
use crate::summarizer::Summarizer;

/// Lets the summarizer pick representative code files, downloads them and
/// asks for a description and a 0..=100 score.
///
/// The concatenated file contents are kept in the scratch context for the
/// project description.
pub struct CodeQualityStep {
    fetcher: Arc<dyn RepositoryFetcher>,
    summarizer: Arc<dyn Summarizer>,
    max_files: usize,
    fetch_concurrency: usize,
}

impl CodeQualityStep {
    pub fn new(
        fetcher: Arc<dyn RepositoryFetcher>,
        summarizer: Arc<dyn Summarizer>,
        max_files: usize,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            summarizer,
            max_files,
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }
}

#[async_trait]
impl MetricStep for CodeQualityStep {
    fn name(&self) -> &'static str {
        "code_quality"
    }

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        let tree = ctx.directory_tree()?;
        let answer = self
            .summarizer
            .complete(&prompts::file_selection(tree, self.max_files))
            .await;
        let choices = parse::file_choices(&answer, self.max_files);
        debug!(
            "{} files chosen for review in {}",
            choices.len(),
            repo.full_name()
        );

        // Order of the chosen files is preserved.
        let shas = choices.into_iter().map(|choice| choice.sha_hash);
        let contents: Vec<Option<String>> = stream::iter(shas)
            .map(|sha| async move { self.fetcher.get_file_content(repo, token, &sha).await })
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let mut file_contents = String::new();
        for content in contents.into_iter().flatten() {
            file_contents.push_str(&content);
            file_contents.push_str("\n\n");
        }

        let answer = self
            .summarizer
            .complete(&prompts::code_quality(&file_contents))
            .await;
        ctx.set_file_contents(file_contents);

        let (commentary, score) = parse::code_quality(&answer);
        Ok(StepOutput::CodeQuality { commentary, score })
    }
}
