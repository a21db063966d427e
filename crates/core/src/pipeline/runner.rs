use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::analysis::RepoMetricSet;
use crate::config::{AnalysisConfig, GithubConfig};
use crate::github::{AccessToken, RepositoryDescriptor, RepositoryFetcher};
use crate::metrics::{STEP_DURATION, STEP_FAILURES};
use crate::summarizer::Summarizer;

use super::context::{ScratchContext, StepError};
use super::step::MetricStep;
use super::steps::{
    BranchesStep, CodeQualityStep, CommitHistoryStep, ContributionStep, DescriptionStep,
    DirectoryStep, LanguagesStep, PopularityStep, ReadmeStep,
};

/// Ordered metric steps applied to one repository at a time.
pub struct Pipeline {
    steps: Vec<Box<dyn MetricStep>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn MetricStep>>) -> Self {
        Self { steps }
    }

    /// The nine steps that fill every field of a [`RepoMetricSet`].
    pub fn standard(
        fetcher: Arc<dyn RepositoryFetcher>,
        summarizer: Arc<dyn Summarizer>,
        analysis: &AnalysisConfig,
        github: &GithubConfig,
    ) -> Self {
        Self::new(vec![
            Box::new(BranchesStep::new(fetcher.clone(), summarizer.clone())),
            Box::new(DirectoryStep::new(
                fetcher.clone(),
                summarizer.clone(),
                analysis.max_tree_depth,
            )),
            Box::new(CodeQualityStep::new(
                fetcher.clone(),
                summarizer.clone(),
                analysis.max_selected_files,
                github.file_fetch_concurrency,
            )),
            Box::new(PopularityStep),
            Box::new(LanguagesStep::new(fetcher.clone())),
            Box::new(ContributionStep::new(
                fetcher.clone(),
                analysis.contribution_retry_attempts,
                Duration::from_millis(analysis.contribution_retry_delay_ms),
            )),
            Box::new(DescriptionStep::new(summarizer.clone())),
            Box::new(CommitHistoryStep::new(fetcher.clone(), summarizer.clone())),
            Box::new(ReadmeStep::new(fetcher, summarizer)),
        ])
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step against `repo`, calling `on_step(index, name)` after each.
    ///
    /// The first step fault aborts the remaining steps for this repository.
    pub async fn run<F>(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        mut on_step: F,
    ) -> Result<RepoMetricSet, StepError>
    where
        F: FnMut(usize, &'static str) + Send,
    {
        let mut metrics = RepoMetricSet::new();
        let mut ctx = ScratchContext::new();

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();
            let started = Instant::now();

            let output = match step.run(repo, token, &mut ctx).await {
                Ok(output) => output,
                Err(e) => {
                    STEP_FAILURES.with_label_values(&[name]).inc();
                    warn!("Step {} failed for {}: {}", name, repo.full_name(), e);
                    return Err(e);
                }
            };

            STEP_DURATION
                .with_label_values(&[name])
                .observe(started.elapsed().as_secs_f64());
            debug!(
                "Step {} done for {} in {:?}",
                name,
                repo.full_name(),
                started.elapsed()
            );

            metrics.apply(output);
            on_step(index, name);
        }

        Ok(metrics)
    }
}
