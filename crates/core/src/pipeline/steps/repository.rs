//! Steps that copy or compute numbers without the summarizer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::analysis::StepOutput;
use crate::github::{AccessToken, ContributorStats, RepositoryDescriptor, RepositoryFetcher};
use crate::pipeline::context::{ScratchContext, StepError};
use crate::pipeline::step::MetricStep;

/// Fork and star counts straight from the repository listing.
pub struct PopularityStep;

#[async_trait]
impl MetricStep for PopularityStep {
    fn name(&self) -> &'static str {
        "popularity"
    }

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        _token: &AccessToken,
        _ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        Ok(StepOutput::Popularity {
            forks: repo.forks_count,
            stars: repo.stargazers_count,
        })
    }
}

/// Bytes of code per language.
pub struct LanguagesStep {
    fetcher: Arc<dyn RepositoryFetcher>,
}

impl LanguagesStep {
    pub fn new(fetcher: Arc<dyn RepositoryFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl MetricStep for LanguagesStep {
    fn name(&self) -> &'static str {
        "languages"
    }

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        _ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        Ok(StepOutput::Languages(
            self.fetcher.get_languages(repo, token).await,
        ))
    }
}

/// The owner's commit cadence and share of the code.
pub struct ContributionStep {
    fetcher: Arc<dyn RepositoryFetcher>,
    attempts: u32,
    retry_delay: Duration,
}

impl ContributionStep {
    pub fn new(fetcher: Arc<dyn RepositoryFetcher>, attempts: u32, retry_delay: Duration) -> Self {
        Self {
            fetcher,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    /// Contributor statistics, asking again while the host reports none yet.
    async fn fetch(&self, repo: &RepositoryDescriptor, token: &AccessToken) -> Vec<ContributorStats> {
        for attempt in 1..=self.attempts {
            let stats = self.fetcher.get_contributions(repo, token).await;
            if !stats.is_empty() {
                return stats;
            }
            debug!(
                "No contributor statistics for {} yet (attempt {}/{})",
                repo.full_name(),
                attempt,
                self.attempts
            );
            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Vec::new()
    }
}

/// Rates for `owner` over weeks with at least one commit.
///
/// Returns `(commit_rate, code_rate, contribution_percent)`.
pub fn contribution_rates(stats: &[ContributorStats], owner: &str) -> (f64, f64, f64) {
    let mut all_lines = 0u64;
    let mut owner_commits = 0u64;
    let mut owner_lines = 0u64;
    let mut owner_weeks = 0u64;

    for contributor in stats {
        let is_owner = contributor
            .author
            .as_ref()
            .is_some_and(|author| author.login == owner);

        for week in contributor.weeks.iter().filter(|w| w.c != 0) {
            all_lines += week.a;
            if is_owner {
                owner_commits += week.c;
                owner_lines += week.a;
                owner_weeks += 1;
            }
        }
    }

    let (commit_rate, code_rate) = if owner_weeks == 0 {
        (0.0, 0.0)
    } else {
        (
            owner_commits as f64 / owner_weeks as f64,
            owner_lines as f64 / owner_weeks as f64,
        )
    };
    let contribution_percent = if all_lines == 0 {
        0.0
    } else {
        100.0 * owner_lines as f64 / all_lines as f64
    };

    (commit_rate, code_rate, contribution_percent)
}

#[async_trait]
impl MetricStep for ContributionStep {
    fn name(&self) -> &'static str {
        "contribution"
    }

    async fn run(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        _ctx: &mut ScratchContext,
    ) -> Result<StepOutput, StepError> {
        let stats = self.fetch(repo, token).await;
        let (commit_rate, code_rate, contribution_percent) =
            contribution_rates(&stats, &repo.owner.login);

        Ok(StepOutput::Contribution {
            commit_rate,
            code_rate,
            contribution_percent,
        })
    }
}
