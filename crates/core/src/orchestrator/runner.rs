//! Analysis orchestrator implementation.
//!
//! Every trigger spawns one task that runs to completion:
//! - User runs: replay a matching cached run, or pipeline every selected
//!   repository in turn, then aggregate.
//! - Team runs: aggregate the members' stored summaries.
//!
//! Whatever happens inside the repository loop, the tail of a run commits
//! the metrics that were produced, marks the subject completed and clears
//! its progress entry.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::{aggregate, RepositoryMetrics, SubjectCounts};
use crate::config::{AnalysisConfig, Config, TeamsConfig};
use crate::github::{AccessToken, RepositoryDescriptor, RepositoryFetcher};
use crate::metrics::{REPOSITORIES_ANALYZED, RUNS_IN_FLIGHT, RUNS_TOTAL, RUN_DURATION};
use crate::pipeline::{Pipeline, StepError};
use crate::progress::ProgressTracker;
use crate::subject::{
    AnalysisStatus, CachedRun, RunOutcome, StoreError, SubjectError, SubjectRef, SubjectStore,
    UserRecord,
};
use crate::summarizer::Summarizer;

use super::types::{TriggerAccepted, TriggerRejected};

/// Clears the subject's progress entry, if it has one, when the run ends,
/// however it ends.
struct RunGuard {
    progress: ProgressTracker,
    key: Option<String>,
}

impl RunGuard {
    fn new(progress: &ProgressTracker, key: Option<String>) -> Self {
        RUNS_IN_FLIGHT.inc();
        Self {
            progress: progress.clone(),
            key,
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Some(key) = &self.key {
            self.progress.clear_progress(key);
        }
        RUNS_IN_FLIGHT.dec();
    }
}

fn advance(progress: &ProgressTracker, key: &str, value: f64) {
    if let Err(e) = progress.set_progress(key, value.clamp(0.0, 1.0)) {
        debug!("Progress update for {} ignored: {}", key, e);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs analyses for users and teams and answers progress and status queries.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    pub(super) store: Arc<dyn SubjectStore>,
    pub(super) fetcher: Arc<dyn RepositoryFetcher>,
    pipeline: Arc<Pipeline>,
    progress: ProgressTracker,
    pub(super) analysis: AnalysisConfig,
    pub(super) teams: TeamsConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        store: Arc<dyn SubjectStore>,
        fetcher: Arc<dyn RepositoryFetcher>,
        pipeline: Pipeline,
        progress: ProgressTracker,
        analysis: AnalysisConfig,
        teams: TeamsConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            pipeline: Arc::new(pipeline),
            progress,
            analysis,
            teams,
        }
    }

    /// Orchestrator over the standard pipeline, tuned by `config`.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn SubjectStore>,
        fetcher: Arc<dyn RepositoryFetcher>,
        summarizer: Arc<dyn Summarizer>,
        progress: ProgressTracker,
    ) -> Self {
        let pipeline = Pipeline::standard(
            fetcher.clone(),
            summarizer,
            &config.analysis,
            &config.github,
        );
        Self::new(
            store,
            fetcher,
            pipeline,
            progress,
            config.analysis.clone(),
            config.teams.clone(),
        )
    }

    pub fn progress_tracker(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Release subjects whose run was cut short by a shutdown.
    ///
    /// Call once at startup, before accepting triggers.
    pub fn recover_interrupted_runs(&self) -> Result<usize, StoreError> {
        let released = self.store.release_interrupted_runs()?;
        if released > 0 {
            warn!("Released {} runs interrupted by a shutdown", released);
        }
        Ok(released)
    }

    // =========================================================================
    // Caller-facing operations
    // =========================================================================

    /// Start an analysis of the user's selected repositories in the background.
    pub fn trigger(
        &self,
        username: &str,
        token: AccessToken,
    ) -> Result<TriggerAccepted, TriggerRejected> {
        let subject = SubjectRef::user(username);
        let user = self
            .store
            .get_user(username)?
            .ok_or_else(|| TriggerRejected::UnknownSubject(subject.clone()))?;
        if user.selection.is_empty() {
            return Err(TriggerRejected::NoRepositoriesSelected);
        }
        if !self.store.try_begin_run(&subject)? {
            return Err(TriggerRejected::AlreadyInProgress);
        }

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("analysis_run", run_id = %run_id, subject = %subject);
        let this = self.clone();
        let username = username.to_string();
        let task_subject = subject.clone();
        tokio::spawn(
            async move {
                match this.run_for_subject(&username, &token).await {
                    Ok(outcome) => info!(
                        "Run finished: {}/{} repositories{}",
                        outcome.repositories_completed,
                        outcome.repositories_requested,
                        if outcome.from_cache { " (cached)" } else { "" }
                    ),
                    Err(e) => {
                        error!("Run could not be committed: {}", e);
                        this.release(&task_subject);
                    }
                }
            }
            .instrument(span),
        );

        Ok(TriggerAccepted { run_id, subject })
    }

    /// Start aggregating a team's member summaries in the background.
    pub fn trigger_team(
        &self,
        team: &str,
        requester: &str,
    ) -> Result<TriggerAccepted, TriggerRejected> {
        let subject = SubjectRef::team(team);
        let record = self
            .store
            .get_team(team)?
            .ok_or_else(|| TriggerRejected::UnknownSubject(subject.clone()))?;
        if !record.has_member(requester) {
            return Err(TriggerRejected::NotAMember(requester.to_string()));
        }
        if !self.store.try_begin_run(&subject)? {
            return Err(TriggerRejected::AlreadyInProgress);
        }

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("analysis_run", run_id = %run_id, subject = %subject);
        let this = self.clone();
        let team = team.to_string();
        let task_subject = subject.clone();
        tokio::spawn(
            async move {
                match this.run_for_team(&team).await {
                    Ok(()) => info!("Team run finished"),
                    Err(e) => {
                        error!("Team run could not be committed: {}", e);
                        this.release(&task_subject);
                    }
                }
            }
            .instrument(span),
        );

        Ok(TriggerAccepted { run_id, subject })
    }

    /// Fraction of the in-flight run, or -1.0 when none is running.
    pub fn get_progress(&self, subject: &SubjectRef) -> f64 {
        self.progress.get_progress(&subject.progress_key())
    }

    pub fn get_status(&self, subject: &SubjectRef) -> Result<AnalysisStatus, SubjectError> {
        self.store
            .get_status(subject)?
            .ok_or_else(|| match subject {
                SubjectRef::User(name) => SubjectError::UnknownUser(name.clone()),
                SubjectRef::Team(name) => SubjectError::UnknownTeam(name.clone()),
            })
    }

    /// Back to `NotStarted` with nothing selected. The cached run survives.
    pub fn reset(&self, username: &str) -> Result<(), SubjectError> {
        let subject = SubjectRef::user(username);
        if self.get_status(&subject)? == AnalysisStatus::InProgress {
            return Err(SubjectError::InProgress);
        }
        self.store.reset_user(username)?;
        self.progress.clear_progress(&subject.progress_key());
        info!("Reset {}", subject);
        Ok(())
    }

    pub fn reset_team(&self, team: &str, requester: &str) -> Result<(), SubjectError> {
        let record = self.get_team(team, requester)?;
        if record.status == AnalysisStatus::InProgress {
            return Err(SubjectError::InProgress);
        }
        self.store.reset_team(team)?;
        info!("Reset team {}", team);
        Ok(())
    }

    // =========================================================================
    // Runs
    // =========================================================================

    /// Analyze the user's selection and commit the results.
    ///
    /// Step faults and panics inside the repository loop end the loop early;
    /// the repositories finished before that are still committed and the
    /// fault is recorded in the returned outcome. `Err` means the store
    /// rejected the commit.
    pub async fn run_for_subject(
        &self,
        username: &str,
        token: &AccessToken,
    ) -> Result<RunOutcome, StoreError> {
        let subject = SubjectRef::user(username);
        let key = subject.progress_key();
        let _guard = RunGuard::new(&self.progress, Some(key.clone()));
        let timer = Instant::now();
        let started_at = Utc::now();

        self.store.set_status(&subject, AnalysisStatus::InProgress)?;
        let user = self
            .store
            .get_user(username)?
            .ok_or_else(|| StoreError::NotFound(subject.to_string()))?;
        advance(&self.progress, &key, 0.0);

        if let Some(cached) = self.store.get_cached_run(username)? {
            if cached.selection == user.selection {
                return self.replay(&user, cached, started_at, timer).await;
            }
        }

        let repositories = user.selected_repositories();
        info!(
            "Analyzing {} repositories for {}",
            repositories.len(),
            username
        );

        let mut metrics = RepositoryMetrics::new();
        let result = AssertUnwindSafe(self.analyze_repositories(
            &repositories,
            token,
            &key,
            &mut metrics,
        ))
        .catch_unwind()
        .await;

        let error = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                error!("Repository loop aborted: {}", e);
                Some(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Repository loop panicked: {}", message);
                Some(format!("panic: {message}"))
            }
        };

        // The summary is written even when the metrics write fails.
        let metrics_written = self.store.replace_metrics(username, &metrics);
        if let Err(e) = &metrics_written {
            error!("Metrics could not be stored: {}", e);
        }

        let counts = self
            .fetcher
            .get_user_profile(token)
            .await
            .map(|profile| SubjectCounts {
                followers: profile.followers,
                repositories: profile.public_repos,
            });
        if counts.is_none() {
            warn!("Profile unavailable; follower count left at 0");
        }
        // Commentary is joined in listing order.
        let summary = aggregate(
            repositories
                .iter()
                .filter_map(|repo| metrics.get(&repo.id.to_string())),
            counts,
        );
        let summary_written = self.store.replace_summary(&subject, &summary);
        metrics_written?;
        summary_written?;

        let outcome = RunOutcome {
            run_id: Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            repositories_requested: user.selection.len(),
            repositories_completed: metrics.len(),
            from_cache: false,
            error,
        };
        self.store.record_run_outcome(username, &outcome)?;

        if !outcome.is_partial() {
            self.store.store_cached_run(
                username,
                &CachedRun {
                    selection: user.selection.clone(),
                    metrics,
                    summary,
                    created_at: Utc::now(),
                },
            )?;
        }

        advance(&self.progress, &key, 1.0);
        self.store.set_status(&subject, AnalysisStatus::Completed)?;

        let result = if outcome.is_partial() { "partial" } else { "completed" };
        RUNS_TOTAL.with_label_values(&["user", result]).inc();
        RUN_DURATION
            .with_label_values(&["user"])
            .observe(timer.elapsed().as_secs_f64());

        Ok(outcome)
    }

    /// Pipeline each repository in order, adding finished ones to `metrics`.
    async fn analyze_repositories(
        &self,
        repositories: &[RepositoryDescriptor],
        token: &AccessToken,
        key: &str,
        metrics: &mut RepositoryMetrics,
    ) -> Result<(), StepError> {
        if repositories.is_empty() || self.pipeline.is_empty() {
            return Ok(());
        }

        let share = 1.0 - self.analysis.progress_reserve;
        let increment = share / repositories.len() as f64 / self.pipeline.len() as f64;
        let progress = &self.progress;
        let mut current = 0.0;

        for repo in repositories {
            debug!("Starting pipeline for {}", repo.full_name());
            let set = self
                .pipeline
                .run(repo, token, |_, _| {
                    current += increment;
                    advance(progress, key, current);
                })
                .await?;

            metrics.insert(repo.id.to_string(), set);
            REPOSITORIES_ANALYZED.inc();
            info!("Finished {}", repo.full_name());
        }

        Ok(())
    }

    /// Replay progress and copy a cached run forward without external calls.
    async fn replay(
        &self,
        user: &UserRecord,
        cached: CachedRun,
        started_at: chrono::DateTime<Utc>,
        timer: Instant,
    ) -> Result<RunOutcome, StoreError> {
        let subject = SubjectRef::user(&user.username);
        let key = subject.progress_key();
        info!("Selection unchanged, replaying cached run for {}", user.username);

        let steps = self.analysis.cache_replay_steps.max(1);
        let interval = Duration::from_millis(self.analysis.cache_replay_interval_ms);
        for i in 0..steps {
            advance(&self.progress, &key, i as f64 / steps as f64);
            tokio::time::sleep(interval).await;
        }

        self.store.replace_metrics(&user.username, &cached.metrics)?;
        self.store.replace_summary(&subject, &cached.summary)?;

        let outcome = RunOutcome {
            run_id: Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            repositories_requested: user.selection.len(),
            repositories_completed: cached.metrics.len(),
            from_cache: true,
            error: None,
        };
        self.store.record_run_outcome(&user.username, &outcome)?;

        advance(&self.progress, &key, 1.0);
        self.store.set_status(&subject, AnalysisStatus::Completed)?;

        RUNS_TOTAL.with_label_values(&["user", "cached"]).inc();
        RUN_DURATION
            .with_label_values(&["user"])
            .observe(timer.elapsed().as_secs_f64());

        Ok(outcome)
    }

    /// Aggregate the stored summaries of a team's members, in member order.
    ///
    /// Members without a record or without a summary are skipped. Team runs
    /// make no external calls and report no progress.
    pub async fn run_for_team(&self, team: &str) -> Result<(), StoreError> {
        let subject = SubjectRef::team(team);
        let _guard = RunGuard::new(&self.progress, None);
        let timer = Instant::now();

        self.store.set_status(&subject, AnalysisStatus::InProgress)?;
        let record = self
            .store
            .get_team(team)?
            .ok_or_else(|| StoreError::NotFound(subject.to_string()))?;

        let mut summaries = Vec::with_capacity(record.members.len());
        for member in &record.members {
            match self.store.get_user(member)?.and_then(|user| user.summary) {
                Some(summary) => summaries.push(summary),
                None => debug!("Member {} has no summary yet, skipping", member),
            }
        }

        info!(
            "Aggregating {} of {} member summaries",
            summaries.len(),
            record.members.len()
        );
        let summary = aggregate(&summaries, None);
        self.store.replace_summary(&subject, &summary)?;
        self.store.set_status(&subject, AnalysisStatus::Completed)?;

        RUNS_TOTAL.with_label_values(&["team", "completed"]).inc();
        RUN_DURATION
            .with_label_values(&["team"])
            .observe(timer.elapsed().as_secs_f64());

        Ok(())
    }

    /// Leave `InProgress` after a run whose commit failed.
    fn release(&self, subject: &SubjectRef) {
        if let Err(e) = self.store.set_status(subject, AnalysisStatus::Completed) {
            error!("Could not release {}: {}", subject, e);
        }
    }
}
