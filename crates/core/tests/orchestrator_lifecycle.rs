//! Orchestrator lifecycle integration tests.
//!
//! These tests drive complete analysis runs through the orchestrator:
//! register -> select -> trigger -> in progress -> completed

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast::error::TryRecvError;

use repometer_core::{
    analysis::SubjectMetricSummary,
    config::{AnalysisConfig, GithubConfig, TeamsConfig},
    progress::ProgressEvent,
    subject::SubjectStore,
    testing::{fixtures, MockFetcher, MockRepository, MockSummarizer},
    AnalysisOrchestrator, AnalysisStatus, Pipeline, ProgressTracker, SqliteSubjectStore,
    SubjectRef, TriggerRejected, NO_PROGRESS,
};

/// Test helper to create all dependencies for orchestrator testing.
struct TestHarness {
    store: Arc<SqliteSubjectStore>,
    fetcher: Arc<MockFetcher>,
    summarizer: Arc<MockSummarizer>,
    progress: ProgressTracker,
    orchestrator: AnalysisOrchestrator,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteSubjectStore::new(&temp_dir.path().join("test.db"))
                .expect("Failed to create subject store"),
        );
        let fetcher = Arc::new(MockFetcher::new());
        let summarizer = Arc::new(fixtures::analysis_summarizer().await);
        let progress = ProgressTracker::new();

        // Fast timings for testing
        let analysis = AnalysisConfig {
            cache_replay_steps: 5,
            cache_replay_interval_ms: 1,
            contribution_retry_delay_ms: 0,
            ..Default::default()
        };
        let pipeline = Pipeline::standard(
            fetcher.clone(),
            summarizer.clone(),
            &analysis,
            &GithubConfig::default(),
        );
        let orchestrator = AnalysisOrchestrator::new(
            store.clone(),
            fetcher.clone(),
            pipeline,
            progress.clone(),
            analysis,
            TeamsConfig::default(),
        );

        Self {
            store,
            fetcher,
            summarizer,
            progress,
            orchestrator,
            _temp_dir: temp_dir,
        }
    }

    /// Register `login` owning the given repositories, all with complete data.
    async fn register(&self, login: &str, repositories: &[(u64, &str)]) {
        self.fetcher
            .set_profile(fixtures::profile(login, 3, 9))
            .await;
        let descriptors = repositories
            .iter()
            .map(|(id, name)| fixtures::repository(*id, name, login))
            .collect();
        self.fetcher.set_repositories(descriptors).await;
        for (id, _) in repositories {
            self.fetcher
                .set_repository_data(*id, fixtures::complete_repository())
                .await;
        }
        self.orchestrator
            .register_user(&fixtures::token(), None)
            .await
            .expect("Failed to register user");
    }

    /// Wait for a subject to reach a status, with timeout.
    async fn wait_for_status(&self, subject: &SubjectRef, expected: AnalysisStatus) {
        let timeout = Duration::from_secs(10);
        let start = std::time::Instant::now();

        loop {
            let status = self.orchestrator.get_status(subject).unwrap();
            // The progress entry is cleared right after the final status write.
            if status == expected && self.orchestrator.get_progress(subject) == NO_PROGRESS {
                return;
            }
            if start.elapsed() > timeout {
                panic!(
                    "Timeout waiting for {} to reach {:?}, current: {:?}",
                    subject, expected, status
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn run_user(&self, login: &str) {
        self.orchestrator
            .trigger(login, fixtures::token())
            .expect("Trigger rejected");
        self.wait_for_status(&SubjectRef::user(login), AnalysisStatus::Completed)
            .await;
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(n)) => panic!("Progress receiver lagged by {n}"),
        }
    }
}

#[tokio::test]
async fn test_single_repository_run_end_to_end() {
    let harness = TestHarness::new().await;
    harness.register("alice", &[(42, "demo")]).await;
    harness
        .orchestrator
        .select_repositories("alice", &[42])
        .unwrap();

    let subject = SubjectRef::user("alice");
    let mut rx = harness.progress.subscribe();
    assert_eq!(harness.orchestrator.get_progress(&subject), NO_PROGRESS);

    let accepted = harness
        .orchestrator
        .trigger("alice", fixtures::token())
        .unwrap();
    assert_eq!(accepted.subject, subject);
    assert!(!accepted.run_id.is_empty());

    harness
        .wait_for_status(&subject, AnalysisStatus::Completed)
        .await;

    // Progress never decreases, ends at 1 and is then cleared.
    let events = drain(&mut rx);
    let values: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Updated { value, .. } => Some(*value),
            ProgressEvent::Cleared { .. } => None,
        })
        .collect();
    assert_eq!(values.len(), 11, "start, nine steps, finish: {values:?}");
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
    assert_eq!(values.first(), Some(&0.0));
    assert_eq!(values.last(), Some(&1.0));
    assert!(matches!(events.last(), Some(ProgressEvent::Cleared { .. })));

    let user = harness.store.get_user("alice").unwrap().unwrap();
    assert_eq!(user.status, AnalysisStatus::Completed);
    let metrics = &user.metrics["42"];
    assert!(metrics.is_complete(), "{metrics:?}");
    assert_eq!(metrics.branch_commentary.as_deref(), Some("Clear and consistent."));
    assert_eq!(metrics.code_quality_score, Some(82));
    assert_eq!(metrics.commit_rate, Some(4.0));
    assert_eq!(metrics.code_rate, Some(100.0));
    assert_eq!(metrics.contribution_percent, Some(100.0));

    let summary = user.summary.unwrap();
    assert_eq!(summary.follower_count, 3);
    assert_eq!(summary.repo_count, 9);
    assert_eq!(summary.code_quality_score, 82.0);
    assert_eq!(summary.language_byte_counts["Rust"], 12_000);

    let last_run = user.last_run.unwrap();
    assert!(!last_run.from_cache);
    assert!(!last_run.is_partial());
    assert!(harness.store.get_cached_run("alice").unwrap().is_some());
}

#[tokio::test]
async fn test_cached_run_replays_without_external_calls() {
    let harness = TestHarness::new().await;
    harness.register("alice", &[(42, "demo")]).await;
    harness
        .orchestrator
        .select_repositories("alice", &[42])
        .unwrap();
    harness.run_user("alice").await;
    let first = harness.store.get_user("alice").unwrap().unwrap();

    // Reset keeps the cache; the same selection makes it usable again.
    harness.orchestrator.reset("alice").unwrap();
    harness
        .orchestrator
        .select_repositories("alice", &[42])
        .unwrap();
    harness.fetcher.clear_recorded().await;
    harness.summarizer.clear_recorded().await;

    harness.run_user("alice").await;

    assert_eq!(harness.fetcher.call_count().await, 0);
    assert_eq!(harness.summarizer.call_count().await, 0);
    let second = harness.store.get_user("alice").unwrap().unwrap();
    assert_eq!(second.summary, first.summary);
    assert_eq!(second.metrics, first.metrics);
    assert!(second.last_run.unwrap().from_cache);
}

#[tokio::test]
async fn test_changed_selection_discards_cache() {
    let harness = TestHarness::new().await;
    harness
        .register("alice", &[(1, "one"), (2, "two")])
        .await;
    harness.orchestrator.select_repositories("alice", &[1]).unwrap();
    harness.run_user("alice").await;

    harness
        .orchestrator
        .select_repositories("alice", &[1, 2])
        .unwrap();
    assert!(harness.store.get_cached_run("alice").unwrap().is_none());
    let user = harness.store.get_user("alice").unwrap().unwrap();
    assert!(user.metrics.is_empty());
    assert!(user.summary.is_none());

    harness.fetcher.clear_recorded().await;
    harness.run_user("alice").await;
    assert_eq!(harness.fetcher.calls_for("get_branches").await, 2);

    let user = harness.store.get_user("alice").unwrap().unwrap();
    assert_eq!(user.metrics.len(), 2);
}

#[tokio::test]
async fn test_commentary_joined_in_listing_order() {
    let harness = TestHarness::new().await;
    // Listed 42 before 100; as strings the ids sort the other way.
    harness
        .register("alice", &[(42, "solo"), (100, "demo")])
        .await;
    harness
        .fetcher
        .set_repository_data(
            42,
            MockRepository {
                branches: vec!["main".into()],
                ..fixtures::complete_repository()
            },
        )
        .await;
    harness
        .orchestrator
        .select_repositories("alice", &[100, 42])
        .unwrap();

    harness.run_user("alice").await;

    let summary = harness
        .store
        .get_user("alice")
        .unwrap()
        .unwrap()
        .summary
        .unwrap();
    assert_eq!(
        summary.branch_commentary,
        "Only Master/Main branch Exists\nClear and consistent."
    );
}

#[tokio::test]
async fn test_selected_repository_missing_from_listing_is_partial() {
    let harness = TestHarness::new().await;
    harness
        .register("alice", &[(1, "one"), (2, "two")])
        .await;
    harness
        .orchestrator
        .select_repositories("alice", &[1, 2])
        .unwrap();
    // A later listing no longer shows repository 2.
    harness
        .store
        .upsert_user("alice", &[fixtures::repository(1, "one", "alice")])
        .unwrap();

    harness.run_user("alice").await;

    let user = harness.store.get_user("alice").unwrap().unwrap();
    assert_eq!(user.metrics.len(), 1);
    let last_run = user.last_run.unwrap();
    assert_eq!(last_run.repositories_requested, 2);
    assert_eq!(last_run.repositories_completed, 1);
    assert!(last_run.is_partial());
    assert!(harness.store.get_cached_run("alice").unwrap().is_none());
}

#[tokio::test]
async fn test_crash_in_second_repository_keeps_first() {
    let harness = TestHarness::new().await;
    harness
        .register("alice", &[(1, "good"), (2, "broken")])
        .await;
    harness.fetcher.crash_on_repository(2).await;
    harness
        .orchestrator
        .select_repositories("alice", &[1, 2])
        .unwrap();

    harness.run_user("alice").await;

    let user = harness.store.get_user("alice").unwrap().unwrap();
    assert_eq!(user.status, AnalysisStatus::Completed);
    assert_eq!(user.metrics.keys().collect::<Vec<_>>(), vec!["1"]);
    assert!(user.metrics["1"].is_complete());

    let summary = user.summary.unwrap();
    assert_eq!(summary.code_quality_score, 82.0);

    let last_run = user.last_run.unwrap();
    assert!(last_run.is_partial());
    assert_eq!(last_run.repositories_requested, 2);
    assert_eq!(last_run.repositories_completed, 1);
    assert!(last_run.error.unwrap().contains("simulated fetcher crash"));

    // Partial runs are never cached.
    assert!(harness.store.get_cached_run("alice").unwrap().is_none());
    assert_eq!(
        harness.orchestrator.get_progress(&SubjectRef::user("alice")),
        NO_PROGRESS
    );
}

#[tokio::test]
async fn test_trigger_rejections() {
    let harness = TestHarness::new().await;

    assert!(matches!(
        harness.orchestrator.trigger("ghost", fixtures::token()),
        Err(TriggerRejected::UnknownSubject(_))
    ));

    harness.register("alice", &[(42, "demo")]).await;
    assert!(matches!(
        harness.orchestrator.trigger("alice", fixtures::token()),
        Err(TriggerRejected::NoRepositoriesSelected)
    ));

    harness
        .orchestrator
        .select_repositories("alice", &[42])
        .unwrap();
    let subject = SubjectRef::user("alice");
    assert!(harness.store.try_begin_run(&subject).unwrap());
    assert!(matches!(
        harness.orchestrator.trigger("alice", fixtures::token()),
        Err(TriggerRejected::AlreadyInProgress)
    ));
    assert!(matches!(
        harness.orchestrator.reset("alice"),
        Err(repometer_core::SubjectError::InProgress)
    ));
}

#[tokio::test]
async fn test_team_aggregates_member_summaries() {
    let harness = TestHarness::new().await;
    harness.register("alice", &[(1, "one")]).await;
    harness.orchestrator.select_repositories("alice", &[1]).unwrap();
    harness.run_user("alice").await;

    // bob never ran an analysis and is skipped.
    harness.store.upsert_user("bob", &[]).unwrap();
    // carol's summary is planted directly.
    harness.store.upsert_user("carol", &[]).unwrap();
    harness
        .store
        .replace_summary(
            &SubjectRef::user("carol"),
            &SubjectMetricSummary {
                follower_count: 7,
                repo_count: 2,
                code_quality_score: 62.0,
                fork_count: 4,
                ..Default::default()
            },
        )
        .unwrap();

    let members = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
    harness
        .orchestrator
        .create_team("alice", "core", &members)
        .unwrap();

    assert!(matches!(
        harness.orchestrator.trigger_team("core", "mallory"),
        Err(TriggerRejected::NotAMember(_))
    ));
    let mut rx = harness.progress.subscribe();
    harness.orchestrator.trigger_team("core", "bob").unwrap();
    let subject = SubjectRef::team("core");
    harness
        .wait_for_status(&subject, AnalysisStatus::Completed)
        .await;

    // Team runs report no progress.
    assert!(drain(&mut rx).is_empty());

    let team = harness.store.get_team("core").unwrap().unwrap();
    let summary = team.summary.unwrap();
    assert_eq!(summary.follower_count, 3 + 7);
    assert_eq!(summary.repo_count, 9 + 2);
    assert_eq!(summary.code_quality_score, (82.0 + 62.0) / 2.0);
    assert_eq!(summary.fork_count, 4);

    harness.orchestrator.reset_team("core", "carol").unwrap();
    assert_eq!(
        harness.orchestrator.get_status(&subject).unwrap(),
        AnalysisStatus::NotStarted
    );
}
