//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock GitHub and summarizer collaborators injected, enabling
//! end-to-end testing without network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use repometer_core::{
    config::AnalysisConfig,
    create_authenticator, load_config_from_str,
    testing::{MockFetcher, MockSummarizer},
    AnalysisOrchestrator, SqliteSubjectStore,
};
use repometer_server::state::AppState;

/// Re-export fixtures for test convenience
pub use repometer_core::testing::fixtures;

/// Token sent in `X-GitHub-Token` by [`TestFixture`] requests.
pub const TEST_TOKEN: &str = "gho_test";

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_registration() {
///     let fixture = TestFixture::new().await;
///     fixture.fetcher.set_profile(fixtures::profile("alice", 3, 9)).await;
///
///     let response = fixture.post("/api/v1/users", None, json!({})).await;
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock GitHub fetcher - configure profiles, listings and repository data
    pub fetcher: Arc<MockFetcher>,
    /// Mock summarizer - configure canned answers
    pub summarizer: Arc<MockSummarizer>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    /// Raw body, for non-JSON endpoints
    pub text: String,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config = load_config_from_str(
            r#"
[auth]
method = "none"

[summarizer]
provider = "ollama"
"#,
        )
        .expect("Failed to parse test config");
        config.database.path = db_path.clone();
        // Fast timings for testing
        config.analysis = AnalysisConfig {
            cache_replay_steps: 3,
            cache_replay_interval_ms: 1,
            contribution_retry_delay_ms: 0,
            ..Default::default()
        };

        let fetcher = Arc::new(MockFetcher::new());
        let summarizer = Arc::new(fixtures::analysis_summarizer().await);
        let store = Arc::new(
            SqliteSubjectStore::new(&db_path).expect("Failed to create subject store"),
        );

        let orchestrator = AnalysisOrchestrator::from_config(
            &config,
            store,
            fetcher.clone(),
            summarizer.clone(),
            repometer_core::ProgressTracker::new(),
        );
        let authenticator = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );

        let state = Arc::new(AppState::new(config, authenticator, orchestrator));
        let router = repometer_server::api::create_router(state);

        Self {
            router,
            fetcher,
            summarizer,
            temp_dir,
        }
    }

    /// Make `login` the token owner, listing `repositories` with complete data.
    pub async fn set_github_user(&self, login: &str, repositories: &[(u64, &str)]) {
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
    }

    /// Register `login` through the API.
    pub async fn register(&self, login: &str, repositories: &[(u64, &str)]) {
        self.set_github_user(login, repositories).await;
        let response = self
            .post("/api/v1/users", Some(login), Value::Null)
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "registration failed: {}",
            response.text
        );
    }

    /// Poll `status_path` until it reports `completed` with no progress entry.
    pub async fn wait_until_completed(&self, user: &str, status_path: &str, progress_path: &str) {
        let start = std::time::Instant::now();
        loop {
            let status = self.get(status_path, Some(user)).await;
            let progress = self.get(progress_path, Some(user)).await;
            if status.body["status"] == "completed" && progress.body["progress"] == -1.0 {
                return;
            }
            if start.elapsed() > Duration::from_secs(10) {
                panic!("Timeout waiting for completion, last status: {}", status.text);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn get(&self, path: &str, user: Option<&str>) -> TestResponse {
        self.request("GET", path, user, None).await
    }

    pub async fn post(&self, path: &str, user: Option<&str>, body: Value) -> TestResponse {
        self.request("POST", path, user, Some(body)).await
    }

    pub async fn put(&self, path: &str, user: Option<&str>, body: Value) -> TestResponse {
        self.request("PUT", path, user, Some(body)).await
    }

    pub async fn delete(&self, path: &str, user: Option<&str>) -> TestResponse {
        self.request("DELETE", path, user, None).await
    }

    /// Send a request as `user` with the test GitHub token.
    async fn request(
        &self,
        method: &str,
        path: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("X-GitHub-Token", TEST_TOKEN);
        if let Some(user) = user {
            builder = builder.header("X-Repometer-User", user);
        }

        let body = match body {
            Some(Value::Null) | None => Body::empty(),
            Some(json_body) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&json_body).unwrap())
            }
        };

        self.send(builder.body(body).unwrap()).await
    }

    /// Send a fully custom request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
