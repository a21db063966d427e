//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the external service traits,
//! allowing analysis runs to be tested without GitHub or a language model.
//!
//! # Example
//!
//! ```rust,ignore
//! use repometer_core::testing::{fixtures, MockFetcher, MockSummarizer};
//!
//! let fetcher = MockFetcher::new();
//! fetcher.set_repositories(vec![fixtures::repository(42, "demo", "alice")]).await;
//! fetcher.set_repository_data(42, fixtures::complete_repository()).await;
//!
//! let summarizer = fixtures::analysis_summarizer().await;
//!
//! // Build an AnalysisOrchestrator around them...
//! ```

mod mock_fetcher;
mod mock_summarizer;

pub use mock_fetcher::{MockFetcher, MockRepository, RecordedFetch};
pub use mock_summarizer::MockSummarizer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;

    use super::{MockRepository, MockSummarizer};
    use crate::analysis::LanguageBytes;
    use crate::github::{
        AccessToken, ContributionWeek, ContributorAuthor, ContributorStats, RepositoryDescriptor,
        RepositoryOwner, TreeEntry, UserProfile,
    };

    /// Marker of the file-selection prompt.
    pub const FILE_SELECTION_MARKER: &str = "RFC8259";
    /// Marker of the code-quality prompt.
    pub const CODE_QUALITY_MARKER: &str = "code quality analyzer";

    pub fn token() -> AccessToken {
        AccessToken::new("gho_test_token")
    }

    /// Create a repository descriptor with no forks or stars.
    pub fn repository(id: u64, name: &str, owner: &str) -> RepositoryDescriptor {
        RepositoryDescriptor {
            id,
            name: name.to_string(),
            owner: RepositoryOwner {
                login: owner.to_string(),
            },
            forks_count: 0,
            stargazers_count: 0,
            default_branch: Some("main".to_string()),
        }
    }

    pub fn profile(login: &str, followers: u64, public_repos: u64) -> UserProfile {
        UserProfile {
            login: login.to_string(),
            followers,
            public_repos,
        }
    }

    pub fn file_entry(path: &str, sha: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            sha: sha.to_string(),
            entry_type: "file".to_string(),
            size: Some(64),
        }
    }

    pub fn dir_entry(path: &str, sha: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            sha: sha.to_string(),
            entry_type: "dir".to_string(),
            size: None,
        }
    }

    /// Contributor statistics from `(commits, additions)` pairs, one per week.
    pub fn contributor(login: &str, weeks: &[(u64, u64)]) -> ContributorStats {
        ContributorStats {
            author: Some(ContributorAuthor {
                login: login.to_string(),
            }),
            weeks: weeks
                .iter()
                .enumerate()
                .map(|(i, &(c, a))| ContributionWeek {
                    w: 1_700_000_000 + i as i64 * 604_800,
                    a,
                    d: a / 4,
                    c,
                })
                .collect(),
        }
    }

    /// Repository data that lets every step produce a value.
    ///
    /// Owner `alice` has all the commits. Pair with [`analysis_summarizer`].
    pub fn complete_repository() -> MockRepository {
        MockRepository {
            branches: vec!["main".into(), "dev".into(), "feature/api".into()],
            languages: LanguageBytes::from([
                ("Rust".to_string(), 12_000),
                ("Shell".to_string(), 300),
            ]),
            contributions: vec![contributor("alice", &[(3, 120), (0, 0), (5, 80)])],
            contributions_pending: 0,
            root_tree: vec![dir_entry("src", "tree-src"), file_entry("README.md", "blob-readme")],
            subtrees: HashMap::from([(
                "tree-src".to_string(),
                vec![file_entry("main.rs", "blob-main"), file_entry("lib.rs", "blob-lib")],
            )]),
            blobs: HashMap::from([
                ("blob-main".to_string(), "fn main() { demo::run(); }".to_string()),
                ("blob-lib".to_string(), "pub fn run() {}".to_string()),
            ]),
            readme: Some("# demo\n\nRuns things.".to_string()),
            commits: vec!["Add run".to_string(), "Initial commit".to_string()],
        }
    }

    /// Summarizer that answers every pipeline prompt with usable output.
    pub async fn analysis_summarizer() -> MockSummarizer {
        let summarizer = MockSummarizer::with_default("\"Clear and consistent.\"");
        summarizer
            .respond_when(
                FILE_SELECTION_MARKER,
                r#"[{"file_name": "src/main.rs", "sha_hash": "blob-main"},
                    {"file_name": "src/lib.rs", "sha_hash": "blob-lib"}]"#,
            )
            .await;
        summarizer
            .respond_when(
                CODE_QUALITY_MARKER,
                r#"{"description": "Small, readable modules.", "score": 82}"#,
            )
            .await;
        summarizer
    }
}
