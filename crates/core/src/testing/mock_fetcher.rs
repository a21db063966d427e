//! Mock repository fetcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analysis::LanguageBytes;
use crate::github::{
    AccessToken, ContributorStats, RepositoryDescriptor, RepositoryFetcher, TreeEntry,
    UserProfile,
};

/// Canned GitHub data for one repository.
#[derive(Debug, Clone, Default)]
pub struct MockRepository {
    pub branches: Vec<String>,
    pub languages: LanguageBytes,
    pub contributions: Vec<ContributorStats>,
    /// Number of contribution lookups answered empty before the data shows up.
    pub contributions_pending: u32,
    pub root_tree: Vec<TreeEntry>,
    /// Subtree listings by tree sha.
    pub subtrees: HashMap<String, Vec<TreeEntry>>,
    /// Decoded blob contents by blob sha.
    pub blobs: HashMap<String, String>,
    pub readme: Option<String>,
    /// Newest first, as the commits API lists them.
    pub commits: Vec<String>,
}

/// A recorded fetcher call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub operation: &'static str,
    pub repository: Option<u64>,
}

/// Mock implementation of the RepositoryFetcher trait.
///
/// Unknown repositories behave like a failing API: empty listings and
/// `None`. Every call is recorded.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = MockFetcher::new();
/// fetcher.set_repositories(vec![fixtures::repository(42, "demo", "alice")]).await;
/// fetcher.set_repository_data(42, MockRepository {
///     branches: vec!["main".into(), "dev".into()],
///     ..Default::default()
/// }).await;
///
/// // ... run the pipeline ...
///
/// assert_eq!(fetcher.calls_for("get_branches").await, 1);
/// ```
#[derive(Debug, Default)]
pub struct MockFetcher {
    profile: Arc<RwLock<Option<UserProfile>>>,
    repositories: Arc<RwLock<Vec<RepositoryDescriptor>>>,
    data: Arc<RwLock<HashMap<u64, MockRepository>>>,
    /// Repositories whose branch lookup panics.
    crash_on: Arc<RwLock<HashSet<u64>>>,
    calls: Arc<RwLock<Vec<RecordedFetch>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_profile(&self, profile: UserProfile) {
        *self.profile.write().await = Some(profile);
    }

    pub async fn set_repositories(&self, repositories: Vec<RepositoryDescriptor>) {
        *self.repositories.write().await = repositories;
    }

    pub async fn set_repository_data(&self, id: u64, data: MockRepository) {
        self.data.write().await.insert(id, data);
    }

    /// Make every step touching `id` panic, starting with the branch lookup.
    pub async fn crash_on_repository(&self, id: u64) {
        self.crash_on.write().await.insert(id);
    }

    pub async fn calls(&self) -> Vec<RecordedFetch> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn calls_for(&self, operation: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn record(&self, operation: &'static str, repository: Option<u64>) {
        self.calls.write().await.push(RecordedFetch {
            operation,
            repository,
        });
    }

    /// Record the call and return the repository's data.
    async fn lookup(&self, operation: &'static str, repo: &RepositoryDescriptor) -> MockRepository {
        self.record(operation, Some(repo.id)).await;
        let crash = self.crash_on.read().await.contains(&repo.id);
        if crash {
            panic!("simulated fetcher crash for repository {}", repo.id);
        }
        self.data
            .read()
            .await
            .get(&repo.id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RepositoryFetcher for MockFetcher {
    async fn get_user_profile(&self, _token: &AccessToken) -> Option<UserProfile> {
        self.record("get_user_profile", None).await;
        self.profile.read().await.clone()
    }

    async fn list_repositories(&self, _token: &AccessToken) -> Vec<RepositoryDescriptor> {
        self.record("list_repositories", None).await;
        self.repositories.read().await.clone()
    }

    async fn get_branches(&self, repo: &RepositoryDescriptor, _token: &AccessToken) -> Vec<String> {
        self.lookup("get_branches", repo).await.branches
    }

    async fn get_languages(&self, repo: &RepositoryDescriptor, _token: &AccessToken) -> LanguageBytes {
        self.lookup("get_languages", repo).await.languages
    }

    async fn get_contributions(
        &self,
        repo: &RepositoryDescriptor,
        _token: &AccessToken,
    ) -> Vec<ContributorStats> {
        let data = self.lookup("get_contributions", repo).await;
        if data.contributions_pending > 0 {
            if let Some(entry) = self.data.write().await.get_mut(&repo.id) {
                entry.contributions_pending -= 1;
            }
            return Vec::new();
        }
        data.contributions
    }

    async fn get_repository_root_tree(
        &self,
        repo: &RepositoryDescriptor,
        _token: &AccessToken,
    ) -> Vec<TreeEntry> {
        self.lookup("get_repository_root_tree", repo).await.root_tree
    }

    async fn get_subtree(
        &self,
        repo: &RepositoryDescriptor,
        _token: &AccessToken,
        sha: &str,
    ) -> Vec<TreeEntry> {
        self.lookup("get_subtree", repo)
            .await
            .subtrees
            .remove(sha)
            .unwrap_or_default()
    }

    async fn get_file_content(
        &self,
        repo: &RepositoryDescriptor,
        _token: &AccessToken,
        sha: &str,
    ) -> Option<String> {
        self.lookup("get_file_content", repo).await.blobs.remove(sha)
    }

    async fn get_readme(&self, repo: &RepositoryDescriptor, _token: &AccessToken) -> Option<String> {
        self.lookup("get_readme", repo).await.readme
    }

    async fn get_commit_messages(
        &self,
        repo: &RepositoryDescriptor,
        _token: &AccessToken,
    ) -> Vec<String> {
        self.lookup("get_commit_messages", repo).await.commits
    }
}
