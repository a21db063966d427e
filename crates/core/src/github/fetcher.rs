use async_trait::async_trait;

use crate::analysis::LanguageBytes;

use super::types::{
    AccessToken, ContributorStats, RepositoryDescriptor, TreeEntry, UserProfile,
};

/// Read access to repository metadata on behalf of a user.
///
/// Implementations never fail: transport or authorization problems are
/// logged and surface as empty collections or `None`.
#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    /// Profile of the token's owner.
    async fn get_user_profile(&self, token: &AccessToken) -> Option<UserProfile>;

    /// Repositories the token's owner can see, in listing order.
    async fn list_repositories(&self, token: &AccessToken) -> Vec<RepositoryDescriptor>;

    /// Branch names.
    async fn get_branches(&self, repo: &RepositoryDescriptor, token: &AccessToken)
        -> Vec<String>;

    async fn get_languages(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> LanguageBytes;

    /// Weekly contributor statistics. Empty while the host is still computing them.
    async fn get_contributions(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> Vec<ContributorStats>;

    async fn get_repository_root_tree(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> Vec<TreeEntry>;

    async fn get_subtree(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        sha: &str,
    ) -> Vec<TreeEntry>;

    /// Decoded blob content; `None` when the blob is too large or unreadable.
    async fn get_file_content(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        sha: &str,
    ) -> Option<String>;

    /// Decoded README, if the repository has one.
    async fn get_readme(&self, repo: &RepositoryDescriptor, token: &AccessToken)
        -> Option<String>;

    /// Commit messages, newest first.
    async fn get_commit_messages(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> Vec<String>;
}
