//! GitHub REST API implementation of [`RepositoryFetcher`].

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::analysis::LanguageBytes;
use crate::config::GithubConfig;
use crate::metrics::FETCHER_FAILURES;

use super::fetcher::RepositoryFetcher;
use super::types::{
    AccessToken, ContributorStats, RepositoryDescriptor, TreeEntry, UserProfile,
};

/// Branches tried, in order, when the descriptor carries no default branch.
const FALLBACK_BRANCHES: [&str; 2] = ["main", "master"];

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// 202 from the statistics endpoints while GitHub computes them.
    #[error("statistics are still being computed")]
    Pending,

    #[error("failed to decode content: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct Branch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitTree {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct EncodedContent {
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
}

/// GitHub API client.
pub struct GithubClient {
    client: Client,
    api_base: String,
    max_file_size_bytes: u64,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, GithubError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            max_file_size_bytes: config.max_file_size_bytes,
        })
    }

    fn repo_url(&self, repo: &RepositoryDescriptor, rest: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            urlencoding::encode(&repo.owner.login),
            urlencoding::encode(&repo.name),
            rest
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &AccessToken,
        query: &[(&str, &str)],
    ) -> Result<T, GithubError> {
        debug!("GitHub GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose())
            .header("Accept", "application/vnd.github+json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Err(GithubError::Pending);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    fn decode(encoded: &EncodedContent) -> Result<String, GithubError> {
        if let Some(encoding) = &encoded.encoding {
            if encoding != "base64" {
                return Err(GithubError::Decode(format!("unsupported encoding {encoding}")));
            }
        }
        // GitHub wraps base64 payloads at 60 columns.
        let compact: String = encoded
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| GithubError::Decode(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| GithubError::Decode(e.to_string()))
    }
}

/// Log and count a failed call, then fall back to the empty value.
fn absorb<T: Default>(operation: &'static str, target: &str, result: Result<T, GithubError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("GitHub {} failed for {}: {}", operation, target, e);
            FETCHER_FAILURES.with_label_values(&[operation]).inc();
            T::default()
        }
    }
}

#[async_trait]
impl RepositoryFetcher for GithubClient {
    async fn get_user_profile(&self, token: &AccessToken) -> Option<UserProfile> {
        let url = format!("{}/user", self.api_base);
        absorb(
            "user_profile",
            "token owner",
            self.get_json(&url, token, &[]).await.map(Some),
        )
    }

    async fn list_repositories(&self, token: &AccessToken) -> Vec<RepositoryDescriptor> {
        let url = format!("{}/user/repos", self.api_base);
        absorb(
            "list_repositories",
            "token owner",
            self.get_json(&url, token, &[("per_page", "100"), ("affiliation", "owner")])
                .await,
        )
    }

    async fn get_branches(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> Vec<String> {
        let url = self.repo_url(repo, "branches");
        let branches: Vec<Branch> = absorb(
            "branches",
            &repo.full_name(),
            self.get_json(&url, token, &[("per_page", "100")]).await,
        );
        branches.into_iter().map(|b| b.name).collect()
    }

    async fn get_languages(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> LanguageBytes {
        let url = self.repo_url(repo, "languages");
        absorb(
            "languages",
            &repo.full_name(),
            self.get_json(&url, token, &[]).await,
        )
    }

    async fn get_contributions(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> Vec<ContributorStats> {
        let url = self.repo_url(repo, "stats/contributors");
        match self.get_json(&url, token, &[]).await {
            Err(GithubError::Pending) => {
                debug!("Contributor stats for {} not ready yet", repo.full_name());
                Vec::new()
            }
            other => absorb("contributions", &repo.full_name(), other),
        }
    }

    async fn get_repository_root_tree(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> Vec<TreeEntry> {
        let url = self.repo_url(repo, "contents/");
        let candidates = repo
            .default_branch
            .as_deref()
            .into_iter()
            .chain(FALLBACK_BRANCHES)
            .collect::<Vec<_>>();

        for branch in candidates {
            match self
                .get_json::<Vec<TreeEntry>>(&url, token, &[("ref", branch)])
                .await
            {
                Ok(entries) => return entries,
                Err(e) => debug!(
                    "No root listing for {} on {}: {}",
                    repo.full_name(),
                    branch,
                    e
                ),
            }
        }

        warn!("Could not list repository contents for {}", repo.full_name());
        FETCHER_FAILURES.with_label_values(&["root_tree"]).inc();
        Vec::new()
    }

    async fn get_subtree(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        sha: &str,
    ) -> Vec<TreeEntry> {
        let url = self.repo_url(repo, &format!("git/trees/{}", urlencoding::encode(sha)));
        let tree: Option<GitTree> = absorb(
            "subtree",
            &repo.full_name(),
            self.get_json(&url, token, &[]).await.map(Some),
        );
        tree.map(|t| t.tree).unwrap_or_default()
    }

    async fn get_file_content(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
        sha: &str,
    ) -> Option<String> {
        let url = self.repo_url(repo, &format!("git/blobs/{}", urlencoding::encode(sha)));
        let blob: EncodedContent = match self.get_json(&url, token, &[]).await {
            Ok(blob) => blob,
            Err(e) => {
                absorb::<()>("file_content", &repo.full_name(), Err(e));
                return None;
            }
        };

        if blob.size > self.max_file_size_bytes {
            debug!(
                "Skipping blob {} in {} ({} bytes)",
                sha,
                repo.full_name(),
                blob.size
            );
            return None;
        }

        Self::decode(&blob)
            .map_err(|e| warn!("Blob {} in {} is not text: {}", sha, repo.full_name(), e))
            .ok()
    }

    async fn get_readme(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> Option<String> {
        let url = self.repo_url(repo, "readme");
        match self.get_json::<EncodedContent>(&url, token, &[]).await {
            Ok(readme) => Self::decode(&readme)
                .map_err(|e| warn!("README of {} is not text: {}", repo.full_name(), e))
                .ok(),
            Err(GithubError::Api { status: 404, .. }) => None,
            Err(e) => {
                absorb::<()>("readme", &repo.full_name(), Err(e));
                None
            }
        }
    }

    async fn get_commit_messages(
        &self,
        repo: &RepositoryDescriptor,
        token: &AccessToken,
    ) -> Vec<String> {
        let url = self.repo_url(repo, "commits");
        let commits: Vec<CommitEntry> = absorb(
            "commits",
            &repo.full_name(),
            self.get_json(&url, token, &[("per_page", "100")]).await,
        );
        commits.into_iter().map(|c| c.commit.message).collect()
    }
}
