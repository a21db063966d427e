use std::fmt;

use serde::{Deserialize, Serialize};

/// GitHub OAuth access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// A repository as returned by the GitHub repository listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub id: u64,
    pub name: String,
    pub owner: RepositoryOwner,
    #[serde(default, alias = "forks")]
    pub forks_count: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl RepositoryDescriptor {
    /// `owner/name`, used in log lines.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}

/// Public counters from the GitHub user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub public_repos: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorAuthor {
    pub login: String,
}

/// One week of a contributor's activity (`a`dditions, `d`eletions, `c`ommits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionWeek {
    #[serde(default)]
    pub w: i64,
    #[serde(default)]
    pub a: u64,
    #[serde(default)]
    pub d: u64,
    #[serde(default)]
    pub c: u64,
}

/// Weekly statistics for one contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStats {
    #[serde(default)]
    pub author: Option<ContributorAuthor>,
    #[serde(default)]
    pub weeks: Vec<ContributionWeek>,
}

/// A file or folder in a repository tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub sha: String,
    /// `file`/`dir` from the contents API, `blob`/`tree` from the git trees API.
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        matches!(self.entry_type.as_str(), "dir" | "tree")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("gho_secret");
        assert_eq!(format!("{:?}", token), "AccessToken(***)");
        assert_eq!(token.expose(), "gho_secret");
    }

    #[test]
    fn test_descriptor_accepts_forks_alias() {
        let json = r#"{"id": 42, "name": "proj", "owner": {"login": "alice"},
                       "forks": 3, "stargazers_count": 9}"#;
        let repo: RepositoryDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(repo.forks_count, 3);
        assert_eq!(repo.stargazers_count, 9);
        assert_eq!(repo.full_name(), "alice/proj");
        assert!(repo.default_branch.is_none());
    }

    #[test]
    fn test_tree_entry_kinds() {
        let entries: Vec<TreeEntry> = serde_json::from_str(
            r#"[{"path": "src", "sha": "t1", "type": "dir"},
                {"path": "lib", "sha": "t2", "type": "tree"},
                {"path": "main.py", "sha": "b1", "type": "file", "size": 12},
                {"path": "x.rs", "sha": "b2", "type": "blob"}]"#,
        )
        .unwrap();
        let dirs: Vec<bool> = entries.iter().map(TreeEntry::is_dir).collect();
        assert_eq!(dirs, vec![true, true, false, false]);
    }

    #[test]
    fn test_contributor_stats_shape() {
        let stats: Vec<ContributorStats> = serde_json::from_str(
            r#"[{"author": {"login": "alice"},
                 "total": 3,
                 "weeks": [{"w": 1, "a": 10, "d": 2, "c": 3}, {"w": 2, "a": 0, "d": 0, "c": 0}]}]"#,
        )
        .unwrap();
        assert_eq!(stats[0].author.as_ref().unwrap().login, "alice");
        assert_eq!(stats[0].weeks.len(), 2);
        assert_eq!(stats[0].weeks[0].c, 3);
    }
}
