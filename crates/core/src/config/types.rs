use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub teams: TeamsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared key, required when `method = "api_key"`.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::ApiKey => "api_key",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("repometer.db")
}

/// GitHub REST API client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_github_timeout")]
    pub timeout_secs: u64,
    /// Blobs larger than this are skipped (default: 150000)
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Parallel blob downloads while building the code-quality input
    #[serde(default = "default_file_fetch_concurrency")]
    pub file_fetch_concurrency: usize,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            user_agent: default_user_agent(),
            timeout_secs: default_github_timeout(),
            max_file_size_bytes: default_max_file_size(),
            file_fetch_concurrency: default_file_fetch_concurrency(),
        }
    }
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    format!("repometer/{}", env!("CARGO_PKG_VERSION"))
}

fn default_github_timeout() -> u64 {
    30
}

fn default_max_file_size() -> u64 {
    150_000
}

fn default_file_fetch_concurrency() -> usize {
    4
}

/// Which language-model backend produces the commentary.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SummarizerProvider {
    /// OpenAI-compatible chat completions endpoint.
    #[default]
    Openai,
    /// Local Ollama server.
    Ollama,
}

/// Summarizer (LLM) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub provider: SummarizerProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override the provider's default endpoint.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Prompts are cut to roughly this many tokens before sending.
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: usize,
    /// Characters per token used for the cut estimate.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
    /// Fixed wait before retrying a rate-limited request.
    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_secs: u64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: SummarizerProvider::default(),
            model: default_model(),
            api_key: None,
            api_base: None,
            max_prompt_tokens: default_max_prompt_tokens(),
            chars_per_token: default_chars_per_token(),
            rate_limit_backoff_secs: default_rate_limit_backoff(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_prompt_tokens() -> usize {
    4000
}

fn default_chars_per_token() -> usize {
    4
}

fn default_rate_limit_backoff() -> u64 {
    10
}

fn default_max_output_tokens() -> u32 {
    512
}

/// Analysis run tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Upper bound on selected repositories per user.
    #[serde(default = "default_max_repositories")]
    pub max_repositories: usize,
    /// Number of progress ticks emitted when replaying a cached run.
    #[serde(default = "default_cache_replay_steps")]
    pub cache_replay_steps: u32,
    #[serde(default = "default_cache_replay_interval")]
    pub cache_replay_interval_ms: u64,
    /// The contributor statistics endpoint answers empty while GitHub computes them.
    #[serde(default = "default_contribution_retry_attempts")]
    pub contribution_retry_attempts: u32,
    #[serde(default = "default_contribution_retry_delay")]
    pub contribution_retry_delay_ms: u64,
    #[serde(default = "default_max_selected_files")]
    pub max_selected_files: usize,
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
    /// Share of the progress bar kept for bootstrap and aggregation.
    #[serde(default = "default_progress_reserve")]
    pub progress_reserve: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_repositories: default_max_repositories(),
            cache_replay_steps: default_cache_replay_steps(),
            cache_replay_interval_ms: default_cache_replay_interval(),
            contribution_retry_attempts: default_contribution_retry_attempts(),
            contribution_retry_delay_ms: default_contribution_retry_delay(),
            max_selected_files: default_max_selected_files(),
            max_tree_depth: default_max_tree_depth(),
            progress_reserve: default_progress_reserve(),
        }
    }
}

fn default_max_repositories() -> usize {
    4
}

fn default_cache_replay_steps() -> u32 {
    20
}

fn default_cache_replay_interval() -> u64 {
    100
}

fn default_contribution_retry_attempts() -> u32 {
    5
}

fn default_contribution_retry_delay() -> u64 {
    1000
}

fn default_max_selected_files() -> usize {
    15
}

fn default_max_tree_depth() -> usize {
    16
}

fn default_progress_reserve() -> f64 {
    0.1
}

/// Team membership bounds (inclusive)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TeamsConfig {
    #[serde(default = "default_min_members")]
    pub min_members: usize,
    #[serde(default = "default_max_members")]
    pub max_members: usize,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            min_members: default_min_members(),
            max_members: default_max_members(),
        }
    }
}

fn default_min_members() -> usize {
    2
}

fn default_max_members() -> usize {
    4
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub github: GithubConfig,
    pub summarizer: SanitizedSummarizerConfig,
    pub analysis: AnalysisConfig,
    pub teams: TeamsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

/// Summarizer config with the API key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSummarizerConfig {
    pub provider: SummarizerProvider,
    pub model: String,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub max_prompt_tokens: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            github: config.github.clone(),
            summarizer: SanitizedSummarizerConfig {
                provider: config.summarizer.provider,
                model: config.summarizer.model.clone(),
                api_key_configured: config
                    .summarizer
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                api_base: config.summarizer.api_base.clone(),
                max_prompt_tokens: config.summarizer.max_prompt_tokens,
            },
            analysis: config.analysis.clone(),
            teams: config.teams.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_valid_config_with_none_auth() {
        let toml = r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::None);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_defaults() {
        let toml = r#"
[auth]
method = "none"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "repometer.db");
        assert_eq!(config.github.max_file_size_bytes, 150_000);
        assert_eq!(config.summarizer.provider, SummarizerProvider::Openai);
        assert_eq!(config.summarizer.model, "gpt-3.5-turbo");
        assert_eq!(config.summarizer.max_prompt_tokens, 4000);
        assert_eq!(config.summarizer.rate_limit_backoff_secs, 10);
        assert_eq!(config.analysis.max_repositories, 4);
        assert_eq!(config.analysis.cache_replay_steps, 20);
        assert_eq!(config.analysis.contribution_retry_attempts, 5);
        assert_eq!(config.analysis.max_selected_files, 15);
        assert_eq!(config.teams.min_members, 2);
        assert_eq!(config.teams.max_members, 4);
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_api_key_auth_and_ollama() {
        let toml = r#"
[auth]
method = "api_key"
api_key = "s3cret"

[summarizer]
provider = "ollama"
model = "llama3"
api_base = "http://gpu-box:11434"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::ApiKey);
        assert_eq!(config.auth.api_key.as_deref(), Some("s3cret"));
        assert_eq!(config.summarizer.provider, SummarizerProvider::Ollama);
        assert_eq!(config.summarizer.model, "llama3");
        assert_eq!(
            config.summarizer.api_base.as_deref(),
            Some("http://gpu-box:11434")
        );
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[auth]
method = "api_key"
api_key = "s3cret"

[summarizer]
api_key = "sk-live"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.auth.method, "api_key");
        assert!(sanitized.summarizer.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("sk-live"));
    }

    #[test]
    fn test_sanitized_config_without_summarizer_key() {
        let toml = r#"
[auth]
method = "none"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.auth.method, "none");
        assert!(!sanitized.summarizer.api_key_configured);
        assert_eq!(sanitized.server.port, 8080);
    }
}
