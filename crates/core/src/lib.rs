pub mod analysis;
pub mod auth;
pub mod config;
pub mod github;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod subject;
pub mod summarizer;
pub mod testing;

pub use analysis::{aggregate, RepoMetricSet, RepositoryMetrics, SubjectMetricSummary};
pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use github::{AccessToken, GithubClient, RepositoryDescriptor, RepositoryFetcher};
pub use orchestrator::{AnalysisOrchestrator, TriggerAccepted, TriggerRejected};
pub use pipeline::{MetricStep, Pipeline, ScratchContext, StepError};
pub use progress::{ProgressError, ProgressTracker, NO_PROGRESS};
pub use subject::{
    AnalysisStatus, SqliteSubjectStore, StoreError, SubjectError, SubjectRef, SubjectStore,
};
pub use summarizer::{create_llm_client, LlmSummarizer, Summarizer};
