use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repometer_core::config::CONFIG_PATH_VAR;
use repometer_core::{
    create_authenticator, create_llm_client, load_config, validate_config, AnalysisOrchestrator,
    Authenticator, GithubClient, LlmSummarizer, ProgressTracker, RepositoryFetcher,
    SqliteSubjectStore, SubjectStore, Summarizer,
};
use repometer_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "repometer {} starting (config {})",
        VERSION,
        &config_hash[..16]
    );
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method().as_str());

    // Create SQLite subject store
    let store: Arc<dyn SubjectStore> = Arc::new(
        SqliteSubjectStore::new(&config.database.path)
            .context("Failed to create subject store")?,
    );
    info!("Subject store initialized");

    // Collaborators
    let fetcher: Arc<dyn RepositoryFetcher> = Arc::new(
        GithubClient::new(&config.github).context("Failed to create GitHub client")?,
    );
    info!("GitHub client targeting {}", config.github.api_base);

    let llm = create_llm_client(&config.summarizer).context("Failed to create LLM client")?;
    info!(
        "Summarizer using {} ({})",
        llm.provider(),
        config.summarizer.model
    );
    let summarizer: Arc<dyn Summarizer> = Arc::new(LlmSummarizer::new(llm, &config.summarizer));

    let orchestrator = AnalysisOrchestrator::from_config(
        &config,
        store,
        fetcher,
        summarizer,
        ProgressTracker::new(),
    );
    orchestrator
        .recover_interrupted_runs()
        .context("Failed to recover interrupted runs")?;

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), authenticator, orchestrator));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // In-flight runs are released by the next startup
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
