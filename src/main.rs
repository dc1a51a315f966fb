use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lines_of_thought::{
    config::{Config, LogFormat},
    embeddings::EmbeddingClient,
    langbase::LangbaseClient,
    server::{AppState, McpServer},
    storage::SqliteStorage,
};

/// Command-line overrides applied on top of the environment.
#[derive(Parser, Debug)]
#[command(name = "lines-of-thought")]
#[command(version, about = "MCP server for branching trees of thoughts")]
struct Cli {
    /// SQLite database file (overrides DATABASE_PATH).
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log level filter (overrides LOG_LEVEL).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Lines of Thought server starting..."
    );

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Initialize Langbase client
    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    // Ensure the moderation and scoring pipes exist (create if needed)
    info!("Ensuring required Langbase pipes exist...");
    if let Err(e) = langbase.ensure_pipes(&config.pipes).await {
        error!(error = %e, "Failed to ensure Langbase pipes exist");
        return Err(e.into());
    }

    // Initialize embedding client
    let embedder = match EmbeddingClient::new(&config.embedding, &config.request) {
        Ok(c) => {
            info!(
                base_url = %config.embedding.base_url,
                model = %config.embedding.model,
                "Embedding client initialized"
            );
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize embedding client");
            return Err(e.into());
        }
    };

    // Create application state
    let state = Arc::new(AppState::new(
        config,
        Arc::new(storage),
        langbase,
        Arc::new(embedder),
    ));

    // Start MCP server
    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging. Output goes to stderr; stdout carries the protocol.
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
