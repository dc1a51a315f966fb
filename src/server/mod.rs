//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::config::Config;
use crate::embeddings::Embedder;
use crate::gate::{LangbaseJudge, Moderator, QualityGate, StrengthScorer};
use crate::langbase::LangbaseClient;
use crate::pipeline::ThoughtPipeline;
use crate::ranking::RankingEngine;
use crate::retrieval::RetrievalEngine;
use crate::storage::Storage;

/// Application state shared across handlers.
///
/// Every component holds `Arc`s to the same storage and embedder, so cloning
/// the state is cheap and requests need no locking.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Graph store.
    pub storage: Arc<dyn Storage>,
    /// Creation, link and delete operations.
    pub pipeline: ThoughtPipeline,
    /// Neighbourhood and subgraph reads.
    pub retrieval: RetrievalEngine,
    /// Search and listing.
    pub ranking: RankingEngine,
}

impl AppState {
    /// Create new application state with Langbase-backed moderation and scoring
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        langbase: LangbaseClient,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let judge = Arc::new(LangbaseJudge::new(langbase, &config.pipes));
        Self::with_components(config, storage, embedder, judge.clone(), judge)
    }

    /// Create application state from explicit collaborators
    pub fn with_components(
        config: Config,
        storage: Arc<dyn Storage>,
        embedder: Arc<dyn Embedder>,
        moderator: Arc<dyn Moderator>,
        scorer: Arc<dyn StrengthScorer>,
    ) -> Self {
        tracing::info!(
            moderation_pipe = %config.pipes.moderation,
            strength_pipe = %config.pipes.argument_strength,
            similarity_threshold = config.gate.similarity_threshold,
            moderation_fail_open = config.gate.moderation_fail_open,
            "AppState initializing"
        );

        let gate = QualityGate::new(storage.clone(), moderator, scorer, config.gate.clone());
        let pipeline = ThoughtPipeline::new(storage.clone(), embedder.clone(), gate);
        let retrieval = RetrievalEngine::new(storage.clone());
        let ranking = RankingEngine::new(storage.clone(), embedder);

        Self {
            config,
            storage,
            pipeline,
            retrieval,
            ranking,
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DatabaseConfig, EmbeddingConfig, GateConfig, LangbaseConfig, LogFormat, LoggingConfig,
        PipeConfig, RequestConfig,
    };
    use crate::embeddings::EmbeddingClient;
    use crate::storage::SqliteStorage;
    use std::path::PathBuf;

    fn create_test_config() -> Config {
        Config {
            langbase: LangbaseConfig {
                api_key: "test-key".to_string(),
                base_url: "https://api.langbase.com".to_string(),
            },
            embedding: EmbeddingConfig {
                base_url: "http://localhost:8080".to_string(),
                api_key: None,
                model: "test-model".to_string(),
                dimension: None,
            },
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
                max_connections: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            request: RequestConfig::default(),
            pipes: PipeConfig::default(),
            gate: GateConfig::default(),
        }
    }

    async fn create_test_state() -> AppState {
        let config = create_test_config();
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let langbase = LangbaseClient::new(&config.langbase, config.request.clone()).unwrap();
        let embedder = EmbeddingClient::new(&config.embedding, &config.request).unwrap();
        AppState::new(config, Arc::new(storage), langbase, Arc::new(embedder))
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let state = create_test_state().await;
        assert_eq!(state.config.langbase.api_key, "test-key");
    }

    #[tokio::test]
    async fn test_shared_state_type() {
        let shared: SharedState = Arc::new(create_test_state().await);

        let shared2 = Arc::clone(&shared);
        assert_eq!(Arc::strong_count(&shared), 2);
        drop(shared2);
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[tokio::test]
    async fn test_app_state_reads_through_storage() {
        let state = create_test_state().await;

        let page = state.ranking.list(None, None).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(!page.has_more);
        assert!(state.storage.get_thought("missing").await.unwrap().is_none());
    }
}
