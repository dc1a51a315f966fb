//! # Lines of Thought
//!
//! An MCP server for building branching trees of short textual thoughts.
//! Each branch can carry a perspective and is scored for how well the child
//! argument follows from its parent.
//!
//! ## Features
//!
//! - **Duplicate-aware creation**: candidates are embedded and compared with
//!   existing roots, their parent, and their siblings before anything is stored
//! - **Moderation**: a Langbase pipe filters spam and off-topic content (fail-open)
//! - **Argument strength**: a Langbase pipe scores each branch in [-100, 100]
//! - **Graph reads**: single and batch neighbourhoods, full subgraphs
//! - **Hybrid search**: 0.7 semantic + 0.3 keyword over top-level thoughts
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → Embedding service (HTTP)
//!                    ↓           → Langbase Pipes (HTTP)
//!              SQLite (graph)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lines_of_thought::{Config, AppState, McpServer};
//! use lines_of_thought::embeddings::EmbeddingClient;
//! use lines_of_thought::langbase::LangbaseClient;
//! use lines_of_thought::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let langbase = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let embedder = EmbeddingClient::new(&config.embedding, &config.request)?;
//!     let state = AppState::new(config, Arc::new(storage), langbase, Arc::new(embedder));
//!     McpServer::new(Arc::new(state)).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management for the server.
pub mod config;
/// Embedding adapter and cosine similarity.
pub mod embeddings;
/// Error types and result aliases for the application.
pub mod error;
/// Duplicate detection, moderation and argument-strength scoring.
pub mod gate;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// Thought creation, linking and deletion.
pub mod pipeline;
/// System prompts for Langbase pipes.
pub mod prompts;
/// Hybrid search and paginated listing.
pub mod ranking;
/// Neighbourhood and subgraph traversal.
pub mod retrieval;
/// MCP server implementation and request handling.
pub mod server;
/// SQLite graph store.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
