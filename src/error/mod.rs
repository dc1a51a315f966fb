use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("{0}")]
    Rejected(#[from] ThoughtError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Graph integrity violated: {message}")]
    Integrity { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Embedding service errors
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid embedding response: {message}")]
    InvalidResponse { message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Caller-visible rejection outcomes.
///
/// These are expected results of the creation pipeline and the read surface,
/// not infrastructure failures. Each carries a stable machine-readable code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThoughtError {
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("A very similar thought already exists (similarity {similarity:.3})")]
    DuplicateThought {
        similarity: f64,
        existing_id: String,
    },

    #[error("Thought is too similar to its parent (similarity {similarity:.3})")]
    SimilarToParent { similarity: f64 },

    #[error("A very similar branch already exists under this parent (similarity {similarity:.3})")]
    DuplicateBranch {
        similarity: f64,
        existing_id: String,
    },

    #[error("Content rejected by moderation: {reason}")]
    ModerationFailed { reason: String },

    #[error("Parent thought not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Branch conflict: {reason}")]
    BranchConflict { reason: String },
}

impl ThoughtError {
    /// Stable code for clients to switch on.
    pub fn code(&self) -> &'static str {
        match self {
            ThoughtError::Validation { .. } => "validation_failed",
            ThoughtError::DuplicateThought { .. } => "duplicate_thought",
            ThoughtError::SimilarToParent { .. } => "similar_to_parent",
            ThoughtError::DuplicateBranch { .. } => "duplicate_branch",
            ThoughtError::ModerationFailed { .. } => "moderation_failed",
            ThoughtError::ParentNotFound { .. } => "parent_not_found",
            ThoughtError::NotFound { .. } => "not_found",
            ThoughtError::BranchConflict { .. } => "branch_conflict",
        }
    }

    /// Structured error body returned to callers.
    pub fn to_payload(&self) -> Value {
        let mut body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });

        match self {
            ThoughtError::Validation { field, .. } => {
                body["field"] = json!(field);
            }
            ThoughtError::DuplicateThought {
                similarity,
                existing_id,
            }
            | ThoughtError::DuplicateBranch {
                similarity,
                existing_id,
            } => {
                body["similarity"] = json!(similarity);
                body["existing_id"] = json!(existing_id);
            }
            ThoughtError::SimilarToParent { similarity } => {
                body["similarity"] = json!(similarity);
            }
            ThoughtError::ModerationFailed { reason } => {
                body["reason"] = json!(reason);
            }
            _ => {}
        }

        json!({ "error": body })
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        ThoughtError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Generic message for anything that is not a caller-visible rejection.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred. Please try again later.";

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("{0}")]
    Rejected(ThoughtError),

    #[error("An internal error occurred. Please try again later.")]
    Internal,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Structured error body for a failed tool call.
    pub fn to_payload(&self) -> Value {
        match self {
            McpError::Rejected(rejection) => rejection.to_payload(),
            McpError::InvalidRequest { .. } | McpError::InvalidParameters { .. } => json!({
                "error": { "code": "validation_failed", "message": self.to_string() }
            }),
            McpError::UnknownTool { .. } => json!({
                "error": { "code": "unknown_tool", "message": self.to_string() }
            }),
            McpError::Internal | McpError::Json(_) => json!({
                "error": { "code": "internal_error", "message": INTERNAL_ERROR_MESSAGE }
            }),
        }
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Rejected(rejection) => McpError::Rejected(rejection),
            AppError::Mcp(inner) => inner,
            other => {
                // Full detail stays in the server log only.
                error!(error = %other, "Request failed with internal error");
                McpError::Internal
            }
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
