use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub embedding: EmbeddingConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub gate: GateConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Embedding service configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Expected vector length. Learned from the first response when unset.
    pub dimension: Option<usize>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration shared by the model service clients
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe configuration
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub moderation: String,
    pub argument_strength: String,
    pub model: String,
}

/// Quality gate policy
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Similarity strictly above this rejects a candidate as a duplicate.
    pub similarity_threshold: f64,
    /// Accept content when the moderation service itself fails.
    pub moderation_fail_open: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let embedding = EmbeddingConfig {
            base_url: env::var("EMBEDDING_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            api_key: env::var("EMBEDDING_API_KEY").ok().filter(|k| !k.is_empty()),
            model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string()),
            dimension: env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|s| s.parse().ok()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/thoughts.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = RequestConfig::default();
        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_ms),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retry_delay_ms),
        };

        let pipe_defaults = PipeConfig::default();
        let pipes = PipeConfig {
            moderation: env::var("PIPE_MODERATION").unwrap_or(pipe_defaults.moderation),
            argument_strength: env::var("PIPE_ARGUMENT_STRENGTH")
                .unwrap_or(pipe_defaults.argument_strength),
            model: env::var("PIPE_MODEL").unwrap_or(pipe_defaults.model),
        };

        let gate_defaults = GateConfig::default();
        let similarity_threshold = match env::var("SIMILARITY_THRESHOLD") {
            Ok(raw) => {
                let value: f64 = raw.parse().map_err(|_| AppError::Config {
                    message: format!("SIMILARITY_THRESHOLD is not a number: {}", raw),
                })?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(AppError::Config {
                        message: format!("SIMILARITY_THRESHOLD must be within [0, 1], got {}", value),
                    });
                }
                value
            }
            Err(_) => gate_defaults.similarity_threshold,
        };
        let gate = GateConfig {
            similarity_threshold,
            moderation_fail_open: env::var("MODERATION_FAIL_OPEN")
                .ok()
                .map(|s| !matches!(s.to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(gate_defaults.moderation_fail_open),
        };

        Ok(Config {
            langbase,
            embedding,
            database,
            logging,
            request,
            pipes,
            gate,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            moderation: "thought-moderation-v1".to_string(),
            argument_strength: "argument-strength-v1".to_string(),
            model: "anthropic:claude-3-5-haiku-latest".to_string(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.9,
            moderation_fail_open: true,
        }
    }
}
