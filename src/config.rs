//! Configuration module for the screenshot search service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::store::StoreConfig;

/// Which embedding model implementation backs the vectorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Deterministic feature hashing, no model download.
    Hash,
    /// Sentence-transformer models through fastembed.
    FastEmbed,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingBackend::Hash => "hash",
            EmbeddingBackend::FastEmbed => "fastembed",
        }
    }

    fn compiled_default() -> Self {
        if cfg!(feature = "fastembed") {
            EmbeddingBackend::FastEmbed
        } else {
            EmbeddingBackend::Hash
        }
    }
}

impl FromStr for EmbeddingBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hash" | "hashing" => Ok(EmbeddingBackend::Hash),
            "fastembed" => Ok(EmbeddingBackend::FastEmbed),
            other => Err(ConfigError::Invalid {
                key: "EMBEDDING_BACKEND",
                reason: format!("unknown backend '{}'", other),
            }),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// MongoDB connection string; `None` runs on the in-memory store
    pub mongodb_uri: Option<String>,
    /// MongoDB database name
    pub mongodb_database: String,
    /// MongoDB collection holding screenshot records
    pub mongodb_collection: String,
    /// How long to wait for MongoDB before falling back
    pub mongodb_connect_timeout: Duration,
    /// Embedding implementation
    pub embedding_backend: EmbeddingBackend,
    /// Embedding model name (fastembed backend)
    pub embedding_model: String,
    /// Output dimension of the hashing backend
    pub embedding_dimension: usize,
    /// Result count when a search omits top_k
    pub default_top_k: usize,
    /// Upper bound on top_k accepted over HTTP
    pub max_top_k: usize,
    /// HTTP API port
    pub http_port: u16,
    /// Prometheus metrics HTTP port
    pub metrics_port: u16,
    /// Bind address (supports IPv4, IPv6, or dual-stack)
    pub bind_address: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `MONGODB_URI` - MongoDB connection string (unset: in-memory fallback)
    /// - `MONGODB_DATABASE` - Database name (default: visual_memory_search)
    /// - `MONGODB_COLLECTION` - Collection name (default: screenshots)
    /// - `MONGODB_CONNECT_TIMEOUT_MS` - Connect timeout (default: 5000)
    /// - `EMBEDDING_BACKEND` - `hash` or `fastembed`
    /// - `EMBEDDING_MODEL` - Model name (default: all-MiniLM-L6-v2)
    /// - `EMBEDDING_DIMENSION` - Hashing backend dimension (default: 384)
    /// - `DEFAULT_TOP_K` - Default result count (default: 5)
    /// - `MAX_TOP_K` - Maximum result count (default: 50)
    /// - `HTTP_PORT` - HTTP listen port (default: 8080)
    /// - `METRICS_PORT` - Prometheus metrics port (default: 9090)
    /// - `BIND_ADDRESS` - Bind address (default: auto-detect [::] or 0.0.0.0)
    /// - `RUST_LOG` - Log level (default: info)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mongodb_uri = env::var("MONGODB_URI")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let mongodb_database =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| "visual_memory_search".to_string());
        let mongodb_collection =
            env::var("MONGODB_COLLECTION").unwrap_or_else(|_| "screenshots".to_string());
        let mongodb_connect_timeout =
            Duration::from_millis(parse_or("MONGODB_CONNECT_TIMEOUT_MS", 5000u64));

        let embedding_backend = match env::var("EMBEDDING_BACKEND") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => EmbeddingBackend::compiled_default(),
        };
        let embedding_model =
            env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string());

        let embedding_dimension = parse_or("EMBEDDING_DIMENSION", 384usize);
        if embedding_dimension == 0 {
            return Err(ConfigError::Invalid {
                key: "EMBEDDING_DIMENSION",
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_top_k = parse_or("MAX_TOP_K", 50usize).max(1);
        let default_top_k = parse_or("DEFAULT_TOP_K", 5usize);
        if default_top_k == 0 || default_top_k > max_top_k {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_TOP_K",
                reason: format!("must be within 1..={}", max_top_k),
            });
        }

        let http_port = parse_or("HTTP_PORT", 8080u16);
        let metrics_port = parse_or("METRICS_PORT", 9090u16);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        // Try dual-stack (::) first, fall back to IPv4-only (0.0.0.0) if needed
        let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "auto".to_string());

        Ok(Config {
            mongodb_uri,
            mongodb_database,
            mongodb_collection,
            mongodb_connect_timeout,
            embedding_backend,
            embedding_model,
            embedding_dimension,
            default_top_k,
            max_top_k,
            http_port,
            metrics_port,
            bind_address,
            log_level,
        })
    }

    /// Connection settings for the document store.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            uri: self.mongodb_uri.clone(),
            database: self.mongodb_database.clone(),
            collection: self.mongodb_collection.clone(),
            connect_timeout: self.mongodb_connect_timeout,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
