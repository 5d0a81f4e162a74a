//! Error types for lodestar-core.
//!
//! Each concern gets its own enum: configuration, chunking, the embedding
//! provider, persistence and keyword ranking. [`RetrievalError`] is what the
//! public [`HybridRetriever`](crate::retriever::HybridRetriever) operations
//! return, with `From` conversions for everything that may surface there.

use crate::search::SearchError;
use thiserror::Error;

/// Errors raised while building the engine from configuration.
///
/// These are fatal at construction time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No embedding endpoint could be resolved from config or environment
    #[error(
        "No embedding endpoint configured: pass a base_url, or set EMBEDDING_BASE_URL + EMBEDDING_KEY, or OLLAMA_EMBED_BASE_URL"
    )]
    MissingEndpoint,
    /// A configuration value is out of range or malformed
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur during text chunking.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Invalid chunking configuration
    #[error("Invalid chunking config: {0}")]
    InvalidConfig(String),
}

impl From<ChunkingError> for ConfigError {
    fn from(err: ChunkingError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// Errors returned by an embedding provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure (connect, timeout, TLS)
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-success status
    #[error("Embedding provider returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },
    /// Response body did not match the expected wire shape
    #[error("Failed to decode embedding response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Response decoded but carried no vector
    #[error("Embedding provider returned an empty embedding")]
    EmptyEmbedding,
}

/// Errors from reading or writing the persisted index.
///
/// Never fatal: a failed load degrades to an empty index and a failed save
/// leaves the in-memory index untouched.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Sidecar JSON could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Artifact present but malformed
    #[error("Corrupt index artifact: {0}")]
    Corrupt(String),
    /// Only one of the two files exists
    #[error("Incomplete index on disk: {0}")]
    Incomplete(String),
}

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors from the keyword ranking backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeywordError {
    /// No ranking backend is available; keyword search degrades to empty
    #[error("Keyword ranking backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Errors returned by [`HybridRetriever`](crate::retriever::HybridRetriever).
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Construction-time configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Embedding provider failure
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Index error (dimension mismatch, invalid query)
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl From<ChunkingError> for RetrievalError {
    fn from(err: ChunkingError) -> Self {
        RetrievalError::Config(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_converts_to_retrieval_error() {
        let err: RetrievalError = SearchError::DimensionMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert!(matches!(
            err,
            RetrievalError::Search(SearchError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn test_chunking_error_is_a_config_error() {
        let err: RetrievalError = ChunkingError::InvalidConfig("chunk_size is 0".into()).into();
        assert!(matches!(err, RetrievalError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_status_error_message() {
        let err = ProviderError::Status {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(
            err.to_string(),
            "Embedding provider returned status 503: overloaded"
        );
    }
}
