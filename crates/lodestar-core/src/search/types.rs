use super::vector::Similarity;
use crate::chunking::Chunk;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for index operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// Vector dimension mismatch (expected vs actual)
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension established by the first vector added
        expected: usize,
        /// Dimension of the rejected vector
        actual: usize,
    },
    /// Invalid search query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Validates that an embedding has the expected dimension.
///
/// ```
/// use lodestar_core::search::validate_dimension;
///
/// assert!(validate_dimension(3, 3).is_ok());
/// assert!(validate_dimension(5, 3).is_err());
/// ```
pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), SearchError> {
    if actual == expected {
        Ok(())
    } else {
        Err(SearchError::DimensionMismatch { expected, actual })
    }
}

/// Build provenance stored alongside a vector index.
///
/// Model id and chunking strategy are compared verbatim to decide whether a
/// persisted index can be reused. The content signature is a weaker hint: it
/// only forces a rebuild when both sides carry one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Embedding model that produced the stored vectors
    pub embedding_model: String,
    /// Chunking strategy tag (`"whole"` or `"recursive"`)
    pub chunking_strategy: String,
    /// Digest of the ingested document set, empty if unknown
    #[serde(default)]
    pub content_signature: String,
}

impl IndexMetadata {
    pub fn new(
        embedding_model: impl Into<String>,
        chunking_strategy: impl Into<String>,
        content_signature: impl Into<String>,
    ) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            chunking_strategy: chunking_strategy.into(),
            content_signature: content_signature.into(),
        }
    }

    /// `true` if model id and chunking strategy both match.
    pub fn matches(&self, model: &str, strategy: &str) -> bool {
        self.embedding_model == model && self.chunking_strategy == strategy
    }

    /// `false` only when both signatures are known and differ.
    pub fn signature_agrees(&self, signature: &str) -> bool {
        self.content_signature.is_empty()
            || signature.is_empty()
            || self.content_signature == signature
    }
}

// ============================================================================
// Persistence Types
// ============================================================================

/// Current schema version for the on-disk index format.
///
/// - v1: vectors artifact + JSON sidecar (manifest, metadata, chunks)
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Index manifest, the first record of the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Schema version this index was written with
    pub schema_version: u32,
    /// Minimum schema version required to read this index
    pub min_compatible_version: u32,
    /// Embedding dimension, 0 for an index that never received a vector
    pub dimension: usize,
    /// Number of stored vectors (and chunks)
    pub count: usize,
    /// Similarity metric the index was built with
    pub similarity: Similarity,
}

impl IndexManifest {
    pub fn new(dimension: usize, count: usize, similarity: Similarity) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            min_compatible_version: 1,
            dimension,
            count,
            similarity,
        }
    }

    /// Checks if this index can be read by the current version.
    pub fn is_compatible(&self) -> bool {
        CURRENT_SCHEMA_VERSION >= self.min_compatible_version
    }
}

/// One fused query result with per-source provenance.
///
/// Built fresh for every query and never persisted. Ranks are zero-based
/// positions in the source list; a `None` rank means the chunk did not appear
/// in that list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    /// Retrieved chunk
    pub chunk: Chunk,
    /// Position in the vector result list
    pub vector_rank: Option<usize>,
    /// Position in the keyword result list
    pub keyword_rank: Option<usize>,
    /// Similarity reported by the vector index
    pub vector_score: Option<f32>,
    /// BM25 score reported by the keyword index
    pub keyword_score: Option<f32>,
    /// Sum of reciprocal-rank contributions
    pub fused_score: f32,
}
