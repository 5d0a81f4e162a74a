//! Defaults and runtime configuration.
//!
//! Constants hold the production defaults; [`RetrieverConfig`] and
//! [`VectorStoreConfig`] deserialize from any serde source with every field
//! optional, falling back to those defaults.
//!
//! ```
//! use lodestar_core::config::{RetrieverConfig, DEFAULT_CHUNK_SIZE, RRF_K};
//!
//! let config = RetrieverConfig::default();
//! assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
//! assert_eq!(config.rrf_k, RRF_K);
//! ```

use crate::chunking::ChunkingMode;
use crate::error::ConfigError;
use crate::search::vector::{AnnBackendKind, Similarity};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::embedding::EmbeddingConfig;

// =============================================================================
// Chunking
// =============================================================================

/// Maximum characters per chunk for recursive splitting.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Characters shared between neighbouring chunks in fixed-width fallback slicing.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

// =============================================================================
// Ranking
// =============================================================================

/// Standard RRF k parameter (Cormack, Clarke & Buettcher, SIGIR 2009).
pub const RRF_K: usize = 60;

/// Results returned by `retrieve_default`.
pub const DEFAULT_TOP_K: usize = 3;

/// BM25 term frequency saturation.
pub const BM25_K1: f32 = 1.5;

/// BM25 document length normalization.
pub const BM25_B: f32 = 0.75;

/// Minimum ef_search for HNSW queries.
///
/// Queries use `max(k * 2, ef_search)`.
pub const DEFAULT_EF_SEARCH: usize = 50;

// =============================================================================
// Embedding provider
// =============================================================================

/// Per-request timeout for embedding calls.
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 60;

/// Vector store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// ANN structure used for search
    pub backend: AnnBackendKind,
    /// Similarity metric
    pub similarity: Similarity,
    /// HNSW search breadth floor (ignored by the flat backend)
    pub ef_search: usize,
    /// Vectors artifact location; `None` keeps the index in memory only
    pub path: Option<PathBuf>,
    /// Metadata sidecar location; defaults to `<path>.meta.json`
    pub meta_path: Option<PathBuf>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: AnnBackendKind::Hnsw,
            similarity: Similarity::Cosine,
            ef_search: DEFAULT_EF_SEARCH,
            path: None,
            meta_path: None,
        }
    }
}

/// Engine settings for a [`HybridRetriever`](crate::retriever::HybridRetriever).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// How documents are cut into chunks at ingest
    pub chunking: ChunkingMode,
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Overlap budget between neighbouring chunks
    pub chunk_overlap: usize,
    /// RRF constant
    pub rrf_k: usize,
    /// Result count for `retrieve_default`
    pub top_k: usize,
    /// Vector store settings
    pub vector_store: VectorStoreConfig,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingMode::Whole,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            rrf_k: RRF_K,
            top_k: DEFAULT_TOP_K,
            vector_store: VectorStoreConfig::default(),
        }
    }
}

impl RetrieverConfig {
    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be > 0".into()));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be > 0".into()));
        }
        if self.vector_store.ef_search == 0 {
            return Err(ConfigError::Invalid("ef_search must be > 0".into()));
        }
        if self.vector_store.meta_path.is_some() && self.vector_store.path.is_none() {
            return Err(ConfigError::Invalid(
                "vector_store.meta_path requires vector_store.path".into(),
            ));
        }
        Ok(())
    }
}
