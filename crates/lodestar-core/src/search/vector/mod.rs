//! Persistent vector index over chunk embeddings.
//!
//! [`VectorIndex`] owns the raw vectors, a parallel chunk store and the
//! [`IndexMetadata`] describing how it was built. Nearest-neighbor search is
//! delegated to a pluggable [`AnnBackend`]: an HNSW graph by default, or an
//! exact linear scan. Both order by the configured [`Similarity`].
//!
//! The dimension is fixed by the first vector added and cleared by
//! [`VectorIndex::reset`].

mod flat;
mod hnsw;
mod metric;

use super::types::{validate_dimension, IndexManifest, IndexMetadata, SearchError};
use crate::chunking::Chunk;
use crate::config::VectorStoreConfig;
use crate::error::PersistenceError;
use crate::storage::{self, IndexPaths, IndexSidecar};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub use self::flat::FlatBackend;
pub use self::hnsw::HnswBackend;
pub use self::metric::Similarity;

/// Nearest-neighbor capability behind the vector index.
///
/// Positions are insertion order, starting at 0. Results are `(position,
/// distance)` pairs sorted by ascending distance, at most `k` long.
pub trait AnnBackend: Send + Sync {
    /// Adds a vector at the next position.
    fn insert(&mut self, vector: Arc<[f32]>);

    /// Returns up to `k` nearest positions to `query`.
    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;

    /// Number of inserted vectors.
    fn len(&self) -> usize;

    /// `true` if nothing has been inserted.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Which [`AnnBackend`] an index is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnBackendKind {
    /// Approximate HNSW graph
    #[default]
    Hnsw,
    /// Exact linear scan
    Flat,
}

impl AnnBackendKind {
    fn create(self, similarity: Similarity, ef_search: usize) -> Box<dyn AnnBackend> {
        match self {
            AnnBackendKind::Hnsw => Box::new(HnswBackend::new(similarity, ef_search)),
            AnnBackendKind::Flat => Box::new(FlatBackend::new(similarity)),
        }
    }
}

/// Vector index with a parallel chunk store and build metadata.
pub struct VectorIndex {
    backend: Box<dyn AnnBackend>,
    kind: AnnBackendKind,
    similarity: Similarity,
    ef_search: usize,
    /// Raw vectors in insertion order, kept for persistence
    vectors: Vec<Arc<[f32]>>,
    /// Chunk for each vector position
    chunks: Vec<Chunk>,
    /// Established by the first `add`
    dimension: Option<usize>,
    metadata: Option<IndexMetadata>,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("backend", &self.backend.name())
            .field("similarity", &self.similarity)
            .field("size", &self.chunks.len())
            .field("dimension", &self.dimension)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl VectorIndex {
    pub fn new(kind: AnnBackendKind, similarity: Similarity, ef_search: usize) -> Self {
        Self {
            backend: kind.create(similarity, ef_search),
            kind,
            similarity,
            ef_search,
            vectors: Vec::new(),
            chunks: Vec::new(),
            dimension: None,
            metadata: None,
        }
    }

    pub fn from_config(config: &VectorStoreConfig) -> Self {
        Self::new(config.backend, config.similarity, config.ef_search)
    }

    /// Adds a vector and its chunk.
    ///
    /// The first call fixes the index dimension.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::DimensionMismatch` if the vector length differs
    /// from the established dimension. The index is left unchanged.
    #[instrument(skip_all, fields(index_size = self.chunks.len()))]
    pub fn add(&mut self, vector: Vec<f32>, chunk: Chunk) -> Result<(), SearchError> {
        match self.dimension {
            Some(dimension) => validate_dimension(dimension, vector.len())?,
            None => {
                if vector.is_empty() {
                    return Err(SearchError::InvalidQuery(
                        "cannot index an empty vector".to_string(),
                    ));
                }
                debug!("Index dimension established: {}", vector.len());
                self.dimension = Some(vector.len());
            }
        }

        let vector: Arc<[f32]> = Arc::from(vector);
        self.backend.insert(Arc::clone(&vector));
        self.vectors.push(vector);
        self.chunks.push(chunk);
        Ok(())
    }

    /// Returns up to `k` chunks most similar to `query`, best first.
    ///
    /// An empty index yields an empty result regardless of the query.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::DimensionMismatch` if the query length differs
    /// from the index dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>, SearchError> {
        let Some(dimension) = self.dimension else {
            return Ok(vec![]);
        };
        if self.chunks.is_empty() || k == 0 {
            return Ok(vec![]);
        }
        validate_dimension(dimension, query.len())?;

        let results = self
            .backend
            .nearest(query, k)
            .into_iter()
            .filter_map(|(position, distance)| {
                self.chunks
                    .get(position)
                    .map(|chunk| (chunk.clone(), self.similarity.score(distance)))
            })
            .collect();
        Ok(results)
    }

    /// Number of indexed vectors.
    pub fn size(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimension established by the first `add`, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn similarity(&self) -> Similarity {
        self.similarity
    }

    /// Chunk store in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn metadata(&self) -> Option<&IndexMetadata> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: IndexMetadata) {
        self.metadata = Some(metadata);
    }

    /// `true` iff stored model id and chunking strategy equal the arguments.
    ///
    /// An index without metadata is never compatible. The content signature
    /// is advisory and not consulted here: callers that gate on it combine
    /// this with [`IndexMetadata::signature_agrees`], as
    /// [`HybridRetriever::has_ready_index`](crate::retriever::HybridRetriever::has_ready_index)
    /// and `ensure_compatibility` do.
    pub fn is_compatible(&self, model: &str, strategy: &str) -> bool {
        self.metadata
            .as_ref()
            .is_some_and(|meta| meta.matches(model, strategy))
    }

    /// Drops all vectors, chunks and metadata. The next `add` re-establishes
    /// the dimension.
    pub fn reset(&mut self) {
        self.backend = self.kind.create(self.similarity, self.ef_search);
        self.vectors.clear();
        self.chunks.clear();
        self.dimension = None;
        self.metadata = None;
    }

    /// Writes the index to `paths`. Returns the number of vectors written.
    ///
    /// # Errors
    ///
    /// Any [`PersistenceError`] from the write. The in-memory index is never
    /// modified.
    pub async fn persist(&self, paths: &IndexPaths) -> Result<usize, PersistenceError> {
        let sidecar = IndexSidecar {
            manifest: IndexManifest::new(
                self.dimension.unwrap_or(0),
                self.chunks.len(),
                self.similarity,
            ),
            metadata: self.metadata.clone(),
            chunks: self.chunks.clone(),
        };
        storage::write_index(paths, &sidecar, &self.vectors).await?;
        Ok(self.chunks.len())
    }

    /// Replaces the contents of this index with what is stored at `paths`.
    ///
    /// Returns `Ok(false)` if nothing is stored there. On error the index is
    /// left empty.
    ///
    /// # Errors
    ///
    /// Any [`PersistenceError`] from the read, plus `Corrupt` if a stored
    /// vector does not fit the stored dimension.
    #[instrument(skip_all, fields(path = %paths.index().display()))]
    pub async fn try_load(&mut self, paths: &IndexPaths) -> Result<bool, PersistenceError> {
        self.reset();
        let Some(persisted) = storage::read_index(paths).await? else {
            return Ok(false);
        };

        if persisted.manifest.similarity != self.similarity {
            warn!(
                "Index at {} was built with {} similarity, rebuilding with {}",
                paths.index().display(),
                persisted.manifest.similarity,
                self.similarity
            );
        }

        for (vector, chunk) in persisted.vectors.into_iter().zip(persisted.chunks) {
            if let Err(e) = self.add(vector, chunk) {
                self.reset();
                return Err(PersistenceError::Corrupt(e.to_string()));
            }
        }
        self.metadata = persisted.metadata;

        info!(
            "Loaded index: {} vectors via {} backend",
            self.size(),
            self.backend.name()
        );
        Ok(true)
    }

    /// Loads from `paths`, degrading to an empty index on any failure.
    ///
    /// Returns `true` if a stored index was loaded.
    pub async fn load(&mut self, paths: &IndexPaths) -> bool {
        match self.try_load(paths).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Failed to load index, starting empty: {}", e);
                false
            }
        }
    }
}
