//! Hybrid retriever combining vector (semantic) and keyword (BM25) search.
//!
//! [`HybridRetriever`] is the public façade of the engine. It owns:
//! - a [`VectorIndex`] holding one embedding per chunk, optionally persisted
//! - a [`KeywordIndex`] over the same chunks, rebuilt lazily after ingest
//! - the last query's fused ranking, for diagnostics
//!
//! # Lifecycle
//!
//! [`open`](HybridRetriever::open) loads a persisted index if one is
//! configured and derives a [`Readiness`]. A persisted index built with a
//! different embedding model or chunking strategy is `Stale`: it is never
//! queried alongside new embeddings, and the first ingest drops it.
//!
//! # Locking
//!
//! Index state sits behind one `tokio::sync::RwLock`. Embedding calls run
//! with no lock held, so cancelling an `ingest` or `retrieve` at the provider
//! call never leaves a half-updated index.

mod readiness;


pub use readiness::{Readiness, ReadinessEvent};

use crate::chunking::{create_chunker, Chunk, ChunkingStrategy};
use crate::config::RetrieverConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{ConfigError, PersistenceError, RetrievalError};
use crate::search::{
    reciprocal_rank_fusion, IndexMetadata, KeywordIndex, RankingBackend, ScoredDocument,
    TextTokenizer, VectorIndex,
};
use crate::storage::IndexPaths;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, instrument, warn};

/// Result of [`HybridRetriever::persist`].
#[derive(Debug)]
pub enum PersistOutcome {
    /// Both files were written
    Saved {
        /// Number of vectors written
        vectors: usize,
    },
    /// No persistence path is configured
    Skipped,
    /// The write failed; the in-memory index is unaffected
    Failed(PersistenceError),
}

impl PersistOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistOutcome::Saved { .. })
    }
}

/// Everything guarded by the index lock.
struct IndexState {
    vector: VectorIndex,
    keyword: KeywordIndex,
    readiness: Readiness,
}

impl IndexState {
    fn apply(&mut self, event: ReadinessEvent) {
        let next = self.readiness.on(event);
        if next != self.readiness {
            debug!("Readiness {} -> {} on {:?}", self.readiness, next, event);
        }
        self.readiness = next;
    }

    fn clear(&mut self) {
        self.vector.reset();
        self.keyword.clear();
    }

    /// Drops the index if its metadata disagrees with `model` and `strategy`.
    ///
    /// A non-empty index without metadata has unknown provenance and is
    /// dropped too. Returns `true` if the index was dropped.
    fn drop_if_incompatible(&mut self, model: &str, strategy: &str, signature: &str) -> bool {
        let incompatible = match self.vector.metadata() {
            Some(meta) => !meta.matches(model, strategy) || !meta.signature_agrees(signature),
            None => !self.vector.is_empty(),
        };
        if !incompatible {
            return false;
        }

        match self.vector.metadata() {
            Some(meta) => warn!(
                "Index built with model={} strategy={}, current model={} strategy={}; dropping {} vectors",
                meta.embedding_model,
                meta.chunking_strategy,
                model,
                strategy,
                self.vector.size()
            ),
            None => warn!(
                "Index has no metadata; dropping {} vectors",
                self.vector.size()
            ),
        }
        self.clear();
        self.apply(ReadinessEvent::IncompatibilityDetected);
        true
    }
}

/// Hybrid retrieval engine.
///
/// Generic over the embedding provider so tests can substitute a
/// deterministic one.
///
/// # Example
///
/// ```ignore
/// use lodestar_core::config::{EmbeddingConfig, RetrieverConfig};
/// use lodestar_core::embedding::HttpEmbeddingProvider;
/// use lodestar_core::HybridRetriever;
///
/// let provider = HttpEmbeddingProvider::new(&EmbeddingConfig::new("nomic-embed-text"))?;
/// let retriever = HybridRetriever::open(provider, RetrieverConfig::default()).await?;
///
/// retriever.ingest("cats are mammals").await?;
/// retriever.ingest("dogs are mammals too").await?;
///
/// let chunks = retriever.retrieve("mammal", 2).await?;
/// ```
pub struct HybridRetriever<P: EmbeddingProvider> {
    provider: P,
    config: RetrieverConfig,
    chunker: Box<dyn ChunkingStrategy>,
    paths: Option<IndexPaths>,
    state: RwLock<IndexState>,
    diagnostics: RwLock<Vec<ScoredDocument>>,
}

impl<P: EmbeddingProvider> HybridRetriever<P> {
    /// Creates an empty in-memory retriever without touching disk.
    ///
    /// Use [`open`](Self::open) to load a persisted index.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::Config`] if `config` fails validation.
    pub fn new(provider: P, config: RetrieverConfig) -> Result<Self, RetrievalError> {
        config.validate()?;
        let chunker = create_chunker(config.chunking, config.chunk_size, config.chunk_overlap)?;
        let paths = IndexPaths::from_config(&config.vector_store);

        Ok(Self {
            state: RwLock::new(IndexState {
                vector: VectorIndex::from_config(&config.vector_store),
                keyword: KeywordIndex::default(),
                readiness: Readiness::Empty,
            }),
            diagnostics: RwLock::new(Vec::new()),
            provider,
            config,
            chunker,
            paths,
        })
    }

    /// Creates a retriever and loads the persisted index, if any.
    ///
    /// A missing or unreadable index is not an error: the retriever starts
    /// empty and the failure is logged.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::Config`] if `config` fails validation.
    pub async fn open(provider: P, config: RetrieverConfig) -> Result<Self, RetrievalError> {
        let retriever = Self::new(provider, config)?;
        retriever.load().await;
        Ok(retriever)
    }

    /// Replaces the keyword tokenizer and refits the keyword index.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn TextTokenizer>) -> Self {
        let state = self.state.get_mut();
        let backend = state.keyword.backend();
        state.keyword = KeywordIndex::new(tokenizer, backend);
        state.keyword.build_from(state.vector.chunks().to_vec());
        self
    }

    /// Replaces the keyword ranking backend and refits the keyword index.
    #[must_use]
    pub fn with_ranking_backend(mut self, backend: Arc<dyn RankingBackend>) -> Self {
        let state = self.state.get_mut();
        let tokenizer = state.keyword.tokenizer();
        state.keyword = KeywordIndex::new(tokenizer, backend);
        state.keyword.build_from(state.vector.chunks().to_vec());
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Tag of the configured chunking strategy.
    pub fn chunking_strategy(&self) -> &'static str {
        self.chunker.name()
    }

    /// (Re)loads the persisted index, replacing the in-memory one.
    ///
    /// Returns `true` if a stored index was loaded. Without a configured path
    /// this only resets the state to empty.
    #[instrument(skip_all)]
    pub async fn load(&self) -> bool {
        let mut state = self.state.write().await;
        let loaded = match &self.paths {
            Some(paths) => state.vector.load(paths).await,
            None => {
                state.vector.reset();
                false
            }
        };

        let chunks = state.vector.chunks().to_vec();
        state.keyword.build_from(chunks);

        let compatible = state
            .vector
            .is_compatible(self.provider.model_id(), self.chunker.name());
        let non_empty = !state.vector.is_empty();
        state.apply(ReadinessEvent::Loaded {
            non_empty,
            compatible,
        });

        if loaded {
            info!(
                "Index loaded: {} chunks, readiness {}",
                state.vector.size(),
                state.readiness
            );
        } else {
            info!("No existing index found, starting empty");
        }
        loaded
    }

    /// Chunks `document`, embeds every non-blank chunk and indexes it.
    ///
    /// Returns the embedding of the last indexed chunk, or `None` if the
    /// document produced no indexable chunk. An index built with a different
    /// model or chunking strategy is dropped before the first add.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::Provider`] if an embedding call fails
    /// - [`RetrievalError::Search`] if an embedding's length disagrees with
    ///   the index dimension
    ///
    /// Chunks indexed before the failure stay indexed.
    #[instrument(skip_all, fields(text_len = document.len()))]
    pub async fn ingest(&self, document: &str) -> Result<Option<Vec<f32>>, RetrievalError> {
        let (last, added) = self.ingest_document(document).await?;
        debug!("Ingested {} chunks", added);
        Ok(last)
    }

    /// Ingests each document in order. Returns the number of chunks added.
    ///
    /// # Errors
    ///
    /// Stops at the first failing document; see [`ingest`](Self::ingest).
    #[instrument(skip_all)]
    pub async fn ingest_all<I>(&self, documents: I) -> Result<usize, RetrievalError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut total = 0;
        for document in documents {
            let (_, added) = self.ingest_document(document.as_ref()).await?;
            total += added;
        }
        info!("Ingested {} chunks", total);
        Ok(total)
    }

    async fn ingest_document(
        &self,
        document: &str,
    ) -> Result<(Option<Vec<f32>>, usize), RetrievalError> {
        let model = self.provider.model_id();
        let strategy = self.chunker.name();

        let mut last = None;
        let mut added = 0;
        for chunk in self.chunker.chunk(document) {
            if chunk.is_blank() {
                continue;
            }

            let embedding = self.provider.embed(chunk.as_str()).await?;

            let mut state = self.state.write().await;
            state.drop_if_incompatible(model, strategy, "");
            if state.vector.metadata().is_none() {
                state
                    .vector
                    .set_metadata(IndexMetadata::new(model, strategy, ""));
            }
            state.vector.add(embedding.clone(), chunk.clone())?;
            state.keyword.push(chunk);
            state.apply(ReadinessEvent::Ingested { chunks: 1 });
            drop(state);

            last = Some(embedding);
            added += 1;
        }
        Ok((last, added))
    }

    /// Returns up to `top_k` chunks for `query`, best first.
    ///
    /// Runs vector and keyword search with `top_k` each, fuses both rankings
    /// with RRF and keeps the head. The full fused list is kept for
    /// [`last_diagnostics`](Self::last_diagnostics). An empty or
    /// [`Stale`](Readiness::Stale) index returns nothing.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::Config`] if `top_k` is 0
    /// - [`RetrievalError::Provider`] if embedding the query fails
    /// - [`RetrievalError::Search`] if the query embedding's length
    ///   disagrees with the index dimension
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>, RetrievalError> {
        self.diagnostics.write().await.clear();
        if top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be > 0".into()).into());
        }

        let query_embedding = self.provider.embed(query).await?;

        let fused = {
            let state = self.read_with_fresh_keywords().await;
            if state.vector.is_empty() {
                debug!("Index is empty, nothing to retrieve");
                return Ok(vec![]);
            }
            if state.readiness == Readiness::Stale {
                warn!("Index is stale for this model or chunking, re-ingest to query it");
                return Ok(vec![]);
            }

            let vector_results = state.vector.search(&query_embedding, top_k)?;
            let keyword_results = state.keyword.search_chunks(query, top_k);
            debug!(
                "Vector search found {} results, keyword search found {}",
                vector_results.len(),
                keyword_results.len()
            );

            reciprocal_rank_fusion(&vector_results, &keyword_results, self.config.rrf_k)
        };

        let results: Vec<Chunk> = fused
            .iter()
            .take(top_k)
            .map(|doc| doc.chunk.clone())
            .collect();
        info!("Retrieved {} of {} fused results", results.len(), fused.len());

        *self.diagnostics.write().await = fused;
        Ok(results)
    }

    /// [`retrieve`](Self::retrieve) with the configured `top_k`.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<Chunk>, RetrievalError> {
        self.retrieve(query, self.config.top_k).await
    }

    /// Keyword-only ranking: up to `top_k` chunks with their BM25 scores.
    ///
    /// Never fails; an unavailable ranking backend yields nothing.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve_keyword(&self, query: &str, top_k: usize) -> Vec<(Chunk, f32)> {
        self.read_with_fresh_keywords()
            .await
            .keyword
            .search_chunks(query, top_k)
    }

    /// Fits the keyword index over every buffered chunk now instead of at
    /// the next query.
    pub async fn build_keyword_index(&self) {
        self.state.write().await.keyword.build();
    }

    /// Fused ranking of the last `retrieve`, empty before the first call.
    pub async fn last_diagnostics(&self) -> Vec<ScoredDocument> {
        self.diagnostics.read().await.clone()
    }

    /// Drops the index if its metadata disagrees with the arguments.
    ///
    /// Model and strategy are compared verbatim; the signature only counts
    /// when both sides carry one. Returns `true` if the index was dropped.
    #[instrument(skip(self))]
    pub async fn ensure_compatibility(&self, model: &str, strategy: &str, signature: &str) -> bool {
        self.state
            .write()
            .await
            .drop_if_incompatible(model, strategy, signature)
    }

    /// Records the metadata persisted with the next [`persist`](Self::persist).
    pub async fn set_meta_info(&self, model: &str, strategy: &str, signature: &str) {
        self.state
            .write()
            .await
            .vector
            .set_metadata(IndexMetadata::new(model, strategy, signature));
    }

    /// `true` if the index is non-empty and was built with these settings,
    /// letting the caller skip ingestion.
    pub async fn has_ready_index(&self, model: &str, strategy: &str, signature: &str) -> bool {
        let state = self.state.read().await;
        !state.vector.is_empty()
            && state.vector.is_compatible(model, strategy)
            && state
                .vector
                .metadata()
                .is_some_and(|meta| meta.signature_agrees(signature))
    }

    /// Drops every vector, chunk and the metadata.
    #[instrument(skip_all)]
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.clear();
        state.apply(ReadinessEvent::Reset);
        info!("Cleared all index data");
    }

    /// Writes the index to the configured path.
    ///
    /// Failures are logged and reported, never raised.
    #[instrument(skip_all)]
    pub async fn persist(&self) -> PersistOutcome {
        let Some(paths) = &self.paths else {
            debug!("No index path configured, skipping persist");
            return PersistOutcome::Skipped;
        };

        let state = self.state.read().await;
        match state.vector.persist(paths).await {
            Ok(vectors) => {
                info!(
                    "Saved index state: {} vectors to {}",
                    vectors,
                    paths.index().display()
                );
                PersistOutcome::Saved { vectors }
            }
            Err(e) => {
                warn!("Failed to persist index: {}", e);
                PersistOutcome::Failed(e)
            }
        }
    }

    pub async fn readiness(&self) -> Readiness {
        self.state.read().await.readiness
    }

    /// Number of indexed chunks.
    pub async fn size(&self) -> usize {
        self.state.read().await.vector.size()
    }

    pub async fn metadata(&self) -> Option<IndexMetadata> {
        self.state.read().await.vector.metadata().cloned()
    }

    /// Read guard over the state, refitting the keyword index first if
    /// chunks were buffered since the last fit.
    async fn read_with_fresh_keywords(&self) -> RwLockReadGuard<'_, IndexState> {
        {
            let state = self.state.read().await;
            if !state.keyword.is_dirty() {
                return state;
            }
        }

        let mut state = self.state.write().await;
        if state.keyword.is_dirty() {
            state.keyword.build();
        }
        state.downgrade()
    }
}
