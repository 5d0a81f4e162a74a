//! BM25 keyword search over a buffered chunk corpus.
//!
//! [`KeywordIndex`] keeps the corpus and a fitted ranking model. There is no
//! incremental update: appending chunks marks the model dirty, and
//! [`KeywordIndex::build`] refits it over the whole corpus in O(corpus size).
//!
//! Ranking itself is a capability ([`RankingBackend`]). [`Bm25Backend`] wraps
//! the [`bm25`](https://crates.io/crates/bm25) crate with our own tokenizer;
//! [`UnavailableBackend`] stands in when no ranker should be used, and keyword
//! search then returns nothing instead of failing, so vector-only retrieval
//! keeps working.
//!
//! # Usage
//!
//! ```
//! use lodestar_core::search::keyword::KeywordIndex;
//! use lodestar_core::Chunk;
//!
//! let mut index = KeywordIndex::default();
//! index.push(Chunk::new("the quick brown fox"));
//! index.push(Chunk::new("the lazy cat"));
//! index.build();
//!
//! let results = index.search("fox", 10);
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].0, 0);
//! ```

use super::tokenizer::{TextTokenizer, UnicodeWordTokenizer};
use crate::chunking::Chunk;
use crate::config::{BM25_B, BM25_K1};
use crate::error::KeywordError;
use bm25::{Embedder, EmbedderBuilder, Scorer};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A ranking model fitted to one corpus.
pub trait RankingModel: Send + Sync {
    /// Score of `query` against every corpus document, in corpus order.
    fn scores(&self, query: &str) -> Vec<f32>;
}

/// Fits ranking models over a tokenized corpus.
pub trait RankingBackend: Send + Sync {
    /// # Errors
    ///
    /// [`KeywordError::BackendUnavailable`] if this backend cannot rank.
    fn fit(
        &self,
        corpus: &[Chunk],
        tokenizer: Arc<dyn TextTokenizer>,
    ) -> Result<Box<dyn RankingModel>, KeywordError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Okapi BM25 via the `bm25` crate.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Backend {
    k1: f32,
    b: f32,
}

impl Bm25Backend {
    pub fn new(k1: f32, b: f32) -> Self {
        Self { k1, b }
    }
}

impl Default for Bm25Backend {
    fn default() -> Self {
        Self::new(BM25_K1, BM25_B)
    }
}

/// Bridges a [`TextTokenizer`] to the tokenizer trait the `bm25` crate expects.
struct TokenizerAdapter(Arc<dyn TextTokenizer>);

impl bm25::Tokenizer for TokenizerAdapter {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        self.0.tokenize(input_text)
    }
}

struct Bm25Model {
    embedder: Embedder<u32, TokenizerAdapter>,
    scorer: Scorer<usize>,
    len: usize,
}

impl RankingModel for Bm25Model {
    fn scores(&self, query: &str) -> Vec<f32> {
        let query_embedding = self.embedder.embed(query);
        (0..self.len)
            .map(|i| self.scorer.score(&i, &query_embedding).unwrap_or(0.0))
            .collect()
    }
}

/// Model for a corpus without a single token: nothing can match.
struct NoMatchModel(usize);

impl RankingModel for NoMatchModel {
    fn scores(&self, _query: &str) -> Vec<f32> {
        vec![0.0; self.0]
    }
}

impl RankingBackend for Bm25Backend {
    fn fit(
        &self,
        corpus: &[Chunk],
        tokenizer: Arc<dyn TextTokenizer>,
    ) -> Result<Box<dyn RankingModel>, KeywordError> {
        // Average document length would be zero; bm25 divides by it
        let has_tokens = corpus.iter().any(|c| !tokenizer.tokenize(c).is_empty());
        if !has_tokens {
            return Ok(Box::new(NoMatchModel(corpus.len())));
        }

        let texts: Vec<&str> = corpus.iter().map(|c| c.as_str()).collect();
        let embedder = EmbedderBuilder::<u32, TokenizerAdapter>::with_tokenizer_and_fit_to_corpus(
            TokenizerAdapter(tokenizer),
            &texts,
        )
        .k1(self.k1)
        .b(self.b)
        .build();

        let mut scorer = Scorer::<usize>::new();
        for (i, text) in texts.iter().enumerate() {
            scorer.upsert(&i, embedder.embed(text));
        }

        Ok(Box::new(Bm25Model {
            embedder,
            scorer,
            len: texts.len(),
        }))
    }

    fn name(&self) -> &'static str {
        "bm25"
    }
}

/// Null backend: keyword ranking is not available.
#[derive(Debug, Clone, Default)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RankingBackend for UnavailableBackend {
    fn fit(
        &self,
        _corpus: &[Chunk],
        _tokenizer: Arc<dyn TextTokenizer>,
    ) -> Result<Box<dyn RankingModel>, KeywordError> {
        Err(KeywordError::BackendUnavailable(self.reason.clone()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Keyword index over a chunk corpus.
pub struct KeywordIndex {
    tokenizer: Arc<dyn TextTokenizer>,
    backend: Arc<dyn RankingBackend>,
    corpus: Vec<Chunk>,
    model: Option<Box<dyn RankingModel>>,
    /// Set when the corpus changed since the last build
    dirty: bool,
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new(
            Arc::new(UnicodeWordTokenizer),
            Arc::new(Bm25Backend::default()),
        )
    }
}

impl KeywordIndex {
    pub fn new(tokenizer: Arc<dyn TextTokenizer>, backend: Arc<dyn RankingBackend>) -> Self {
        Self {
            tokenizer,
            backend,
            corpus: Vec::new(),
            model: None,
            dirty: false,
        }
    }

    pub fn tokenizer(&self) -> Arc<dyn TextTokenizer> {
        Arc::clone(&self.tokenizer)
    }

    pub fn backend(&self) -> Arc<dyn RankingBackend> {
        Arc::clone(&self.backend)
    }

    /// Appends a chunk to the corpus. The model is stale until the next build.
    pub fn push(&mut self, chunk: Chunk) {
        self.corpus.push(chunk);
        self.dirty = true;
    }

    /// Replaces the corpus and fits a model over it.
    pub fn build_from(&mut self, corpus: Vec<Chunk>) {
        self.corpus = corpus;
        self.build();
    }

    /// Fits the ranking model over the current corpus.
    ///
    /// If the backend is unavailable, the model is cleared and searches
    /// return nothing until a later build succeeds.
    #[instrument(skip_all, fields(corpus_size = self.corpus.len(), backend = self.backend.name()))]
    pub fn build(&mut self) {
        self.dirty = false;
        if self.corpus.is_empty() {
            self.model = None;
            return;
        }

        match self.backend.fit(&self.corpus, Arc::clone(&self.tokenizer)) {
            Ok(model) => {
                debug!("Keyword index built over {} chunks", self.corpus.len());
                self.model = Some(model);
            }
            Err(e) => {
                warn!("Keyword search disabled: {}", e);
                self.model = None;
            }
        }
    }

    /// `true` if chunks were pushed since the last build.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Corpus position and BM25 score of up to `k` matching chunks.
    ///
    /// Only strictly positive scores are returned, best first; equal scores
    /// keep corpus order. Returns nothing if the model has not been built, the
    /// corpus is empty, or the backend is unavailable.
    pub fn search(&self, query: &str, k: usize) -> Vec<(usize, f32)> {
        let Some(model) = &self.model else {
            return vec![];
        };
        if k == 0 {
            return vec![];
        }

        let mut results: Vec<(usize, f32)> = model
            .scores(query)
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // Stable sort: ties keep corpus order
        results.sort_by(|a, b| b.1.total_cmp(&a.1));
        results.truncate(k);
        results
    }

    /// Like [`search`](Self::search), resolved to chunks.
    pub fn search_chunks(&self, query: &str, k: usize) -> Vec<(Chunk, f32)> {
        self.search(query, k)
            .into_iter()
            .filter_map(|(i, score)| self.corpus.get(i).map(|c| (c.clone(), score)))
            .collect()
    }

    /// Chunk at a corpus position.
    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.corpus.get(index)
    }

    /// Drops the corpus and the model.
    pub fn clear(&mut self) {
        self.corpus.clear();
        self.model = None;
        self.dirty = false;
    }

    /// Number of chunks in the corpus.
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}
