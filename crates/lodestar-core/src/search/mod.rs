//! Index structures and ranking.
//!
//! - `vector`: persistent ANN index (HNSW or exact scan) with build metadata
//! - `keyword`: BM25 index over a buffered chunk corpus
//! - `tokenizer`: term extraction for keyword ranking
//! - `fusion`: Reciprocal Rank Fusion of the two result lists
//! - `types`: shared types ([`IndexMetadata`], [`ScoredDocument`], [`SearchError`])
//!
//! None of these hold references to each other; the
//! [`HybridRetriever`](crate::retriever::HybridRetriever) owns one of each
//! index and combines them per query.
//!
//! **Reciprocal Rank Fusion**: `score = 1 / (k + rank + 1)` with zero-based
//! ranks and `k = 60`, summed over both lists. Raw scores never mix, so cosine
//! similarity and BM25 need no normalization against each other.

pub mod fusion;
pub mod keyword;
pub mod tokenizer;
pub mod types;
pub mod vector;

pub use fusion::reciprocal_rank_fusion;
pub use keyword::{Bm25Backend, KeywordIndex, RankingBackend, UnavailableBackend};
pub use tokenizer::{TextTokenizer, UnicodeWordTokenizer};
pub use types::{
    validate_dimension, IndexManifest, IndexMetadata, ScoredDocument, SearchError,
    CURRENT_SCHEMA_VERSION,
};
pub use vector::{AnnBackend, AnnBackendKind, Similarity, VectorIndex};
