//! # Lodestar Core
//!
//! Hybrid retrieval engine that answers a query with the most relevant text
//! fragments by combining dense-vector similarity search with BM25 keyword
//! ranking and fusing both rankings with Reciprocal Rank Fusion.
//!
//! ## Modules
//!
//! - [`chunking`] - Text chunking strategies (whole document, recursive separator splitting)
//! - [`embedding`] - Embedding provider abstraction and HTTP client (OpenAI / Ollama shapes)
//! - [`search`] - Vector index, keyword index, tokenizer and RRF fusion
//! - [`storage`] - On-disk layout for the persisted vector index
//! - [`retriever`] - [`HybridRetriever`](retriever::HybridRetriever) orchestrating ingest, query and index lifecycle
//! - [`config`] - Defaults and deserializable configuration
//! - [`signature`] - Content signatures for staleness detection
//! - [`error`] - Error types shared across the crate

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod retriever;
pub mod search;
pub mod signature;
pub mod storage;

pub use chunking::{Chunk, ChunkingMode};
pub use error::RetrievalError;
pub use retriever::{HybridRetriever, PersistOutcome, Readiness};
pub use search::{IndexMetadata, ScoredDocument};
