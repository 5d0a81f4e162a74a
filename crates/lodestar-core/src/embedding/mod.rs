//! Embedding provider client.
//!
//! The retriever never computes vectors itself: it calls an
//! [`EmbeddingProvider`] for every chunk at ingest and for every query. The
//! bundled [`HttpEmbeddingProvider`] talks to either an OpenAI-compatible
//! endpoint or an Ollama server; which one is decided by
//! [`EmbeddingEndpoint::resolve`] from configuration and environment.
//!
//! # Endpoint resolution
//!
//! | Source | Shape |
//! |---|---|
//! | `base_url` containing `/v1` | OpenAI, `{base}/embeddings` |
//! | any other `base_url` | Ollama, `{base}/api/embeddings` |
//! | `EMBEDDING_BASE_URL` + `EMBEDDING_KEY` | OpenAI |
//! | `OLLAMA_EMBED_BASE_URL` | Ollama |
//!
//! Nothing resolvable is a construction-time [`ConfigError`](crate::error::ConfigError).

pub mod config;
mod http;
mod traits;

pub use config::{EmbeddingConfig, EmbeddingEndpoint, EndpointShape};
pub use http::HttpEmbeddingProvider;
pub use traits::EmbeddingProvider;
