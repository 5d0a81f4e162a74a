//! Text chunking strategies for document ingestion.
//!
//! A document is cut into [`Chunk`]s before embedding. Two strategies exist:
//!
//! - **Whole** ([`WholeDocument`]): the document is a single chunk.
//! - **Recursive** ([`RecursiveSplitter`]): separator-priority splitting with a
//!   greedy merge pass bounded by `chunk_size` characters.
//!
//! The strategy tag ([`ChunkingMode`]) is also recorded in the persisted index
//! metadata, so changing it invalidates an existing index.

mod recursive;
mod types;

use crate::error::ChunkingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use recursive::RecursiveSplitter;
pub use types::Chunk;

/// Trait for text chunking strategies.
///
/// Implementations must be deterministic: the same input and settings always
/// produce the same chunks in the same order.
pub trait ChunkingStrategy: Send + Sync {
    /// Splits text into ordered chunks.
    fn chunk(&self, text: &str) -> Vec<Chunk>;

    /// Strategy tag stored in index metadata.
    fn name(&self) -> &'static str;
}

/// Chunking strategy tag, as it appears in configuration and index metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingMode {
    /// Whole document as one chunk
    #[default]
    Whole,
    /// Recursive separator splitting
    Recursive,
}

impl ChunkingMode {
    /// Tag string (`"whole"` or `"recursive"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingMode::Whole => "whole",
            ChunkingMode::Recursive => "recursive",
        }
    }
}

impl fmt::Display for ChunkingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingMode {
    type Err = ChunkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole" => Ok(ChunkingMode::Whole),
            "recursive" => Ok(ChunkingMode::Recursive),
            other => Err(ChunkingError::InvalidConfig(format!(
                "unknown chunking strategy '{other}' (expected 'whole' or 'recursive')"
            ))),
        }
    }
}

/// Uses the whole document as one chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeDocument;

impl ChunkingStrategy for WholeDocument {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return vec![];
        }
        vec![Chunk::new(text)]
    }

    fn name(&self) -> &'static str {
        ChunkingMode::Whole.as_str()
    }
}

/// Creates the chunker for a strategy tag.
///
/// # Errors
///
/// Returns [`ChunkingError::InvalidConfig`] if `chunk_size` is 0 for the
/// recursive strategy.
pub fn create_chunker(
    mode: ChunkingMode,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Box<dyn ChunkingStrategy>, ChunkingError> {
    match mode {
        ChunkingMode::Whole => Ok(Box::new(WholeDocument)),
        ChunkingMode::Recursive => Ok(Box::new(RecursiveSplitter::new(
            chunk_size,
            chunk_overlap,
        )?)),
    }
}
