//! Types for text chunking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Immutable text fragment, the unit indexed and retrieved.
///
/// Backed by a shared `Arc<str>`: the vector index's chunk store, the keyword
/// corpus and query results all hold handles to the same text, so neither
/// index owns it exclusively. Equality and hashing are by content, which is
/// also the identity used to deduplicate results during fusion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chunk(Arc<str>);

impl Chunk {
    /// Creates a chunk from any owned or borrowed text.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    /// Returns the chunk text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters (Unicode scalar values), the unit `chunk_size` is measured in.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// `true` if the chunk holds only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Deref for Chunk {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
