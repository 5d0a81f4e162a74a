//! Separator-priority recursive splitting.
//!
//! The first separator of `["\n\n", "\n", ". ", " "]` that occurs anywhere in
//! the text is used to cut it into pieces, which are then greedily merged into
//! chunks of at most `chunk_size` characters. Text containing none of those
//! separators is sliced at fixed width with stride `chunk_size - chunk_overlap`.
//!
//! Overlap is simplified: when a piece overflows the running buffer, the
//! buffer is flushed and that piece alone seeds the next one. There is no
//! sliding window.

use super::{Chunk, ChunkingMode, ChunkingStrategy};
use crate::error::ChunkingError;
use std::borrow::Cow;
use tracing::instrument;

/// Separators in priority order. The empty separator selects fixed-width slicing.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Recursive character splitter.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// Creates a splitter.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::InvalidConfig`] if `chunk_size` is 0.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits text into chunks.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return vec![];
        }

        let separator = SEPARATORS
            .iter()
            .copied()
            .find(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or("");

        if separator.is_empty() {
            self.split_fixed_width(text)
        } else {
            self.merge_pieces(text, separator)
        }
    }

    /// Stride for fixed-width slicing. Falls back to `chunk_size` when the
    /// overlap would leave no forward progress.
    fn stride(&self) -> usize {
        if self.chunk_overlap >= self.chunk_size {
            self.chunk_size
        } else {
            self.chunk_size - self.chunk_overlap
        }
    }

    fn split_fixed_width(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every char boundary, including the end of the text
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        (0..char_count)
            .step_by(self.stride())
            .map(|start| {
                let end = (start + self.chunk_size).min(char_count);
                Chunk::new(&text[boundaries[start]..boundaries[end]])
            })
            .collect()
    }

    fn merge_pieces(&self, text: &str, separator: &str) -> Vec<Chunk> {
        let pieces: Vec<&str> = text.split(separator).collect();
        let last = pieces.len() - 1;

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffered_chars = 0usize;

        for (i, piece) in pieces.into_iter().enumerate() {
            let segment: Cow<'_, str> = if i < last {
                Cow::Owned(format!("{piece}{separator}"))
            } else {
                Cow::Borrowed(piece)
            };
            let segment_chars = segment.chars().count();

            if buffered_chars + segment_chars <= self.chunk_size {
                buffer.push_str(&segment);
                buffered_chars += segment_chars;
                continue;
            }

            if !buffer.is_empty() {
                push_trimmed(&mut chunks, &buffer);
                buffer.clear();
                buffered_chars = 0;
            }

            if segment_chars > self.chunk_size {
                // Oversized piece: keep its first chunk_size chars, drop the rest
                push_trimmed(&mut chunks, truncate_chars(&segment, self.chunk_size));
            } else {
                buffer.push_str(&segment);
                buffered_chars = segment_chars;
            }
        }

        if !buffer.is_empty() {
            push_trimmed(&mut chunks, &buffer);
        }

        chunks
    }
}

impl ChunkingStrategy for RecursiveSplitter {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.split(text)
    }

    fn name(&self) -> &'static str {
        ChunkingMode::Recursive.as_str()
    }
}

fn push_trimmed(chunks: &mut Vec<Chunk>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(Chunk::new(trimmed));
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}
