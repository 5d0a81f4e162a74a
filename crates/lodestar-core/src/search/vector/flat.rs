// Brute-force backend: exact results, linear scan per query

use super::metric::Similarity;
use super::AnnBackend;
use std::sync::Arc;

/// Exhaustive nearest-neighbor search.
///
/// Always exact. O(n) per query, fine for small corpora.
pub struct FlatBackend {
    similarity: Similarity,
    vectors: Vec<Arc<[f32]>>,
}

impl FlatBackend {
    pub fn new(similarity: Similarity) -> Self {
        Self {
            similarity,
            vectors: Vec::new(),
        }
    }
}

impl AnnBackend for FlatBackend {
    fn insert(&mut self, vector: Arc<[f32]>) {
        self.vectors.push(vector);
    }

    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, self.similarity.distance(query, v)))
            .collect();
        // Stable: equal distances keep insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn name(&self) -> &'static str {
        "flat"
    }
}
