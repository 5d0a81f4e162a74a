// rust-cv/hnsw backend with incremental insertion

use super::metric::{key_distance, ScaledMetric, Similarity};
use super::AnnBackend;
use ::hnsw::{Hnsw, Searcher};
use space::Neighbor;
use std::sync::Arc;

/// HNSW graph over shared vectors.
///
/// # Parameters
///
/// - **M = 16**: bidirectional links per node at layers > 0.
/// - **M0 = 32**: links at layer 0, the usual `2 * M`.
///
/// Queries run with `ef = max(k * 2, ef_search)`, where `k` is clamped to the graph size.
///
/// Reference: "Efficient and robust approximate nearest neighbor search using
/// Hierarchical Navigable Small World graphs", Malkov & Yashunin (2018).
pub struct HnswBackend {
    index: Hnsw<ScaledMetric, Arc<[f32]>, rand::rngs::StdRng, 16, 32>,
    /// Scratch state for insertion; queries get their own so search is `&self`
    insert_searcher: Searcher<u32>,
    ef_search: usize,
    len: usize,
}

impl HnswBackend {
    pub fn new(similarity: Similarity, ef_search: usize) -> Self {
        Self {
            index: Hnsw::new(ScaledMetric(similarity)),
            insert_searcher: Searcher::default(),
            ef_search,
            len: 0,
        }
    }
}

impl AnnBackend for HnswBackend {
    fn insert(&mut self, vector: Arc<[f32]>) {
        self.index.insert(vector, &mut self.insert_searcher);
        self.len += 1;
    }

    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let actual_k = k.min(self.len);
        if actual_k == 0 {
            return vec![];
        }

        let mut neighbors = vec![
            Neighbor {
                index: !0,
                distance: !0
            };
            actual_k
        ];
        let ef = std::cmp::max(actual_k.saturating_mul(2), self.ef_search);
        let query: Arc<[f32]> = Arc::from(query);
        let mut searcher = Searcher::default();

        self.index.nearest(&query, ef, &mut searcher, &mut neighbors);

        let mut results: Vec<(usize, u32)> = neighbors
            .into_iter()
            .filter(|n| n.index != !0)
            .map(|n| (n.index, n.distance))
            .collect();
        // Equal distances fall back to insertion order
        results.sort_by_key(|&(index, distance)| (distance, index));

        results
            .into_iter()
            .map(|(index, key)| (index, key_distance(key)))
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn name(&self) -> &'static str {
        "hnsw"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with(vectors: &[[f32; 3]]) -> HnswBackend {
        let mut backend = HnswBackend::new(Similarity::Cosine, 50);
        for v in vectors {
            backend.insert(Arc::from(&v[..]));
        }
        backend
    }

    #[test]
    fn test_nearest_orders_by_distance() {
        let backend = backend_with(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.1, 0.0]]);
        let results = backend.nearest(&[1.0, 0.0, 0.0], 2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 2);
        assert!(results[0].1 <= results[1].1);
    }

    #[test]
    fn test_nearest_on_empty_graph() {
        let backend = HnswBackend::new(Similarity::Cosine, 50);
        assert!(backend.nearest(&[1.0, 0.0, 0.0], 5).is_empty());
        assert_eq!(backend.len(), 0);
    }

    #[test]
    fn test_k_larger_than_graph() {
        let backend = backend_with(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert_eq!(backend.nearest(&[1.0, 0.0, 0.0], 10).len(), 2);
    }

    #[test]
    fn test_unbounded_k() {
        let backend = backend_with(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert_eq!(backend.nearest(&[1.0, 0.0, 0.0], usize::MAX).len(), 2);
    }

    #[test]
    fn test_recall_over_many_points() {
        let mut backend = HnswBackend::new(Similarity::L2, 50);
        for i in 0..200 {
            let angle = i as f32 * 0.03;
            backend.insert(Arc::from(vec![angle.cos(), angle.sin(), i as f32 * 0.001]));
        }

        let results = backend.nearest(&[1.0, 0.0, 0.0], 10);
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].0, 0);
        for pair in results.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }
}
