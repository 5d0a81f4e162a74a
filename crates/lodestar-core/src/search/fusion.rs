// Reciprocal Rank Fusion (RRF) with per-source provenance

use super::types::ScoredDocument;
use crate::chunking::Chunk;
use std::collections::HashMap;

/// Merges a vector result list and a keyword result list with RRF.
///
/// RRF formula: `fused(d) = sum_r 1 / (k + rank_r(d) + 1)`, where `rank_r(d)`
/// is the zero-based position of `d` in list `r`. A document missing from a
/// list gets nothing from it.
///
/// Documents are identified by chunk text. A chunk repeated within one list
/// counts once, at its best rank. Output is sorted by `fused_score`
/// descending; equal scores keep first-seen order (vector list first, then
/// keyword list), so results are reproducible.
///
/// Reference: "Reciprocal Rank Fusion outperforms Condorcet and individual
/// Rank Learning Methods", Cormack, Clarke & Buettcher (SIGIR 2009).
pub fn reciprocal_rank_fusion(
    vector_results: &[(Chunk, f32)],
    keyword_results: &[(Chunk, f32)],
    k: usize,
) -> Vec<ScoredDocument> {
    let k_param = k as f32;
    let mut fused: Vec<ScoredDocument> = Vec::new();
    let mut positions: HashMap<Chunk, usize> = HashMap::new();

    let mut entry = |chunk: &Chunk| -> usize {
        *positions.entry(chunk.clone()).or_insert_with(|| {
            fused.push(ScoredDocument {
                chunk: chunk.clone(),
                vector_rank: None,
                keyword_rank: None,
                vector_score: None,
                keyword_score: None,
                fused_score: 0.0,
            });
            fused.len() - 1
        })
    };

    let mut slots = Vec::with_capacity(vector_results.len() + keyword_results.len());
    for (chunk, _) in vector_results.iter().chain(keyword_results) {
        slots.push(entry(chunk));
    }

    let (vector_slots, keyword_slots) = slots.split_at(vector_results.len());

    for (rank, ((_, score), &slot)) in vector_results.iter().zip(vector_slots).enumerate() {
        let doc = &mut fused[slot];
        if doc.vector_rank.is_none() {
            doc.vector_rank = Some(rank);
            doc.vector_score = Some(*score);
            doc.fused_score += 1.0 / (k_param + rank as f32 + 1.0);
        }
    }

    for (rank, ((_, score), &slot)) in keyword_results.iter().zip(keyword_slots).enumerate() {
        let doc = &mut fused[slot];
        if doc.keyword_rank.is_none() {
            doc.keyword_rank = Some(rank);
            doc.keyword_score = Some(*score);
            doc.fused_score += 1.0 / (k_param + rank as f32 + 1.0);
        }
    }

    // Stable sort keeps first-seen order for ties
    fused.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));
    fused
}
