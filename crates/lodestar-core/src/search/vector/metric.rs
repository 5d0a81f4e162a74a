//! Similarity metrics shared by every ANN backend.
//!
//! A metric has two faces: a distance (smaller is closer) that backends order
//! by, and a similarity score (larger is closer) that callers see. HNSW needs
//! an unsigned integer distance, so [`ScaledMetric`] maps the `f32` distance
//! onto a `u32` key with the same ordering.

use serde::{Deserialize, Serialize};
use space::Metric;
use std::fmt;
use std::sync::Arc;

/// Vector similarity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    /// Cosine similarity in `[-1, 1]`
    #[default]
    Cosine,
    /// Raw dot product
    InnerProduct,
    /// Euclidean distance, reported as `1 / (1 + d)`
    L2,
}

impl Similarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Similarity::Cosine => "cosine",
            Similarity::InnerProduct => "inner_product",
            Similarity::L2 => "l2",
        }
    }

    /// Distance between two vectors; smaller is closer.
    ///
    /// Cosine distance against a zero vector is 2.0, the maximum.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Similarity::Cosine => {
                let mag_a = norm(a);
                let mag_b = norm(b);
                if mag_a == 0.0 || mag_b == 0.0 {
                    return 2.0;
                }
                1.0 - dot(a, b) / (mag_a * mag_b)
            }
            Similarity::InnerProduct => -dot(a, b),
            Similarity::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }

    /// Converts a distance from [`Similarity::distance`] to a similarity score.
    pub fn score(&self, distance: f32) -> f32 {
        match self {
            Similarity::Cosine => (1.0 - distance).clamp(-1.0, 1.0),
            Similarity::InnerProduct => -distance,
            Similarity::L2 => 1.0 / (1.0 + distance.max(0.0).sqrt()),
        }
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Maps an `f32` onto a `u32` preserving total order. NaN sorts last.
pub(crate) fn distance_key(distance: f32) -> u32 {
    if distance.is_nan() {
        return u32::MAX;
    }
    let bits = distance.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

/// Inverse of [`distance_key`].
pub(crate) fn key_distance(key: u32) -> f32 {
    if key & 0x8000_0000 != 0 {
        f32::from_bits(key & 0x7fff_ffff)
    } else {
        f32::from_bits(!key)
    }
}

/// [`Similarity`] adapted to the `space` metric interface used by HNSW.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScaledMetric(pub(crate) Similarity);

impl Metric<Arc<[f32]>> for ScaledMetric {
    type Unit = u32;

    fn distance(&self, a: &Arc<[f32]>, b: &Arc<[f32]>) -> u32 {
        distance_key(self.0.distance(a, b))
    }
}
