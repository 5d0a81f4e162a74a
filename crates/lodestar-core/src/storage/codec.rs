//! Binary layout of the vectors artifact.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "LSVX"
//! 4       4     format version (u32 LE)
//! 8       4     dimension (u32 LE)
//! 12      8     vector count (u64 LE)
//! 20      ..    count * dimension f32 values, little-endian, row-major
//! ```

use crate::error::PersistenceError;

pub const VECTORS_MAGIC: [u8; 4] = *b"LSVX";
pub const VECTORS_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 20;
const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

/// Encodes vectors of a common dimension into the artifact format.
pub fn encode_vectors<V: AsRef<[f32]>>(dimension: usize, vectors: &[V]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(HEADER_LEN + vectors.len() * dimension * FLOAT_SIZE);
    buffer.extend_from_slice(&VECTORS_MAGIC);
    buffer.extend_from_slice(&VECTORS_FORMAT_VERSION.to_le_bytes());
    buffer.extend_from_slice(&(dimension as u32).to_le_bytes());
    buffer.extend_from_slice(&(vectors.len() as u64).to_le_bytes());

    for vector in vectors {
        for &value in vector.as_ref() {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
    buffer
}

/// Decodes an artifact into `(dimension, vectors)`.
///
/// # Errors
///
/// Returns [`PersistenceError::Corrupt`] on a bad magic, an unknown version,
/// or a payload whose length disagrees with the header.
pub fn decode_vectors(data: &[u8]) -> Result<(usize, Vec<Vec<f32>>), PersistenceError> {
    if data.len() < HEADER_LEN {
        return Err(PersistenceError::Corrupt(format!(
            "vectors artifact is {} bytes, shorter than its {HEADER_LEN}-byte header",
            data.len()
        )));
    }
    if data[0..4] != VECTORS_MAGIC {
        return Err(PersistenceError::Corrupt(
            "vectors artifact has wrong magic".to_string(),
        ));
    }

    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != VECTORS_FORMAT_VERSION {
        return Err(PersistenceError::Corrupt(format!(
            "unsupported vectors format version {version}"
        )));
    }

    let dimension = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&data[12..20]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    let payload = &data[HEADER_LEN..];
    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(FLOAT_SIZE))
        .ok_or_else(|| PersistenceError::Corrupt("vector count overflows".to_string()))?;
    if payload.len() != expected_len {
        return Err(PersistenceError::Corrupt(format!(
            "payload is {} bytes, header implies {expected_len} ({count} x {dimension})",
            payload.len()
        )));
    }
    if count > 0 && dimension == 0 {
        return Err(PersistenceError::Corrupt(
            "non-empty artifact with zero dimension".to_string(),
        ));
    }

    let vectors = if dimension == 0 {
        Vec::new()
    } else {
        payload
            .chunks_exact(dimension * FLOAT_SIZE)
            .map(|row| {
                row.chunks_exact(FLOAT_SIZE)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect()
            })
            .collect()
    };

    Ok((dimension, vectors))
}
