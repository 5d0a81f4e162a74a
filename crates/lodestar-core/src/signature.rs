//! Content signatures for staleness detection.
//!
//! A signature identifies an ordered set of source documents. Callers store
//! it in [`IndexMetadata`](crate::search::IndexMetadata) and compare it on the
//! next start to decide whether the persisted index still reflects their
//! corpus.

/// Stable hex digest (blake3) over `documents` in order.
///
/// Each document is length-prefixed, so `["ab", "c"]` and `["a", "bc"]`
/// differ. An empty set has a fixed, non-empty signature.
///
/// ```
/// use lodestar_core::signature::content_signature;
///
/// let a = content_signature(["cats are mammals", "dogs are mammals too"]);
/// let owned = vec!["cats are mammals".to_string(), "dogs are mammals too".to_string()];
/// let b = content_signature(owned);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn content_signature<I>(documents: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut hasher = blake3::Hasher::new();
    let mut count: u64 = 0;
    for document in documents {
        let bytes = document.as_ref().as_bytes();
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
        count += 1;
    }
    hasher.update(&count.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}
