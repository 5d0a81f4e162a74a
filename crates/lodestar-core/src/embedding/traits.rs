//! The embedding capability consumed by the retriever.

use crate::error::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

/// Turns text into a dense vector.
///
/// Every vector from one provider must have the same length; the vector index
/// rejects anything else. `model_id` is recorded in the index metadata, so
/// switching models invalidates a persisted index.
///
/// # Examples
///
/// ```ignore
/// let provider = HttpEmbeddingProvider::new(&EmbeddingConfig::new("nomic-embed-text"))?;
/// let vector = provider.embed("cats are mammals").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds one text.
    ///
    /// # Errors
    ///
    /// Any [`ProviderError`]; callers decide whether to retry.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Identifier of the model producing the vectors.
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        (**self).embed(text).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}
