//! Embedding Provider
//!
//! Capability seam for turning text into vectors. The store and cache never
//! call a provider themselves; `SemanticMemory` composes one with the
//! vector store, and any implementation (remote endpoint, local model,
//! test stub) can be substituted without touching store logic.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;

/// Text-to-vector capability
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving input order
    ///
    /// The default implementation embeds concurrently. Providers with a
    /// native batch endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        try_join_all(texts.iter().map(|text| self.embed(text))).await
    }
}
