//! Semantic Memory
//!
//! Text-level recall over the vector store, with embeddings supplied by a
//! pluggable provider.

use hashbrown::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::embedding::EmbeddingProvider;

use super::store::{MetadataValue, SearchHit, VectorRecord, VectorStore};

/// Result of a recall, hydrated with the stored text and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RecallResult {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub metadata: Option<HashMap<String, MetadataValue>>,
}

/// Semantic memory over an embedding provider and a vector store
#[derive(Clone)]
pub struct SemanticMemory {
    provider: Arc<dyn EmbeddingProvider>,
    store: VectorStore,
}

impl SemanticMemory {
    /// Create a semantic memory backed by the given provider
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            store: VectorStore::new(),
        }
    }

    /// Get the underlying vector store for direct vector-level access
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Embed `text` and upsert it under `id`
    pub async fn remember(
        &self,
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: Option<HashMap<String, MetadataValue>>,
    ) -> anyhow::Result<()> {
        let id = id.into();
        let text = text.into();
        let embedding = self.provider.embed(&text).await?;

        let mut record = VectorRecord::new(id, text, embedding);
        if let Some(meta) = metadata {
            record = record.with_metadata(meta);
        }
        self.store.add(record)?;
        Ok(())
    }

    /// Embed and upsert a batch of (id, text) pairs
    pub async fn remember_batch(&self, items: &[(String, String)]) -> anyhow::Result<()> {
        let texts: Vec<String> = items.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;

        for ((id, text), embedding) in items.iter().zip(embeddings) {
            self.store
                .add(VectorRecord::new(id.clone(), text.clone(), embedding))?;
        }
        debug!(count = items.len(), "Stored batch of memories");
        Ok(())
    }

    /// Embed the query and return the nearest stored records
    pub async fn recall(
        &self,
        query: &str,
        top_k: usize,
        min_score: Option<f32>,
    ) -> anyhow::Result<Vec<RecallResult>> {
        let embedding = self.provider.embed(query).await?;
        let hits = self.store.search(&embedding, top_k, min_score)?;

        Ok(hits
            .into_iter()
            .filter_map(|SearchHit { id, score }| {
                self.store.get(&id).map(|record| RecallResult {
                    id,
                    text: record.text,
                    score,
                    metadata: record.metadata,
                })
            })
            .collect())
    }

    /// Remove a memory, returns true if it existed
    pub fn forget(&self, id: &str) -> bool {
        self.store.delete(id)
    }

    /// Get number of stored memories
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if no memories are stored
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
