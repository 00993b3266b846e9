//! Vector Store
//!
//! In-memory document store with cosine-ranked nearest-neighbor search.

use dashmap::DashMap;
use hashbrown::HashMap;
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

use crate::error::{MemoraError, Result};
use crate::metrics::Metrics;

use super::similarity::cosine_similarity;

/// Closed metadata payload type
///
/// Replaces open-ended dynamic payloads so record contracts stay checkable.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Str(String),
    Number(f64),
    Bool(bool),
}

/// A stored document with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Caller-supplied identifier, unique within a store
    pub id: String,
    /// Original source text, kept for retrieval display
    pub text: String,
    /// Embedding vector; length must match the store's dimensionality
    pub embedding: Vec<f32>,
    /// Optional metadata
    pub metadata: Option<HashMap<String, MetadataValue>>,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, MetadataValue>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Get embedding dimension
    pub fn dim(&self) -> usize {
        self.embedding.len()
    }
}

/// A search result as (id, score)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

/// Concurrent in-memory vector store
///
/// Handles are cheap to clone and share the same underlying records.
/// Dimensionality is established by the first successful insert and
/// enforced for every insert and query after that, even once the store
/// has been emptied again.
#[derive(Clone)]
pub struct VectorStore {
    records: Arc<DashMap<String, VectorRecord>>,
    dimension: Arc<RwLock<Option<usize>>>,
    metrics: Arc<Metrics>,
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore {
    /// Create a new empty store with no dimensionality constraint yet
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            dimension: Arc::new(RwLock::new(None)),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Get the established embedding dimension, if any insert has happened
    pub fn dimension(&self) -> Option<usize> {
        *self.dimension.read().unwrap()
    }

    /// Insert or overwrite the record with its id
    ///
    /// Overwriting replaces the prior record entirely. Fails with
    /// `DimensionMismatch` when the embedding's length disagrees with the
    /// store's established dimensionality.
    pub fn add(&self, record: VectorRecord) -> Result<()> {
        let dim = record.dim();
        {
            let mut established = self.dimension.write().unwrap();
            match *established {
                None => *established = Some(dim),
                Some(expected) if expected != dim => {
                    return Err(MemoraError::DimensionMismatch {
                        expected,
                        actual: dim,
                    });
                }
                Some(_) => {}
            }
        }

        self.records.insert(record.id.clone(), record);
        self.metrics.record_upsert();
        Ok(())
    }

    /// Get a record by id
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Delete a record, returns true if it existed
    pub fn delete(&self, id: &str) -> bool {
        let existed = self.records.remove(id).is_some();
        if existed {
            self.metrics.record_delete();
        }
        existed
    }

    /// Get number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get all record ids
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    /// Find the `top_k` records nearest to the query embedding
    ///
    /// Results are in strictly descending score order, ties broken by
    /// ascending id. Scores below `min_score` are excluded even when that
    /// yields fewer than `top_k` hits. An empty store returns no hits.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        match self.dimension() {
            Some(expected) if expected != query.len() => {
                return Err(MemoraError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
            // No insert has happened yet, so nothing to scan
            None => return Ok(Vec::new()),
            Some(_) => {}
        }

        self.metrics.record_search();

        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .filter_map(|entry| {
                let score = cosine_similarity(query, &entry.embedding);
                match min_score {
                    Some(min) if score < min => None,
                    _ => Some(SearchHit {
                        id: entry.key().clone(),
                        score,
                    }),
                }
            })
            .collect();

        // Sort by score (descending), then id (ascending) for determinism
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        hits.truncate(top_k);
        Ok(hits)
    }

    /// Get this store's operation counters
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_delete() {
        let store = VectorStore::new();

        store
            .add(VectorRecord::new("doc1", "hello world", vec![1.0, 0.0, 0.0]))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), Some(3));

        let record = store.get("doc1").unwrap();
        assert_eq!(record.text, "hello world");

        assert!(store.delete("doc1"));
        assert!(!store.delete("doc1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_upsert_replaces_record() {
        let store = VectorStore::new();

        let mut meta = HashMap::new();
        meta.insert("lang".to_string(), MetadataValue::Str("en".to_string()));
        store
            .add(VectorRecord::new("doc1", "first", vec![1.0, 0.0]).with_metadata(meta))
            .unwrap();
        store
            .add(VectorRecord::new("doc1", "second", vec![0.0, 1.0]))
            .unwrap();

        assert_eq!(store.len(), 1);
        let record = store.get("doc1").unwrap();
        assert_eq!(record.text, "second");
        assert_eq!(record.metadata, None);
    }

    #[test]
    fn test_dimension_mismatch_on_add() {
        let store = VectorStore::new();
        store
            .add(VectorRecord::new("a", "", vec![1.0, 0.0, 0.0]))
            .unwrap();

        let err = store
            .add(VectorRecord::new("b", "", vec![1.0, 0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            MemoraError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_dimension_mismatch_on_search() {
        let store = VectorStore::new();
        store
            .add(VectorRecord::new("a", "", vec![1.0, 0.0, 0.0]))
            .unwrap();

        assert!(store.search(&[1.0, 0.0], 5, None).is_err());
    }

    #[test]
    fn test_dimension_persists_after_emptying() {
        let store = VectorStore::new();
        store
            .add(VectorRecord::new("a", "", vec![1.0, 0.0, 0.0]))
            .unwrap();
        store.delete("a");

        assert!(store.search(&[1.0, 0.0], 5, None).is_err());
        assert!(store.add(VectorRecord::new("b", "", vec![1.0])).is_err());
    }

    #[test]
    fn test_search_empty_store() {
        let store = VectorStore::new();
        let hits = store.search(&[1.0, 0.0, 0.0], 5, None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_ranking() {
        let store = VectorStore::new();
        store
            .add(VectorRecord::new("a", "", vec![1.0, 0.0, 0.0]))
            .unwrap();
        store
            .add(VectorRecord::new("b", "", vec![0.0, 1.0, 0.0]))
            .unwrap();
        store
            .add(VectorRecord::new("c", "", vec![1.0, 1.0, 0.0]))
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 2, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].id, "c");
        assert!((hits[1].score - 0.707).abs() < 1e-3);
    }

    #[test]
    fn test_search_scores_match_recomputation() {
        let store = VectorStore::new();
        store
            .add(VectorRecord::new("a", "", vec![0.2, 0.8, 0.1]))
            .unwrap();
        store
            .add(VectorRecord::new("b", "", vec![0.9, 0.3, 0.5]))
            .unwrap();

        let query = [0.4, 0.4, 0.4];
        let hits = store.search(&query, 5, None).unwrap();
        assert_eq!(hits.len(), 2);
        for hit in hits {
            let expected = cosine_similarity(&query, &store.get(&hit.id).unwrap().embedding);
            assert!((hit.score - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_search_tie_break_by_id() {
        let store = VectorStore::new();
        // Identical embeddings score identically against any query
        store
            .add(VectorRecord::new("z", "", vec![1.0, 0.0]))
            .unwrap();
        store
            .add(VectorRecord::new("a", "", vec![1.0, 0.0]))
            .unwrap();
        store
            .add(VectorRecord::new("m", "", vec![1.0, 0.0]))
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 3, None).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_search_min_score_filter() {
        let store = VectorStore::new();
        store
            .add(VectorRecord::new("near", "", vec![1.0, 0.0]))
            .unwrap();
        store
            .add(VectorRecord::new("far", "", vec![0.0, 1.0]))
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 5, Some(0.5)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "near");
    }

    #[test]
    fn test_metrics_counters() {
        let store = VectorStore::new();
        store
            .add(VectorRecord::new("a", "", vec![1.0, 0.0]))
            .unwrap();
        store.search(&[1.0, 0.0], 1, None).unwrap();
        store.delete("a");
        store.delete("a");

        assert_eq!(store.metrics().upserts(), 1);
        assert_eq!(store.metrics().searches(), 1);
        assert_eq!(store.metrics().deletes(), 1);
    }
}
