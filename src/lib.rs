//! MEMORA - In-Memory Semantic Memory Engine
//!
//! Vector similarity search with importance-weighted context caching,
//! a pluggable embedding-provider seam, and an in-process event bus.

pub mod context;
pub mod embedding;
pub mod error;
pub mod events;
pub mod metrics;
pub mod vector;

pub use context::{
    CacheConfig, Clock, ContextCache, ExpirySweeper, ManualClock, RankedEntry, SystemClock,
};
pub use embedding::EmbeddingProvider;
pub use error::{MemoraError, Result};
pub use events::{Event, EventBus};
pub use metrics::{Metrics, MetricsSnapshot};
pub use vector::{
    cosine_similarity, MetadataValue, RecallResult, SearchHit, SemanticMemory, VectorRecord,
    VectorStore,
};
