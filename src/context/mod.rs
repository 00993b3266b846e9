//! Context Module
//!
//! Bounded key-value caching with importance-weighted, TTL-aware eviction.

mod cache;
mod sweeper;

pub use cache::{CacheConfig, Clock, ContextCache, ManualClock, RankedEntry, SystemClock};
pub use sweeper::ExpirySweeper;
