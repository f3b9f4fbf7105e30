//! # 缓存模块
//!
//! 看板历史的合并刷新缓存、缓存键与命中统计

pub mod keys;
pub mod metrics;
pub mod poll_cache;

pub use keys::{CacheKey, CacheKeyBuilder, EMPTY_ID_SET};
pub use metrics::{CacheCounter, CacheMetricsRegistry, CacheMetricsReport, CacheStats};
pub use poll_cache::PollCache;
