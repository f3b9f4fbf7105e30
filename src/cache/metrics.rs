//! # 缓存命中统计
//!
//! 进程级计数器，经 `/api/internal/cache-metrics` 暴露

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 单个缓存的命中/未命中计数
#[derive(Debug, Default)]
pub struct CacheCounter {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// 计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl std::ops::Add for CacheStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hits: self.hits + rhs.hits,
            misses: self.misses + rhs.misses,
        }
    }
}

/// 全部缓存计数器
#[derive(Debug, Clone, Default)]
pub struct CacheMetricsRegistry {
    pub availability: Arc<CacheCounter>,
    pub config: Arc<CacheCounter>,
    pub group_info: Arc<CacheCounter>,
    pub dashboard: Arc<CacheCounter>,
}

/// 指标接口的响应体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetricsReport {
    pub availability_cache: CacheStats,
    pub config_cache: CacheStats,
    pub group_info_cache: CacheStats,
    pub dashboard_cache: CacheStats,
    /// 所有数据库读缓存之和（不含看板）
    pub combined_db_cache: CacheStats,
    pub generated_at: DateTime<Utc>,
}

impl CacheMetricsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn report(&self) -> CacheMetricsReport {
        let availability = self.availability.snapshot();
        let config = self.config.snapshot();
        let group_info = self.group_info.snapshot();

        CacheMetricsReport {
            availability_cache: availability,
            config_cache: config,
            group_info_cache: group_info,
            dashboard_cache: self.dashboard.snapshot(),
            combined_db_cache: availability + config + group_info,
            generated_at: Utc::now(),
        }
    }

    pub fn reset_all(&self) {
        self.availability.reset();
        self.config.reset();
        self.group_info.reset();
        self.dashboard.reset();
    }
}
