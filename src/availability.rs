//! # 可用性统计
//!
//! 按 7/15/30 天统计每个 Provider 的可用率，维护期间的记录不计入

use chrono::{DateTime, TimeDelta, Utc};
use entity::{CheckHistory, check_history};
use moka::future::Cache;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheCounter, CacheKeyBuilder};
use crate::error::Result;
use crate::types::CheckStatus;

/// 统计周期（天）
pub const AVAILABILITY_PERIODS: [u32; 3] = [7, 15, 30];

/// 单个周期的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityStat {
    pub period_days: u32,
    pub total_checks: u64,
    pub available_checks: u64,
    /// 百分比；周期内没有记录时为空
    pub availability_pct: Option<f64>,
}

/// 单个 Provider 的全部周期统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAvailability {
    pub config_id: String,
    pub stats: Vec<AvailabilityStat>,
}

/// 可用性统计服务
pub struct AvailabilityService {
    db: Arc<DatabaseConnection>,
    cache: Cache<String, Arc<Vec<ProviderAvailability>>>,
    counter: Arc<CacheCounter>,
}

impl AvailabilityService {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, ttl: Duration, counter: Arc<CacheCounter>) -> Self {
        Self {
            db,
            cache: Cache::builder().max_capacity(64).time_to_live(ttl).build(),
            counter,
        }
    }

    pub async fn get_availability(
        &self,
        config_ids: &BTreeSet<String>,
    ) -> Result<Arc<Vec<ProviderAvailability>>> {
        let key = CacheKeyBuilder::availability(config_ids);
        if let Some(cached) = self.cache.get(&key).await {
            self.counter.record_hit();
            return Ok(cached);
        }

        self.counter.record_miss();
        let now = Utc::now();
        let longest = AVAILABILITY_PERIODS.iter().copied().max().unwrap_or(30);
        let since = now - TimeDelta::days(i64::from(longest));

        let rows: Vec<(String, String, DateTime<Utc>)> = CheckHistory::find()
            .select_only()
            .column(check_history::Column::ConfigId)
            .column(check_history::Column::Status)
            .column(check_history::Column::CheckedAt)
            .filter(check_history::Column::ConfigId.is_in(config_ids.iter().cloned()))
            .filter(check_history::Column::CheckedAt.gte(since))
            .into_tuple()
            .all(self.db.as_ref())
            .await?;

        let summary = Arc::new(summarize(&rows, config_ids, now));
        self.cache.insert(key, Arc::clone(&summary)).await;
        Ok(summary)
    }
}

/// 由 (配置 ID, 状态, 检测时间) 记录计算统计
#[must_use]
pub fn summarize(
    rows: &[(String, String, DateTime<Utc>)],
    config_ids: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> Vec<ProviderAvailability> {
    let mut buckets: BTreeMap<&str, Vec<[u64; 2]>> = config_ids
        .iter()
        .map(|id| (id.as_str(), vec![[0, 0]; AVAILABILITY_PERIODS.len()]))
        .collect();

    for (config_id, status, checked_at) in rows {
        let Some(counts) = buckets.get_mut(config_id.as_str()) else {
            continue;
        };
        let status = status.parse().unwrap_or(CheckStatus::Error);
        if status == CheckStatus::Maintenance {
            continue;
        }
        let age = now - *checked_at;
        for (slot, days) in counts.iter_mut().zip(AVAILABILITY_PERIODS) {
            if age <= TimeDelta::days(i64::from(days)) {
                slot[0] += 1;
                if status.is_available() {
                    slot[1] += 1;
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|(config_id, counts)| ProviderAvailability {
            config_id: config_id.to_string(),
            stats: counts
                .into_iter()
                .zip(AVAILABILITY_PERIODS)
                .map(|([total, available], period_days)| AvailabilityStat {
                    period_days,
                    total_checks: total,
                    available_checks: available,
                    availability_pct: percentage(available, total),
                })
                .collect(),
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn percentage(available: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| available as f64 * 100.0 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn row(id: &str, status: &str, days_ago: i64, now: DateTime<Utc>) -> (String, String, DateTime<Utc>) {
        (id.to_string(), status.to_string(), now - TimeDelta::days(days_ago))
    }

    #[test]
    fn test_periods_are_nested() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let ids = BTreeSet::from(["p1".to_string()]);
        let rows = vec![
            row("p1", "operational", 1, now),
            row("p1", "failed", 3, now),
            row("p1", "degraded", 10, now),
            row("p1", "error", 20, now),
        ];

        let summary = summarize(&rows, &ids, now);
        let totals: Vec<_> = summary[0]
            .stats
            .iter()
            .map(|s| (s.period_days, s.total_checks, s.available_checks))
            .collect();
        assert_eq!(totals, vec![(7, 2, 1), (15, 3, 2), (30, 4, 2)]);
        assert_eq!(summary[0].stats[0].availability_pct, Some(50.0));
    }

    #[test]
    fn test_maintenance_rows_are_excluded() {
        let now = Utc::now();
        let ids = BTreeSet::from(["p1".to_string()]);
        let rows = vec![row("p1", "maintenance", 1, now), row("p1", "operational", 1, now)];

        let summary = summarize(&rows, &ids, now);
        assert_eq!(summary[0].stats[0].total_checks, 1);
        assert_eq!(summary[0].stats[0].availability_pct, Some(100.0));
    }

    #[test]
    fn test_provider_without_rows_has_no_percentage() {
        let now = Utc::now();
        let ids = BTreeSet::from(["p1".to_string(), "p2".to_string()]);
        let rows = vec![row("p1", "operational", 1, now), row("ghost", "operational", 1, now)];

        let summary = summarize(&rows, &ids, now);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[1].config_id, "p2");
        assert!(summary[1].stats.iter().all(|s| s.availability_pct.is_none()));
    }
}
