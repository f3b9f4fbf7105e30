//! # 看板聚合器
//!
//! 读取路径：配置 → 历史（必要时经 [`PollCache`] 合并刷新）→ 维护占位 → 官方状态 → 排序分组。
//! 刷新是唯一的写路径，只通过历史存储写入。

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::grouping::{group_timelines, sort_by_name};
use super::{DashboardData, ProviderTimeline, RefreshMode};
use crate::cache::{CacheCounter, CacheKeyBuilder, PollCache};
use crate::checks::CheckRunner;
use crate::config::PollingConfig;
use crate::error::Result;
use crate::history::HistoryStore;
use crate::official_status::OfficialStatusSource;
use crate::providers::ConfigStore;
use crate::types::{CheckResult, CheckStatus, HistorySnapshot, ProviderConfig};
use crate::{ldebug, lwarn, logging::{LogComponent, LogStage}};

/// 维护占位条目的消息
pub const MAINTENANCE_MESSAGE: &str = "配置处于维护模式";

/// 看板聚合器
pub struct DashboardAggregator {
    configs: Arc<dyn ConfigStore>,
    history: Arc<dyn HistoryStore>,
    checker: Arc<dyn CheckRunner>,
    official: Arc<dyn OfficialStatusSource>,
    cache: PollCache<Arc<HistorySnapshot>>,
    polling: PollingConfig,
}

/// 只保留活跃 Provider 的非空历史
fn filter_history(snapshot: &HistorySnapshot, allowed: &BTreeSet<String>) -> HistorySnapshot {
    snapshot
        .iter()
        .filter(|(id, items)| allowed.contains(*id) && !items.is_empty())
        .map(|(id, items)| (id.clone(), items.clone()))
        .collect()
}

impl DashboardAggregator {
    #[must_use]
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        history: Arc<dyn HistoryStore>,
        checker: Arc<dyn CheckRunner>,
        official: Arc<dyn OfficialStatusSource>,
        polling: PollingConfig,
        counter: Arc<CacheCounter>,
    ) -> Self {
        Self {
            configs,
            history,
            checker,
            official,
            cache: PollCache::new(counter),
            polling,
        }
    }

    /// 生成看板数据
    pub async fn load_dashboard_data(&self, mode: RefreshMode) -> Result<DashboardData> {
        self.official.ensure_official_status_poller();

        let (maintenance, active): (Vec<_>, Vec<_>) = self
            .configs
            .load_provider_configs()
            .await?
            .into_iter()
            .partition(|config| config.is_maintenance);
        let allowed: BTreeSet<String> = active.iter().map(|c| c.id.clone()).collect();

        let history = match mode {
            RefreshMode::Always => self.refresh_history(active, &allowed).await?,
            RefreshMode::Missing | RefreshMode::Never => {
                let current = filter_history(&self.history.load_history().await?, &allowed);
                if mode == RefreshMode::Missing && !allowed.is_empty() && current.is_empty() {
                    self.refresh_history(active, &allowed).await?
                } else {
                    Arc::new(current)
                }
            }
        };

        let data = self.assemble(&history, &maintenance, Utc::now());
        ldebug!(
            "system",
            LogStage::Aggregation,
            LogComponent::Dashboard,
            "load_dashboard_data",
            &format!("看板生成完成: {} 个 Provider (refresh={mode})", data.total)
        );
        Ok(data)
    }

    /// 经合并缓存执行一次 检测 + 追加
    async fn refresh_history(
        &self,
        active: Vec<ProviderConfig>,
        allowed: &BTreeSet<String>,
    ) -> Result<Arc<HistorySnapshot>> {
        if allowed.is_empty() {
            return Ok(Arc::new(HistorySnapshot::new()));
        }

        let key = CacheKeyBuilder::poll_history(self.polling.interval_ms(), allowed);
        let checker = Arc::clone(&self.checker);
        let history = Arc::clone(&self.history);
        let allowed = allowed.clone();

        let compute = move || async move {
            let results = match checker.run_provider_checks(&active).await {
                Ok(results) => results,
                Err(e) => {
                    lwarn!(
                        "system",
                        LogStage::Aggregation,
                        LogComponent::Dashboard,
                        "run_provider_checks",
                        &format!("检测执行失败，改为读取已有历史: {e}")
                    );
                    Vec::new()
                }
            };

            // 空结果不写入，避免用空集合覆盖已有历史
            let snapshot = if results.is_empty() {
                history.load_history().await?
            } else {
                history.append_history(results).await?
            };
            Ok(Arc::new(filter_history(&snapshot, &allowed)))
        };

        self.cache
            .get_or_refresh(&key, self.polling.interval(), compute)
            .await
    }

    fn assemble(
        &self,
        history: &HistorySnapshot,
        maintenance: &[ProviderConfig],
        now: DateTime<Utc>,
    ) -> DashboardData {
        let mut timelines = Vec::with_capacity(history.len() + maintenance.len());
        let mut last_updated: Option<DateTime<Utc>> = None;

        for (id, items) in history {
            let mut items = items.clone();
            items.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
            let Some(first) = items.first() else {
                continue;
            };

            last_updated = last_updated.max(Some(first.checked_at));
            let mut latest = first.clone();
            latest.official_status = self.official.get_official_status(&latest.provider_type);
            timelines.push(ProviderTimeline {
                id: id.clone(),
                items,
                latest,
            });
        }

        for config in maintenance {
            timelines.push(ProviderTimeline {
                id: config.id.clone(),
                items: Vec::new(),
                latest: CheckResult {
                    id: config.id.clone(),
                    name: config.name.clone(),
                    provider_type: config.provider_type.clone(),
                    endpoint: config.endpoint.clone(),
                    model: config.model.clone(),
                    status: CheckStatus::Maintenance,
                    latency_ms: None,
                    ping_latency_ms: None,
                    message: MAINTENANCE_MESSAGE.to_string(),
                    checked_at: now,
                    group_name: config.group_name.clone(),
                    official_status: self.official.get_official_status(&config.provider_type),
                },
            });
        }

        sort_by_name(&mut timelines);
        let grouped_timelines = group_timelines(&timelines);

        DashboardData {
            total: timelines.len(),
            provider_timelines: timelines,
            grouped_timelines,
            last_updated,
            poll_interval_label: self.polling.interval_label(),
            poll_interval_ms: self.polling.interval_ms(),
            generated_at: now.timestamp_millis(),
        }
    }
}
