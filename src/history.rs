//! # 检测历史存储
//!
//! 历史记录只追加不修改；读取时按时间窗口与单 Provider 条数截断

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use entity::{CheckHistory, check_history};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use std::sync::Arc;

use crate::config::HistoryConfig;
use crate::error::{Context, Result};
use crate::types::{CheckResult, HistorySnapshot};
use crate::{ldebug, logging::{LogComponent, LogStage}};

/// 检测历史接口
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 读取当前历史快照，每个 Provider 的条目按检测时间倒序
    async fn load_history(&self) -> Result<HistorySnapshot>;

    /// 追加一批结果并返回追加后的快照
    async fn append_history(&self, results: Vec<CheckResult>) -> Result<HistorySnapshot>;
}

/// 基于 Sea-ORM 的历史存储
pub struct SeaOrmHistoryStore {
    db: Arc<DatabaseConnection>,
    config: HistoryConfig,
}

fn clamp_latency(value: Option<u64>) -> Option<i32> {
    value.map(|v| i32::try_from(v).unwrap_or(i32::MAX))
}

impl SeaOrmHistoryStore {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, config: HistoryConfig) -> Self {
        Self { db, config }
    }

    fn to_active_model(result: CheckResult) -> check_history::ActiveModel {
        check_history::ActiveModel {
            id: NotSet,
            config_id: Set(result.id),
            name: Set(result.name),
            provider_type: Set(result.provider_type),
            endpoint: Set(result.endpoint),
            model: Set(result.model),
            group_name: Set(result.group_name),
            status: Set(result.status.as_str().to_string()),
            latency_ms: Set(clamp_latency(result.latency_ms)),
            ping_latency_ms: Set(clamp_latency(result.ping_latency_ms)),
            message: Set(result.message),
            checked_at: Set(result.checked_at),
        }
    }
}

#[async_trait]
impl HistoryStore for SeaOrmHistoryStore {
    async fn load_history(&self) -> Result<HistorySnapshot> {
        let since = Utc::now() - TimeDelta::hours(i64::from(self.config.window_hours));
        let rows = CheckHistory::find()
            .filter(check_history::Column::CheckedAt.gte(since))
            .order_by_desc(check_history::Column::CheckedAt)
            .order_by_desc(check_history::Column::Id)
            .all(self.db.as_ref())
            .await
            .context("读取检测历史失败")?;

        let mut snapshot = HistorySnapshot::new();
        for row in rows {
            let items = snapshot.entry(row.config_id.clone()).or_default();
            if items.len() < self.config.max_points_per_provider {
                items.push(row.into());
            }
        }
        Ok(snapshot)
    }

    async fn append_history(&self, results: Vec<CheckResult>) -> Result<HistorySnapshot> {
        if results.is_empty() {
            return self.load_history().await;
        }

        let count = results.len();
        let cutoff = Utc::now() - TimeDelta::days(i64::from(self.config.retention_days));
        let txn = self.db.begin().await?;

        CheckHistory::insert_many(results.into_iter().map(Self::to_active_model))
            .exec(&txn)
            .await
            .context("写入检测历史失败")?;
        let pruned = CheckHistory::delete_many()
            .filter(check_history::Column::CheckedAt.lt(cutoff))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        ldebug!(
            "system",
            LogStage::Db,
            LogComponent::Database,
            "append_history",
            &format!("写入检测结果 {count} 条，清理过期记录 {} 条", pruned.rows_affected)
        );
        self.load_history().await
    }
}
