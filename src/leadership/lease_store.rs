//! # 租约存储
//!
//! 对单行租约记录的类型化操作，所有写入都是条件更新

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::poller_lease::{self, LEASE_ROW_ID};
use entity::PollerLease;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;

/// 租约当前状态的快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    pub holder_node_id: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LeaseRecord {
    fn vacant() -> Self {
        Self {
            holder_node_id: String::new(),
            acquired_at: DateTime::<Utc>::UNIX_EPOCH,
            expires_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// 租约在 `now` 时刻是否可被抢占
    #[must_use]
    pub fn is_claimable_at(&self, now: DateTime<Utc>) -> bool {
        self.holder_node_id.is_empty() || self.expires_at <= now
    }
}

/// 租约持久化接口
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// 确保租约行存在，重复调用无副作用
    async fn ensure_lease_row(&self) -> Result<()>;

    /// 租约空闲或已过期时原子地占有它
    async fn try_acquire(
        &self,
        node_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 仅当持有者仍是 `node_id` 时延长租约
    async fn try_renew(
        &self,
        node_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 读取当前租约
    async fn current_lease(&self) -> Result<Option<LeaseRecord>>;
}

/// 基于 Sea-ORM 的租约存储
pub struct SeaOrmLeaseStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmLeaseStore {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LeaseStore for SeaOrmLeaseStore {
    async fn ensure_lease_row(&self) -> Result<()> {
        let vacant = LeaseRecord::vacant();
        let row = poller_lease::ActiveModel {
            id: Set(LEASE_ROW_ID),
            holder_node_id: Set(vacant.holder_node_id),
            acquired_at: Set(vacant.acquired_at),
            expires_at: Set(vacant.expires_at),
            updated_at: Set(Utc::now()),
        };

        PollerLease::insert(row)
            .on_conflict(
                OnConflict::column(poller_lease::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn try_acquire(
        &self,
        node_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = PollerLease::update_many()
            .col_expr(poller_lease::Column::HolderNodeId, Expr::value(node_id))
            .col_expr(poller_lease::Column::AcquiredAt, Expr::value(now))
            .col_expr(poller_lease::Column::ExpiresAt, Expr::value(expires_at))
            .col_expr(poller_lease::Column::UpdatedAt, Expr::value(now))
            .filter(poller_lease::Column::Id.eq(LEASE_ROW_ID))
            .filter(
                Condition::any()
                    .add(poller_lease::Column::HolderNodeId.eq(""))
                    .add(poller_lease::Column::ExpiresAt.lte(now)),
            )
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn try_renew(
        &self,
        node_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = PollerLease::update_many()
            .col_expr(poller_lease::Column::ExpiresAt, Expr::value(expires_at))
            .col_expr(poller_lease::Column::UpdatedAt, Expr::value(now))
            .filter(poller_lease::Column::Id.eq(LEASE_ROW_ID))
            .filter(poller_lease::Column::HolderNodeId.eq(node_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn current_lease(&self) -> Result<Option<LeaseRecord>> {
        let row = PollerLease::find_by_id(LEASE_ROW_ID)
            .one(self.db.as_ref())
            .await?;
        Ok(row.map(|row| LeaseRecord {
            holder_node_id: row.holder_node_id,
            acquired_at: row.acquired_at,
            expires_at: row.expires_at,
        }))
    }
}

/// 进程内租约存储
///
/// 单实例部署或模拟多节点竞争时使用
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    row: Mutex<Option<LeaseRecord>>,
}

impl MemoryLeaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn ensure_lease_row(&self) -> Result<()> {
        let mut row = self.row.lock().unwrap_or_else(PoisonError::into_inner);
        row.get_or_insert_with(LeaseRecord::vacant);
        Ok(())
    }

    async fn try_acquire(
        &self,
        node_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut row = self.row.lock().unwrap_or_else(PoisonError::into_inner);
        match row.as_mut() {
            Some(lease) if lease.is_claimable_at(now) => {
                *lease = LeaseRecord {
                    holder_node_id: node_id.to_string(),
                    acquired_at: now,
                    expires_at,
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn try_renew(
        &self,
        node_id: &str,
        _now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut row = self.row.lock().unwrap_or_else(PoisonError::into_inner);
        match row.as_mut() {
            Some(lease) if lease.holder_node_id == node_id => {
                lease.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn current_lease(&self) -> Result<Option<LeaseRecord>> {
        Ok(self
            .row
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
