//! # 轮询租约实体定义
//!
//! 全局唯一的一行租约记录，用于多实例间选举轮询主节点

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 租约行的固定主键
pub const LEASE_ROW_ID: i32 = 1;

/// 轮询租约实体
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poller_lease")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// 当前持有者节点 ID，空字符串表示无人持有
    pub holder_node_id: String,
    pub acquired_at: DateTimeUtc,
    pub expires_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 租约在给定时刻是否仍然有效
    #[must_use]
    pub fn is_held_at(&self, now: DateTimeUtc) -> bool {
        !self.holder_node_id.is_empty() && self.expires_at > now
    }
}
