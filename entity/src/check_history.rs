//! # 检测历史实体定义
//!
//! 检测结果写入后不再修改，官方状态只在读取时附加

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 检测历史实体
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "check_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub config_id: String,
    pub name: String,
    #[sea_orm(column_name = "type")]
    pub provider_type: String,
    pub endpoint: String,
    pub model: String,
    pub group_name: Option<String>,
    pub status: String,
    pub latency_ms: Option<i32>,
    pub ping_latency_ms: Option<i32>,
    pub message: String,
    pub checked_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
