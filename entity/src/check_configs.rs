//! # 检测配置实体定义
//!
//! 每一行描述一个被监控的 Provider 端点

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 检测配置实体
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "check_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(column_name = "type")]
    pub provider_type: String,
    pub endpoint: String,
    pub model: String,
    pub group_name: Option<String>,
    pub enabled: bool,
    pub is_maintenance: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
