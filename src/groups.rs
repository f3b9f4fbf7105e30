//! # 分组信息

use entity::group_info;
use entity::GroupInfo as GroupInfoEntity;
use moka::future::Cache;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheCounter, CacheKeyBuilder};
use crate::error::Result;

/// 分组的展示元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_name: String,
    pub website_url: Option<String>,
    pub description: Option<String>,
}

impl From<group_info::Model> for GroupInfo {
    fn from(row: group_info::Model) -> Self {
        Self {
            group_name: row.group_name,
            website_url: row.website_url,
            description: row.description,
        }
    }
}

/// 分组信息读取，结果（包括不存在）都会被缓存
pub struct GroupInfoStore {
    db: Arc<DatabaseConnection>,
    cache: Cache<String, Option<GroupInfo>>,
    counter: Arc<CacheCounter>,
}

impl GroupInfoStore {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, ttl: Duration, counter: Arc<CacheCounter>) -> Self {
        Self {
            db,
            cache: Cache::builder().max_capacity(256).time_to_live(ttl).build(),
            counter,
        }
    }

    pub async fn get_group_info(&self, group_name: &str) -> Result<Option<GroupInfo>> {
        let key = CacheKeyBuilder::group_info(group_name);
        if let Some(cached) = self.cache.get(&key).await {
            self.counter.record_hit();
            return Ok(cached);
        }

        self.counter.record_miss();
        let info = GroupInfoEntity::find_by_id(group_name.to_string())
            .one(self.db.as_ref())
            .await?
            .map(GroupInfo::from);
        self.cache.insert(key, info.clone()).await;
        Ok(info)
    }
}
