//! # Provider 配置存储
//!
//! 读取启用中的检测配置，经短 TTL 缓存削减数据库读取

use async_trait::async_trait;
use entity::{CheckConfigs, check_configs};
use moka::future::Cache;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheCounter;
use crate::error::Result;
use crate::types::ProviderConfig;
use crate::{ldebug, logging::{LogComponent, LogStage}};

/// 配置存储接口
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// 加载所有启用的配置（含维护中的）
    async fn load_provider_configs(&self) -> Result<Vec<ProviderConfig>>;
}

const ENABLED_CONFIGS_KEY: &str = "enabled";

/// 基于 Sea-ORM 的配置存储
pub struct SeaOrmConfigStore {
    db: Arc<DatabaseConnection>,
    cache: Cache<&'static str, Arc<Vec<ProviderConfig>>>,
    counter: Arc<CacheCounter>,
}

impl SeaOrmConfigStore {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, ttl: Duration, counter: Arc<CacheCounter>) -> Self {
        Self {
            db,
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            counter,
        }
    }

    async fn query_enabled(&self) -> Result<Vec<ProviderConfig>> {
        let rows = CheckConfigs::find()
            .filter(check_configs::Column::Enabled.eq(true))
            .order_by_asc(check_configs::Column::Name)
            .all(self.db.as_ref())
            .await?;

        ldebug!(
            "system",
            LogStage::Db,
            LogComponent::Config,
            "load_provider_configs",
            &format!("加载检测配置 {} 条", rows.len())
        );
        Ok(rows.into_iter().map(ProviderConfig::from).collect())
    }
}

#[async_trait]
impl ConfigStore for SeaOrmConfigStore {
    async fn load_provider_configs(&self) -> Result<Vec<ProviderConfig>> {
        if let Some(cached) = self.cache.get(ENABLED_CONFIGS_KEY).await {
            self.counter.record_hit();
            return Ok(cached.as_ref().clone());
        }

        self.counter.record_miss();
        let configs = Arc::new(self.query_enabled().await?);
        self.cache
            .insert(ENABLED_CONFIGS_KEY, Arc::clone(&configs))
            .await;
        Ok(configs.as_ref().clone())
    }
}
