//! 协调上下文
//!
//! 启动时构建一次，统一持有选主、缓存与各协作服务，经 `Arc` 在请求与后台任务间共享。
//! 测试中可以用 [`CoordinationContext::from_parts`] 注入替身实现。

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::availability::AvailabilityService;
use crate::cache::CacheMetricsRegistry;
use crate::checks::{CheckRunner, HttpCheckRunner};
use crate::config::AppConfig;
use crate::dashboard::DashboardAggregator;
use crate::error::Result;
use crate::groups::GroupInfoStore;
use crate::history::{HistoryStore, SeaOrmHistoryStore};
use crate::leadership::{LeaderElector, SeaOrmLeaseStore, resolve_node_id};
use crate::official_status::{OfficialStatusPoller, OfficialStatusSource};
use crate::poller::Poller;
use crate::providers::{ConfigStore, SeaOrmConfigStore};
use crate::{linfo, lwarn, logging::{LogComponent, LogStage}};

/// 可替换的协作实现
pub struct Collaborators {
    pub configs: Arc<dyn ConfigStore>,
    pub history: Arc<dyn HistoryStore>,
    pub checker: Arc<dyn CheckRunner>,
    pub official: Arc<dyn OfficialStatusSource>,
}

pub struct CoordinationContext {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub metrics: CacheMetricsRegistry,
    pub elector: Arc<LeaderElector>,
    pub aggregator: Arc<DashboardAggregator>,
    pub availability: Arc<AvailabilityService>,
    pub groups: Arc<GroupInfoStore>,
    pub configs: Arc<dyn ConfigStore>,
    pub poller: Arc<Poller>,
    official_poller: Option<Arc<OfficialStatusPoller>>,
}

impl CoordinationContext {
    /// 使用数据库与 HTTP 实现构建
    pub fn build(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Result<Arc<Self>> {
        let metrics = CacheMetricsRegistry::new();
        let official = Arc::new(OfficialStatusPoller::new(&config.official_status)?);
        let collaborators = Collaborators {
            configs: Arc::new(SeaOrmConfigStore::new(
                Arc::clone(&db),
                Duration::from_secs(config.cache.config_ttl_secs),
                Arc::clone(&metrics.config),
            )),
            history: Arc::new(SeaOrmHistoryStore::new(Arc::clone(&db), config.history.clone())),
            checker: Arc::new(HttpCheckRunner::new(&config.checker)?),
            official: official.clone(),
        };

        let mut context = Self::from_parts(config, db, metrics, collaborators);
        context.official_poller = Some(official);
        Ok(Arc::new(context))
    }

    /// 由给定的协作实现构建
    #[must_use]
    pub fn from_parts(
        config: Arc<AppConfig>,
        db: Arc<DatabaseConnection>,
        metrics: CacheMetricsRegistry,
        collaborators: Collaborators,
    ) -> Self {
        let node_id = resolve_node_id(config.node.id.as_deref());
        let elector = Arc::new(LeaderElector::new(
            node_id,
            Arc::new(SeaOrmLeaseStore::new(Arc::clone(&db))),
        ));

        let aggregator = Arc::new(DashboardAggregator::new(
            Arc::clone(&collaborators.configs),
            Arc::clone(&collaborators.history),
            Arc::clone(&collaborators.checker),
            collaborators.official,
            config.polling.clone(),
            Arc::clone(&metrics.dashboard),
        ));
        let poller = Arc::new(Poller::new(
            Arc::clone(&elector),
            Arc::clone(&collaborators.configs),
            collaborators.history,
            collaborators.checker,
            config.polling.interval(),
        ));
        let availability = Arc::new(AvailabilityService::new(
            Arc::clone(&db),
            Duration::from_secs(config.cache.availability_ttl_secs),
            Arc::clone(&metrics.availability),
        ));
        let groups = Arc::new(GroupInfoStore::new(
            Arc::clone(&db),
            Duration::from_secs(config.cache.group_info_ttl_secs),
            Arc::clone(&metrics.group_info),
        ));

        Self {
            config,
            db,
            metrics,
            elector,
            aggregator,
            availability,
            groups,
            configs: collaborators.configs,
            poller,
            official_poller: None,
        }
    }

    /// 启动选主与后台轮询
    ///
    /// 选主初始化失败不影响轮询器启动，每轮轮询都会重试初始化
    pub async fn start_background(&self) -> Result<()> {
        if let Err(e) = self.elector.ensure_leadership().await {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::Main,
                "start_background",
                &format!("选主初始化失败，将由后台轮询重试: {e}")
            );
        }
        self.poller.start().await?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "start_background",
            &format!(
                "后台任务已启动: node={}, role={}",
                self.elector.node_id(),
                self.elector.role()
            )
        );
        Ok(())
    }

    /// 停止所有后台任务
    pub async fn shutdown(&self) {
        self.poller.stop().await;
        if let Some(official) = &self.official_poller {
            official.stop();
        }
        self.elector.stop().await;
        linfo!("system", LogStage::Shutdown, LogComponent::Main, "shutdown", "后台任务已停止");
    }
}
