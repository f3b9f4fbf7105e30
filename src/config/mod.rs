//! # 配置管理模块
//!
//! 处理应用配置加载、验证和管理

mod app_config;
mod database;
mod manager;

pub use app_config::{
    AppConfig, CacheConfig, CheckerConfig, HistoryConfig, MetricsConfig, NodeConfig,
    OfficialStatusConfig, PollingConfig, ServerConfig, DEFAULT_POLL_INTERVAL_SECS,
    MAX_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS,
};
pub use database::DatabaseConfig;
pub use manager::{CONFIG_PATH_ENV, ConfigManager};
