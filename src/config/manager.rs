//! # 配置管理器
//!
//! 负责定位配置文件、加载、应用环境变量覆盖并完成校验

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::AppConfig;
use crate::error::{MonitorError, Result};

/// 显式指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "CHECK_CX_CONFIG_PATH";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置
    config: Arc<AppConfig>,
    /// 实际读取的配置文件
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 按命令行参数、环境变量、`RUST_ENV` 的顺序定位配置文件并加载
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = match cli_path {
            Some(path) => path.to_path_buf(),
            None => env::var(CONFIG_PATH_ENV).map_or_else(
                |_| {
                    let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
                    PathBuf::from(format!("config/config.{env}.toml"))
                },
                PathBuf::from,
            ),
        };

        Self::from_file_with_env(&path, |key| env::var(key).ok())
    }

    /// 从指定文件加载，`lookup` 用于读取环境变量覆盖
    pub fn from_file_with_env<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, source) = if path.exists() {
            (Self::load_config_file(path)?, Some(path.to_path_buf()))
        } else {
            info!("配置文件不存在，使用默认配置: {}", path.display());
            (AppConfig::default(), None)
        };

        let applied = Self::apply_env_overrides(&mut config, lookup)?;
        config.validate().map_err(MonitorError::config)?;

        info!("配置加载完成");
        info!("- 配置文件: {}", source.as_ref().map_or("<默认>".to_string(), |p| p.display().to_string()));
        info!("- 环境变量覆盖: {} 个", applied);

        Ok(Self {
            config: Arc::new(config),
            source,
        })
    }

    /// 获取当前配置
    #[must_use]
    pub fn get_config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 配置来源文件
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        let config_content = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
        })?;

        toml::from_str(&config_content).map_err(|e| {
            MonitorError::config_with_source(
                format!("TOML解析失败 - 配置文件: {}, 详细错误: {e}", path.display()),
                e,
            )
        })
    }

    /// 应用环境变量覆盖，返回实际生效的覆盖数量
    fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(node_id) = read("CHECK_NODE_ID") {
            debug!("应用环境变量覆盖: node.id = {}", node_id);
            config.node.id = Some(node_id);
            applied += 1;
        }

        if let Some(raw) = read("CHECK_POLL_INTERVAL_SECONDS") {
            config.polling.interval_secs = raw.parse().map_err(|e| {
                MonitorError::config_with_source(
                    format!("CHECK_POLL_INTERVAL_SECONDS 不是合法的秒数: {raw}"),
                    e,
                )
            })?;
            debug!("应用环境变量覆盖: polling.interval_secs = {}", raw);
            applied += 1;
        }

        if let Some(token) = read("INTERNAL_METRICS_TOKEN") {
            debug!("应用环境变量覆盖: metrics.token = ***");
            config.metrics.token = Some(token);
            applied += 1;
        }

        if let Some(url) = read("DATABASE_URL") {
            debug!("应用环境变量覆盖: database.url");
            config.database.url = url;
            applied += 1;
        }

        if let Some(raw) = read("CHECK_CX_PORT") {
            config.server.port = raw.parse().map_err(|e| {
                MonitorError::config_with_source(format!("CHECK_CX_PORT 不是合法的端口: {raw}"), e)
            })?;
            debug!("应用环境变量覆盖: server.port = {}", raw);
            applied += 1;
        }

        Ok(applied)
    }
}
