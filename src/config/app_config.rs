//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 轮询间隔下限（秒）
pub const MIN_POLL_INTERVAL_SECS: u64 = 15;
/// 轮询间隔上限（秒）
pub const MAX_POLL_INTERVAL_SECS: u64 = 600;
/// 默认轮询间隔（秒）
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 管理端 HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: super::DatabaseConfig,
    /// 轮询配置
    pub polling: PollingConfig,
    /// 节点身份配置
    pub node: NodeConfig,
    /// 内部指标接口配置
    pub metrics: MetricsConfig,
    /// 缓存配置
    pub cache: CacheConfig,
    /// 历史记录配置
    pub history: HistoryConfig,
    /// 官方状态轮询配置
    pub official_status: OfficialStatusConfig,
    /// 检测执行配置
    pub checker: CheckerConfig,
}

/// 管理端服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 轮询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// 轮询间隔（秒），超出范围时会被夹到 [15, 600]
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl PollingConfig {
    /// 生效的轮询间隔
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(
            self.interval_secs
                .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS),
        )
    }

    /// 生效的轮询间隔（毫秒）
    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        self.interval().as_secs() * 1000
    }

    /// 面向展示的轮询间隔文案
    #[must_use]
    pub fn interval_label(&self) -> String {
        let secs = self.interval().as_secs();
        if secs % 60 == 0 {
            format!("{} 分钟", secs / 60)
        } else {
            format!("{secs} 秒")
        }
    }
}

/// 节点身份配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// 显式节点 ID，未设置时回退到主机名
    pub id: Option<String>,
}

/// 内部指标接口配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 共享密钥，未配置时接口不做鉴权
    pub token: Option<String>,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 配置缓存过期时间（秒）
    pub config_ttl_secs: u64,
    /// 可用性统计缓存过期时间（秒）
    pub availability_ttl_secs: u64,
    /// 分组信息缓存过期时间（秒）
    pub group_info_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            config_ttl_secs: 30,
            availability_ttl_secs: 300,
            group_info_ttl_secs: 300,
        }
    }
}

/// 历史记录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// 每个 Provider 在看板中保留的最多条目
    pub max_points_per_provider: usize,
    /// 历史保留天数
    pub retention_days: u32,
    /// 看板读取的时间窗口（小时）
    pub window_hours: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_points_per_provider: 60,
            retention_days: 30,
            window_hours: 24,
        }
    }
}

/// 官方状态轮询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficialStatusConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for OfficialStatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            timeout_secs: 10,
        }
    }
}

/// 检测执行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// 单个端点的请求超时（秒）
    pub timeout_secs: u64,
    /// 超过该延迟视为降级（毫秒）
    pub degraded_threshold_ms: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 45,
            degraded_threshold_ms: 6000,
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.history.max_points_per_provider == 0 {
            return Err("history.max_points_per_provider 必须大于 0".to_string());
        }
        if self.checker.timeout_secs == 0 {
            return Err("checker.timeout_secs 必须大于 0".to_string());
        }
        Ok(())
    }

    /// 管理端监听地址
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(5, 15)]
    #[case(60, 60)]
    #[case(3600, 600)]
    fn test_poll_interval_is_clamped(#[case] configured: u64, #[case] expected: u64) {
        let polling = PollingConfig {
            interval_secs: configured,
        };
        assert_eq!(polling.interval(), Duration::from_secs(expected));
        assert_eq!(polling.interval_ms(), expected * 1000);
    }

    #[rstest]
    #[case(60, "1 分钟")]
    #[case(300, "5 分钟")]
    #[case(45, "45 秒")]
    fn test_poll_interval_label(#[case] configured: u64, #[case] label: &str) {
        let polling = PollingConfig {
            interval_secs: configured,
        };
        assert_eq!(polling.interval_label(), label);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [polling]
            interval_secs = 120

            [metrics]
            token = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.polling.interval_secs, 120);
        assert_eq!(config.metrics.token.as_deref(), Some("secret"));
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.history.max_points_per_provider, 60);
    }

    #[test]
    fn test_validate_rejects_empty_database_url() {
        let mut config = AppConfig::default();
        config.database.url.clear();
        assert!(config.validate().is_err());
    }
}
