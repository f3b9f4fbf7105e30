//! # 端点检测执行
//!
//! 并发探测每个 Provider 端点，单个探测的失败只体现在结果状态上

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use url::Url;

use crate::config::CheckerConfig;
use crate::error::{MonitorError, Result};
use crate::types::{CheckResult, CheckStatus, ProviderConfig};
use crate::{ldebug, logging::{LogComponent, LogStage}};

/// 检测执行接口
#[async_trait]
pub trait CheckRunner: Send + Sync {
    /// 探测给定配置；返回的结果可能少于输入，空表示什么都没执行
    async fn run_provider_checks(&self, configs: &[ProviderConfig]) -> Result<Vec<CheckResult>>;
}

/// 基于 HTTP 的检测执行器
pub struct HttpCheckRunner {
    client: Client,
    degraded_threshold: Duration,
}

impl HttpCheckRunner {
    pub fn new(config: &CheckerConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(concat!("check-cx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::internal_with_source("创建 HTTP 客户端失败", e))?;

        Ok(Self {
            client,
            degraded_threshold: Duration::from_millis(config.degraded_threshold_ms),
        })
    }

    async fn check_one(&self, config: &ProviderConfig) -> CheckResult {
        let started = Instant::now();
        let response = self.client.get(&config.endpoint).send().await;
        let elapsed = started.elapsed();

        let (status, latency_ms, message) = match response {
            Ok(response) => {
                let code = response.status();
                (
                    self.classify(code, elapsed),
                    Some(millis(elapsed)),
                    format!("HTTP {}", code.as_u16()),
                )
            }
            Err(e) if e.is_timeout() => (CheckStatus::Error, None, "请求超时".to_string()),
            Err(e) => (CheckStatus::Error, None, format!("请求失败: {e}")),
        };

        let ping_latency_ms = self.ping(&config.endpoint).await;

        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::Checker,
            "check_provider",
            &format!("{} -> {} ({})", config.name, status, message)
        );

        CheckResult {
            id: config.id.clone(),
            name: config.name.clone(),
            provider_type: config.provider_type.clone(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            status,
            latency_ms,
            ping_latency_ms,
            message,
            checked_at: Utc::now(),
            group_name: config.group_name.clone(),
            official_status: None,
        }
    }

    fn classify(&self, code: StatusCode, elapsed: Duration) -> CheckStatus {
        if code.is_server_error() {
            CheckStatus::Failed
        } else if code == StatusCode::TOO_MANY_REQUESTS || elapsed > self.degraded_threshold {
            CheckStatus::Degraded
        } else {
            CheckStatus::Operational
        }
    }

    /// 对端点源站发送 HEAD，测量网络往返
    async fn ping(&self, endpoint: &str) -> Option<u64> {
        let origin = Url::parse(endpoint).ok()?.origin().ascii_serialization();
        let started = Instant::now();
        self.client.head(&origin).send().await.ok()?;
        Some(millis(started.elapsed()))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CheckRunner for HttpCheckRunner {
    async fn run_provider_checks(&self, configs: &[ProviderConfig]) -> Result<Vec<CheckResult>> {
        Ok(join_all(configs.iter().map(|config| self.check_one(config))).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::provider_config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn runner(degraded_threshold_ms: u64) -> HttpCheckRunner {
        HttpCheckRunner::new(&CheckerConfig {
            timeout_secs: 2,
            degraded_threshold_ms,
        })
        .unwrap()
    }

    fn config_for(server: &MockServer, id: &str, route: &str) -> ProviderConfig {
        let mut config = provider_config(id, id, None);
        config.endpoint = format!("{}{route}", server.uri());
        config
    }

    #[tokio::test]
    async fn test_fast_success_is_operational() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/chat"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let results = runner(5_000)
            .run_provider_checks(&[config_for(&server, "p1", "/v1/chat")])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::Operational);
        assert_eq!(results[0].message, "HTTP 200");
        assert!(results[0].latency_ms.is_some());
        assert!(results[0].ping_latency_ms.is_some());
    }

    #[tokio::test]
    async fn test_auth_rejection_counts_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let results = runner(5_000)
            .run_provider_checks(&[config_for(&server, "p1", "/v1/chat")])
            .await
            .unwrap();
        assert_eq!(results[0].status, CheckStatus::Operational);
    }

    #[tokio::test]
    async fn test_server_error_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let results = runner(5_000)
            .run_provider_checks(&[config_for(&server, "p1", "/")])
            .await
            .unwrap();
        assert_eq!(results[0].status, CheckStatus::Failed);
        assert_eq!(results[0].message, "HTTP 503");
    }

    #[tokio::test]
    async fn test_slow_answer_is_degraded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(150)))
            .mount(&server)
            .await;

        let results = runner(50)
            .run_provider_checks(&[config_for(&server, "p1", "/")])
            .await
            .unwrap();
        assert_eq!(results[0].status, CheckStatus::Degraded);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let mut config = provider_config("p1", "Dead", Some("X"));
        config.endpoint = "http://127.0.0.1:9/v1".to_string();

        let results = runner(5_000).run_provider_checks(&[config]).await.unwrap();
        assert_eq!(results[0].status, CheckStatus::Error);
        assert!(results[0].latency_ms.is_none());
        assert_eq!(results[0].group_name.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn test_every_config_gets_a_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let configs = vec![
            config_for(&server, "a", "/a"),
            config_for(&server, "b", "/b"),
            config_for(&server, "c", "/c"),
        ];
        let results = runner(5_000).run_provider_checks(&configs).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
