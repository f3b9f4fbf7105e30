//! # 官方状态轮询
//!
//! 周期性拉取各厂商 Statuspage 的 `status.json`，按 Provider 类型保存最新状态

use chrono::Utc;
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::OfficialStatusConfig;
use crate::error::{MonitorError, Result};
use crate::types::{OfficialStatus, OfficialStatusLevel};
use crate::{ldebug, linfo, lwarn, logging::{LogComponent, LogStage}};

/// 官方状态来源接口
pub trait OfficialStatusSource: Send + Sync {
    /// 读取指定 Provider 类型的最新官方状态
    fn get_official_status(&self, provider_type: &str) -> Option<OfficialStatus>;

    /// 确保后台轮询已启动，重复调用无副作用
    fn ensure_official_status_poller(&self);
}

/// 已知的 Statuspage 地址
#[must_use]
pub fn default_endpoints() -> HashMap<String, String> {
    HashMap::from([
        (
            "openai".to_string(),
            "https://status.openai.com/api/v2/status.json".to_string(),
        ),
        (
            "anthropic".to_string(),
            "https://status.anthropic.com/api/v2/status.json".to_string(),
        ),
    ])
}

#[derive(Debug, Deserialize)]
struct StatuspageDocument {
    status: StatuspageIndicator,
}

#[derive(Debug, Deserialize)]
struct StatuspageIndicator {
    #[serde(default)]
    indicator: String,
    description: Option<String>,
}

struct PollerInner {
    client: Client,
    endpoints: HashMap<String, String>,
    statuses: DashMap<String, OfficialStatus>,
}

impl PollerInner {
    async fn fetch(&self, url: &str) -> Result<OfficialStatus> {
        let document: StatuspageDocument = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(OfficialStatus {
            status: OfficialStatusLevel::from_indicator(&document.status.indicator),
            message: document.status.description,
            checked_at: Utc::now(),
        })
    }

    async fn poll_once(&self) {
        for (provider_type, url) in &self.endpoints {
            match self.fetch(url).await {
                Ok(status) => {
                    ldebug!(
                        "system",
                        LogStage::ExternalApi,
                        LogComponent::OfficialStatus,
                        "fetch_status",
                        &format!("{provider_type} 官方状态: {:?}", status.status)
                    );
                    self.statuses.insert(provider_type.clone(), status);
                }
                Err(e) => {
                    lwarn!(
                        "system",
                        LogStage::ExternalApi,
                        LogComponent::OfficialStatus,
                        "fetch_status",
                        &format!("拉取 {provider_type} 官方状态失败: {e}")
                    );
                    self.statuses.insert(
                        provider_type.clone(),
                        OfficialStatus {
                            status: OfficialStatusLevel::Unknown,
                            message: Some(e.to_string()),
                            checked_at: Utc::now(),
                        },
                    );
                }
            }
        }
    }
}

/// 官方状态轮询器
pub struct OfficialStatusPoller {
    inner: Arc<PollerInner>,
    enabled: bool,
    interval: Duration,
    started: AtomicBool,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl OfficialStatusPoller {
    pub fn new(config: &OfficialStatusConfig) -> Result<Self> {
        Self::with_endpoints(config, default_endpoints())
    }

    pub fn with_endpoints(
        config: &OfficialStatusConfig,
        endpoints: HashMap<String, String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MonitorError::internal_with_source("创建 HTTP 客户端失败", e))?;

        Ok(Self {
            inner: Arc::new(PollerInner {
                client,
                endpoints,
                statuses: DashMap::new(),
            }),
            enabled: config.enabled,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            started: AtomicBool::new(false),
            task: std::sync::Mutex::new(None),
        })
    }

    /// 立即拉取一轮
    pub async fn poll_once(&self) {
        self.inner.poll_once().await;
    }

    /// 停止后台轮询
    pub fn stop(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            linfo!(
                "system",
                LogStage::Shutdown,
                LogComponent::OfficialStatus,
                "stop",
                "官方状态轮询已停止"
            );
        }
    }
}

impl OfficialStatusSource for OfficialStatusPoller {
    fn get_official_status(&self, provider_type: &str) -> Option<OfficialStatus> {
        self.inner
            .statuses
            .get(provider_type)
            .map(|entry| entry.value().clone())
    }

    fn ensure_official_status_poller(&self) {
        if !self.enabled || self.started.swap(true, Ordering::AcqRel) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                inner.poll_once().await;
            }
        });
        *self
            .task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handle);

        linfo!(
            "system",
            LogStage::BackgroundTask,
            LogComponent::OfficialStatus,
            "start",
            &format!("官方状态轮询已启动，间隔 {} 秒", period.as_secs())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(enabled: bool) -> OfficialStatusConfig {
        OfficialStatusConfig {
            enabled,
            interval_secs: 300,
            timeout_secs: 2,
        }
    }

    async fn statuspage(indicator: &str, description: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page": {"id": "x", "name": "OpenAI"},
                "status": {"indicator": indicator, "description": description}
            })))
            .mount(&server)
            .await;
        server
    }

    fn endpoints_for(server: &MockServer) -> HashMap<String, String> {
        HashMap::from([(
            "openai".to_string(),
            format!("{}/api/v2/status.json", server.uri()),
        )])
    }

    #[tokio::test]
    async fn test_poll_once_stores_status_by_type() {
        let server = statuspage("minor", "Partially Degraded Service").await;
        let poller =
            OfficialStatusPoller::with_endpoints(&config(true), endpoints_for(&server)).unwrap();

        assert!(poller.get_official_status("openai").is_none());
        poller.poll_once().await;

        let status = poller.get_official_status("openai").unwrap();
        assert_eq!(status.status, OfficialStatusLevel::Degraded);
        assert_eq!(status.message.as_deref(), Some("Partially Degraded Service"));
        assert!(poller.get_official_status("anthropic").is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_records_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let poller =
            OfficialStatusPoller::with_endpoints(&config(true), endpoints_for(&server)).unwrap();

        poller.poll_once().await;
        assert_eq!(
            poller.get_official_status("openai").unwrap().status,
            OfficialStatusLevel::Unknown
        );
    }

    #[tokio::test]
    async fn test_ensure_starts_once() {
        let server = statuspage("none", "All Systems Operational").await;
        let poller =
            OfficialStatusPoller::with_endpoints(&config(true), endpoints_for(&server)).unwrap();

        poller.ensure_official_status_poller();
        poller.ensure_official_status_poller();

        for _ in 0..50 {
            if poller.get_official_status("openai").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            poller.get_official_status("openai").unwrap().status,
            OfficialStatusLevel::Operational
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        poller.stop();
    }

    #[tokio::test]
    async fn test_disabled_poller_never_fetches() {
        let server = statuspage("none", "ok").await;
        let poller =
            OfficialStatusPoller::with_endpoints(&config(false), endpoints_for(&server)).unwrap();

        poller.ensure_official_status_poller();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
