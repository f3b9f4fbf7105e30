//! # 后台轮询
//!
//! 按轮询间隔执行检测并写入历史；只有主节点真正执行，上一轮未结束时跳过本轮

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::checks::CheckRunner;
use crate::error::Result;
use crate::history::HistoryStore;
use crate::leadership::LeaderElector;
use crate::providers::ConfigStore;
use crate::types::CheckResult;
use crate::{ldebug, lerror, linfo, lwarn, logging::{LogComponent, LogStage}};

/// 单轮轮询的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 当前节点不是主节点
    NotLeader,
    /// 上一轮尚未结束
    Busy,
    /// 没有需要检测的配置
    NoActiveConfigs,
    /// 完成，附带写入的结果条数
    Completed { written: usize },
}

/// 轮询期间持有，离开作用域时清除运行标记
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 主节点后台轮询器
pub struct Poller {
    elector: Arc<LeaderElector>,
    configs: Arc<dyn ConfigStore>,
    history: Arc<dyn HistoryStore>,
    checker: Arc<dyn CheckRunner>,
    interval: Duration,
    running: AtomicBool,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

/// `name:status(latency)` 形式的单行摘要
fn summarize(results: &[CheckResult]) -> String {
    results
        .iter()
        .map(|r| {
            let latency = r
                .latency_ms
                .map_or_else(|| "-".to_string(), |ms| format!("{ms}ms"));
            format!("{}:{}({latency})", r.name, r.status)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Poller {
    #[must_use]
    pub fn new(
        elector: Arc<LeaderElector>,
        configs: Arc<dyn ConfigStore>,
        history: Arc<dyn HistoryStore>,
        checker: Arc<dyn CheckRunner>,
        interval: Duration,
    ) -> Self {
        Self {
            elector,
            configs,
            history,
            checker,
            interval,
            running: AtomicBool::new(false),
            task_handle: Mutex::new(None),
        }
    }

    /// 启动后台轮询，首轮立即执行
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut handle = self.task_handle.lock().await;
        if handle.is_some() {
            crate::bail!("轮询任务已在运行");
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.interval;
        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(poller) = weak.upgrade() else {
                    break;
                };
                // 单独的任务执行，慢轮次不会推迟计时
                tokio::spawn(async move {
                    if let Err(e) = poller.scheduled_tick().await {
                        lerror!(
                            "system",
                            LogStage::BackgroundTask,
                            LogComponent::Poller,
                            "tick",
                            &format!("轮询失败: {e}")
                        );
                    }
                });
            }
        }));

        linfo!(
            "system",
            LogStage::BackgroundTask,
            LogComponent::Poller,
            "start",
            &format!("后台轮询已启动，间隔 {} 秒", period.as_secs())
        );
        Ok(())
    }

    /// 停止后台轮询
    pub async fn stop(&self) {
        if let Some(handle) = self.task_handle.lock().await.take() {
            handle.abort();
            linfo!("system", LogStage::Shutdown, LogComponent::Poller, "stop", "后台轮询已停止");
        }
    }

    /// 后台循环的一轮：先确保选主已启动，再执行 [`Self::tick`]
    ///
    /// 选主初始化失败时本轮按非主节点处理，下一轮重试
    pub async fn scheduled_tick(&self) -> Result<TickOutcome> {
        if let Err(e) = self.elector.ensure_leadership().await {
            lwarn!(
                "system",
                LogStage::BackgroundTask,
                LogComponent::Poller,
                "ensure_leadership",
                &format!("选主初始化失败，下一轮重试: {e}"),
                node_id = %self.elector.node_id()
            );
            return Ok(TickOutcome::NotLeader);
        }
        self.tick().await
    }

    /// 执行一轮：非主节点或上一轮未结束时直接跳过
    pub async fn tick(&self) -> Result<TickOutcome> {
        if !self.elector.is_leader() {
            ldebug!(
                "system",
                LogStage::BackgroundTask,
                LogComponent::Poller,
                "tick",
                "非主节点，跳过本轮",
                node_id = %self.elector.node_id()
            );
            return Ok(TickOutcome::NotLeader);
        }

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            ldebug!(
                "system",
                LogStage::BackgroundTask,
                LogComponent::Poller,
                "tick",
                "上一轮仍在执行，跳过本轮"
            );
            return Ok(TickOutcome::Busy);
        }
        let _guard = RunningGuard(&self.running);

        let active: Vec<_> = self
            .configs
            .load_provider_configs()
            .await?
            .into_iter()
            .filter(|config| !config.is_maintenance)
            .collect();
        if active.is_empty() {
            return Ok(TickOutcome::NoActiveConfigs);
        }

        let results = self.checker.run_provider_checks(&active).await?;
        if results.is_empty() {
            return Ok(TickOutcome::Completed { written: 0 });
        }

        let summary = summarize(&results);
        let written = results.len();
        self.history.append_history(results).await?;

        linfo!(
            "system",
            LogStage::BackgroundTask,
            LogComponent::Poller,
            "tick",
            &format!("检测完成 {written} 项: {summary}")
        );
        Ok(TickOutcome::Completed { written })
    }
}
