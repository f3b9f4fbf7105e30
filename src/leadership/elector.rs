//! # 租约选主
//!
//! 每个进程持有一个 [`LeaderElector`]，周期性地抢占或续租共享租约。
//! 只有 `leader` 节点执行后台检测，其余节点只读。

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{LeaseRecord, LeaseStore};
use crate::error::{MonitorError, Result};
use crate::{ldebug, lerror, linfo, lwarn, logging::{LogComponent, LogStage}};

/// 租约有效期
pub const LEASE_DURATION: Duration = Duration::from_secs(120);
/// 续租周期
pub const LEASE_RENEW_INTERVAL: Duration = Duration::from_secs(30);

/// 允许连续失败的续租次数，超过后主动降级
const MAX_MISSED_RENEWALS: u32 = 1;

/// 节点角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Leader,
    Standby,
}

impl NodeRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::Standby => "standby",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct ElectorState {
    role: NodeRole,
    /// 连续续租失败次数
    missed_renewals: u32,
    /// 最近一次成功写入的过期时间
    lease_expires_at: Option<DateTime<Utc>>,
}

/// 租约选主器
pub struct LeaderElector {
    node_id: String,
    store: Arc<dyn LeaseStore>,
    lease_duration: TimeDelta,
    renew_interval: Duration,
    leader: AtomicBool,
    /// 串行化所有刷新，保证同一节点的抢占/续租不会交错
    state: Mutex<ElectorState>,
    setup: OnceCell<()>,
    renew_task: Mutex<Option<JoinHandle<()>>>,
}

impl LeaderElector {
    /// 使用默认租约参数创建
    #[must_use]
    pub fn new(node_id: impl Into<String>, store: Arc<dyn LeaseStore>) -> Self {
        Self::with_timing(node_id, store, LEASE_DURATION, LEASE_RENEW_INTERVAL)
    }

    /// 自定义租约有效期与续租周期
    #[must_use]
    pub fn with_timing(
        node_id: impl Into<String>,
        store: Arc<dyn LeaseStore>,
        lease_duration: Duration,
        renew_interval: Duration,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            store,
            lease_duration: TimeDelta::from_std(lease_duration)
                .unwrap_or_else(|_| TimeDelta::seconds(120)),
            renew_interval,
            leader: AtomicBool::new(false),
            state: Mutex::new(ElectorState {
                role: NodeRole::Standby,
                missed_renewals: 0,
                lease_expires_at: None,
            }),
            setup: OnceCell::new(),
            renew_task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// 当前是否为主节点
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.leader.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn role(&self) -> NodeRole {
        if self.is_leader() {
            NodeRole::Leader
        } else {
            NodeRole::Standby
        }
    }

    /// 读取共享租约的当前持有情况
    pub async fn current_lease(&self) -> Result<Option<LeaseRecord>> {
        self.store.current_lease().await
    }

    /// 确保选主已启动
    ///
    /// 首次调用会建租约行、立即执行一次刷新并启动续租任务；并发调用共享同一次初始化，
    /// 成功后的调用直接返回。初始化失败时下次调用会重试。
    pub async fn ensure_leadership(self: &Arc<Self>) -> Result<()> {
        self.setup
            .get_or_try_init(|| async {
                self.store.ensure_lease_row().await.map_err(|e| {
                    lerror!(
                        "system",
                        LogStage::Election,
                        LogComponent::Leadership,
                        "ensure_lease_row",
                        format!("初始化租约行失败: {e}"),
                        node_id = %self.node_id
                    );
                    e
                })?;
                self.refresh().await;
                self.spawn_renew_task().await;

                linfo!(
                    "system",
                    LogStage::Election,
                    LogComponent::Leadership,
                    "ensure_leadership",
                    "选主已启动",
                    node_id = %self.node_id,
                    role = %self.role()
                );
                Ok::<(), MonitorError>(())
            })
            .await?;
        Ok(())
    }

    /// 以当前时间执行一次刷新
    pub async fn refresh(&self) -> NodeRole {
        self.refresh_at(Utc::now()).await
    }

    /// 以指定时刻执行一次刷新：主节点续租，备节点尝试抢占
    ///
    /// 存储错误只记录日志，不向外传播
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> NodeRole {
        let mut state = self.state.lock().await;
        let expires_at = now + self.lease_duration;

        match state.role {
            NodeRole::Leader => self.renew(&mut state, now, expires_at).await,
            NodeRole::Standby => self.acquire(&mut state, now, expires_at).await,
        }

        state.role
    }

    async fn renew(&self, state: &mut ElectorState, now: DateTime<Utc>, expires_at: DateTime<Utc>) {
        match self.store.try_renew(&self.node_id, now, expires_at).await {
            Ok(true) => {
                state.missed_renewals = 0;
                state.lease_expires_at = Some(expires_at);
                ldebug!(
                    "system",
                    LogStage::Election,
                    LogComponent::Leadership,
                    "renew",
                    "续租成功",
                    node_id = %self.node_id,
                    expires_at = %expires_at
                );
            }
            Ok(false) => {
                self.transition(state, NodeRole::Standby, "租约已被其他节点持有");
            }
            Err(e) => {
                state.missed_renewals += 1;
                let locally_expired = state.lease_expires_at.is_none_or(|at| at <= now);
                lwarn!(
                    "system",
                    LogStage::Election,
                    LogComponent::Leadership,
                    "renew",
                    format!("续租失败: {e}"),
                    node_id = %self.node_id,
                    missed_renewals = state.missed_renewals
                );
                if state.missed_renewals > MAX_MISSED_RENEWALS || locally_expired {
                    self.transition(state, NodeRole::Standby, "续租连续失败");
                }
            }
        }
    }

    async fn acquire(&self, state: &mut ElectorState, now: DateTime<Utc>, expires_at: DateTime<Utc>) {
        match self.store.try_acquire(&self.node_id, now, expires_at).await {
            Ok(true) => {
                state.missed_renewals = 0;
                state.lease_expires_at = Some(expires_at);
                self.transition(state, NodeRole::Leader, "抢占租约成功");
            }
            Ok(false) => {}
            Err(e) => {
                lwarn!(
                    "system",
                    LogStage::Election,
                    LogComponent::Leadership,
                    "acquire",
                    format!("抢占租约失败: {e}"),
                    node_id = %self.node_id
                );
            }
        }
    }

    fn transition(&self, state: &mut ElectorState, to: NodeRole, reason: &str) {
        let from = state.role;
        if from == to {
            return;
        }
        state.role = to;
        if to == NodeRole::Standby {
            state.lease_expires_at = None;
            state.missed_renewals = 0;
        }
        self.leader.store(to == NodeRole::Leader, Ordering::Release);

        linfo!(
            "system",
            LogStage::Election,
            LogComponent::Leadership,
            "role_change",
            format!("节点角色切换: {from} -> {to} ({reason})"),
            node_id = %self.node_id
        );
    }

    async fn spawn_renew_task(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let period = self.renew_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(elector) = weak.upgrade() else {
                    break;
                };
                elector.refresh().await;
            }
        });

        if let Some(previous) = self.renew_task.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// 停止续租任务并降级为备节点
    pub async fn stop(&self) {
        if let Some(handle) = self.renew_task.lock().await.take() {
            handle.abort();
        }
        let mut state = self.state.lock().await;
        self.transition(&mut state, NodeRole::Standby, "选主已停止");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leadership::MemoryLeaseStore;
    use crate::testing::FlakyLeaseStore;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    async fn ready_store() -> Arc<FlakyLeaseStore> {
        let store = Arc::new(FlakyLeaseStore::new());
        store.ensure_lease_row().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_first_refresh_acquires_vacant_lease() {
        let store = ready_store().await;
        let elector = LeaderElector::new("node-a", store.clone());

        assert_eq!(elector.refresh_at(t(0)).await, NodeRole::Leader);
        assert!(elector.is_leader());
        assert_eq!(store.current_lease().await.unwrap().unwrap().holder_node_id, "node-a");
    }

    #[tokio::test]
    async fn test_second_node_stays_standby_while_lease_live() {
        let store = ready_store().await;
        let a = LeaderElector::new("node-a", store.clone());
        let b = LeaderElector::new("node-b", store.clone());

        a.refresh_at(t(0)).await;
        assert_eq!(b.refresh_at(t(30)).await, NodeRole::Standby);
        assert_eq!(b.refresh_at(t(119)).await, NodeRole::Standby);
    }

    #[tokio::test]
    async fn test_standby_takes_over_expired_lease() {
        let store = ready_store().await;
        let a = LeaderElector::new("node-a", store.clone());
        let b = LeaderElector::new("node-b", store.clone());

        a.refresh_at(t(0)).await;
        // a 进程失联，不再续租
        assert_eq!(b.refresh_at(t(120)).await, NodeRole::Leader);

        // a 恢复后续租失败，降级
        assert_eq!(a.refresh_at(t(125)).await, NodeRole::Standby);
        assert!(!a.is_leader());
    }

    #[tokio::test]
    async fn test_single_renew_error_keeps_leadership() {
        let store = ready_store().await;
        let elector = LeaderElector::new("node-a", store.clone());
        elector.refresh_at(t(0)).await;

        store.fail_for("node-a");
        assert_eq!(elector.refresh_at(t(30)).await, NodeRole::Leader);

        store.heal("node-a");
        assert_eq!(elector.refresh_at(t(60)).await, NodeRole::Leader);
        // 成功后计数清零，再失败一次仍是主节点
        store.fail_for("node-a");
        assert_eq!(elector.refresh_at(t(90)).await, NodeRole::Leader);
    }

    #[tokio::test]
    async fn test_consecutive_renew_errors_demote() {
        let store = ready_store().await;
        let elector = LeaderElector::new("node-a", store.clone());
        elector.refresh_at(t(0)).await;

        store.fail_for("node-a");
        assert_eq!(elector.refresh_at(t(30)).await, NodeRole::Leader);
        assert_eq!(elector.refresh_at(t(60)).await, NodeRole::Standby);
    }

    #[tokio::test]
    async fn test_renew_error_after_local_expiry_demotes() {
        let store = ready_store().await;
        let elector = LeaderElector::new("node-a", store.clone());
        elector.refresh_at(t(0)).await;

        store.fail_for("node-a");
        assert_eq!(elector.refresh_at(t(200)).await, NodeRole::Standby);
    }

    #[tokio::test]
    async fn test_acquire_error_keeps_standby() {
        let store = ready_store().await;
        let elector = LeaderElector::new("node-a", store.clone());

        store.fail_for("node-a");
        assert_eq!(elector.refresh_at(t(0)).await, NodeRole::Standby);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_leadership_is_idempotent() {
        let store = Arc::new(FlakyLeaseStore::new());
        let elector = Arc::new(LeaderElector::new("node-a", store.clone()));

        let (first, second) = tokio::join!(elector.ensure_leadership(), elector.ensure_leadership());
        first.unwrap();
        second.unwrap();
        elector.ensure_leadership().await.unwrap();

        assert!(elector.is_leader());
        assert_eq!(store.ensure_calls(), 1);
        elector.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_setup_is_retried() {
        let store = Arc::new(FlakyLeaseStore::new());
        let elector = Arc::new(LeaderElector::new("node-a", store.clone()));

        store.fail_for("*");
        assert!(elector.ensure_leadership().await.is_err());

        store.heal("*");
        elector.ensure_leadership().await.unwrap();
        assert!(elector.is_leader());
        elector.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_task_keeps_lease_alive() {
        let store = Arc::new(MemoryLeaseStore::new());
        let elector = Arc::new(LeaderElector::new("node-a", store.clone()));
        elector.ensure_leadership().await.unwrap();
        let first_expiry = store.current_lease().await.unwrap().unwrap().expires_at;

        tokio::time::sleep(LEASE_RENEW_INTERVAL + Duration::from_millis(10)).await;

        let lease = store.current_lease().await.unwrap().unwrap();
        assert_eq!(lease.holder_node_id, "node-a");
        assert!(lease.expires_at >= first_expiry);
        elector.stop().await;
        assert!(!elector.is_leader());
    }

    proptest! {
        /// 每轮所有节点按随机顺序各刷新一次，随机注入存储错误；任意时刻至多一个主节点
        #[test]
        fn prop_at_most_one_leader(
            rounds in prop::collection::vec(
                (
                    prop::collection::vec(any::<bool>(), 3),
                    Just(vec![0usize, 1, 2]).prop_shuffle(),
                ),
                1..40,
            )
        ) {
            futures::executor::block_on(async {
                let store = Arc::new(FlakyLeaseStore::new());
                store.ensure_lease_row().await.unwrap();
                let electors: Vec<LeaderElector> = ["n0", "n1", "n2"]
                    .iter()
                    .map(|id| LeaderElector::new(*id, store.clone()))
                    .collect();

                for (round, (failures, order)) in rounds.iter().enumerate() {
                    let now = t(i64::try_from(round).unwrap() * 30);
                    for (idx, failing) in failures.iter().enumerate() {
                        let id = electors[idx].node_id().to_string();
                        if *failing { store.fail_for(&id) } else { store.heal(&id) }
                    }
                    for idx in order {
                        electors[*idx].refresh_at(now).await;
                        let leaders = electors.iter().filter(|e| e.is_leader()).count();
                        assert!(leaders <= 1, "round {round}: {leaders} leaders");
                    }
                }
            });
        }
    }
}
