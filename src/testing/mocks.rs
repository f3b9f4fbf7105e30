//! # 测试替身
//!
//! 各协作接口的内存实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::result_for;
use crate::checks::CheckRunner;
use crate::error::{MonitorError, Result};
use crate::history::HistoryStore;
use crate::leadership::{LeaseRecord, LeaseStore, MemoryLeaseStore};
use crate::official_status::OfficialStatusSource;
use crate::providers::ConfigStore;
use crate::types::{CheckResult, CheckStatus, HistorySnapshot, OfficialStatus, ProviderConfig};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 可按节点注入故障的租约存储；`"*"` 表示所有调用都失败
#[derive(Default)]
pub struct FlakyLeaseStore {
    inner: MemoryLeaseStore,
    failing: Mutex<HashSet<String>>,
    ensure_calls: AtomicUsize,
}

impl FlakyLeaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, node_id: &str) {
        guard(&self.failing).insert(node_id.to_string());
    }

    pub fn heal(&self, node_id: &str) {
        guard(&self.failing).remove(node_id);
    }

    #[must_use]
    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    fn check(&self, node_id: &str) -> Result<()> {
        let failing = guard(&self.failing);
        if failing.contains("*") || failing.contains(node_id) {
            return Err(MonitorError::database("租约表暂时不可用"));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for FlakyLeaseStore {
    async fn ensure_lease_row(&self) -> Result<()> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        self.check("*")?;
        self.inner.ensure_lease_row().await
    }

    async fn try_acquire(
        &self,
        node_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.check(node_id)?;
        self.inner.try_acquire(node_id, now, expires_at).await
    }

    async fn try_renew(
        &self,
        node_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.check(node_id)?;
        self.inner.try_renew(node_id, now, expires_at).await
    }

    async fn current_lease(&self) -> Result<Option<LeaseRecord>> {
        self.inner.current_lease().await
    }
}

/// 内存历史存储
#[derive(Default)]
pub struct MemoryHistoryStore {
    snapshot: Mutex<HistorySnapshot>,
    append_calls: AtomicUsize,
    fail_appends: AtomicBool,
}

impl MemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, results: Vec<CheckResult>) {
        let mut snapshot = guard(&self.snapshot);
        for result in results {
            snapshot.entry(result.id.clone()).or_default().push(result);
        }
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn len(&self, id: &str) -> usize {
        guard(&self.snapshot).get(id).map_or(0, Vec::len)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load_history(&self) -> Result<HistorySnapshot> {
        Ok(guard(&self.snapshot).clone())
    }

    async fn append_history(&self, results: Vec<CheckResult>) -> Result<HistorySnapshot> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(MonitorError::database("写入检测历史失败"));
        }
        self.seed(results);
        Ok(guard(&self.snapshot).clone())
    }
}

/// 固定内容的配置存储
pub struct StaticConfigStore {
    configs: Mutex<Vec<ProviderConfig>>,
}

impl StaticConfigStore {
    #[must_use]
    pub const fn new(configs: Vec<ProviderConfig>) -> Self {
        Self {
            configs: Mutex::new(configs),
        }
    }

    pub fn set(&self, configs: Vec<ProviderConfig>) {
        *guard(&self.configs) = configs;
    }
}

#[async_trait]
impl ConfigStore for StaticConfigStore {
    async fn load_provider_configs(&self) -> Result<Vec<ProviderConfig>> {
        Ok(guard(&self.configs).clone())
    }
}

#[derive(Debug, Clone, Copy)]
enum Script {
    Operational,
    Empty,
    Fail,
}

/// 按预设脚本返回结果的检测执行器，记录调用次数
pub struct ScriptedCheckRunner {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedCheckRunner {
    const fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// 每个配置返回一条 operational 结果
    #[must_use]
    pub const fn operational() -> Self {
        Self::with_script(Script::Operational)
    }

    /// 什么都不返回
    #[must_use]
    pub const fn empty() -> Self {
        Self::with_script(Script::Empty)
    }

    /// 整体失败
    #[must_use]
    pub const fn failing() -> Self {
        Self::with_script(Script::Fail)
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckRunner for ScriptedCheckRunner {
    async fn run_provider_checks(&self, configs: &[ProviderConfig]) -> Result<Vec<CheckResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Operational => Ok(configs
                .iter()
                .map(|c| result_for(c, CheckStatus::Operational))
                .collect()),
            Script::Empty => Ok(Vec::new()),
            Script::Fail => Err(MonitorError::check("所有端点均不可达")),
        }
    }
}

/// 固定的官方状态
#[derive(Default)]
pub struct StaticOfficialStatus {
    statuses: Mutex<HashMap<String, OfficialStatus>>,
    ensure_calls: AtomicUsize,
}

impl StaticOfficialStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, provider_type: &str, status: OfficialStatus) {
        guard(&self.statuses).insert(provider_type.to_string(), status);
    }

    #[must_use]
    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }
}

impl OfficialStatusSource for StaticOfficialStatus {
    fn get_official_status(&self, provider_type: &str) -> Option<OfficialStatus> {
        guard(&self.statuses).get(provider_type).cloned()
    }

    fn ensure_official_status_poller(&self) {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
    }
}
