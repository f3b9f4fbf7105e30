//! # 合并刷新缓存
//!
//! 按键保存最近一次成功计算的值。键在 TTL 内直接复用；过期后同一时刻只允许一次计算，
//! 期间到达的调用者共享同一个结果（成功或失败）。

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::CacheCounter;
use crate::error::{MonitorError, Result};
use crate::{ldebug, lwarn, logging::{LogComponent, LogStage}};

type SharedOutcome<V> = std::result::Result<V, Arc<MonitorError>>;
type InflightRefresh<V> = Shared<BoxFuture<'static, SharedOutcome<V>>>;

struct Slot<V> {
    value: Option<V>,
    last_ping_at: Option<Instant>,
    /// 进行中的计算及其编号
    inflight: Option<(u64, InflightRefresh<V>)>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: None,
            last_ping_at: None,
            inflight: None,
        }
    }
}

type Slots<V> = Arc<Mutex<HashMap<String, Slot<V>>>>;

/// 合并刷新缓存
pub struct PollCache<V> {
    slots: Slots<V>,
    next_op: AtomicU64,
    counter: Arc<CacheCounter>,
}

fn lock<V>(slots: &Mutex<HashMap<String, Slot<V>>>) -> MutexGuard<'_, HashMap<String, Slot<V>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V> PollCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(counter: Arc<CacheCounter>) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_op: AtomicU64::new(1),
            counter,
        }
    }

    /// 返回键对应的值，必要时调用 `compute` 刷新
    ///
    /// - 值在 `ttl` 内：直接返回，不调用 `compute`
    /// - 已有计算在进行：等待它的结果
    /// - 否则启动新计算；计算在独立任务中运行，调用方被取消也会执行完毕
    ///
    /// 失败不会覆盖已有的值，也不会留下进行中标记
    pub async fn get_or_refresh<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let refresh = {
            let mut slots = lock(&self.slots);
            let slot = slots.entry(key.to_string()).or_default();

            if let (Some(value), Some(at)) = (&slot.value, slot.last_ping_at) {
                if at.elapsed() < ttl {
                    self.counter.record_hit();
                    return Ok(value.clone());
                }
            }

            if let Some((op, inflight)) = &slot.inflight {
                self.counter.record_hit();
                ldebug!(
                    "system",
                    LogStage::Cache,
                    LogComponent::PollCache,
                    "join_inflight",
                    "复用进行中的刷新",
                    key = %key,
                    op = *op
                );
                inflight.clone()
            } else {
                self.counter.record_miss();
                let op = self.next_op.fetch_add(1, Ordering::Relaxed);
                let refresh = Self::spawn_refresh(Arc::clone(&self.slots), key.to_string(), op, compute());
                slot.inflight = Some((op, refresh.clone()));
                refresh
            }
        };

        refresh.await.map_err(MonitorError::coalesced)
    }

    fn spawn_refresh<Fut>(slots: Slots<V>, key: String, op: u64, fut: Fut) -> InflightRefresh<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let task_slots = Arc::clone(&slots);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let outcome = fut.await;
            let mut slots = lock(&task_slots);
            if let Some(slot) = slots.get_mut(&task_key) {
                if let Ok(value) = &outcome {
                    slot.value = Some(value.clone());
                    slot.last_ping_at = Some(Instant::now());
                }
                clear_inflight(slot, op);
            }
            drop(slots);

            outcome.map_err(|e| {
                lwarn!(
                    "system",
                    LogStage::Cache,
                    LogComponent::PollCache,
                    "refresh",
                    format!("刷新失败: {e}"),
                    key = %task_key
                );
                Arc::new(e)
            })
        });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    if let Some(slot) = lock(&slots).get_mut(&key) {
                        clear_inflight(slot, op);
                    }
                    Err(Arc::new(MonitorError::internal_with_source(
                        "刷新任务异常终止",
                        join_err,
                    )))
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// 只清除自己发起的那次计算
fn clear_inflight<V>(slot: &mut Slot<V>, op: u64) {
    if slot.inflight.as_ref().is_some_and(|(current, _)| *current == op) {
        slot.inflight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const TTL: Duration = Duration::from_secs(60);

    fn cache() -> (PollCache<u32>, Arc<CacheCounter>) {
        let counter = Arc::new(CacheCounter::new());
        (PollCache::new(Arc::clone(&counter)), counter)
    }

    impl<V: Clone> PollCache<V> {
        fn peek(&self, key: &str) -> Option<V> {
            lock(&self.slots).get(key).and_then(|s| s.value.clone())
        }

        fn has_inflight(&self, key: &str) -> bool {
            lock(&self.slots).get(key).is_some_and(|s| s.inflight.is_some())
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_compute() {
        let (cache, counter) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let callers = (0..5).map(|_| {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            cache.get_or_refresh("k", TTL, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok(7)
            })
        });
        let all = futures::future::join_all(callers);
        let release = async {
            tokio::task::yield_now().await;
            gate.notify_one();
        };
        let (results, ()) = tokio::join!(all, release);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.into_iter().all(|r| r.unwrap() == 7));
        let stats = counter.snapshot();
        assert_eq!((stats.hits, stats.misses), (4, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_reused_within_ttl() {
        let (cache, _) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let compute = |calls: Arc<AtomicUsize>| {
            move || async move { Ok(u32::try_from(calls.fetch_add(1, Ordering::SeqCst)).unwrap()) }
        };

        assert_eq!(cache.get_or_refresh("k", TTL, compute(calls.clone())).await.unwrap(), 0);
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get_or_refresh("k", TTL, compute(calls.clone())).await.unwrap(), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get_or_refresh("k", TTL, compute(calls.clone())).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (cache, _) = cache();
        let a = cache.get_or_refresh("a", TTL, || async { Ok(1) }).await.unwrap();
        let b = cache.get_or_refresh("b", TTL, || async { Ok(2) }).await.unwrap();
        assert_eq!((a, b), (1, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_shared_and_keeps_previous_value() {
        let (cache, _) = cache();
        cache.get_or_refresh("k", TTL, || async { Ok(1) }).await.unwrap();
        tokio::time::advance(TTL).await;

        let gate = Arc::new(Notify::new());
        let failing = |gate: Arc<Notify>| {
            move || async move {
                gate.notified().await;
                Err::<u32, _>(MonitorError::check("探测全部失败"))
            }
        };
        let first = cache.get_or_refresh("k", TTL, failing(gate.clone()));
        let second = cache.get_or_refresh("k", TTL, failing(gate.clone()));
        let release = async {
            tokio::task::yield_now().await;
            gate.notify_one();
        };
        let (first, second, ()) = tokio::join!(first, second, release);

        assert!(matches!(first, Err(MonitorError::Coalesced { .. })));
        assert!(second.is_err());
        assert_eq!(cache.peek("k"), Some(1));
        assert!(!cache.has_inflight("k"));

        // 失败后下一次调用重新计算
        let value = cache.get_or_refresh("k", TTL, || async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_compute_survives_dropped_caller() {
        let (cache, _) = cache();
        let gate = Arc::new(Notify::new());
        let g = gate.clone();

        let pending = cache.get_or_refresh("k", TTL, move || async move {
            g.notified().await;
            Ok(9)
        });
        // 轮询一次后放弃等待
        assert!(futures::poll!(Box::pin(pending)).is_pending());

        gate.notify_one();
        for _ in 0..10 {
            tokio::task::yield_now().await;
            if cache.peek("k").is_some() {
                break;
            }
        }
        assert_eq!(cache.peek("k"), Some(9));
        assert!(!cache.has_inflight("k"));
    }

    #[tokio::test]
    async fn test_stale_refresh_does_not_clear_newer_slot() {
        let (cache, _) = cache();
        let gate = Arc::new(Notify::new());
        let g = gate.clone();

        let first = cache.get_or_refresh("k", TTL, move || async move {
            g.notified().await;
            Ok(1)
        });
        let mut first = Box::pin(first);
        assert!(futures::poll!(first.as_mut()).is_pending());

        // 模拟槽位已被另一次刷新接管
        let replacement: InflightRefresh<u32> = async { Ok(2) }.boxed().shared();
        lock(&cache.slots).get_mut("k").unwrap().inflight = Some((u64::MAX, replacement));

        gate.notify_one();
        assert_eq!(first.await.unwrap(), 1);
        let slots = lock(&cache.slots);
        let (op, _) = slots.get("k").unwrap().inflight.as_ref().unwrap();
        assert_eq!(*op, u64::MAX);
    }
}
