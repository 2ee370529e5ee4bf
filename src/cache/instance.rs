//! Instance cache: one live execution handle per model id.
//!
//! # Architecture
//!
//! Each model id owns a *slot*: an async mutex around an optional entry.
//! The slot table itself is a `RwLock<HashMap>` that is only held long
//! enough to look up or insert a slot, never across an `.await`.
//!
//! - **Get-or-create** locks the slot, returns the cached handle if there
//!   is one, and otherwise runs the creator *while holding the slot lock*.
//!   Concurrent misses for the same id queue on that lock, so the creator
//!   runs at most once per id and every caller gets the same handle.
//! - **Eviction** (explicit, idle sweep, or shutdown) takes the entry and
//!   releases the handle under the same slot lock, so it is mutually
//!   exclusive with creation for that id: a caller never receives a handle
//!   that has already been released.
//! - A failed or cancelled creation leaves the slot empty, so the next
//!   call retries instead of replaying the failure.
//!
//! # Idle sweep
//!
//! [`InstanceCache::start_sweeper`] spawns a background task that runs
//! [`InstanceCache::sweep_idle`] every `sweep_interval`. The sweep visits
//! one slot at a time and skips slots that are busy (locked), since a busy
//! slot is by definition in use. A release failure is logged and counted
//! and does not stop the sweep. [`InstanceCache::shutdown`] stops the task
//! and joins it before releasing every remaining handle.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::backend::ExecutionHandle;
use crate::telemetry;
use crate::{HuginnError, Result};

/// Configuration for the instance cache.
///
/// ```rust
/// # use huginn::InstanceCacheConfig;
/// # use std::time::Duration;
/// let config = InstanceCacheConfig::new()
///     .idle_threshold(Duration::from_secs(600))
///     .sweep_interval(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct InstanceCacheConfig {
    /// Entries idle longer than this are evicted by the sweep. Default: 30 minutes.
    pub idle_threshold: Duration,
    /// How often the background sweep runs. Default: 5 minutes.
    pub sweep_interval: Duration,
}

impl Default for InstanceCacheConfig {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl InstanceCacheConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle threshold.
    pub fn idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    /// Set the sweep interval.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// A cached handle and when it was last handed out.
struct CacheEntry<H> {
    model_id: String,
    handle: Arc<H>,
    last_access: Instant,
}

type Slot<H> = tokio::sync::Mutex<Option<CacheEntry<H>>>;

#[derive(Debug, Clone, Copy)]
enum EvictReason {
    Idle,
    Explicit,
    Shutdown,
}

impl EvictReason {
    fn as_str(&self) -> &'static str {
        match self {
            EvictReason::Idle => "idle",
            EvictReason::Explicit => "explicit",
            EvictReason::Shutdown => "shutdown",
        }
    }
}

struct Shared<H> {
    slots: RwLock<HashMap<String, Arc<Slot<H>>>>,
    config: InstanceCacheConfig,
    shut_down: AtomicBool,
}

struct Sweeper {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Keyed store of live execution handles, one per model id.
pub struct InstanceCache<H: ExecutionHandle> {
    shared: Arc<Shared<H>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<H: ExecutionHandle> InstanceCache<H> {
    /// Create an empty cache. The idle sweep is not started; see
    /// [`start_sweeper`](Self::start_sweeper).
    pub fn new(config: InstanceCacheConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                slots: RwLock::new(HashMap::new()),
                config,
                shut_down: AtomicBool::new(false),
            }),
            sweeper: Mutex::new(None),
        }
    }

    /// The cache configuration.
    pub fn config(&self) -> &InstanceCacheConfig {
        &self.shared.config
    }

    /// Return the cached handle for `model_id`, creating it with `create`
    /// on a miss.
    ///
    /// `create` runs at most once per id even under concurrent misses.
    /// Its error is returned as-is and nothing is cached. Dropping the
    /// returned future mid-creation leaves no entry behind.
    #[instrument(skip(self, create), fields(model = %model_id))]
    pub async fn get_or_create<F, Fut>(&self, model_id: &str, create: F) -> Result<Arc<H>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<H>>,
    {
        self.shared.get_or_create(model_id, create).await
    }

    /// [`get_or_create`](Self::get_or_create) that stops promptly with
    /// [`HuginnError::Cancelled`] when `cancel` fires.
    pub async fn get_or_create_with_cancel<F, Fut>(
        &self,
        model_id: &str,
        create: F,
        cancel: &CancellationToken,
    ) -> Result<Arc<H>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<H>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(model = %model_id, "instance creation cancelled");
                Err(HuginnError::Cancelled)
            }
            result = self.get_or_create(model_id, create) => result,
        }
    }

    /// Remove and release the entry for `model_id`.
    ///
    /// Returns `Ok(false)` if nothing was cached. If the handle's release
    /// fails the entry is still gone and the release error is returned.
    #[instrument(skip(self), fields(model = %model_id))]
    pub async fn evict(&self, model_id: &str) -> Result<bool> {
        self.shared.evict(model_id).await
    }

    /// Evict every entry idle for longer than the idle threshold.
    ///
    /// Returns how many entries were evicted. Normally driven by the
    /// background sweeper; exposed for callers that run their own schedule.
    #[instrument(skip(self))]
    pub async fn sweep_idle(&self) -> usize {
        self.shared.sweep_idle().await
    }

    /// Whether a handle is currently cached for `model_id`.
    pub async fn contains(&self, model_id: &str) -> bool {
        match self.shared.existing_slot(model_id) {
            Some(slot) => slot.lock().await.is_some(),
            None => false,
        }
    }

    /// Ids with a cached handle, sorted.
    pub async fn cached_models(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for (_, slot) in self.shared.snapshot() {
            if let Some(entry) = slot.lock().await.as_ref() {
                ids.push(entry.model_id.clone());
            }
        }
        ids.sort();
        ids
    }

    /// Spawn the background idle sweep on the current Tokio runtime.
    ///
    /// No-op if the sweeper is already running or the cache is shut down.
    pub fn start_sweeper(&self) -> Result<()> {
        let interval = self.shared.config.sweep_interval;
        if interval.is_zero() {
            return Err(HuginnError::Configuration(
                "sweep interval must be greater than zero".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            HuginnError::Configuration("instance cache sweeper requires a Tokio runtime".into())
        })?;

        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.is_some() || self.shared.shut_down.load(Ordering::SeqCst) {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let task = runtime.spawn(run_sweeper(
            Arc::downgrade(&self.shared),
            interval,
            cancel.clone(),
        ));
        *sweeper = Some(Sweeper { cancel, task });
        debug!(?interval, "instance cache sweeper started");
        Ok(())
    }

    /// Whether the background sweep is running.
    pub fn sweeper_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }

    /// Stop the sweep, wait for it, and release every cached handle.
    ///
    /// Later calls are no-ops. After shutdown, `get_or_create` fails with
    /// [`HuginnError::ShutDown`]. Returns an error if any release failed;
    /// every entry is removed regardless.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        if self.shared.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sweeper) = sweeper {
            sweeper.cancel.cancel();
            if let Err(e) = sweeper.task.await {
                warn!(error = %e, "instance cache sweeper ended abnormally");
            }
        }

        let slots: Vec<Arc<Slot<H>>> = self
            .shared
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, slot)| slot)
            .collect();

        let outcomes = join_all(slots.into_iter().map(|slot| async move {
            let entry = slot.lock().await.take();
            match entry {
                Some(entry) => release(entry, EvictReason::Shutdown).await.is_err(),
                None => false,
            }
        }))
        .await;
        let released = outcomes.len();
        let failures = outcomes.into_iter().filter(|failed| *failed).count();

        info!(slots = released, failures, "instance cache shut down");
        if failures > 0 {
            return Err(HuginnError::Backend(format!(
                "{failures} cached handle(s) failed to release during shutdown"
            )));
        }
        Ok(())
    }
}

impl<H: ExecutionHandle> Drop for InstanceCache<H> {
    fn drop(&mut self) {
        let sweeper = self
            .sweeper
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sweeper) = sweeper {
            sweeper.cancel.cancel();
        }
    }
}

impl<H: ExecutionHandle> fmt::Debug for InstanceCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("config", &self.shared.config)
            .field("slots", &self.shared.snapshot().len())
            .field("shut_down", &self.shared.shut_down.load(Ordering::SeqCst))
            .finish()
    }
}

impl<H: ExecutionHandle> Shared<H> {
    async fn get_or_create<F, Fut>(&self, model_id: &str, create: F) -> Result<Arc<H>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<H>>,
    {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(HuginnError::ShutDown);
        }

        let slot = self.slot(model_id);
        let mut guard = slot.lock().await;
        // Shutdown may have drained the table while we waited.
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(HuginnError::ShutDown);
        }

        if let Some(entry) = guard.as_mut() {
            entry.last_access = Instant::now();
            metrics::counter!(telemetry::INSTANCE_CACHE_HITS_TOTAL).increment(1);
            return Ok(Arc::clone(&entry.handle));
        }

        metrics::counter!(telemetry::INSTANCE_CACHE_MISSES_TOTAL).increment(1);
        let handle = match create(model_id.to_string()).await {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                drop(guard);
                self.prune(model_id, slot);
                return Err(e);
            }
        };
        *guard = Some(CacheEntry {
            model_id: model_id.to_string(),
            handle: Arc::clone(&handle),
            last_access: Instant::now(),
        });
        debug!(model = %model_id, "instance cached");
        Ok(handle)
    }

    async fn evict(&self, model_id: &str) -> Result<bool> {
        let Some(slot) = self.existing_slot(model_id) else {
            return Ok(false);
        };
        let mut guard = slot.lock().await;
        let result = match guard.take() {
            Some(entry) => release(entry, EvictReason::Explicit).await.map(|()| true),
            None => Ok(false),
        };
        drop(guard);
        self.prune(model_id, slot);
        result
    }

    async fn sweep_idle(&self) -> usize {
        let threshold = self.config.idle_threshold;
        let mut evicted = 0;
        for (model_id, slot) in self.snapshot() {
            {
                // A locked slot is being created, hit, or evicted right now.
                let Ok(mut guard) = slot.try_lock() else {
                    continue;
                };
                // Released under the slot lock so a concurrent miss waits
                // for the old handle to close before creating a new one.
                if let Some(entry) =
                    guard.take_if(|entry| entry.last_access.elapsed() > threshold)
                {
                    // Release failures are logged inside `release`; keep sweeping.
                    let _ = release(entry, EvictReason::Idle).await;
                    evicted += 1;
                }
            }
            self.prune(&model_id, slot);
        }
        if evicted > 0 {
            info!(evicted, "idle instances evicted");
        }
        evicted
    }

    /// Get or insert the slot for `model_id`.
    fn slot(&self, model_id: &str) -> Arc<Slot<H>> {
        if let Some(slot) = self.existing_slot(model_id) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(model_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None))),
        )
    }

    fn existing_slot(&self, model_id: &str) -> Option<Arc<Slot<H>>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model_id)
            .cloned()
    }

    fn snapshot(&self) -> Vec<(String, Arc<Slot<H>>)> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect()
    }

    /// Drop an empty slot from the table once nobody else references it.
    ///
    /// Slots are only cloned under the table lock, so a strong count of one
    /// under the write lock means no caller can be waiting on this slot.
    fn prune(&self, model_id: &str, slot: Arc<Slot<H>>) {
        drop(slot);
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let removable = slots.get(model_id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1
                && slot.try_lock().map(|entry| entry.is_none()).unwrap_or(false)
        });
        if removable {
            slots.remove(model_id);
        }
    }
}

/// Release an evicted entry's handle, recording metrics.
async fn release<H: ExecutionHandle>(entry: CacheEntry<H>, reason: EvictReason) -> Result<()> {
    metrics::counter!(telemetry::INSTANCES_EVICTED_TOTAL, "reason" => reason.as_str())
        .increment(1);
    match entry.handle.release().await {
        Ok(()) => {
            debug!(model = %entry.model_id, reason = reason.as_str(), "instance released");
            Ok(())
        }
        Err(e) => {
            metrics::counter!(telemetry::INSTANCE_RELEASE_FAILURES_TOTAL).increment(1);
            warn!(
                model = %entry.model_id,
                reason = reason.as_str(),
                error = %e,
                "failed to release instance"
            );
            Err(e)
        }
    }
}

async fn run_sweeper<H: ExecutionHandle>(
    shared: Weak<Shared<H>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else { break };
                shared.sweep_idle().await;
            }
        }
    }
    debug!("instance cache sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Handle;
    impl ExecutionHandle for Handle {}

    #[test]
    fn config_builder_pattern() {
        let config = InstanceCacheConfig::new()
            .idle_threshold(Duration::from_secs(60))
            .sweep_interval(Duration::from_secs(5));
        assert_eq!(config.idle_threshold, Duration::from_secs(60));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
    }

    #[test]
    fn config_defaults() {
        let config = InstanceCacheConfig::default();
        assert_eq!(config.idle_threshold, Duration::from_secs(1800));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn failed_creation_leaves_no_slot_behind() {
        let cache = InstanceCache::<Handle>::new(InstanceCacheConfig::default());
        let result = cache
            .get_or_create("m", |_| {
                std::future::ready(Err(HuginnError::Backend("boom".into())))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.shared.snapshot().is_empty());
    }

    #[tokio::test]
    async fn evict_prunes_slot() {
        let cache = InstanceCache::<Handle>::new(InstanceCacheConfig::default());
        cache
            .get_or_create("m", |_| std::future::ready(Ok(Handle)))
            .await
            .unwrap();
        assert_eq!(cache.shared.snapshot().len(), 1);

        assert!(cache.evict("m").await.unwrap());
        assert!(cache.shared.snapshot().is_empty());
    }

    #[test]
    fn sweeper_requires_runtime() {
        let cache = InstanceCache::<Handle>::new(InstanceCacheConfig::default());
        let err = cache.start_sweeper().unwrap_err();
        assert!(matches!(err, HuginnError::Configuration(_)));
    }

    #[tokio::test]
    async fn zero_sweep_interval_is_rejected() {
        let cache = InstanceCache::<Handle>::new(
            InstanceCacheConfig::new().sweep_interval(Duration::ZERO),
        );
        assert!(cache.start_sweeper().is_err());
    }
}
