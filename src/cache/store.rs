//! Cache Store Module
//!
//! Main cache engine: a sharded concurrent table of [`CompositeKey`] to
//! [`CacheEntry`], lazily expired on read and reclaimed by a cooperative
//! sweep.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::cache::entry::ms_to_datetime;
use crate::cache::summary::{KeyNormalizer, Summary};
use crate::cache::{CacheEntry, CacheOptions, CoarseClock, CompositeKey, Expiration};
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweep_task, SweepTimer};

type Snapshot<V> = Vec<(CompositeKey, Arc<CacheEntry<V>>)>;

// == Sweep Outcome ==
/// Result of one [`CacheStore::scan_for_expired`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The sweep ran; `removed` expired entries were reclaimed
    Completed { removed: usize },
    /// Another sweep was in progress; nothing was done
    AlreadyRunning,
    /// The store is disposed; nothing was done
    Disposed,
}

impl SweepOutcome {
    /// Removed count, or `None` if the sweep did not run.
    pub fn removed(&self) -> Option<usize> {
        match self {
            SweepOutcome::Completed { removed } => Some(*removed),
            _ => None,
        }
    }

    /// Removed count, or -1 if the sweep did not run.
    pub fn as_count(&self) -> i64 {
        self.removed()
            .map_or(-1, |removed| i64::try_from(removed).unwrap_or(i64::MAX))
    }

    pub fn into_result(self) -> Result<usize> {
        match self {
            SweepOutcome::Completed { removed } => Ok(removed),
            SweepOutcome::AlreadyRunning => Err(CacheError::SweepAlreadyRunning),
            SweepOutcome::Disposed => Err(CacheError::Disposed),
        }
    }
}

// == Sweep Status ==
/// Diagnostics about the most recent sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStatus {
    /// Clock reading when the last sweep started (store creation if none has)
    pub started_at: Option<DateTime<Utc>>,
    pub in_progress: bool,
    /// Wall time of the last sweep that ran to completion
    pub duration: Duration,
}

// == Store Inner ==
/// State shared with the periodic sweep task, which holds it weakly.
#[derive(Debug)]
pub(crate) struct StoreInner<V> {
    entries: DashMap<CompositeKey, Arc<CacheEntry<V>>>,
    clock: Arc<CoarseClock>,
    options: CacheOptions,
    disposed: AtomicBool,
    sweep_in_progress: AtomicBool,
    last_sweep_ms: AtomicU64,
    last_sweep_micros: AtomicU64,
}

/// Clears the in-progress flag however the sweep ends.
struct SweepGuard<'a> {
    in_progress: &'a AtomicBool,
    started: Instant,
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.in_progress.store(false, Ordering::Release);
    }
}

impl<V> StoreInner<V> {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Removes `key` only while it still maps to this exact entry.
    fn remove_exact(&self, key: &CompositeKey, entry: &Arc<CacheEntry<V>>) -> bool {
        self.entries
            .remove_if(key, |_, current| Arc::ptr_eq(current, entry))
            .is_some()
    }

    fn snapshot(&self) -> Snapshot<V> {
        self.entries
            .iter()
            .map(|item| (item.key().clone(), Arc::clone(item.value())))
            .collect()
    }

    fn begin_sweep(&self) -> std::result::Result<SweepGuard<'_>, SweepOutcome> {
        if self.is_disposed() {
            return Err(SweepOutcome::Disposed);
        }
        if self
            .sweep_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SweepOutcome::AlreadyRunning);
        }

        self.last_sweep_ms.store(self.clock.now_ms(), Ordering::Relaxed);
        Ok(SweepGuard {
            in_progress: &self.sweep_in_progress,
            started: Instant::now(),
        })
    }

    fn finish_sweep(&self, guard: SweepGuard<'_>, removed: usize) -> SweepOutcome {
        let elapsed = guard.started.elapsed();
        self.last_sweep_micros.store(
            u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
        debug!(
            "Expiration sweep removed {} entries in {:?}, {} remain",
            removed,
            elapsed,
            self.entries.len()
        );
        SweepOutcome::Completed { removed }
    }

    /// Visits one batch, returning `(visited, removed)`.
    ///
    /// A panic while checking one entry is logged and skipped. The snapshot
    /// usually holds the last reference to a reclaimed value, so its drop runs
    /// in a separate guarded step after the removal is counted.
    fn sweep_batch(
        &self,
        batch: impl Iterator<Item = (CompositeKey, Arc<CacheEntry<V>>)>,
    ) -> (usize, usize) {
        let (mut visited, mut removed) = (0, 0);
        for (key, entry) in batch {
            visited += 1;
            let evicted = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.is_expired(&self.clock) && self.remove_exact(&key, &entry)
            }));
            match evicted {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(_) => warn!("Expiration sweep skipped entry '{}' after a panic", key),
            }

            if panic::catch_unwind(AssertUnwindSafe(move || drop(entry))).is_err() {
                warn!("Dropping swept entry '{}' panicked", key);
            }
        }
        (visited, removed)
    }

    /// Sweep yielding to the async scheduler between batches.
    pub(crate) async fn sweep(&self) -> SweepOutcome {
        let guard = match self.begin_sweep() {
            Ok(guard) => guard,
            Err(outcome) => return outcome,
        };

        let batch_size = self.options.sweep_yield_batch_size;
        let mut pending = self.snapshot().into_iter();
        let mut removed = 0;
        loop {
            let (visited, evicted) = self.sweep_batch(pending.by_ref().take(batch_size));
            removed += evicted;
            if visited < batch_size {
                break;
            }
            tokio::task::yield_now().await;
            if self.is_disposed() {
                debug!("Store disposed mid-sweep, stopping early");
                break;
            }
        }

        self.finish_sweep(guard, removed)
    }

    /// Sweep yielding the OS thread between batches.
    pub(crate) fn sweep_blocking(&self) -> SweepOutcome {
        let guard = match self.begin_sweep() {
            Ok(guard) => guard,
            Err(outcome) => return outcome,
        };

        let batch_size = self.options.sweep_yield_batch_size;
        let mut pending = self.snapshot().into_iter();
        let mut removed = 0;
        loop {
            let (visited, evicted) = self.sweep_batch(pending.by_ref().take(batch_size));
            removed += evicted;
            if visited < batch_size {
                break;
            }
            std::thread::yield_now();
            if self.is_disposed() {
                debug!("Store disposed mid-sweep, stopping early");
                break;
            }
        }

        self.finish_sweep(guard, removed)
    }
}

// == Cache Store ==
/// Concurrent, partitioned cache with absolute and sliding expiration.
///
/// No global lock is taken: every operation is a single-key operation on a
/// sharded table. Expired entries stay in the table, invisible to reads,
/// until a sweep reclaims them.
///
/// Share between threads with `Arc<CacheStore<V>>`. Dropping the store
/// disposes it.
#[derive(Debug)]
pub struct CacheStore<V> {
    inner: Arc<StoreInner<V>>,
    sweep_task: Mutex<Option<SweepTimer>>,
}

impl<V> CacheStore<V>
where
    V: Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a store on the process-wide coarse clock.
    ///
    /// A non-zero `sweep_interval` starts a periodic sweep: a task on the
    /// current tokio runtime, or a dedicated thread outside one.
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, CoarseClock::shared())
    }

    /// Creates a store reading expirations from `clock`.
    pub fn with_clock(options: CacheOptions, clock: Arc<CoarseClock>) -> Self {
        let inner = Arc::new(StoreInner {
            entries: DashMap::new(),
            last_sweep_ms: AtomicU64::new(clock.now_ms()),
            clock,
            options,
            disposed: AtomicBool::new(false),
            sweep_in_progress: AtomicBool::new(false),
            last_sweep_micros: AtomicU64::new(0),
        });
        let sweep_task = spawn_sweep_task(Arc::downgrade(&inner), inner.options.sweep_interval);

        Self {
            inner,
            sweep_task: Mutex::new(sweep_task),
        }
    }

    // == Set ==
    /// Inserts or fully replaces the entry under `key`.
    ///
    /// No-op once the store is disposed.
    pub fn set(&self, key: CompositeKey, value: V, expiration: impl Into<Expiration>) {
        self.set_with_sliding(key, value, expiration, Duration::ZERO);
    }

    /// Like [`set`](Self::set), with a sliding window refreshed on each read.
    pub fn set_with_sliding(
        &self,
        key: CompositeKey,
        value: V,
        expiration: impl Into<Expiration>,
        sliding: Duration,
    ) {
        if self.inner.is_disposed() {
            debug!("Ignoring set of '{}' on disposed store", key);
            return;
        }
        let entry = CacheEntry::with_sliding(value, expiration.into(), sliding, &self.inner.clock);
        self.inner.entries.insert(key, Arc::new(entry));
    }

    // == Get Entry ==
    /// Returns the live entry under `key`, counting it as a read.
    pub fn get_entry(&self, key: &CompositeKey) -> Option<Arc<CacheEntry<V>>> {
        let entry = self.inner.entries.get(key).map(|e| Arc::clone(e.value()))?;
        let (_, live) = entry.try_get(&self.inner.clock);
        live.then_some(entry)
    }

    // == Remove ==
    /// Removes the mapping, returning whether one existed.
    ///
    /// The removed entry is force-expired so readers still holding it see it
    /// as gone.
    pub fn remove(&self, key: &CompositeKey) -> bool {
        if self.inner.is_disposed() {
            return false;
        }
        match self.inner.entries.remove(key) {
            Some((_, entry)) => {
                entry.set_expired();
                true
            }
            None => false,
        }
    }

    // == Rename ==
    /// Moves the live entry under `from` to `to`, overwriting `to`.
    ///
    /// Returns `false` and changes nothing when `from == to` or `from` is
    /// absent or expired. Not atomic across both keys: a concurrent writer
    /// to `to` may win.
    pub fn rename(&self, from: &CompositeKey, to: &CompositeKey) -> bool {
        if from == to || self.inner.is_disposed() {
            return false;
        }
        let Some(entry) = self.inner.entries.get(from).map(|e| Arc::clone(e.value())) else {
            return false;
        };
        if entry.is_expired(&self.inner.clock) {
            return false;
        }

        self.inner.entries.insert(to.clone(), Arc::clone(&entry));
        self.inner.remove_exact(from, &entry);
        true
    }

    // == Clear ==
    /// Empties the table. Meant for tests and resets.
    pub fn clear(&self) {
        if self.inner.is_disposed() {
            return;
        }
        self.inner.entries.clear();
    }

    // == Count ==
    /// Table size, including expired entries not yet swept.
    pub fn count(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    // == Sweep ==
    /// Removes expired entries, yielding to the tokio scheduler after every
    /// `sweep_yield_batch_size` entries visited.
    ///
    /// Returns [`SweepOutcome::AlreadyRunning`] immediately if another sweep
    /// holds the flag. Stops early if the store is disposed between batches.
    pub async fn scan_for_expired(&self) -> SweepOutcome {
        self.inner.sweep().await
    }

    /// [`scan_for_expired`](Self::scan_for_expired) for synchronous callers;
    /// yields the OS thread between batches.
    pub fn scan_for_expired_blocking(&self) -> SweepOutcome {
        self.inner.sweep_blocking()
    }

    /// When the last sweep started, whether one is running, and how long the
    /// last completed one took.
    pub fn last_sweep(&self) -> SweepStatus {
        SweepStatus {
            started_at: ms_to_datetime(self.inner.last_sweep_ms.load(Ordering::Relaxed)),
            in_progress: self.inner.sweep_in_progress.load(Ordering::Acquire),
            duration: Duration::from_micros(self.inner.last_sweep_micros.load(Ordering::Relaxed)),
        }
    }

    // == Diagnostics ==
    /// Aggregates live entries by (optionally normalized) key.
    ///
    /// Expired entries are only counted in [`Summary::expired`]. With a
    /// `partition`, other partitions are skipped entirely. Works on a
    /// snapshot, so the normalizer holds no table lock.
    pub fn summarize(
        &self,
        normalizer: Option<KeyNormalizer<'_>>,
        partition: Option<&str>,
    ) -> Summary {
        let mut summary = Summary::default();
        for (key, entry) in self.inner.snapshot() {
            if partition.is_some_and(|p| p != key.partition()) {
                continue;
            }
            if entry.is_expired(&self.inner.clock) {
                summary.expired += 1;
                continue;
            }

            let bucket = match normalizer {
                Some(normalize) => normalize(key.key()),
                None => Some(key.key().to_string()),
            };
            if let Some(bucket) = bucket {
                summary.record(bucket, &entry);
            }
        }
        summary
    }

    /// Snapshot of every live entry.
    pub fn entries(&self) -> Vec<(CompositeKey, Arc<CacheEntry<V>>)> {
        self.inner
            .snapshot()
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired(&self.inner.clock))
            .collect()
    }

    /// Snapshot of the live entries in one partition, keyed by bare key.
    pub fn partition_entries(&self, partition: &str) -> Vec<(String, Arc<CacheEntry<V>>)> {
        self.inner
            .entries
            .iter()
            .filter(|item| {
                item.key().partition() == partition && !item.value().is_expired(&self.inner.clock)
            })
            .map(|item| (item.key().key().to_string(), Arc::clone(item.value())))
            .collect()
    }

    // == Accessors ==
    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    pub fn clock(&self) -> &Arc<CoarseClock> {
        &self.inner.clock
    }

    // == Dispose ==
    /// Stops the periodic sweep and turns mutations into no-ops. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(timer) = self.sweep_task.lock().ok().and_then(|mut timer| timer.take()) {
            timer.stop();
        }
        debug!("Cache store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Get ==
    /// Returns a clone of the live value under `key`.
    ///
    /// An expired entry reads as absent but stays in the table until swept.
    pub fn get(&self, key: &CompositeKey) -> Option<V> {
        let item = self.inner.entries.get(key)?;
        let (value, live) = item.value().try_get(&self.inner.clock);
        live.then(|| value.clone())
    }
}

impl<V> Drop for CacheStore<V> {
    fn drop(&mut self) {
        self.inner.disposed.store(true, Ordering::Release);
        if let Some(timer) = self.sweep_task.get_mut().ok().and_then(|timer| timer.take()) {
            timer.stop();
        }
    }
}
