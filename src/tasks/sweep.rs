//! Periodic Expiration Sweep
//!
//! Background timer that reclaims expired cache entries on a fixed cadence.
//! It holds the store weakly, so it never keeps a dropped store alive.
//!
//! Inside a tokio runtime the timer is a task; outside one it is a dedicated
//! OS thread running blocking sweeps.

use std::sync::Weak;
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{StoreInner, SweepOutcome};

/// Handle to a running periodic sweep.
#[derive(Debug)]
pub(crate) enum SweepTimer {
    Task(JoinHandle<()>),
    Thread(thread::JoinHandle<()>),
}

impl SweepTimer {
    /// Stops the timer.
    ///
    /// A task is aborted. A thread is detached and exits at its next tick,
    /// once it sees the store dropped or disposed.
    pub(crate) fn stop(self) {
        match self {
            SweepTimer::Task(task) => task.abort(),
            SweepTimer::Thread(_) => {}
        }
    }
}

/// Starts the periodic sweep.
///
/// Returns `None` when `interval` is zero, or when the timer thread could not
/// be spawned; the store then relies on manual sweeps.
pub(crate) fn spawn_sweep_task<V>(
    store: Weak<StoreInner<V>>,
    interval: Duration,
) -> Option<SweepTimer>
where
    V: Send + Sync + 'static,
{
    if interval.is_zero() {
        debug!("Periodic expiration sweep disabled");
        return None;
    }

    match Handle::try_current() {
        Ok(handle) => Some(SweepTimer::Task(handle.spawn(run_async(store, interval)))),
        Err(_) => spawn_sweep_thread(store, interval),
    }
}

async fn run_async<V>(store: Weak<StoreInner<V>>, interval: Duration)
where
    V: Send + Sync + 'static,
{
    info!("Starting expiration sweep task with interval of {:?}", interval);

    loop {
        // Sleep for the configured interval
        tokio::time::sleep(interval).await;

        let Some(store) = store.upgrade() else {
            debug!("Cache store dropped, stopping expiration sweep task");
            break;
        };
        if !report(store.sweep().await) {
            break;
        }
    }
}

fn spawn_sweep_thread<V>(
    store: Weak<StoreInner<V>>,
    interval: Duration,
) -> Option<SweepTimer>
where
    V: Send + Sync + 'static,
{
    let spawned = thread::Builder::new()
        .name("cache-sweep".to_string())
        .spawn(move || {
            info!("Starting expiration sweep thread with interval of {:?}", interval);

            loop {
                thread::sleep(interval);

                let Some(store) = store.upgrade() else {
                    debug!("Cache store dropped, stopping expiration sweep thread");
                    break;
                };
                if !report(store.sweep_blocking()) {
                    break;
                }
            }
        });

    match spawned {
        Ok(thread) => Some(SweepTimer::Thread(thread)),
        Err(err) => {
            error!(
                "Failed to start expiration sweep thread, sweeps must be run manually: {}",
                err
            );
            None
        }
    }
}

/// Logs one periodic sweep. Returns `false` once the timer should stop.
fn report(outcome: SweepOutcome) -> bool {
    match outcome {
        SweepOutcome::Completed { removed } if removed > 0 => {
            info!("Expiration sweep: removed {} expired entries", removed);
        }
        SweepOutcome::Completed { .. } => {
            debug!("Expiration sweep: no expired entries found");
        }
        SweepOutcome::AlreadyRunning => {
            debug!("Expiration sweep skipped, another sweep is running");
        }
        SweepOutcome::Disposed => {
            debug!("Cache store disposed, stopping periodic expiration sweep");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::{CacheOptions, CacheStore, CoarseClock, CompositeKey};

    fn clock() -> Arc<CoarseClock> {
        Arc::new(CoarseClock::starting_at(1_000_000))
    }

    #[tokio::test]
    async fn test_zero_interval_spawns_nothing() {
        let store: CacheStore<String> = CacheStore::with_clock(CacheOptions::manual_sweep(), clock());
        assert!(!store.last_sweep().in_progress);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.last_sweep().duration, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let store = CacheStore::with_clock(
            CacheOptions::default().with_sweep_interval(Duration::from_millis(20)),
            clock(),
        );
        let key = CompositeKey::new("long_lived");
        store.set(key.clone(), "value".to_string(), Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.get(&key).as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_sweep_task_stops_on_dispose() {
        let clock = clock();
        let store = CacheStore::with_clock(
            CacheOptions::default().with_sweep_interval(Duration::from_millis(20)),
            Arc::clone(&clock),
        );
        store.set(CompositeKey::new("k"), 1u32, Duration::from_secs(1));
        store.dispose();
        clock.advance(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Nothing swept it after disposal
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_sweep_thread_outside_runtime() {
        let clock = clock();
        let store = CacheStore::with_clock(
            CacheOptions::default().with_sweep_interval(Duration::from_millis(20)),
            Arc::clone(&clock),
        );
        store.set(CompositeKey::new("short"), 1u32, Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));

        let mut reclaimed = false;
        for _ in 0..100 {
            thread::sleep(Duration::from_millis(20));
            if store.is_empty() {
                reclaimed = true;
                break;
            }
        }
        assert!(reclaimed, "Sweep thread should have reclaimed the entry");
    }

    #[test]
    fn test_sweep_thread_stops_on_dispose() {
        let clock = clock();
        let store = CacheStore::with_clock(
            CacheOptions::default().with_sweep_interval(Duration::from_millis(20)),
            Arc::clone(&clock),
        );
        store.set(CompositeKey::new("k"), 1u32, Duration::from_secs(1));
        store.dispose();
        clock.advance(Duration::from_secs(5));

        thread::sleep(Duration::from_millis(100));

        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_report_stops_only_on_dispose() {
        assert!(report(SweepOutcome::Completed { removed: 0 }));
        assert!(report(SweepOutcome::Completed { removed: 2 }));
        assert!(report(SweepOutcome::AlreadyRunning));
        assert!(!report(SweepOutcome::Disposed));
    }
}
