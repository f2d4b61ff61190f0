//! Coarse Clock Module
//!
//! A cheap, slightly stale "now" for expiration checks. One shared clock is
//! refreshed by a background thread once per [`CLOCK_RESOLUTION`]; readers
//! only ever load an atomic.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, error};

/// How often the shared clock publishes a fresh reading.
///
/// Entries may outlive their deadline by up to this much.
pub const CLOCK_RESOLUTION: Duration = Duration::from_secs(1);

static SHARED_CLOCK: OnceLock<Arc<CoarseClock>> = OnceLock::new();

// == Coarse Clock ==
/// Monotonically non-decreasing approximation of the current time, in Unix
/// milliseconds.
#[derive(Debug)]
pub struct CoarseClock {
    now_ms: AtomicU64,
    /// Set when no updater could be started; reads then hit the system clock.
    precise: AtomicBool,
}

impl CoarseClock {
    // == Shared ==
    /// Returns the process-wide clock, starting its updater thread on first use.
    ///
    /// The updater runs for the rest of the process lifetime.
    pub fn shared() -> Arc<CoarseClock> {
        Arc::clone(SHARED_CLOCK.get_or_init(|| {
            let clock = Arc::new(CoarseClock::starting_at(current_timestamp_ms()));
            clock.spawn_updater();
            clock
        }))
    }

    // == Standalone ==
    /// Creates a clock frozen at `now_ms` with no updater attached.
    ///
    /// Time only moves through [`advance`](Self::advance) or
    /// [`refresh`](Self::refresh), which makes expiration deterministic in tests.
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
            precise: AtomicBool::new(false),
        }
    }

    // == Now ==
    /// Returns the last published time in Unix milliseconds.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        if self.precise.load(Ordering::Relaxed) {
            self.refresh();
        }
        self.now_ms.load(Ordering::Acquire)
    }

    // == Refresh ==
    /// Captures the system time and publishes it, never moving backwards.
    pub fn refresh(&self) {
        self.now_ms.fetch_max(current_timestamp_ms(), Ordering::AcqRel);
    }

    // == Advance ==
    /// Moves the published time forward by `by`.
    ///
    /// On the shared clock the next refresh overwrites this with real time
    /// if real time is further ahead.
    pub fn advance(&self, by: Duration) {
        let by_ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .now_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |now| {
                Some(now.saturating_add(by_ms))
            });
    }

    fn spawn_updater(self: &Arc<Self>) {
        let clock = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("coarse-clock".to_string())
            .spawn(move || loop {
                thread::sleep(CLOCK_RESOLUTION);
                clock.refresh();
            });

        match spawned {
            Ok(_) => debug!("Coarse clock updater started"),
            Err(err) => {
                error!(
                    "Failed to start coarse clock updater, falling back to precise reads: {}",
                    err
                );
                self.precise.store(true, Ordering::Relaxed);
            }
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
///
/// A system clock set before the epoch reads as 0.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
