//! Cache Entry Module
//!
//! Defines the stored unit: a value plus its absolute deadline, optional
//! sliding window and access counter. Deadlines are Unix milliseconds read
//! against a [`CoarseClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::CoarseClock;

/// Deadline sentinel for entries that never expire.
pub const NEVER: u64 = u64::MAX;

// == Expiration ==
/// When a newly stored entry should expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Never expires (sliding windows are ignored)
    Never,
    /// Expires at a fixed point in time
    At(DateTime<Utc>),
    /// Expires this long after the clock's current reading
    After(Duration),
}

impl Expiration {
    /// Resolves to a deadline in Unix milliseconds.
    fn deadline_ms(&self, clock: &CoarseClock) -> u64 {
        match *self {
            Expiration::Never => NEVER,
            Expiration::At(at) if at == DateTime::<Utc>::MAX_UTC => NEVER,
            // Deadlines before the epoch clamp to 0, which is always expired
            Expiration::At(at) => u64::try_from(at.timestamp_millis()).unwrap_or(0),
            Expiration::After(ttl) if ttl == Duration::MAX => NEVER,
            Expiration::After(ttl) => {
                let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(NEVER);
                clock.now_ms().saturating_add(ttl_ms)
            }
        }
    }
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        Expiration::After(ttl)
    }
}

impl From<DateTime<Utc>> for Expiration {
    fn from(at: DateTime<Utc>) -> Self {
        Expiration::At(at)
    }
}

// == Cache Entry ==
/// A single cache entry with value and expiration metadata.
///
/// Entries are replaced wholesale on `set`; only the deadline and the access
/// counter change after construction.
#[derive(Debug)]
pub struct CacheEntry<V> {
    value: V,
    absolute_expiration: AtomicU64,
    sliding_secs: u32,
    access_count: AtomicU64,
}

impl<V> CacheEntry<V> {
    // == Constructors ==
    /// Creates an entry with an absolute or relative expiration.
    pub fn new(value: V, expiration: Expiration, clock: &CoarseClock) -> Self {
        Self::with_sliding(value, expiration, Duration::ZERO, clock)
    }

    /// Creates an entry whose deadline is pushed to `now + sliding` on every
    /// successful read.
    ///
    /// Sliding stays off for entries that never expire and for a zero
    /// window. Partial seconds round up.
    pub fn with_sliding(
        value: V,
        expiration: Expiration,
        sliding: Duration,
        clock: &CoarseClock,
    ) -> Self {
        let deadline = expiration.deadline_ms(clock);
        Self {
            value,
            absolute_expiration: AtomicU64::new(deadline),
            sliding_secs: sliding_seconds(deadline, sliding),
            access_count: AtomicU64::new(0),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the clock reaches its deadline.
    #[inline]
    pub fn is_expired(&self, clock: &CoarseClock) -> bool {
        self.absolute_expiration.load(Ordering::Acquire) <= clock.now_ms()
    }

    // == Try Get ==
    /// Reads the value, returning whether the entry is still live.
    ///
    /// The value comes back either way, but `false` means "not present".
    /// A live read bumps the access counter and slides the deadline.
    #[inline]
    pub fn try_get(&self, clock: &CoarseClock) -> (&V, bool) {
        let now = clock.now_ms();
        let deadline = self.absolute_expiration.load(Ordering::Acquire);
        if deadline <= now {
            return (&self.value, false);
        }

        // Lost increments under contention are tolerated
        self.access_count.fetch_add(1, Ordering::Relaxed);

        if self.sliding_secs != 0 {
            let slid = now.saturating_add(u64::from(self.sliding_secs) * 1000);
            // Only slide from the deadline we checked; never revives an entry
            // that was force-expired in between.
            let _ = self.absolute_expiration.compare_exchange(
                deadline,
                slid,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }

        (&self.value, true)
    }

    // == Set Expired ==
    /// Forces immediate expiration.
    pub fn set_expired(&self) {
        self.absolute_expiration.store(0, Ordering::Release);
    }

    // == Accessors ==
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Number of successful reads so far (best effort).
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Raw deadline in Unix milliseconds, [`NEVER`] for no expiration.
    pub fn expires_at_ms(&self) -> u64 {
        self.absolute_expiration.load(Ordering::Acquire)
    }

    /// Deadline as a timestamp, or `None` if the entry never expires.
    pub fn absolute_expiration(&self) -> Option<DateTime<Utc>> {
        ms_to_datetime(self.expires_at_ms())
    }

    /// Sliding window, or `None` if sliding is off.
    pub fn sliding_window(&self) -> Option<Duration> {
        (self.sliding_secs != 0).then(|| Duration::from_secs(u64::from(self.sliding_secs)))
    }
}

fn sliding_seconds(deadline: u64, sliding: Duration) -> u32 {
    if deadline == NEVER || sliding.is_zero() {
        return 0;
    }
    let secs = sliding.as_secs() + u64::from(sliding.subsec_nanos() > 0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// Converts a deadline to a timestamp; [`NEVER`] maps to `None`.
pub(crate) fn ms_to_datetime(ms: u64) -> Option<DateTime<Utc>> {
    if ms == NEVER {
        return None;
    }
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}
