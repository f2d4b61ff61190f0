//! Cache Options Module
//!
//! Tuning knobs for the expiration sweep.

use std::time::Duration;

/// Default interval between periodic sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(120);

/// Default number of entries visited between cooperative yields.
pub const DEFAULT_SWEEP_YIELD_BATCH_SIZE: usize = 100_000;

// == Cache Options ==
/// Sweep configuration for a [`CacheStore`](crate::cache::CacheStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Time between periodic sweeps; zero disables the timer
    pub sweep_interval: Duration,
    /// Entries visited between yields; always at least 1
    pub sweep_yield_batch_size: usize,
}

impl CacheOptions {
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the yield batch size. Zero is clamped to 1.
    pub fn with_sweep_yield_batch_size(mut self, batch_size: usize) -> Self {
        self.sweep_yield_batch_size = batch_size.max(1);
        self
    }

    /// Options with no periodic sweep; callers sweep manually.
    pub fn manual_sweep() -> Self {
        Self::default().with_sweep_interval(Duration::ZERO)
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            sweep_yield_batch_size: DEFAULT_SWEEP_YIELD_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = CacheOptions::default();
        assert_eq!(options.sweep_interval, Duration::from_secs(120));
        assert_eq!(options.sweep_yield_batch_size, 100_000);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let options = CacheOptions::default().with_sweep_yield_batch_size(0);
        assert_eq!(options.sweep_yield_batch_size, 1);
    }

    #[test]
    fn test_manual_sweep_disables_timer() {
        assert!(CacheOptions::manual_sweep().sweep_interval.is_zero());
    }
}
