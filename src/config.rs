//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheOptions, DEFAULT_SWEEP_YIELD_BATCH_SIZE};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Periodic sweep interval in seconds (0 disables it)
    pub sweep_interval: u64,
    /// Entries visited between cooperative yields during a sweep
    pub sweep_yield_batch_size: usize,
    /// TTL in seconds for HTTP sets that carry none
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 120)
    /// - `SWEEP_YIELD_BATCH_SIZE` - Entries per sweep batch (default: 100000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            sweep_yield_batch_size: env_or(
                "SWEEP_YIELD_BATCH_SIZE",
                defaults.sweep_yield_batch_size,
            ),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Sweep options for the cache store.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::default()
            .with_sweep_interval(Duration::from_secs(self.sweep_interval))
            .with_sweep_yield_batch_size(self.sweep_yield_batch_size)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sweep_interval: 120,
            sweep_yield_batch_size: DEFAULT_SWEEP_YIELD_BATCH_SIZE,
            default_ttl: 300,
            server_port: 3000,
        }
    }
}
