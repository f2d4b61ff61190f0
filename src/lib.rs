//! Slim Cache - An in-process, time-expiring key/value cache
//!
//! Partitioned keys, absolute and sliding expiration on a coarse clock, and
//! cooperative background sweeps. Ships with a small HTTP admin server.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
mod tasks;

pub use api::AppState;
pub use cache::{CacheOptions, CacheStore, CompositeKey, Expiration, SweepOutcome};
pub use config::Config;
pub use error::{CacheError, Result};
