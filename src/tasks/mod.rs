//! Background Tasks Module
//!
//! Contains background tasks owned by a cache store.
//!
//! # Tasks
//! - Expiration Sweep: Removes expired cache entries at the configured interval, on a
//!   tokio task or, outside a runtime, a dedicated thread

mod sweep;

pub(crate) use sweep::{spawn_sweep_task, SweepTimer};
