//! Cache Module
//!
//! Provides an in-process cache with partitioned keys, absolute and sliding
//! expiration, and cooperative expiration sweeps.

mod clock;
mod entry;
mod key;
mod options;
mod store;
pub mod summary;


// Re-export public types
pub use clock::{current_timestamp_ms, CoarseClock, CLOCK_RESOLUTION};
pub use entry::{CacheEntry, Expiration, NEVER};
pub use key::CompositeKey;
pub use options::{CacheOptions, DEFAULT_SWEEP_INTERVAL, DEFAULT_SWEEP_YIELD_BATCH_SIZE};
pub use store::{CacheStore, SweepOutcome, SweepStatus};
pub use summary::{BucketSummary, KeyNormalizer, Summary};

pub(crate) use store::StoreInner;
