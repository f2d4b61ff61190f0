//! Composite Key Module
//!
//! Keys are a `(partition, key)` pair so several logical datasets can share
//! one table without colliding.

use std::fmt;
use std::sync::Arc;

use crate::error::{CacheError, Result};

// == Composite Key ==
/// Immutable cache key made of a partition name and a key string.
///
/// The default partition is the empty string. Cloning is a pair of
/// reference-count bumps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    partition: Arc<str>,
    key: Arc<str>,
}

impl CompositeKey {
    // == Constructors ==
    /// Creates a key in the default (empty) partition.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self {
            partition: Arc::from(""),
            key: key.into(),
        }
    }

    /// Creates a key in the given partition.
    pub fn partitioned(partition: impl Into<Arc<str>>, key: impl Into<Arc<str>>) -> Self {
        Self {
            partition: partition.into(),
            key: key.into(),
        }
    }

    /// Builds a key from optional parts, as received from untyped input.
    ///
    /// A missing partition means the default partition. A missing key is an
    /// [`CacheError::InvalidKey`].
    pub fn parse(key: Option<&str>, partition: Option<&str>) -> Result<Self> {
        let key = key.ok_or_else(|| CacheError::InvalidKey("key is required".to_string()))?;
        Ok(Self::partitioned(partition.unwrap_or(""), key))
    }

    // == Accessors ==
    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.partition, self.key)
    }
}
