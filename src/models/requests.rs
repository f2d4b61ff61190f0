//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::cache::CompositeKey;
use crate::error::Result;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under (required)
/// - `value`: The value to store
/// - `partition`: Optional partition (default partition if omitted)
/// - `ttl`: Optional TTL in seconds (server default if omitted, 0 = never)
/// - `sliding`: Optional sliding window in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    #[serde(default)]
    pub key: Option<String>,
    pub value: String,
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub sliding: Option<u64>,
}

impl SetRequest {
    /// Builds the composite key, failing with `InvalidKey` if `key` is missing.
    pub fn composite_key(&self) -> Result<CompositeKey> {
        CompositeKey::parse(self.key.as_deref(), self.partition.as_deref())
    }
}

/// Request body for the RENAME operation (POST /rename)
#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from_partition: Option<String>,
    #[serde(default)]
    pub to_partition: Option<String>,
}

impl RenameRequest {
    /// Returns the `(from, to)` keys, failing with `InvalidKey` if either is missing.
    pub fn composite_keys(&self) -> Result<(CompositeKey, CompositeKey)> {
        let from = CompositeKey::parse(self.from.as_deref(), self.from_partition.as_deref())?;
        let to = CompositeKey::parse(self.to.as_deref(), self.to_partition.as_deref())?;
        Ok((from, to))
    }
}

/// Query string selecting a partition (`?partition=...`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartitionQuery {
    #[serde(default)]
    pub partition: Option<String>,
}

impl PartitionQuery {
    pub fn key(&self, key: &str) -> CompositeKey {
        CompositeKey::partitioned(self.partition.as_deref().unwrap_or(""), key)
    }
}

/// Query string for GET /summary
///
/// `normalize=numbers` groups keys that differ only in their digits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default)]
    pub normalize: Option<String>,
}
