//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;

use serde::Serialize;

use crate::cache::{BucketSummary, CompositeKey, Summary, SweepStatus};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub partition: String,
    pub value: String,
}

impl GetResponse {
    pub fn new(key: &CompositeKey, value: impl Into<String>) -> Self {
        Self {
            key: key.key().to_string(),
            partition: key.partition().to_string(),
            value: value.into(),
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    pub key: String,
    pub partition: String,
}

impl SetResponse {
    pub fn new(key: &CompositeKey) -> Self {
        Self {
            message: format!("Key '{}' set successfully", key.key()),
            key: key.key().to_string(),
            partition: key.partition().to_string(),
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub key: String,
    pub partition: String,
}

impl DeleteResponse {
    pub fn new(key: &CompositeKey) -> Self {
        Self {
            message: format!("Key '{}' deleted successfully", key.key()),
            key: key.key().to_string(),
            partition: key.partition().to_string(),
        }
    }
}

/// Response body for POST /rename
#[derive(Debug, Clone, Serialize)]
pub struct RenameResponse {
    /// Whether a live entry was moved
    pub moved: bool,
}

/// Response body for POST /sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub removed: usize,
}

/// Response body for DELETE /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    /// Entries dropped by the clear
    pub cleared: usize,
}

impl ClearResponse {
    pub fn new(cleared: usize) -> Self {
        Self {
            message: format!("Cleared {} entries", cleared),
            cleared,
        }
    }
}

/// One bucket in GET /summary
#[derive(Debug, Clone, Serialize)]
pub struct BucketResponse {
    pub count: usize,
    pub total_access_count: u64,
    /// RFC 3339 timestamp, `null` when an entry never expires
    pub max_expiration: Option<String>,
}

impl From<&BucketSummary> for BucketResponse {
    fn from(bucket: &BucketSummary) -> Self {
        Self {
            count: bucket.count,
            total_access_count: bucket.total_access_count,
            max_expiration: bucket.max_expiration_at().map(|at| at.to_rfc3339()),
        }
    }
}

/// Response body for GET /summary
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    /// Expired entries still awaiting a sweep
    pub expired: usize,
    pub buckets: HashMap<String, BucketResponse>,
}

impl From<Summary> for SummaryResponse {
    fn from(summary: Summary) -> Self {
        Self {
            expired: summary.expired,
            buckets: summary
                .buckets
                .iter()
                .map(|(name, bucket)| (name.clone(), BucketResponse::from(bucket)))
                .collect(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Table size, including expired entries not yet swept
    pub count: usize,
    /// When the last sweep started (RFC 3339)
    pub last_sweep: Option<String>,
    pub sweep_in_progress: bool,
    pub last_sweep_duration_ms: u64,
}

impl StatsResponse {
    pub fn new(count: usize, sweep: SweepStatus) -> Self {
        Self {
            count,
            last_sweep: sweep.started_at.map(|at| at.to_rfc3339()),
            sweep_in_progress: sweep.in_progress,
            last_sweep_duration_ms: u64::try_from(sweep.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
