//! Cache Summary Module
//!
//! Read-only aggregation over live entries, grouped by a normalized key.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::cache::entry::{ms_to_datetime, CacheEntry};

/// Maps a raw key to its bucket name; `None` leaves the entry out.
pub type KeyNormalizer<'a> = &'a dyn Fn(&str) -> Option<String>;

// == Bucket Summary ==
/// Aggregate stats for the live entries that normalized to one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketSummary {
    pub count: usize,
    pub total_access_count: u64,
    /// Latest deadline in the bucket (Unix ms, `u64::MAX` = never)
    pub max_expiration: u64,
}

impl BucketSummary {
    pub(crate) fn from_entry<V>(entry: &CacheEntry<V>) -> Self {
        Self {
            count: 1,
            total_access_count: entry.access_count(),
            max_expiration: entry.expires_at_ms(),
        }
    }

    pub(crate) fn add<V>(&mut self, entry: &CacheEntry<V>) {
        self.count += 1;
        self.total_access_count += entry.access_count();
        self.max_expiration = self.max_expiration.max(entry.expires_at_ms());
    }

    /// Latest deadline as a timestamp, `None` if some entry never expires.
    pub fn max_expiration_at(&self) -> Option<DateTime<Utc>> {
        ms_to_datetime(self.max_expiration)
    }
}

impl fmt::Display for BucketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Count: {}, TotalAccessCount: {}, MaxExpiration: ",
            self.count, self.total_access_count
        )?;
        match self.max_expiration_at() {
            Some(at) => write!(f, "{}", at.to_rfc3339()),
            None => write!(f, "never"),
        }
    }
}

// == Summary ==
/// Result of [`CacheStore::summarize`](crate::cache::CacheStore::summarize).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Expired, not yet swept entries that were skipped
    pub expired: usize,
    pub buckets: HashMap<String, BucketSummary>,
}

impl Summary {
    pub(crate) fn record<V>(&mut self, bucket: String, entry: &CacheEntry<V>) {
        self.buckets
            .entry(bucket)
            .and_modify(|existing| existing.add(entry))
            .or_insert_with(|| BucketSummary::from_entry(entry));
    }

    pub fn bucket(&self, name: &str) -> Option<&BucketSummary> {
        self.buckets.get(name)
    }

    /// Number of live entries across all buckets.
    pub fn live(&self) -> usize {
        self.buckets.values().map(|b| b.count).sum()
    }
}

// == Normalizers ==
/// Replaces every run of digits with `#`, so `req12` and `req7` share the
/// bucket `req#`.
pub fn replace_numbers(key: &str) -> Option<String> {
    static DIGITS: OnceLock<Option<Regex>> = OnceLock::new();
    match DIGITS.get_or_init(|| Regex::new(r"\d+").ok()) {
        Some(digits) => Some(digits.replace_all(key, "#").into_owned()),
        None => Some(key.to_string()),
    }
}
