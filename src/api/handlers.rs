//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::debug;

use crate::cache::summary::replace_numbers;
use crate::cache::{CacheStore, Expiration, KeyNormalizer};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, PartitionQuery, RenameRequest,
    RenameResponse, SetRequest, SetResponse, StatsResponse, SummaryQuery, SummaryResponse,
    SweepResponse,
};

/// Application state shared across all handlers.
///
/// The store synchronizes internally, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheStore<String>>,
    /// TTL applied to sets that carry none
    pub default_ttl: Duration,
}

impl AppState {
    /// Creates a new AppState around the given cache store.
    pub fn new(cache: CacheStore<String>, default_ttl: Duration) -> Self {
        Self {
            cache: Arc::new(cache),
            default_ttl,
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        let cache = CacheStore::new(config.cache_options());
        Self::new(cache, Duration::from_secs(config.default_ttl))
    }

    fn ensure_live(&self) -> Result<()> {
        if self.cache.is_disposed() {
            return Err(CacheError::Disposed);
        }
        Ok(())
    }
}

/// Handler for PUT /set
///
/// Stores a value with optional partition, TTL and sliding window.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let key = req.composite_key()?;
    state.ensure_live()?;

    let ttl = req.ttl.map_or(state.default_ttl, Duration::from_secs);
    let expiration = if ttl.is_zero() {
        Expiration::Never
    } else {
        Expiration::After(ttl)
    };
    let sliding = Duration::from_secs(req.sliding.unwrap_or(0));

    state
        .cache
        .set_with_sliding(key.clone(), req.value, expiration, sliding);

    Ok(Json(SetResponse::new(&key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PartitionQuery>,
) -> Result<Json<GetResponse>> {
    let key = query.key(&key);
    let value = state
        .cache
        .get(&key)
        .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

    Ok(Json(GetResponse::new(&key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PartitionQuery>,
) -> Result<Json<DeleteResponse>> {
    state.ensure_live()?;
    let key = query.key(&key);
    if !state.cache.remove(&key) {
        return Err(CacheError::NotFound(key.to_string()));
    }

    Ok(Json(DeleteResponse::new(&key)))
}

/// Handler for POST /rename
pub async fn rename_handler(
    State(state): State<AppState>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<RenameResponse>> {
    let (from, to) = req.composite_keys()?;
    state.ensure_live()?;

    let moved = state.cache.rename(&from, &to);
    debug!("Rename '{}' -> '{}': moved={}", from, to, moved);

    Ok(Json(RenameResponse { moved }))
}

/// Handler for POST /sweep
///
/// Runs an expiration sweep now; 409 if one is already running.
pub async fn sweep_handler(State(state): State<AppState>) -> Result<Json<SweepResponse>> {
    let removed = state.cache.scan_for_expired().await.into_result()?;
    Ok(Json(SweepResponse { removed }))
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    state.ensure_live()?;
    let cleared = state.cache.count();
    state.cache.clear();

    Ok(Json(ClearResponse::new(cleared)))
}

/// Handler for GET /summary
///
/// Supported `normalize` values: `numbers`.
pub async fn summary_handler(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>> {
    let normalizer: Option<KeyNormalizer<'_>> = match query.normalize.as_deref() {
        None => None,
        Some("numbers") => Some(&replace_numbers),
        Some(other) => {
            return Err(CacheError::InvalidRequest(format!(
                "Unknown normalizer '{}'",
                other
            )))
        }
    };

    let summary = state
        .cache
        .summarize(normalizer, query.partition.as_deref());
    Ok(Json(SummaryResponse::from(summary)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.count(),
        state.cache.last_sweep(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
