//! Cache backend trait and implementations.

mod inmemory;

pub use inmemory::InMemoryBackend;

use crate::error::{Error, Result};
use crate::key::CacheKey;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Stored state of one cache key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Envelope bytes of the last successful fetch or overwrite.
    pub data: Option<Vec<u8>>,
    /// When `data` was written.
    pub updated_at: Option<Instant>,
    /// Last read or write, used for garbage collection.
    pub touched_at: Instant,
    /// Set by invalidation, cleared by the next write.
    pub stale: bool,
    /// Error of the most recent failed fetch, cleared by the next write.
    pub error: Option<Error>,
    /// Number of writes since the entry was created.
    pub write_count: u32,
}

impl CacheEntry {
    pub(crate) fn empty(now: Instant) -> Self {
        CacheEntry {
            data: None,
            updated_at: None,
            touched_at: now,
            stale: false,
            error: None,
            write_count: 0,
        }
    }

    /// Data present, not invalidated, and younger than `stale_time`.
    pub fn is_fresh(&self, stale_time: Duration) -> bool {
        match (&self.data, self.updated_at) {
            (Some(_), Some(updated_at)) => !self.stale && updated_at.elapsed() < stale_time,
            _ => false,
        }
    }
}

/// Key-addressed store behind the query client.
///
/// Implementations must make `invalidate` idempotent: it only flags entries,
/// it never drops their data.
pub trait CacheBackend: Send + Sync + 'static {
    /// Read an entry, refreshing its `touched_at`.
    fn get(&self, key: &CacheKey) -> impl Future<Output = Result<Option<CacheEntry>>> + Send;

    /// Store fresh data, clearing the stale flag and any recorded error.
    fn set(&self, key: &CacheKey, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Record a failed fetch without touching existing data.
    fn record_error(&self, key: &CacheKey, error: Error)
        -> impl Future<Output = Result<()>> + Send;

    /// Mark every entry under `prefix` stale; returns how many matched.
    fn invalidate(&self, prefix: &CacheKey) -> impl Future<Output = Result<usize>> + Send;

    fn remove(&self, key: &CacheKey) -> impl Future<Output = Result<()>> + Send;

    fn keys(&self) -> impl Future<Output = Result<Vec<CacheKey>>> + Send;

    /// Evict entries not touched within `max_idle`; returns how many were dropped.
    fn collect_garbage(&self, max_idle: Duration) -> impl Future<Output = Result<usize>> + Send;

    fn clear_all(&self) -> impl Future<Output = Result<()>> + Send;
}
