//! Metrics hooks and freshness policy.

use crate::entity::EntityKind;
use crate::key::CacheKey;
use std::collections::HashMap;
use std::time::Duration;

/// Trait for recording cache activity.
///
/// All methods default to no-ops so implementations only override what they
/// export.
pub trait CacheMetrics: Send + Sync {
    /// A read was served from a fresh cache entry.
    fn record_hit(&self, _key: &CacheKey, _duration: Duration) {}

    /// A read had to go to the remote API.
    fn record_miss(&self, _key: &CacheKey, _duration: Duration) {}

    /// A prefix was invalidated, flagging `matched` entries.
    fn record_invalidation(&self, _prefix: &CacheKey, _matched: usize) {}

    fn record_error(&self, _key: &CacheKey, _error: &str) {}
}

/// Default metrics sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {}

/// How long a fetched value is served before the next read refetches it.
#[derive(Clone, Debug)]
pub enum StalePolicy {
    /// Same stale time for every kind.
    Fixed(Duration),

    /// Per-kind stale times with a fallback.
    PerKind {
        default: Duration,
        overrides: HashMap<EntityKind, Duration>,
    },
}

impl Default for StalePolicy {
    fn default() -> Self {
        StalePolicy::Fixed(Duration::from_secs(30))
    }
}

impl StalePolicy {
    pub fn stale_time(&self, kind: EntityKind) -> Duration {
        match self {
            StalePolicy::Fixed(duration) => *duration,
            StalePolicy::PerKind { default, overrides } => {
                overrides.get(&kind).copied().unwrap_or(*default)
            }
        }
    }
}
