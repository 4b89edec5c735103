//! Builder pattern for reads with per-call settings.

use crate::backend::CacheBackend;
use crate::client::{QueryClient, QueryState};
use crate::entity::Cacheable;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::key::CacheKey;
use crate::repository::DataRepository;
use std::time::Duration;

/// Fluent builder for reads that need gating, retry or stale-time overrides.
///
/// # Example
///
/// ```ignore
/// let state = client
///     .builder()
///     .enabled(!id.is_empty())
///     .with_stale_time(Duration::from_secs(300))
///     .with_retry(1)
///     .query(&CacheKey::detail(EntityKind::Soil, id), fetcher::detail::<Soil, _>(client.repository(), id))
///     .await;
/// ```
pub struct QueryBuilder<'a, B: CacheBackend, R: DataRepository> {
    client: &'a QueryClient<B, R>,
    enabled: bool,
    retry_count: Option<u32>,
    stale_time: Option<Duration>,
}

impl<'a, B: CacheBackend, R: DataRepository> QueryBuilder<'a, B, R> {
    /// Create a new builder with the client's defaults.
    pub(crate) fn new(client: &'a QueryClient<B, R>) -> Self {
        Self {
            client,
            enabled: true,
            retry_count: None,
            stale_time: None,
        }
    }

    /// Gate the read. A disabled read never reaches the fetcher.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Override how many times transient failures are retried.
    pub fn with_retry(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Override how long a fetched value is served before refetching.
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Execute as a query binding.
    pub async fn query<V, F>(self, key: &CacheKey, fetcher: F) -> QueryState<V>
    where
        V: Cacheable,
        F: Fetcher<V>,
    {
        let mut options = self.client.default_options(key);
        if let Some(retries) = self.retry_count {
            options.retries = retries;
        }
        if let Some(stale_time) = self.stale_time {
            options.stale_time = stale_time;
        }
        self.client
            .query_with(key, self.enabled, fetcher, options)
            .await
    }

    /// Execute and return the value; a disabled read yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after retries are exhausted.
    pub async fn fetch<V, F>(self, key: &CacheKey, fetcher: F) -> Result<Option<V>>
    where
        V: Cacheable,
        F: Fetcher<V>,
    {
        self.query(key, fetcher).await.into_result()
    }
}
