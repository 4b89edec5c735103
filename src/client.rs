//! Query client - main entry point for cache reads, writes and invalidation.

use crate::backend::{CacheBackend, CacheEntry};
use crate::builder::QueryBuilder;
use crate::config::ClientConfig;
use crate::entity::{CacheEntity, Cacheable};
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::key::CacheKey;
use crate::mutation::MutationBuilder;
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::repository::DataRepository;
use crate::resource::ResourceHandle;
use crate::serialization::{deserialize_from_cache, serialize_for_cache};
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub(crate) type SharedFetch = Shared<BoxFuture<'static, std::result::Result<Arc<Vec<u8>>, Error>>>;

/// A running fetch and the flag that stops it from writing its result.
///
/// `superseded` is set when the key is invalidated, overwritten or removed
/// while the request is out. The result then reaches the callers already
/// waiting on it but never lands in the cache.
struct InFlight {
    fetch: SharedFetch,
    superseded: Arc<AtomicBool>,
}

/// Outcome of a query binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Gated off, or never fetched: no data and no error.
    Idle,
    /// A fetch for the key is in flight.
    Loading,
    Success,
    Error,
}

/// What a query binding hands back to a view: `{ data, error, status }`.
///
/// On error, `data` still carries the last successfully cached value, if any.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<Error>,
    pub status: QueryStatus,
}

impl<T> QueryState<T> {
    /// Stable "no data yet" state of a gated query.
    pub fn idle() -> Self {
        QueryState {
            data: None,
            error: None,
            status: QueryStatus::Idle,
        }
    }

    pub fn success(data: T) -> Self {
        QueryState {
            data: Some(data),
            error: None,
            status: QueryStatus::Success,
        }
    }

    pub fn failed(error: Error, previous: Option<T>) -> Self {
        QueryState {
            data: previous,
            error: Some(error),
            status: QueryStatus::Error,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Whether the failure was a 404 / unresolved slug.
    pub fn is_not_found(&self) -> bool {
        self.error.as_ref().is_some_and(Error::is_not_found)
    }

    /// Collapse into a `Result`; an idle state yields `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

/// Per-call fetch settings; defaults come from the client's configuration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FetchOptions {
    pub retries: u32,
    pub backoff: Duration,
    pub stale_time: Duration,
}

/// Cache handle shared by every binding.
///
/// Cloning is cheap (`Arc` increments); clones share the backend, the
/// repository and the in-flight request table. Build one per test to get an
/// isolated cache.
///
/// # Example
///
/// ```ignore
/// let client = QueryClient::new(InMemoryBackend::new(), HttpRepository::new(&config)?)
///     .with_config(config);
///
/// let soils = client.resource::<Soil>().list(ListParams::new().page(1)).await;
/// ```
pub struct QueryClient<B: CacheBackend, R: DataRepository> {
    backend: Arc<B>,
    repository: Arc<R>,
    config: Arc<ClientConfig>,
    metrics: Arc<dyn CacheMetrics>,
    in_flight: Arc<DashMap<CacheKey, InFlight>>,
}

impl<B: CacheBackend, R: DataRepository> Clone for QueryClient<B, R> {
    fn clone(&self) -> Self {
        QueryClient {
            backend: Arc::clone(&self.backend),
            repository: Arc::clone(&self.repository),
            config: Arc::clone(&self.config),
            metrics: Arc::clone(&self.metrics),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<B: CacheBackend, R: DataRepository> QueryClient<B, R> {
    /// Create a client with default configuration.
    pub fn new(backend: B, repository: R) -> Self {
        QueryClient {
            backend: Arc::new(backend),
            repository: Arc::new(repository),
            config: Arc::new(ClientConfig::default()),
            metrics: Arc::new(NoOpMetrics),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: impl CacheMetrics + 'static) -> Self {
        self.metrics = Arc::new(metrics);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Typed list/detail/mutation bindings for one entity kind.
    pub fn resource<T: CacheEntity>(&self) -> ResourceHandle<'_, T, B, R> {
        ResourceHandle::new(self)
    }

    /// Mutation binding with the entity's default invalidation strategy.
    pub fn mutation<T: CacheEntity>(&self) -> MutationBuilder<'_, T, B, R> {
        MutationBuilder::new(self)
    }

    /// Builder for reads that need per-call gating, retry or stale time.
    pub fn builder(&self) -> QueryBuilder<'_, B, R> {
        QueryBuilder::new(self)
    }

    pub(crate) fn default_options(&self, key: &CacheKey) -> FetchOptions {
        FetchOptions {
            retries: self.config.read_retries,
            backoff: self.config.retry_backoff,
            stale_time: self.config.stale_policy.stale_time(key.kind()),
        }
    }

    /// Gated read returning a [`QueryState`].
    ///
    /// With `enabled == false` nothing is fetched and the idle state is
    /// returned.
    pub async fn query<V, F>(&self, key: &CacheKey, enabled: bool, fetcher: F) -> QueryState<V>
    where
        V: Cacheable,
        F: Fetcher<V>,
    {
        let options = self.default_options(key);
        self.query_with(key, enabled, fetcher, options).await
    }

    pub(crate) async fn query_with<V, F>(
        &self,
        key: &CacheKey,
        enabled: bool,
        fetcher: F,
        options: FetchOptions,
    ) -> QueryState<V>
    where
        V: Cacheable,
        F: Fetcher<V>,
    {
        if !enabled {
            debug!("Query {} disabled, not fetching", key);
            return QueryState::idle();
        }

        match self.fetch_query_with(key, fetcher, options).await {
            Ok(data) => QueryState::success(data),
            Err(error) => {
                let previous = self.get_query_data(key).await.ok().flatten();
                QueryState::failed(error, previous)
            }
        }
    }

    /// Get-or-fetch: serve a fresh entry, otherwise fetch (coalesced) and store.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error after read retries are exhausted, or a
    /// cache error if the stored entry cannot be decoded.
    pub async fn fetch_query<V, F>(&self, key: &CacheKey, fetcher: F) -> Result<V>
    where
        V: Cacheable,
        F: Fetcher<V>,
    {
        let options = self.default_options(key);
        self.fetch_query_with(key, fetcher, options).await
    }

    pub(crate) async fn fetch_query_with<V, F>(
        &self,
        key: &CacheKey,
        fetcher: F,
        options: FetchOptions,
    ) -> Result<V>
    where
        V: Cacheable,
        F: Fetcher<V>,
    {
        let timer = Instant::now();

        if let Some(entry) = self.backend.get(key).await? {
            if entry.is_fresh(options.stale_time) {
                if let Some(bytes) = entry.data.as_deref() {
                    debug!("✓ Cache hit for {}", key);
                    self.metrics.record_hit(key, timer.elapsed());
                    return deserialize_from_cache(bytes);
                }
            }
        }

        debug!("Cache miss or stale entry for {}, fetching", key);
        let shared = self.in_flight_fetch(key, fetcher, options);
        let result = shared.await;
        self.metrics.record_miss(key, timer.elapsed());

        match result {
            Ok(bytes) => deserialize_from_cache(&bytes),
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                Err(e)
            }
        }
    }

    /// Join the in-flight request for `key`, or start one.
    pub(crate) fn in_flight_fetch<V, F>(
        &self,
        key: &CacheKey,
        fetcher: F,
        options: FetchOptions,
    ) -> SharedFetch
    where
        V: Cacheable,
        F: Fetcher<V>,
    {
        self.in_flight
            .entry(key.clone())
            .or_insert_with(|| {
                let superseded = Arc::new(AtomicBool::new(false));
                let fetch = {
                    let backend = Arc::clone(&self.backend);
                    let in_flight = Arc::clone(&self.in_flight);
                    let superseded = Arc::clone(&superseded);
                    let key = key.clone();
                    async move {
                        let result = match retry_read(&key, &fetcher, options).await {
                            Ok(value) => match serialize_for_cache(&value) {
                                Ok(bytes) => {
                                    store_unless_superseded(&*backend, &key, &bytes, &superseded)
                                        .await;
                                    Ok(Arc::new(bytes))
                                }
                                Err(e) => Err(e),
                            },
                            Err(e) => {
                                if !superseded.load(Ordering::SeqCst) {
                                    if let Err(store_err) =
                                        backend.record_error(&key, e.clone()).await
                                    {
                                        warn!(
                                            "⚠ Failed to record error for {}: {}",
                                            key, store_err
                                        );
                                    }
                                }
                                Err(e)
                            }
                        };
                        in_flight.remove_if(&key, |_, running| {
                            Arc::ptr_eq(&running.superseded, &superseded)
                        });
                        result
                    }
                    .boxed()
                    .shared()
                };
                InFlight { fetch, superseded }
            })
            .fetch
            .clone()
    }

    /// Detach every in-flight fetch under `prefix` so its result is not
    /// stored and later readers start a new request.
    fn supersede(&self, prefix: &CacheKey) {
        self.in_flight.retain(|key, running| {
            if key.starts_with(prefix) {
                running.superseded.store(true, Ordering::SeqCst);
                debug!("Superseded in-flight fetch of {}", key);
                false
            } else {
                true
            }
        });
    }

    /// Whether a fetch for `key` is currently in flight.
    pub fn is_fetching(&self, key: &CacheKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Cached value for `key`, fresh or stale, without fetching.
    pub async fn get_query_data<V: Cacheable>(&self, key: &CacheKey) -> Result<Option<V>> {
        match self.backend.get(key).await? {
            Some(CacheEntry {
                data: Some(bytes), ..
            }) => deserialize_from_cache(&bytes).map(Some),
            _ => Ok(None),
        }
    }

    /// Snapshot of a key as a view would render it, without fetching.
    pub async fn snapshot<V: Cacheable>(&self, key: &CacheKey) -> Result<QueryState<V>> {
        let entry = self.backend.get(key).await?;
        let data = match entry.as_ref().and_then(|e| e.data.as_deref()) {
            Some(bytes) => Some(deserialize_from_cache(bytes)?),
            None => None,
        };
        let error = entry.and_then(|e| e.error);

        let status = if self.is_fetching(key) {
            QueryStatus::Loading
        } else if error.is_some() {
            QueryStatus::Error
        } else if data.is_some() {
            QueryStatus::Success
        } else {
            QueryStatus::Idle
        };
        Ok(QueryState {
            data,
            error,
            status,
        })
    }

    /// Overwrite `key` with a known-fresh value (optimistic set).
    pub async fn set_query_data<V: Cacheable>(&self, key: &CacheKey, value: &V) -> Result<()> {
        let bytes = serialize_for_cache(value)?;
        self.supersede(key);
        self.backend.set(key, bytes).await?;
        debug!("✓ Overwrote {}", key);
        Ok(())
    }

    /// Mark every entry under `prefix` stale; the next read of each refetches.
    pub async fn invalidate(&self, prefix: &CacheKey) -> Result<usize> {
        self.supersede(prefix);
        let matched = self.backend.invalidate(prefix).await?;
        self.metrics.record_invalidation(prefix, matched);
        debug!("✓ Invalidated {} ({} entries)", prefix, matched);
        Ok(matched)
    }

    pub async fn remove_query(&self, key: &CacheKey) -> Result<()> {
        self.supersede(key);
        self.backend.remove(key).await
    }

    /// Evict entries idle for longer than the configured `gc_time`.
    pub async fn collect_garbage(&self) -> Result<usize> {
        self.backend.collect_garbage(self.config.gc_time).await
    }
}

/// Write a fetched value unless its key changed while the request was out.
///
/// The flag is read again after the write, so an invalidation racing the
/// write leaves the entry stale rather than fresh.
async fn store_unless_superseded<B: CacheBackend>(
    backend: &B,
    key: &CacheKey,
    bytes: &[u8],
    superseded: &AtomicBool,
) {
    if superseded.load(Ordering::SeqCst) {
        debug!("Dropping superseded result for {}", key);
        return;
    }
    if let Err(e) = backend.set(key, bytes.to_vec()).await {
        warn!("⚠ Failed to store {}: {}", key, e);
        return;
    }
    if superseded.load(Ordering::SeqCst) {
        if let Err(e) = backend.invalidate(key).await {
            warn!("⚠ Failed to mark {} stale: {}", key, e);
        }
    }
}

/// Run a read, retrying transient failures with exponential backoff.
pub(crate) async fn retry_read<V, F>(key: &CacheKey, fetcher: &F, options: FetchOptions) -> Result<V>
where
    F: Fetcher<V>,
{
    let max_attempts = options.retries.saturating_add(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempts >= max_attempts || !e.is_transient() {
                    return Err(e);
                }

                warn!(
                    "⚠ Fetch of {} failed (attempt {}/{}): {}, retrying",
                    key, attempts, max_attempts, e
                );

                let delay = options
                    .backoff
                    .saturating_mul(2_u32.saturating_pow(attempts - 1));
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::entity::EntityKind;
    use crate::fetcher;
    use crate::key::ListParams;
    use crate::models::Soil;
    use crate::repository::{InMemoryRepository, Page, RepoOp};
    use std::sync::Mutex;

    fn loam() -> Soil {
        Soil {
            id: "s1".to_string(),
            slug: "loam".to_string(),
            name: "Loam".to_string(),
            soil_type: "loam".to_string(),
            ph_min: Some(6.0),
            ph_max: Some(7.0),
            drainage: Some("good".to_string()),
            description: None,
        }
    }

    fn setup() -> (QueryClient<InMemoryBackend, InMemoryRepository>, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        repo.insert(&loam()).expect("insert");
        let config = ClientConfig {
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let client = QueryClient::new(InMemoryBackend::new(), repo.clone()).with_config(config);
        (client, repo)
    }

    fn with_slow_responses(
        delay: Duration,
    ) -> (QueryClient<InMemoryBackend, InMemoryRepository>, InMemoryRepository) {
        let repo = InMemoryRepository::new().with_response_delay(delay);
        repo.insert(&loam()).expect("insert");
        (QueryClient::new(InMemoryBackend::new(), repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_without_fetch() {
        let (client, repo) = setup();
        let key = CacheKey::detail(EntityKind::Soil, "s1");

        for _ in 0..3 {
            let soil: Soil = client
                .fetch_query(&key, fetcher::detail::<Soil, _>(client.repository(), "s1"))
                .await
                .expect("Failed to fetch");
            assert_eq!(soil.slug, "loam");
        }

        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 1);
    }

    #[tokio::test]
    async fn test_invalidation_twice_refetches_once() {
        let (client, repo) = setup();
        let key = CacheKey::detail(EntityKind::Soil, "s1");
        let read = || async {
            client
                .fetch_query::<Soil, _>(&key, fetcher::detail::<Soil, _>(client.repository(), "s1"))
                .await
                .expect("Failed to fetch")
        };

        read().await;
        client
            .invalidate(&CacheKey::all(EntityKind::Soil))
            .await
            .expect("invalidate");
        client
            .invalidate(&CacheKey::all(EntityKind::Soil))
            .await
            .expect("invalidate");
        read().await;
        read().await;

        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 2);
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_request() {
        let repo = InMemoryRepository::new().with_latency(Duration::from_millis(20));
        repo.insert(&loam()).expect("insert");
        let client = QueryClient::new(InMemoryBackend::new(), repo.clone());
        let params = ListParams::new().page(1);
        let key = CacheKey::list(EntityKind::Soil, &params);

        let (a, b) = tokio::join!(
            client.fetch_query::<Page<Soil>, _>(
                &key,
                fetcher::list::<Soil, _>(client.repository(), params.clone())
            ),
            client.fetch_query::<Page<Soil>, _>(
                &key,
                fetcher::list::<Soil, _>(client.repository(), params.clone())
            ),
        );

        assert_eq!(a.expect("first").total, 1);
        assert_eq!(b.expect("second").total, 1);
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::List), 1);
        assert!(!client.is_fetching(&key));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let (client, repo) = setup();
        repo.fail_next(EntityKind::Soil, Error::Network("reset".into()))
            .expect("queue");
        repo.fail_next(
            EntityKind::Soil,
            Error::Server {
                status: 503,
                message: "unavailable".into(),
            },
        )
        .expect("queue");

        let soil: Soil = client
            .fetch_query(
                &CacheKey::detail(EntityKind::Soil, "s1"),
                fetcher::detail::<Soil, _>(client.repository(), "s1"),
            )
            .await
            .expect("retries should recover");
        assert_eq!(soil.id, "s1");
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 3);
    }

    #[tokio::test]
    async fn test_not_found_and_unauthorized_are_not_retried() {
        let (client, repo) = setup();
        let err = client
            .fetch_query::<Soil, _>(
                &CacheKey::detail(EntityKind::Soil, "missing"),
                fetcher::detail::<Soil, _>(client.repository(), "missing"),
            )
            .await
            .expect_err("missing");
        assert!(err.is_not_found());
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 1);

        repo.fail_next(EntityKind::Soil, Error::Unauthorized { status: 401 })
            .expect("queue");
        let err = client
            .fetch_query::<Soil, _>(
                &CacheKey::detail(EntityKind::Soil, "s1"),
                fetcher::detail::<Soil, _>(client.repository(), "s1"),
            )
            .await
            .expect_err("unauthorized");
        assert!(matches!(err, Error::Unauthorized { status: 401 }));
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 2);
    }

    #[tokio::test]
    async fn test_disabled_query_is_idle_and_does_not_fetch() {
        let (client, repo) = setup();
        let state: QueryState<Soil> = client
            .query(
                &CacheKey::detail(EntityKind::Soil, ""),
                false,
                fetcher::detail::<Soil, _>(client.repository(), ""),
            )
            .await;

        assert!(state.is_idle());
        assert!(state.data.is_none());
        assert!(state.error.is_none());
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 0);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_data() {
        let (client, repo) = setup();
        let key = CacheKey::detail(EntityKind::Soil, "s1");
        let fetch = || fetcher::detail::<Soil, _>(client.repository(), "s1");

        assert!(client.query::<Soil, _>(&key, true, fetch()).await.is_success());
        client.invalidate(&key).await.expect("invalidate");
        repo.fail_next(EntityKind::Soil, Error::from_status(400, ""))
            .expect("queue");

        let state = client.query::<Soil, _>(&key, true, fetch()).await;
        assert!(state.is_error());
        assert_eq!(state.data.expect("previous data").slug, "loam");

        let snapshot: QueryState<Soil> = client.snapshot(&key).await.expect("snapshot");
        assert!(snapshot.is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_go_stale_after_stale_time() {
        let (client, repo) = setup();
        let key = CacheKey::detail(EntityKind::Soil, "s1");
        let fetch = || fetcher::detail::<Soil, _>(client.repository(), "s1");

        client.fetch_query::<Soil, _>(&key, fetch()).await.expect("fetch");
        tokio::time::advance(Duration::from_secs(10)).await;
        client.fetch_query::<Soil, _>(&key, fetch()).await.expect("fetch");
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        client.fetch_query::<Soil, _>(&key, fetch()).await.expect("fetch");
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_detaches_in_flight_fetch() {
        let (client, repo) = with_slow_responses(Duration::from_millis(50));
        let key = CacheKey::detail(EntityKind::Soil, "s1");
        let fetch = || fetcher::detail::<Soil, _>(client.repository(), "s1");

        let (early, late) = tokio::join!(client.fetch_query::<Soil, _>(&key, fetch()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            repo.insert(&Soil {
                name: "Sandy loam".to_string(),
                ..loam()
            })
            .expect("insert");
            client
                .invalidate(&CacheKey::all(EntityKind::Soil))
                .await
                .expect("invalidate");
            assert!(!client.is_fetching(&key));
            client.fetch_query::<Soil, _>(&key, fetch()).await
        });

        assert_eq!(early.expect("early read").name, "Loam");
        assert_eq!(late.expect("late read").name, "Sandy loam");
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 2);

        let cached: Soil = client.fetch_query(&key, fetch()).await.expect("cached");
        assert_eq!(cached.name, "Sandy loam");
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_during_fetch_is_kept() {
        let (client, repo) = with_slow_responses(Duration::from_millis(50));
        let key = CacheKey::detail(EntityKind::Soil, "s1");
        let fetch = || fetcher::detail::<Soil, _>(client.repository(), "s1");
        let updated = Soil {
            name: "Silty loam".to_string(),
            ..loam()
        };

        let (read, ()) = tokio::join!(client.fetch_query::<Soil, _>(&key, fetch()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            client.set_query_data(&key, &updated).await.expect("overwrite");
        });
        assert_eq!(read.expect("read").name, "Loam");

        let cached: Soil = client.fetch_query(&key, fetch()).await.expect("cached");
        assert_eq!(cached, updated);
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 1);
    }

    #[tokio::test]
    async fn test_max_retry_setting_does_not_overflow() {
        let (client, repo) = setup();
        let client = client.with_config(ClientConfig {
            read_retries: u32::MAX,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        });
        repo.fail_next(EntityKind::Soil, Error::Network("reset".into()))
            .expect("queue");

        let soil: Soil = client
            .fetch_query(
                &CacheKey::detail(EntityKind::Soil, "s1"),
                fetcher::detail::<Soil, _>(client.repository(), "s1"),
            )
            .await
            .expect("recovers");
        assert_eq!(soil.id, "s1");
        assert_eq!(repo.calls(EntityKind::Soil, RepoOp::Get), 2);
    }

    #[tokio::test]
    async fn test_with_custom_metrics() {
        #[derive(Clone, Default)]
        struct TestMetrics {
            hits: Arc<Mutex<usize>>,
            misses: Arc<Mutex<usize>>,
            invalidated: Arc<Mutex<usize>>,
        }

        impl CacheMetrics for TestMetrics {
            fn record_hit(&self, _key: &CacheKey, _duration: Duration) {
                *self.hits.lock().expect("Failed to lock hits") += 1;
            }

            fn record_miss(&self, _key: &CacheKey, _duration: Duration) {
                *self.misses.lock().expect("Failed to lock misses") += 1;
            }

            fn record_invalidation(&self, _prefix: &CacheKey, matched: usize) {
                *self.invalidated.lock().expect("Failed to lock invalidated") += matched;
            }
        }

        let metrics = TestMetrics::default();
        let (client, _repo) = setup();
        let client = client.with_metrics(metrics.clone());
        let key = CacheKey::detail(EntityKind::Soil, "s1");

        for _ in 0..2 {
            client
                .fetch_query::<Soil, _>(&key, fetcher::detail::<Soil, _>(client.repository(), "s1"))
                .await
                .expect("fetch");
        }
        client
            .invalidate(&CacheKey::all(EntityKind::Soil))
            .await
            .expect("invalidate");

        assert_eq!(*metrics.misses.lock().expect("lock"), 1);
        assert_eq!(*metrics.hits.lock().expect("lock"), 1);
        assert_eq!(*metrics.invalidated.lock().expect("lock"), 1);
    }
}
