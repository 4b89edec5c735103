//! Cursor-paginated ("load more") queries for the media library.

use crate::backend::CacheBackend;
use crate::client::QueryClient;
use crate::entity::CacheEntity;
use crate::error::Result;
use crate::fetcher;
use crate::key::{CacheKey, ListParams};
use crate::repository::{CursorPage, DataRepository};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Every page fetched so far, in fetch order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfinitePages<T> {
    pub pages: Vec<CursorPage<T>>,
}

impl<T> Default for InfinitePages<T> {
    fn default() -> Self {
        InfinitePages { pages: Vec::new() }
    }
}

impl<T> InfinitePages<T> {
    /// Cursor for the next fetch: `None` before the first page.
    pub fn next_cursor(&self) -> Option<&str> {
        self.pages.last().and_then(|p| p.next_cursor.as_deref())
    }

    /// True until a page reports `next_cursor = None`.
    pub fn has_next_page(&self) -> bool {
        match self.pages.last() {
            Some(page) => page.next_cursor.is_some(),
            None => true,
        }
    }

    /// Items of every page, concatenated without reordering or dedup.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Infinite query under `[kind, "infinite", params]`.
///
/// Pages are stored as one [`InfinitePages`] value. Invalidating `all(kind)`
/// marks it stale, and the next `fetch_next_page` starts over from the first
/// page.
pub struct InfiniteQuery<'a, T, B, R>
where
    T: CacheEntity,
    B: CacheBackend,
    R: DataRepository,
{
    client: &'a QueryClient<B, R>,
    params: ListParams,
    key: CacheKey,
    _entity: PhantomData<T>,
}

impl<'a, T, B, R> InfiniteQuery<'a, T, B, R>
where
    T: CacheEntity,
    B: CacheBackend,
    R: DataRepository,
{
    pub fn new(client: &'a QueryClient<B, R>, params: ListParams) -> Self {
        let key = CacheKey::infinite(T::KIND, &params);
        InfiniteQuery {
            client,
            params,
            key,
            _entity: PhantomData,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Pages fetched so far. A stale set is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns a cache error if the stored pages cannot be decoded.
    pub async fn pages(&self) -> Result<InfinitePages<T>> {
        Ok(self
            .client
            .get_query_data::<InfinitePages<T>>(&self.key)
            .await?
            .unwrap_or_default())
    }

    pub async fn has_next_page(&self) -> Result<bool> {
        Ok(self.current().await?.has_next_page())
    }

    /// Fetch one more page.
    ///
    /// Returns `Ok(false)` without fetching once the last page reported no
    /// next cursor. Concurrent calls share one request. A page that lands
    /// after the pages were invalidated is not stored.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after read retries; stored pages are kept.
    pub async fn fetch_next_page(&self) -> Result<bool> {
        let pages = self.current().await?;
        if !pages.has_next_page() {
            debug!("No further pages for {}", self.key);
            return Ok(false);
        }

        debug!(
            "Fetching page {} of {} (cursor {:?})",
            pages.pages.len() + 1,
            self.key,
            pages.next_cursor()
        );

        let fetch =
            fetcher::next_page::<T, _>(self.client.repository(), self.params.clone(), pages);
        let options = self.client.default_options(&self.key);
        self.client
            .in_flight_fetch::<InfinitePages<T>, _>(&self.key, fetch, options)
            .await?;
        Ok(true)
    }

    /// Fetch pages until the last one reports no next cursor.
    pub async fn fetch_all(&self) -> Result<InfinitePages<T>> {
        while self.fetch_next_page().await? {}
        self.pages().await
    }

    /// Stored pages, or an empty set when there are none or they are stale.
    async fn current(&self) -> Result<InfinitePages<T>> {
        let stale_time = self.client.default_options(&self.key).stale_time;
        match self.client.backend().get(&self.key).await? {
            Some(entry) if entry.is_fresh(stale_time) => self.pages().await,
            _ => Ok(InfinitePages::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::entity::EntityKind;
    use crate::models::Media;
    use crate::repository::{InMemoryRepository, RepoOp};
    use std::time::Duration;

    fn photo(i: usize) -> Media {
        Media {
            id: format!("m{i}"),
            url: format!("https://cdn.example.com/m{i}.jpg"),
            filename: format!("m{i}.jpg"),
            mime_type: "image/jpeg".to_string(),
            size_bytes: 1024,
            alt: None,
            created_at: None,
        }
    }

    fn setup(count: usize) -> (QueryClient<InMemoryBackend, InMemoryRepository>, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        for i in 0..count {
            repo.insert(&photo(i)).expect("insert");
        }
        (QueryClient::new(InMemoryBackend::new(), repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_pages_accumulate_in_order() {
        let (client, _repo) = setup(5);
        let query = InfiniteQuery::<Media, _, _>::new(&client, ListParams::new().limit(2));

        assert!(query.fetch_next_page().await.expect("page 1"));
        assert!(query.fetch_next_page().await.expect("page 2"));

        let pages = query.pages().await.expect("pages");
        assert_eq!(pages.pages.len(), 2);
        let ids: Vec<_> = pages.items().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2", "m3"]);
        assert!(pages.has_next_page());
    }

    #[tokio::test]
    async fn test_load_more_after_null_cursor_does_not_fetch() {
        let (client, repo) = setup(3);
        let query = InfiniteQuery::<Media, _, _>::new(&client, ListParams::new().limit(2));

        let all = query.fetch_all().await.expect("fetch all");
        assert_eq!(all.len(), 3);
        assert_eq!(repo.calls(EntityKind::Media, RepoOp::CursorPage), 2);

        for _ in 0..3 {
            assert!(!query.fetch_next_page().await.expect("load more"));
        }
        assert!(!query.has_next_page().await.expect("has next"));
        assert_eq!(repo.calls(EntityKind::Media, RepoOp::CursorPage), 2);
    }

    #[tokio::test]
    async fn test_invalidation_restarts_from_first_page() {
        let (client, repo) = setup(5);
        let query = InfiniteQuery::<Media, _, _>::new(&client, ListParams::new().limit(2));
        query.fetch_next_page().await.expect("page 1");
        query.fetch_next_page().await.expect("page 2");

        client
            .invalidate(&CacheKey::all(EntityKind::Media))
            .await
            .expect("invalidate");
        query.fetch_next_page().await.expect("restart");

        let pages = query.pages().await.expect("pages");
        assert_eq!(pages.pages.len(), 1);
        assert_eq!(pages.items().next().map(|m| m.id.as_str()), Some("m0"));
        assert_eq!(repo.calls(EntityKind::Media, RepoOp::CursorPage), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_load_more_fetches_once() {
        let repo = InMemoryRepository::new().with_latency(Duration::from_millis(20));
        for i in 0..5 {
            repo.insert(&photo(i)).expect("insert");
        }
        let client = QueryClient::new(InMemoryBackend::new(), repo.clone());
        let query = InfiniteQuery::<Media, _, _>::new(&client, ListParams::new().limit(2));

        let (a, b) = tokio::join!(query.fetch_next_page(), query.fetch_next_page());
        assert!(a.expect("first caller"));
        assert!(b.expect("second caller"));

        let pages = query.pages().await.expect("pages");
        assert_eq!(pages.pages.len(), 1);
        assert_eq!(pages.len(), 2);
        assert_eq!(repo.calls(EntityKind::Media, RepoOp::CursorPage), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_during_page_fetch_restarts() {
        let repo = InMemoryRepository::new().with_response_delay(Duration::from_millis(50));
        for i in 0..5 {
            repo.insert(&photo(i)).expect("insert");
        }
        let client = QueryClient::new(InMemoryBackend::new(), repo.clone());
        let query = InfiniteQuery::<Media, _, _>::new(&client, ListParams::new().limit(2));
        query.fetch_next_page().await.expect("page 1");

        let (loaded, ()) = tokio::join!(query.fetch_next_page(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            client
                .invalidate(&CacheKey::all(EntityKind::Media))
                .await
                .expect("invalidate");
        });
        assert!(loaded.expect("page 2"));

        query.fetch_next_page().await.expect("restart");
        let pages = query.pages().await.expect("pages");
        assert_eq!(pages.pages.len(), 1);
        assert_eq!(pages.items().next().map(|m| m.id.as_str()), Some("m0"));
        assert_eq!(repo.calls(EntityKind::Media, RepoOp::CursorPage), 3);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_previous_pages() {
        let (client, repo) = setup(5);
        let client = client.with_config(crate::ClientConfig {
            read_retries: 0,
            ..Default::default()
        });
        let query = InfiniteQuery::<Media, _, _>::new(&client, ListParams::new().limit(2));
        query.fetch_next_page().await.expect("page 1");

        repo.fail_next(
            EntityKind::Media,
            crate::Error::Server {
                status: 502,
                message: "bad gateway".into(),
            },
        )
        .expect("queue");
        assert!(query.fetch_next_page().await.is_err());
        assert_eq!(query.pages().await.expect("pages").pages.len(), 1);
    }
}
