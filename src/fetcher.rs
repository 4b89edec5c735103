//! Fetcher adapters: one remote call bound behind a zero-argument thunk.
//!
//! Each adapter owns what it needs (`Arc` of the repository, owned params) so
//! the thunk is `'static` and can be shared by coalesced readers and called
//! again on retry. Adapters never catch errors.

use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use crate::infinite::InfinitePages;
use crate::key::ListParams;
use crate::repository::{CursorPage, DataRepository, Page};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

/// Future produced by a fetcher.
pub type FetchFuture<V> = BoxFuture<'static, Result<V>>;

/// A repeatable zero-argument remote call.
pub trait Fetcher<V>: Fn() -> FetchFuture<V> + Send + Sync + 'static {}

impl<V, F> Fetcher<V> for F where F: Fn() -> FetchFuture<V> + Send + Sync + 'static {}

/// `GET /{kind}?{params}`
pub fn list<T, R>(repository: &Arc<R>, params: ListParams) -> impl Fetcher<Page<T>>
where
    T: CacheEntity,
    R: DataRepository,
{
    let repository = Arc::clone(repository);
    move || {
        let repository = Arc::clone(&repository);
        let params = params.clone();
        async move { repository.fetch_list::<T>(&params).await }.boxed()
    }
}

/// `GET /{kind}/{id}`
pub fn detail<T, R>(repository: &Arc<R>, id: impl Into<String>) -> impl Fetcher<T>
where
    T: CacheEntity,
    R: DataRepository,
{
    by_id_or_slug(repository, id)
}

/// `GET /{kind}/{idOrSlug}`
pub fn by_id_or_slug<T, R>(repository: &Arc<R>, id_or_slug: impl Into<String>) -> impl Fetcher<T>
where
    T: CacheEntity,
    R: DataRepository,
{
    let repository = Arc::clone(repository);
    let id_or_slug = id_or_slug.into();
    move || {
        let repository = Arc::clone(&repository);
        let id_or_slug = id_or_slug.clone();
        async move { repository.fetch_one::<T>(&id_or_slug).await }.boxed()
    }
}

/// `GET /{kind}?slug={slug}&limit=1`, resolved to the matching record's id.
///
/// Fails with `Error::NotFound` when no record carries the slug.
pub fn slug_lookup<T, R>(repository: &Arc<R>, slug: impl Into<String>) -> impl Fetcher<String>
where
    T: CacheEntity,
    R: DataRepository,
{
    let repository = Arc::clone(repository);
    let slug = slug.into();
    move || {
        let repository = Arc::clone(&repository);
        let slug = slug.clone();
        async move {
            let params = ListParams::new().filter("slug", slug.as_str()).limit(1);
            let page = repository.fetch_list::<T>(&params).await?;
            page.items
                .iter()
                .find(|item| item.slug() == Some(slug.as_str()))
                .map(|item| item.entity_id().to_string())
                .ok_or_else(|| Error::NotFound(format!("{} with slug '{}'", T::KIND, slug)))
        }
        .boxed()
    }
}

/// `GET /{kind}?{params}&cursor={cursor}`
pub fn cursor_page<T, R>(
    repository: &Arc<R>,
    params: ListParams,
    cursor: Option<String>,
) -> impl Fetcher<CursorPage<T>>
where
    T: CacheEntity,
    R: DataRepository,
{
    let repository = Arc::clone(repository);
    move || {
        let repository = Arc::clone(&repository);
        let params = params.clone();
        let cursor = cursor.clone();
        async move {
            repository
                .fetch_cursor_page::<T>(&params, cursor.as_deref())
                .await
        }
        .boxed()
    }
}

/// The page after `pages`, appended to them.
///
/// Starts from the first page when `pages` is empty.
pub fn next_page<T, R>(
    repository: &Arc<R>,
    params: ListParams,
    pages: InfinitePages<T>,
) -> impl Fetcher<InfinitePages<T>>
where
    T: CacheEntity,
    R: DataRepository,
{
    let cursor = pages.next_cursor().map(str::to_string);
    let fetch_page = cursor_page::<T, R>(repository, params, cursor);
    move || {
        let page = fetch_page();
        let mut pages = pages.clone();
        async move {
            pages.pages.push(page.await?);
            Ok(pages)
        }
        .boxed()
    }
}
