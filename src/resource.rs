//! Typed per-entity bindings over the query client.

use crate::backend::CacheBackend;
use crate::client::{retry_read, QueryClient, QueryState};
use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use crate::fetcher;
use crate::infinite::InfiniteQuery;
use crate::key::{CacheKey, ListParams};
use crate::models::Validate;
use crate::mutation::MutationBuilder;
use crate::repository::{DataRepository, Page};
use crate::slug::SlugResolver;
use serde::Serialize;
use std::marker::PhantomData;

/// List, detail, slug and mutation bindings for entity type `T`.
///
/// ```ignore
/// let soils = client.resource::<Soil>();
/// let page = soils.list(ListParams::new().filter("type", "clay")).await;
/// let loam = soils.by_slug(Some("loam")).await;
/// soils.update(&id, &SoilInput::new("loam", "Loam", "loam")).await?;
/// ```
pub struct ResourceHandle<'a, T, B, R>
where
    T: CacheEntity,
    B: CacheBackend,
    R: DataRepository,
{
    client: &'a QueryClient<B, R>,
    _entity: PhantomData<T>,
}

impl<'a, T, B, R> ResourceHandle<'a, T, B, R>
where
    T: CacheEntity,
    B: CacheBackend,
    R: DataRepository,
{
    pub(crate) fn new(client: &'a QueryClient<B, R>) -> Self {
        ResourceHandle {
            client,
            _entity: PhantomData,
        }
    }

    /// Key for every cached entry of this kind.
    pub fn all_key(&self) -> CacheKey {
        CacheKey::all(T::KIND)
    }

    /// List binding. Always enabled; the params are part of the key.
    pub async fn list(&self, params: ListParams) -> QueryState<Page<T>> {
        let key = CacheKey::list(T::KIND, &params);
        self.client
            .query::<Page<T>, _>(&key, true, fetcher::list::<T, _>(self.client.repository(), params))
            .await
    }

    /// # Errors
    ///
    /// Returns the list fetch error after read retries.
    pub async fn fetch_list(&self, params: ListParams) -> Result<Page<T>> {
        let key = CacheKey::list(T::KIND, &params);
        self.client
            .fetch_query::<Page<T>, _>(&key, fetcher::list::<T, _>(self.client.repository(), params))
            .await
    }

    /// Detail binding, gated on a non-blank id.
    pub async fn detail(&self, id: Option<&str>) -> QueryState<T> {
        let id = id.map(str::trim).filter(|id| !id.is_empty());
        let key = CacheKey::detail(T::KIND, id.unwrap_or_default());
        self.client
            .query::<T, _>(
                &key,
                id.is_some(),
                fetcher::detail::<T, _>(self.client.repository(), id.unwrap_or_default()),
            )
            .await
    }

    /// # Errors
    ///
    /// `Error::ValidationError` for a blank id (nothing is fetched), otherwise
    /// the detail fetch error.
    pub async fn fetch_detail(&self, id: &str) -> Result<T> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::ValidationError(format!(
                "{} detail requested without an id",
                T::KIND
            )));
        }
        let key = CacheKey::detail(T::KIND, id);
        self.client
            .fetch_query::<T, _>(&key, fetcher::detail::<T, _>(self.client.repository(), id))
            .await
    }

    /// Detail addressed by id or slug in a single request
    /// (`GET /{kind}/{idOrSlug}`).
    ///
    /// The argument may be either, so it is never used as a cache key: the
    /// request always goes out and the result is stored under the detail
    /// key of the returned record's id.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after read retries.
    pub async fn fetch_by_id_or_slug(&self, id_or_slug: &str) -> Result<T> {
        let all = self.all_key();
        let fetch = fetcher::by_id_or_slug::<T, _>(self.client.repository(), id_or_slug);
        let entity = retry_read::<T, _>(&all, &fetch, self.client.default_options(&all)).await?;

        let canonical = CacheKey::detail(T::KIND, entity.entity_id());
        if let Err(e) = self.client.set_query_data(&canonical, &entity).await {
            warn!("⚠ Failed to store {}: {}", canonical, e);
        }
        Ok(entity)
    }

    /// Two-phase slug binding; see [`SlugResolver`].
    pub async fn by_slug(&self, slug: Option<&str>) -> QueryState<T> {
        self.slugs().query(slug).await
    }

    pub fn slugs(&self) -> SlugResolver<'a, T, B, R> {
        SlugResolver::new(self.client)
    }

    /// Cursor-paginated binding, used by the media library.
    pub fn infinite(&self, params: ListParams) -> InfiniteQuery<'a, T, B, R> {
        InfiniteQuery::new(self.client, params)
    }

    /// Mutation binding with the entity's default strategy.
    pub fn mutation(&self) -> MutationBuilder<'a, T, B, R> {
        MutationBuilder::new(self.client)
    }

    /// # Errors
    ///
    /// See [`MutationBuilder::create`].
    pub async fn create<P>(&self, payload: &P) -> Result<T>
    where
        P: Serialize + Validate + Sync,
    {
        self.mutation().create(payload).await
    }

    /// # Errors
    ///
    /// See [`MutationBuilder::update`].
    pub async fn update<P>(&self, id: &str, payload: &P) -> Result<T>
    where
        P: Serialize + Validate + Sync,
    {
        self.mutation().update(id, payload).await
    }

    /// # Errors
    ///
    /// See [`MutationBuilder::delete`].
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.mutation().delete(id).await
    }
}
