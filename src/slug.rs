//! Two-phase slug lookup: slug → id, then id → entity.

use crate::backend::CacheBackend;
use crate::client::{QueryClient, QueryState};
use crate::entity::CacheEntity;
use crate::error::Result;
use crate::fetcher;
use crate::key::CacheKey;
use crate::repository::DataRepository;
use std::marker::PhantomData;

/// Resolves slug-addressed routes through the regular detail query.
///
/// The slug → id mapping is cached under `[kind, "slug", slug]`, so it is
/// dropped together with everything else when `all(kind)` is invalidated.
pub struct SlugResolver<'a, T, B, R>
where
    T: CacheEntity,
    B: CacheBackend,
    R: DataRepository,
{
    client: &'a QueryClient<B, R>,
    _entity: PhantomData<T>,
}

impl<'a, T, B, R> SlugResolver<'a, T, B, R>
where
    T: CacheEntity,
    B: CacheBackend,
    R: DataRepository,
{
    pub fn new(client: &'a QueryClient<B, R>) -> Self {
        SlugResolver {
            client,
            _entity: PhantomData,
        }
    }

    /// Phase 1: the id of the record carrying `slug`.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when no record has the slug, or the lookup's error.
    pub async fn resolve(&self, slug: &str) -> Result<String> {
        let key = CacheKey::slug(T::KIND, slug);
        self.client
            .fetch_query::<String, _>(
                &key,
                fetcher::slug_lookup::<T, _>(self.client.repository(), slug),
            )
            .await
    }

    /// Gated two-phase query.
    ///
    /// A blank or absent slug is idle. If phase 1 fails, its error is returned
    /// and the detail fetch never runs.
    pub async fn query(&self, slug: Option<&str>) -> QueryState<T> {
        let Some(slug) = slug.map(str::trim).filter(|s| !s.is_empty()) else {
            debug!("Slug query for {} disabled, no slug", T::KIND);
            return QueryState::idle();
        };

        let id = match self.resolve(slug).await {
            Ok(id) => id,
            Err(error) => {
                debug!("Slug '{}' for {} did not resolve: {}", slug, T::KIND, error);
                return QueryState::failed(error, None);
            }
        };

        let key = CacheKey::detail(T::KIND, id.as_str());
        self.client
            .query::<T, _>(&key, true, fetcher::detail::<T, _>(self.client.repository(), id))
            .await
    }
}
