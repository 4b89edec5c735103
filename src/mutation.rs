//! Write side: one remote call, then cache invalidation or overwrite.

use crate::backend::CacheBackend;
use crate::client::QueryClient;
use crate::entity::CacheEntity;
use crate::error::Result;
use crate::key::CacheKey;
use crate::models::Validate;
use crate::repository::DataRepository;
use crate::strategy::InvalidationStrategy;
use serde::Serialize;
use std::marker::PhantomData;
use tokio::time::Instant;

/// Create/update/delete for one entity type.
///
/// Each call performs exactly one remote request and is never retried. The
/// cache is only touched after the request succeeds, so a failed mutation
/// leaves every entry as it was.
pub struct MutationBuilder<'a, T, B, R>
where
    T: CacheEntity,
    B: CacheBackend,
    R: DataRepository,
{
    client: &'a QueryClient<B, R>,
    strategy: InvalidationStrategy,
    _entity: PhantomData<T>,
}

impl<'a, T, B, R> MutationBuilder<'a, T, B, R>
where
    T: CacheEntity,
    B: CacheBackend,
    R: DataRepository,
{
    pub(crate) fn new(client: &'a QueryClient<B, R>) -> Self {
        MutationBuilder {
            client,
            strategy: T::INVALIDATION,
            _entity: PhantomData,
        }
    }

    /// Override the entity's default invalidation strategy for this call.
    pub fn with_strategy(mut self, strategy: InvalidationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> InvalidationStrategy {
        self.strategy
    }

    /// `POST /{kind}`, then refresh the cache per the strategy.
    ///
    /// # Errors
    ///
    /// `Error::InvalidPayload` if the payload fails validation (nothing is
    /// sent), otherwise the remote error unchanged.
    pub async fn create<P>(self, payload: &P) -> Result<T>
    where
        P: Serialize + Validate + Sync,
    {
        payload.validate()?;
        let timer = Instant::now();

        let created: T = self.client.repository().create::<T, P>(payload).await?;
        info!(
            "✓ Created {} {} in {:?}",
            T::KIND,
            created.entity_id(),
            timer.elapsed()
        );

        self.apply(&created).await;
        Ok(created)
    }

    /// `PATCH /{kind}/{id}`, then refresh the cache per the strategy.
    ///
    /// # Errors
    ///
    /// `Error::InvalidPayload` if the payload fails validation (nothing is
    /// sent), otherwise the remote error unchanged.
    pub async fn update<P>(self, id: &str, payload: &P) -> Result<T>
    where
        P: Serialize + Validate + Sync,
    {
        payload.validate()?;
        let timer = Instant::now();

        let updated: T = self.client.repository().update::<T, P>(id, payload).await?;
        info!("✓ Updated {} {} in {:?}", T::KIND, id, timer.elapsed());

        self.apply(&updated).await;
        Ok(updated)
    }

    /// `DELETE /{kind}/{id}`, then invalidate `all(kind)` and `detail(kind, id)`
    /// whatever the strategy, so lingering readers refetch and see a 404.
    ///
    /// # Errors
    ///
    /// Returns the remote error unchanged.
    pub async fn delete(self, id: &str) -> Result<()> {
        let timer = Instant::now();

        self.client.repository().delete::<T>(id).await?;
        info!("✓ Deleted {} {} in {:?}", T::KIND, id, timer.elapsed());

        self.invalidate(&CacheKey::all(T::KIND)).await;
        self.invalidate(&CacheKey::detail(T::KIND, id)).await;
        Ok(())
    }

    async fn apply(&self, entity: &T) {
        let detail = CacheKey::detail(T::KIND, entity.entity_id());
        debug!("Applying {} invalidation for {}", self.strategy, detail);

        match self.strategy {
            InvalidationStrategy::Broad => {
                self.invalidate(&CacheKey::all(T::KIND)).await;
            }
            InvalidationStrategy::Targeted => {
                self.invalidate(&CacheKey::all(T::KIND)).await;
                self.invalidate(&detail).await;
            }
            InvalidationStrategy::OptimisticOverwrite => {
                // Invalidate first: `all(kind)` covers the detail key, and the
                // overwrite below must leave it fresh.
                self.invalidate(&CacheKey::all(T::KIND)).await;
                if let Err(e) = self.client.set_query_data(&detail, entity).await {
                    warn!("⚠ Failed to overwrite {}: {}", detail, e);
                }
            }
        }
    }

    /// The remote write already happened; a cache failure here is logged,
    /// not returned.
    async fn invalidate(&self, prefix: &CacheKey) {
        if let Err(e) = self.client.invalidate(prefix).await {
            warn!("⚠ Failed to invalidate {}: {}", prefix, e);
        }
    }
}
