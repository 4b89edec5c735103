//! Entity kinds and the trait every cached record implements.

use crate::error::{Error, Result};
use crate::strategy::InvalidationStrategy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote resource a cache key or request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Vegetable,
    Soil,
    Fertilizer,
    Pest,
    Disease,
    Article,
    WarningRule,
    Media,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Vegetable,
        EntityKind::Soil,
        EntityKind::Fertilizer,
        EntityKind::Pest,
        EntityKind::Disease,
        EntityKind::Article,
        EntityKind::WarningRule,
        EntityKind::Media,
    ];

    /// REST collection segment, also used as the first cache key segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Vegetable => "vegetables",
            EntityKind::Soil => "soils",
            EntityKind::Fertilizer => "fertilizers",
            EntityKind::Pest => "pests",
            EntityKind::Disease => "diseases",
            EntityKind::Article => "articles",
            EntityKind::WarningRule => "warning-rules",
            EntityKind::Media => "media",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::ValidationError(format!("unknown entity kind: {s}")))
    }
}

/// Anything that can be stored in the query cache.
///
/// Blanket-implemented; list pages, slug lookups and infinite page sets are
/// cached through this alongside the entities themselves.
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Trait that all entities served by the remote API must implement.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use garden_query::{CacheEntity, EntityKind, InvalidationStrategy};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// pub struct Herb {
///     pub id: String,
///     pub slug: String,
/// }
///
/// impl CacheEntity for Herb {
///     const KIND: EntityKind = EntityKind::Vegetable;
///     const INVALIDATION: InvalidationStrategy = InvalidationStrategy::Broad;
///
///     fn entity_id(&self) -> &str {
///         &self.id
///     }
///
///     fn slug(&self) -> Option<&str> {
///         Some(&self.slug)
///     }
/// }
/// ```
pub trait CacheEntity: Cacheable + Clone {
    /// Remote collection this entity lives in.
    const KIND: EntityKind;

    /// How mutations of this entity refresh the cache.
    const INVALIDATION: InvalidationStrategy;

    /// Opaque identifier assigned by the server.
    fn entity_id(&self) -> &str;

    /// Human-readable unique identifier, for kinds that have one.
    fn slug(&self) -> Option<&str> {
        None
    }

    /// Optional: Validate entity after deserialization.
    fn validate(&self) -> Result<()> {
        if self.entity_id().is_empty() {
            return Err(Error::ValidationError(format!(
                "{} record without an id",
                Self::KIND
            )));
        }
        Ok(())
    }
}
