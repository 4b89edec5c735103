use crate::entity::{CacheEntity, EntityKind};
use crate::strategy::InvalidationStrategy;
use serde::{Deserialize, Serialize};

/// Uploaded file in the media library. Listed with cursor pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: String,
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    pub alt: Option<String>,
    pub created_at: Option<String>,
}

impl Media {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

impl CacheEntity for Media {
    const KIND: EntityKind = EntityKind::Media;
    const INVALIDATION: InvalidationStrategy = InvalidationStrategy::Broad;

    fn entity_id(&self) -> &str {
        &self.id
    }
}
