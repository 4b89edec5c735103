use super::validate::{Checker, Validate};
use crate::entity::{CacheEntity, EntityKind};
use crate::error::FieldError;
use crate::strategy::InvalidationStrategy;
use serde::{Deserialize, Serialize};

/// Growing guide or reference article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    /// Markdown source.
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    /// Id of the cover image in the media library.
    pub cover_media_id: Option<String>,
}

impl CacheEntity for Article {
    const KIND: EntityKind = EntityKind::Article;
    const INVALIDATION: InvalidationStrategy = InvalidationStrategy::Targeted;

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub cover_media_id: Option<String>,
}

impl ArticleInput {
    pub fn new(slug: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        ArticleInput {
            slug: slug.into(),
            title: title.into(),
            summary: None,
            body: body.into(),
            tags: Vec::new(),
            published: false,
            cover_media_id: None,
        }
    }
}

impl Validate for ArticleInput {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut check = Checker::new();
        check
            .slug("slug", &self.slug)
            .required("title", &self.title)
            .required("body", &self.body);
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            check.fail("tags", "tags cannot be blank");
        }
        check.finish()
    }
}
