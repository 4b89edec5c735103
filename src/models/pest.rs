use super::validate::{Checker, Validate};
use crate::entity::{CacheEntity, EntityKind};
use crate::error::FieldError;
use crate::strategy::InvalidationStrategy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pest {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub scientific_name: Option<String>,
    pub description: Option<String>,
    pub treatment: Option<String>,
    #[serde(default)]
    pub affected_vegetable_ids: Vec<String>,
}

impl CacheEntity for Pest {
    const KIND: EntityKind = EntityKind::Pest;
    const INVALIDATION: InvalidationStrategy = InvalidationStrategy::Broad;

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PestInput {
    pub slug: String,
    pub name: String,
    pub scientific_name: Option<String>,
    pub description: Option<String>,
    pub treatment: Option<String>,
    pub affected_vegetable_ids: Vec<String>,
}

impl PestInput {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        PestInput {
            slug: slug.into(),
            name: name.into(),
            scientific_name: None,
            description: None,
            treatment: None,
            affected_vegetable_ids: Vec::new(),
        }
    }
}

impl Validate for PestInput {
    fn field_errors(&self) -> Vec<FieldError> {
        Checker::new()
            .slug("slug", &self.slug)
            .required("name", &self.name)
            .finish()
    }
}
