use super::validate::{Checker, Validate};
use crate::entity::{CacheEntity, EntityKind};
use crate::error::FieldError;
use crate::strategy::InvalidationStrategy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disease {
    pub id: String,
    pub slug: String,
    pub name: String,
    /// `fungal`, `bacterial`, `viral`, ...
    pub pathogen_type: String,
    pub symptoms: Option<String>,
    pub prevention: Option<String>,
    #[serde(default)]
    pub affected_vegetable_ids: Vec<String>,
}

impl CacheEntity for Disease {
    const KIND: EntityKind = EntityKind::Disease;
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
pub struct DiseaseInput {
    pub slug: String,
    pub name: String,
    pub pathogen_type: String,
    pub symptoms: Option<String>,
    pub prevention: Option<String>,
    pub affected_vegetable_ids: Vec<String>,
}

impl DiseaseInput {
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        pathogen_type: impl Into<String>,
    ) -> Self {
        DiseaseInput {
            slug: slug.into(),
            name: name.into(),
            pathogen_type: pathogen_type.into(),
            symptoms: None,
            prevention: None,
            affected_vegetable_ids: Vec::new(),
        }
    }
}

impl Validate for DiseaseInput {
    fn field_errors(&self) -> Vec<FieldError> {
        Checker::new()
            .slug("slug", &self.slug)
            .required("name", &self.name)
            .required("pathogenType", &self.pathogen_type)
            .finish()
    }
}
