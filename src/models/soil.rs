use super::validate::{Checker, Validate};
use crate::entity::{CacheEntity, EntityKind};
use crate::error::FieldError;
use crate::strategy::InvalidationStrategy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Soil {
    pub id: String,
    pub slug: String,
    pub name: String,
    /// `clay`, `sand`, `loam`, ... Filterable as `type`.
    #[serde(rename = "type")]
    pub soil_type: String,
    pub ph_min: Option<f64>,
    pub ph_max: Option<f64>,
    pub drainage: Option<String>,
    pub description: Option<String>,
}

impl CacheEntity for Soil {
    const KIND: EntityKind = EntityKind::Soil;
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
pub struct SoilInput {
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub soil_type: String,
    pub ph_min: Option<f64>,
    pub ph_max: Option<f64>,
    pub drainage: Option<String>,
    pub description: Option<String>,
}

impl SoilInput {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, soil_type: impl Into<String>) -> Self {
        SoilInput {
            slug: slug.into(),
            name: name.into(),
            soil_type: soil_type.into(),
            ph_min: None,
            ph_max: None,
            drainage: None,
            description: None,
        }
    }
}

impl Validate for SoilInput {
    fn field_errors(&self) -> Vec<FieldError> {
        Checker::new()
            .slug("slug", &self.slug)
            .required("name", &self.name)
            .required("type", &self.soil_type)
            .range("phMin", self.ph_min, 0.0, 14.0)
            .range("phMax", self.ph_max, 0.0, 14.0)
            .ordered("phMax", self.ph_min, self.ph_max, "must not be below phMin")
            .finish()
    }
}
