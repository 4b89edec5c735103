use super::validate::{Checker, Validate};
use crate::entity::{CacheEntity, EntityKind};
use crate::error::FieldError;
use crate::strategy::InvalidationStrategy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fertilizer {
    pub id: String,
    pub slug: String,
    pub name: String,
    /// `organic` or `mineral`.
    pub category: String,
    pub nitrogen_pct: Option<f64>,
    pub phosphorus_pct: Option<f64>,
    pub potassium_pct: Option<f64>,
    pub application_rate: Option<String>,
    pub description: Option<String>,
}

impl Fertilizer {
    /// `N-P-K` label, e.g. `10-5-5`.
    pub fn npk_label(&self) -> Option<String> {
        match (self.nitrogen_pct, self.phosphorus_pct, self.potassium_pct) {
            (Some(n), Some(p), Some(k)) => Some(format!("{n}-{p}-{k}")),
            _ => None,
        }
    }
}

impl CacheEntity for Fertilizer {
    const KIND: EntityKind = EntityKind::Fertilizer;
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
pub struct FertilizerInput {
    pub slug: String,
    pub name: String,
    pub category: String,
    pub nitrogen_pct: Option<f64>,
    pub phosphorus_pct: Option<f64>,
    pub potassium_pct: Option<f64>,
    pub application_rate: Option<String>,
    pub description: Option<String>,
}

impl FertilizerInput {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        FertilizerInput {
            slug: slug.into(),
            name: name.into(),
            category: category.into(),
            nitrogen_pct: None,
            phosphorus_pct: None,
            potassium_pct: None,
            application_rate: None,
            description: None,
        }
    }

    pub fn with_npk(mut self, n: f64, p: f64, k: f64) -> Self {
        self.nitrogen_pct = Some(n);
        self.phosphorus_pct = Some(p);
        self.potassium_pct = Some(k);
        self
    }
}

impl Validate for FertilizerInput {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut check = Checker::new();
        check
            .slug("slug", &self.slug)
            .required("name", &self.name)
            .required("category", &self.category)
            .range("nitrogenPct", self.nitrogen_pct, 0.0, 100.0)
            .range("phosphorusPct", self.phosphorus_pct, 0.0, 100.0)
            .range("potassiumPct", self.potassium_pct, 0.0, 100.0);

        let total: f64 = [self.nitrogen_pct, self.phosphorus_pct, self.potassium_pct]
            .iter()
            .flatten()
            .sum();
        if total > 100.0 {
            check.fail("nitrogenPct", "N, P and K together cannot exceed 100%");
        }
        check.finish()
    }
}
