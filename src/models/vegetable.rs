use super::validate::{Checker, Validate};
use crate::entity::{CacheEntity, EntityKind};
use crate::error::FieldError;
use crate::strategy::InvalidationStrategy;
use serde::{Deserialize, Serialize};

/// A crop in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vegetable {
    pub id: String,
    pub slug: String,
    pub name: String,
    /// e.g. `fruit`, `leaf`, `root`, `legume`.
    pub category: String,
    pub scientific_name: Option<String>,
    pub description: Option<String>,
    /// Months (1-12) in which the crop can be sown.
    #[serde(default)]
    pub sowing_months: Vec<u8>,
    pub days_to_harvest: Option<u32>,
    pub spacing_cm: Option<f64>,
    pub ph_min: Option<f64>,
    pub ph_max: Option<f64>,
    #[serde(default)]
    pub soil_ids: Vec<String>,
}

impl CacheEntity for Vegetable {
    const KIND: EntityKind = EntityKind::Vegetable;
    const INVALIDATION: InvalidationStrategy = InvalidationStrategy::OptimisticOverwrite;

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }
}

/// Body of `POST /vegetables` and `PATCH /vegetables/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VegetableInput {
    pub slug: String,
    pub name: String,
    pub category: String,
    pub scientific_name: Option<String>,
    pub description: Option<String>,
    pub sowing_months: Vec<u8>,
    pub days_to_harvest: Option<u32>,
    pub spacing_cm: Option<f64>,
    pub ph_min: Option<f64>,
    pub ph_max: Option<f64>,
    pub soil_ids: Vec<String>,
}

impl VegetableInput {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        VegetableInput {
            slug: slug.into(),
            name: name.into(),
            category: category.into(),
            scientific_name: None,
            description: None,
            sowing_months: Vec::new(),
            days_to_harvest: None,
            spacing_cm: None,
            ph_min: None,
            ph_max: None,
            soil_ids: Vec::new(),
        }
    }
}

impl From<&Vegetable> for VegetableInput {
    fn from(v: &Vegetable) -> Self {
        VegetableInput {
            slug: v.slug.clone(),
            name: v.name.clone(),
            category: v.category.clone(),
            scientific_name: v.scientific_name.clone(),
            description: v.description.clone(),
            sowing_months: v.sowing_months.clone(),
            days_to_harvest: v.days_to_harvest,
            spacing_cm: v.spacing_cm,
            ph_min: v.ph_min,
            ph_max: v.ph_max,
            soil_ids: v.soil_ids.clone(),
        }
    }
}

impl Validate for VegetableInput {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut check = Checker::new();
        check
            .slug("slug", &self.slug)
            .required("name", &self.name)
            .required("category", &self.category)
            .int_range("daysToHarvest", self.days_to_harvest, 1, 365)
            .positive("spacingCm", self.spacing_cm)
            .range("phMin", self.ph_min, 0.0, 14.0)
            .range("phMax", self.ph_max, 0.0, 14.0)
            .ordered("phMax", self.ph_min, self.ph_max, "must not be below phMin");
        if self.sowing_months.iter().any(|m| !(1..=12).contains(m)) {
            check.fail("sowingMonths", "months must be between 1 and 12");
        }
        check.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_input_is_valid() {
        assert!(VegetableInput::new("tomato", "Tomato", "fruit")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let input = VegetableInput {
            days_to_harvest: Some(0),
            spacing_cm: Some(-5.0),
            sowing_months: vec![3, 13],
            ..VegetableInput::new("tomato", "Tomato", "fruit")
        };

        let fields: Vec<_> = input.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["daysToHarvest", "spacingCm", "sowingMonths"]);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let input = VegetableInput {
            days_to_harvest: Some(70),
            ..VegetableInput::new("tomato", "Tomato", "fruit")
        };
        let json = serde_json::to_value(&input).expect("serialize");
        assert_eq!(json["daysToHarvest"], 70);
        assert!(json.get("days_to_harvest").is_none());
    }
}
