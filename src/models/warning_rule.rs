use super::validate::{Checker, Validate};
use crate::entity::{CacheEntity, EntityKind};
use crate::error::FieldError;
use crate::strategy::InvalidationStrategy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Alert raised when a measured condition leaves the configured window,
/// e.g. frost risk below 2 °C for tomatoes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningRule {
    pub id: String,
    pub name: String,
    /// Restricts the rule to one crop; `None` applies to all.
    pub vegetable_id: Option<String>,
    /// Measured quantity, e.g. `temperature`, `humidity`, `soilMoisture`.
    pub metric: String,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    #[serde(default)]
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub active: bool,
}

impl WarningRule {
    /// Whether a reading falls outside the rule's window.
    pub fn is_triggered_by(&self, reading: f64) -> bool {
        self.min_value.is_some_and(|min| reading < min)
            || self.max_value.is_some_and(|max| reading > max)
    }
}

impl CacheEntity for WarningRule {
    const KIND: EntityKind = EntityKind::WarningRule;
    const INVALIDATION: InvalidationStrategy = InvalidationStrategy::Targeted;

    fn entity_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningRuleInput {
    pub name: String,
    pub vegetable_id: Option<String>,
    pub metric: String,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub severity: Severity,
    pub message: String,
    pub active: bool,
}

impl WarningRuleInput {
    pub fn new(name: impl Into<String>, metric: impl Into<String>, message: impl Into<String>) -> Self {
        WarningRuleInput {
            name: name.into(),
            vegetable_id: None,
            metric: metric.into(),
            min_value: None,
            max_value: None,
            severity: Severity::default(),
            message: message.into(),
            active: true,
        }
    }
}

impl Validate for WarningRuleInput {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut check = Checker::new();
        check
            .required("name", &self.name)
            .required("metric", &self.metric)
            .required("message", &self.message);

        match (self.min_value, self.max_value) {
            (None, None) => {
                check.fail("minValue", "at least one threshold is required");
            }
            (Some(min), Some(max)) if min >= max => {
                check.fail("maxValue", "must be greater than minValue");
            }
            _ => {}
        }
        check.finish()
    }
}
