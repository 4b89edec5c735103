//! Typed records and payloads for every entity kind.
//!
//! Records mirror the JSON the API returns (camelCase fields) and are also
//! what the query cache stores. Inputs are the create/update bodies and are
//! validated before anything is sent.

mod article;
mod disease;
mod fertilizer;
mod media;
mod pest;
mod soil;
pub mod validate;
mod vegetable;
mod warning_rule;

pub use article::{Article, ArticleInput};
pub use disease::{Disease, DiseaseInput};
pub use fertilizer::{Fertilizer, FertilizerInput};
pub use media::Media;
pub use pest::{Pest, PestInput};
pub use soil::{Soil, SoilInput};
pub use validate::Validate;
pub use vegetable::{Vegetable, VegetableInput};
pub use warning_rule::{Severity, WarningRule, WarningRuleInput};
