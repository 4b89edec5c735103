//! Client-side payload checks, run before any create/update request.

use crate::error::{Error, FieldError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Lowercase alphanumeric words joined by single hyphens.
pub const SLUG_PATTERN: &str = r"^[a-z0-9]+(?:-[a-z0-9]+)*$";

static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX
        .get_or_init(|| Regex::new(SLUG_PATTERN).expect("valid slug pattern"))
        .is_match(slug)
}

/// A create or update payload that can be checked without the server.
pub trait Validate {
    /// Every rejected field; empty when the payload is acceptable.
    fn field_errors(&self) -> Vec<FieldError>;

    /// # Errors
    ///
    /// Returns `Error::InvalidPayload` listing every rejected field.
    fn validate(&self) -> Result<()> {
        let errors = self.field_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidPayload(errors))
        }
    }
}

/// Collects field errors for one payload.
#[derive(Debug, Default)]
pub(crate) struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &'static str, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn required(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "is required");
        }
        self
    }

    pub fn slug(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "is required");
        } else if !is_valid_slug(value) {
            self.fail(
                field,
                "must contain only lowercase letters, digits and single hyphens",
            );
        }
        self
    }

    pub fn optional_slug(&mut self, field: &'static str, value: Option<&str>) -> &mut Self {
        match value {
            Some(value) => self.slug(field, value),
            None => self,
        }
    }

    /// Inclusive range check on an optional number.
    pub fn range(&mut self, field: &'static str, value: Option<f64>, min: f64, max: f64) -> &mut Self {
        if let Some(v) = value {
            if !v.is_finite() || v < min || v > max {
                self.fail(field, format!("must be between {min} and {max}"));
            }
        }
        self
    }

    pub fn int_range(&mut self, field: &'static str, value: Option<u32>, min: u32, max: u32) -> &mut Self {
        if let Some(v) = value {
            if v < min || v > max {
                self.fail(field, format!("must be between {min} and {max}"));
            }
        }
        self
    }

    pub fn positive(&mut self, field: &'static str, value: Option<f64>) -> &mut Self {
        if let Some(v) = value {
            if !v.is_finite() || v <= 0.0 {
                self.fail(field, "must be greater than 0");
            }
        }
        self
    }

    /// `low <= high` when both are present.
    pub fn ordered(
        &mut self,
        field: &'static str,
        low: Option<f64>,
        high: Option<f64>,
        message: &str,
    ) -> &mut Self {
        if let (Some(low), Some(high)) = (low, high) {
            if low > high {
                self.fail(field, message);
            }
        }
        self
    }

    pub fn finish(&mut self) -> Vec<FieldError> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_pattern_compiles() {
        let pattern = Regex::new(SLUG_PATTERN).expect("slug pattern");
        assert!(pattern.is_match("sweet-basil"));
    }

    #[test]
    fn test_slug_format() {
        for ok in ["tomato", "cherry-tomato", "npk-10-10-10", "a1"] {
            assert!(is_valid_slug(ok), "{ok} should be valid");
        }
        for bad in ["", "Tomato", "cherry--tomato", "-tomato", "tomato-", "cherry tomato", "tomàto"] {
            assert!(!is_valid_slug(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_checker_collects_every_failure() {
        let errors = Checker::new()
            .required("name", "  ")
            .slug("slug", "Bad Slug")
            .range("phMin", Some(15.0), 0.0, 14.0)
            .positive("spacingCm", Some(0.0))
            .ordered("phMax", Some(7.0), Some(6.0), "must not be below phMin")
            .finish();

        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "slug", "phMin", "spacingCm", "phMax"]);
    }

    #[test]
    fn test_absent_optional_values_pass() {
        let errors = Checker::new()
            .range("phMin", None, 0.0, 14.0)
            .int_range("daysToHarvest", None, 1, 365)
            .positive("spacingCm", None)
            .optional_slug("slug", None)
            .finish();
        assert!(errors.is_empty());
    }
}
