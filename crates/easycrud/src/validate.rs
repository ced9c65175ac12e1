//! Edit-form validation.
//!
//! Submission asks a [`FormValidator`] whether the edit form is valid. The
//! bundled [`RuleValidator`] checks each visible editor field against the
//! [`Rule`]s on its column definition; hosts with their own widget-level
//! validation implement the trait instead.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::row::Record;
use crate::schema::{EditMode, Schema};

/// A single validation rule.
#[derive(Clone)]
pub enum Rule {
    /// The value must be present and non-empty.
    Required {
        /// Message shown on failure.
        message: String,
    },
    /// Text must have at least `min` characters.
    MinLength {
        /// Minimum length.
        min: usize,
        /// Message shown on failure.
        message: String,
    },
    /// Text must have at most `max` characters.
    MaxLength {
        /// Maximum length.
        max: usize,
        /// Message shown on failure.
        message: String,
    },
    /// Text must match a regular expression.
    Pattern {
        /// Compiled pattern.
        regex: Regex,
        /// Message shown on failure.
        message: String,
    },
}

impl Rule {
    /// A required-field rule.
    pub fn required(message: impl Into<String>) -> Self {
        Self::Required {
            message: message.into(),
        }
    }

    /// A minimum-length rule.
    pub fn min_length(min: usize, message: impl Into<String>) -> Self {
        Self::MinLength {
            min,
            message: message.into(),
        }
    }

    /// A maximum-length rule.
    pub fn max_length(max: usize, message: impl Into<String>) -> Self {
        Self::MaxLength {
            max,
            message: message.into(),
        }
    }

    /// A pattern rule. Fails if `pattern` is not a valid regex.
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self::Pattern {
            regex: Regex::new(pattern)?,
            message: message.into(),
        })
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        match self {
            Self::Required { message }
            | Self::MinLength { message, .. }
            | Self::MaxLength { message, .. }
            | Self::Pattern { message, .. } => message,
        }
    }

    /// Check `value`. Length and pattern rules pass on empty values, so
    /// optional fields only need [`Rule::Required`] when they are mandatory.
    pub fn check(&self, value: Option<&Value>) -> bool {
        let text = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        match (self, text) {
            (Self::Required { .. }, text) => text.is_some_and(|t| !t.is_empty()),
            (_, None) => true,
            (_, Some(text)) if text.is_empty() => true,
            (Self::MinLength { min, .. }, Some(text)) => text.chars().count() >= *min,
            (Self::MaxLength { max, .. }, Some(text)) => text.chars().count() <= *max,
            (Self::Pattern { regex, .. }, Some(text)) => regex.is_match(&text),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required { message } => f.debug_struct("Required").field("message", message).finish(),
            Self::MinLength { min, message } => f
                .debug_struct("MinLength")
                .field("min", min)
                .field("message", message)
                .finish(),
            Self::MaxLength { max, message } => f
                .debug_struct("MaxLength")
                .field("max", max)
                .field("message", message)
                .finish(),
            Self::Pattern { regex, message } => f
                .debug_struct("Pattern")
                .field("regex", &regex.as_str())
                .field("message", message)
                .finish(),
        }
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Field name.
    pub field: String,
    /// Rule message.
    pub message: String,
    /// The rejected value.
    pub value: Value,
}

/// Failed rules keyed by field name.
pub type InvalidFields = BTreeMap<String, Vec<FieldError>>;

/// Decides whether the edit form may be submitted.
pub trait FormValidator: Send + Sync {
    /// Validate `values` for the drawer in `mode`.
    fn validate(&self, schema: &Schema, mode: EditMode, values: &Record) -> Result<(), InvalidFields>;
}

/// Checks editor fields visible in the current mode against their rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl FormValidator for RuleValidator {
    fn validate(&self, schema: &Schema, mode: EditMode, values: &Record) -> Result<(), InvalidFields> {
        let mut invalid = InvalidFields::new();
        for name in &schema.fields.editor {
            let Some(def) = schema.get(name) else { continue };
            if !def.is_visible(mode) {
                continue;
            }
            let value = values.get(name);
            let errors: Vec<FieldError> = def
                .rules
                .iter()
                .filter(|rule| !rule.check(value))
                .map(|rule| FieldError {
                    field: name.clone(),
                    message: rule.message().to_string(),
                    value: value.cloned().unwrap_or(Value::Null),
                })
                .collect();
            if !errors.is_empty() {
                invalid.insert(name.clone(), errors);
            }
        }
        if invalid.is_empty() { Ok(()) } else { Err(invalid) }
    }
}

/// Accepts every form.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl FormValidator for AcceptAll {
    fn validate(&self, _: &Schema, _: EditMode, _: &Record) -> Result<(), InvalidFields> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::ColumnDef;

    fn schema() -> Schema {
        Schema::new()
            .define(
                "userName",
                ColumnDef::new("User name")
                    .rule(Rule::required("User name is required"))
                    .rule(Rule::min_length(3, "At least 3 characters")),
            )
            .define(
                "phone",
                ColumnDef::new("Phone").rule(Rule::pattern(r"^\d{11}$", "Invalid phone").unwrap()),
            )
            .define(
                "password",
                ColumnDef::new("Password")
                    .visible_when(|mode| mode == EditMode::Create)
                    .rule(Rule::required("Password is required")),
            )
            .editor(["userName", "phone", "password"])
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rule_checks() {
        assert!(!Rule::required("r").check(None));
        assert!(!Rule::required("r").check(Some(&json!(""))));
        assert!(Rule::required("r").check(Some(&json!(0))));
        assert!(Rule::max_length(2, "m").check(Some(&json!("ab"))));
        assert!(!Rule::max_length(2, "m").check(Some(&json!("abc"))));
        assert!(Rule::min_length(5, "m").check(Some(&json!(""))));
    }

    #[test]
    fn test_rule_validator_collects_failures() {
        let values = record(json!({"userName": "al", "phone": "123", "password": null}));
        let invalid = RuleValidator
            .validate(&schema(), EditMode::Create, &values)
            .unwrap_err();
        assert_eq!(invalid.len(), 3);
        assert_eq!(invalid["userName"][0].message, "At least 3 characters");
        assert_eq!(invalid["phone"][0].value, json!("123"));
    }

    #[test]
    fn test_hidden_fields_are_not_validated() {
        let values = record(json!({"userName": "alice", "phone": "", "password": null}));
        assert!(RuleValidator.validate(&schema(), EditMode::Edit, &values).is_ok());
        assert!(RuleValidator.validate(&schema(), EditMode::Create, &values).is_err());
    }
}
