//! Request field helpers shared by the payload types.
//!
//! Client payloads distinguish three states per field: absent, explicit
//! `null`, and a value. [`Field`] keeps that distinction so a `PATCH` can
//! clear a nullable column without touching the rest.

use std::collections::HashMap;
use std::str::FromStr;

use fastprint_core::validation::{NOT_NULL, REQUIRED};
use fastprint_core::{ValidationErrors, check_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Message used when a required text field is sent empty.
pub const BLANK: &str = "This field may not be blank.";

/// One field of an incoming payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    /// Not present in the payload.
    #[default]
    Missing,
    /// Present as `null`.
    Null,
    /// Present with a value.
    Value(T),
}

impl<'de, T> Deserialize<'de> for Field<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Null, Self::Value))
    }
}

impl<T> Field<T> {
    /// Whether the payload carried this field at all.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    /// Apply a fallible conversion to the value, keeping `Missing`/`Null`.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Field<U>, E> {
        Ok(match self {
            Self::Missing => Field::Missing,
            Self::Null => Field::Null,
            Self::Value(value) => Field::Value(f(value)?),
        })
    }
}

impl Field<String> {
    /// Build from a form value, where an empty string means "no value".
    #[must_use]
    pub fn from_form(value: Option<&str>) -> Self {
        match value {
            None => Self::Missing,
            Some("") => Self::Null,
            Some(value) => Self::Value(value.to_owned()),
        }
    }
}

/// Text parts of a `multipart/form-data` body, keyed by field name.
///
/// When a name repeats, the last value wins.
#[derive(Debug, Clone, Default)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Text field as a [`Field`]; empty means `Null`.
    #[must_use]
    pub fn text(&self, name: &str) -> Field<String> {
        Field::from_form(self.get(name))
    }
}

/// A non-nullable text field that must not be blank.
///
/// Returns `Some(value)` when a valid value was supplied, `None` when it was
/// absent or invalid (the failure is recorded in `errors`).
pub fn text(errors: &mut ValidationErrors, name: &str, field: Field<String>, max: usize) -> Option<String> {
    match field {
        Field::Missing => None,
        Field::Null => {
            errors.add(name, NOT_NULL);
            None
        }
        Field::Value(value) if value.trim().is_empty() => {
            errors.add(name, BLANK);
            None
        }
        Field::Value(value) => {
            errors.check_max_len(name, &value, max);
            Some(value)
        }
    }
}

/// A nullable text field. Blank strings are stored as `None`.
///
/// Returns `None` when absent, `Some(None)` to clear, `Some(Some(v))` to set.
pub fn nullable_text(
    errors: &mut ValidationErrors,
    name: &str,
    field: Field<String>,
    max: Option<usize>,
) -> Option<Option<String>> {
    match field {
        Field::Missing => None,
        Field::Null => Some(None),
        Field::Value(value) if value.trim().is_empty() => Some(None),
        Field::Value(value) => {
            if let Some(max) = max {
                errors.check_max_len(name, &value, max);
            }
            Some(Some(value))
        }
    }
}

/// A non-nullable amount.
pub fn amount(errors: &mut ValidationErrors, name: &str, field: Field<Decimal>) -> Option<Decimal> {
    match field {
        Field::Missing => None,
        Field::Null => {
            errors.add(name, NOT_NULL);
            None
        }
        Field::Value(value) => checked_amount(errors, name, value),
    }
}

/// A nullable amount.
pub fn nullable_amount(
    errors: &mut ValidationErrors,
    name: &str,
    field: Field<Decimal>,
) -> Option<Option<Decimal>> {
    match field {
        Field::Missing => None,
        Field::Null => Some(None),
        Field::Value(value) => checked_amount(errors, name, value).map(Some),
    }
}

fn checked_amount(errors: &mut ValidationErrors, name: &str, value: Decimal) -> Option<Decimal> {
    match check_amount(value) {
        Ok(value) => Some(value),
        Err(e) => {
            errors.add(name, e.to_string());
            None
        }
    }
}

/// A non-nullable integer with a lower bound.
pub fn integer(errors: &mut ValidationErrors, name: &str, field: Field<i32>, min: i32) -> Option<i32> {
    match field {
        Field::Missing => None,
        Field::Null => {
            errors.add(name, NOT_NULL);
            None
        }
        Field::Value(value) if value < min => {
            errors.add(
                name,
                format!("Ensure this value is greater than or equal to {min}."),
            );
            None
        }
        Field::Value(value) => Some(value),
    }
}

/// A non-nullable boolean.
pub fn boolean(errors: &mut ValidationErrors, name: &str, field: Field<bool>) -> Option<bool> {
    match field {
        Field::Missing => None,
        Field::Null => {
            errors.add(name, NOT_NULL);
            None
        }
        Field::Value(value) => Some(value),
    }
}

/// Record a "required" failure when a field that must be present is not.
pub fn require<T>(errors: &mut ValidationErrors, name: &str, value: Option<&T>) {
    if value.is_none() && !errors.has(name) {
        errors.add(name, REQUIRED);
    }
}

/// Parse a form string into a typed field, recording parse failures.
pub fn parse_form<T: FromStr>(
    errors: &mut ValidationErrors,
    name: &str,
    value: Option<&str>,
    message: &str,
) -> Field<T> {
    match Field::from_form(value) {
        Field::Missing => Field::Missing,
        Field::Null => Field::Null,
        Field::Value(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) => Field::Value(parsed),
            Err(_) => {
                errors.add(name, message);
                Field::Missing
            }
        },
    }
}

/// Parse a form boolean the way HTML forms and JS `FormData` send them.
pub fn parse_form_bool(errors: &mut ValidationErrors, name: &str, value: Option<&str>) -> Field<bool> {
    match Field::from_form(value) {
        Field::Missing => Field::Missing,
        Field::Null => Field::Null,
        Field::Value(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Field::Value(true),
            "false" | "0" | "no" | "off" => Field::Value(false),
            _ => {
                errors.add(name, "Must be a valid boolean.");
                Field::Missing
            }
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct CompanyOnly {
        company: Field<String>,
    }

    #[test]
    fn test_field_distinguishes_missing_null_and_value() {
        let missing: CompanyOnly = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.company, Field::Missing);

        let null: CompanyOnly = serde_json::from_str(r#"{"company": null}"#).unwrap();
        assert_eq!(null.company, Field::Null);

        let value: CompanyOnly = serde_json::from_str(r#"{"company": "Acme"}"#).unwrap();
        assert_eq!(value.company, Field::Value("Acme".to_owned()));
    }

    #[test]
    fn test_text_rejects_null_and_blank() {
        let mut errors = ValidationErrors::new();
        assert_eq!(text(&mut errors, "city", Field::Null, 100), None);
        assert_eq!(text(&mut errors, "state", Field::Value("  ".into()), 50), None);
        assert_eq!(errors.messages("city"), [NOT_NULL]);
        assert_eq!(errors.messages("state"), [BLANK]);
    }

    #[test]
    fn test_nullable_text_clears_on_blank() {
        let mut errors = ValidationErrors::new();
        assert_eq!(
            nullable_text(&mut errors, "company", Field::Value(String::new()), Some(255)),
            Some(None)
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_integer_lower_bound() {
        let mut errors = ValidationErrors::new();
        assert_eq!(integer(&mut errors, "product_quantity", Field::Value(0), 1), None);
        assert!(errors.has("product_quantity"));
    }

    #[test]
    fn test_parse_form_reports_bad_numbers() {
        let mut errors = ValidationErrors::new();
        let parsed: Field<i32> = parse_form(&mut errors, "page_count", Some("many"), "A valid integer is required.");
        assert_eq!(parsed, Field::Missing);
        assert!(errors.has("page_count"));

        let blank: Field<i32> = parse_form(&mut errors, "trim", Some(""), "unused");
        assert_eq!(blank, Field::Null);
    }

    #[test]
    fn test_parse_form_bool() {
        let mut errors = ValidationErrors::new();
        assert_eq!(parse_form_bool(&mut errors, "flag", Some("true")), Field::Value(true));
        assert_eq!(parse_form_bool(&mut errors, "flag", Some("0")), Field::Value(false));
        assert_eq!(parse_form_bool(&mut errors, "flag", Some("maybe")), Field::Missing);
        assert!(errors.has("flag"));
    }
}
