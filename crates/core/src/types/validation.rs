//! Field-keyed validation errors.
//!
//! Serialized as `{"field": ["message", ...]}`, which is the shape every
//! client of the API already parses.

use std::collections::BTreeMap;

use serde::Serialize;

/// Message used when a required field is absent or blank.
pub const REQUIRED: &str = "This field is required.";

/// Message used when a non-nullable field is sent as `null`.
pub const NOT_NULL: &str = "This field may not be null.";

/// Validation failures collected per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// An empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-field error set.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a failure for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Record that `field` is required.
    pub fn required(&mut self, field: &str) {
        self.add(field, REQUIRED);
    }

    /// Fold another error set into this one.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Check a string against a maximum character count.
    pub fn check_max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
        }
    }

    /// Whether no failures were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `field` has at least one failure.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Names of the fields that failed.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(value)` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` if any failure was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self.fields().collect::<Vec<_>>();
        write!(f, "validation failed for: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_field_map() {
        let mut errors = ValidationErrors::new();
        errors.required("email");
        errors.add("email", "Enter a valid email address.");
        errors.check_max_len("country", "United Kingdom", 10);

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "country": ["Ensure this field has no more than 10 characters."],
                "email": ["This field is required.", "Enter a valid email address."],
            })
        );
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationErrors::new().into_result(5), Ok(5));

        let errors = ValidationErrors::single("subtotal", REQUIRED);
        let err = errors.into_result(()).unwrap_err();
        assert!(err.has("subtotal"));
        assert_eq!(err.to_string(), "validation failed for: subtotal");
    }

    #[test]
    fn test_merge_keeps_both_sides() {
        let mut left = ValidationErrors::single("city", REQUIRED);
        left.merge(ValidationErrors::single("state", REQUIRED));
        assert_eq!(left.fields().collect::<Vec<_>>(), vec!["city", "state"]);
    }
}
