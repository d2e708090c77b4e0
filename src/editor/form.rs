//! Form state
//!
//! Raw input values keyed by field name plus the inline validation messages
//! currently shown.

use std::collections::BTreeMap;

use crate::api::FieldErrors;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: BTreeMap<String, String>,
    errors: FieldErrors,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field from user input; clears that field's invalid marking
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.values.insert(field.to_string(), value.into());
        self.errors.remove(field);
    }

    /// Load values without touching validation state
    pub fn fill<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (field, value) in values {
            self.values.insert(field.into(), value.into());
        }
    }

    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Blank input is None so the server can report the field as required
    pub fn text(&self, field: &str) -> Option<String> {
        let value = self.value(field).trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Parsed number; blank or unparsable input is None
    pub fn number(&self, field: &str) -> Option<f64> {
        self.value(field).trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        let raw = self.value(field).trim();
        raw.parse::<i64>().ok().or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && v.fract() == 0.0)
                .map(|v| v as i64)
        })
    }

    /// Replace every invalid marking with the server's field errors
    pub fn apply_errors(&mut self, errors: &FieldErrors) {
        self.errors = errors.clone();
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn is_invalid(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Inline message of a field, messages joined by a space
    pub fn message(&self, field: &str) -> Option<String> {
        self.errors.get(field).map(|messages| messages.join(" "))
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Empty every field and marking
    pub fn reset(&mut self) {
        self.values.clear();
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(fields: &[&str]) -> FieldErrors {
        fields
            .iter()
            .map(|f| (f.to_string(), vec![format!("{} is wrong", f)]))
            .collect()
    }

    #[test]
    fn test_apply_errors_replaces_previous_markings() {
        let mut form = FormState::new();
        form.apply_errors(&errors(&["price", "unit"]));
        assert!(form.is_invalid("price"));

        form.apply_errors(&errors(&["source"]));
        assert!(!form.is_invalid("price"));
        assert!(!form.is_invalid("unit"));
        assert_eq!(form.message("source").unwrap(), "source is wrong");
    }

    #[test]
    fn test_editing_a_field_clears_only_its_marking() {
        let mut form = FormState::new();
        form.apply_errors(&errors(&["price", "unit"]));
        form.set("price", "12");
        assert!(!form.is_invalid("price"));
        assert!(form.is_invalid("unit"));
    }

    #[test]
    fn test_number_parsing() {
        let mut form = FormState::new();
        form.fill([("a", " 2.5 "), ("b", "abc"), ("c", ""), ("d", "24"), ("e", "3.0")]);
        assert_eq!(form.number("a"), Some(2.5));
        assert_eq!(form.number("b"), None);
        assert_eq!(form.number("c"), None);
        assert_eq!(form.integer("d"), Some(24));
        assert_eq!(form.integer("e"), Some(3));
        assert_eq!(form.integer("a"), None);
        assert_eq!(form.text("c"), None);
    }
}
