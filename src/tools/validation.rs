//! Form validation
//!
//! Collects per-field messages so a whole form is reported at once.

use crate::api::FieldErrors;

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Trimmed length in characters must be within bounds
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len < min || len > max {
            if min > 0 && len == 0 {
                self.push(field, "This field is required.");
            } else {
                self.push(
                    field,
                    format!("Field must be between {} and {} characters long.", min, max),
                );
            }
        }
    }

    /// Optional text up to a maximum length
    pub fn max_length(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.push(field, format!("Field cannot be longer than {} characters.", max));
            }
        }
    }

    /// Required number no smaller than `min`; returns the value when valid
    pub fn at_least(&mut self, field: &str, value: Option<f64>, min: f64) -> f64 {
        match value {
            None => {
                self.push(field, "This field is required.");
                0.0
            }
            Some(v) if !v.is_finite() => {
                self.push(field, "Not a valid number.");
                0.0
            }
            Some(v) if v < min => {
                self.push(field, format!("Number must be at least {}.", min));
                v
            }
            Some(v) => v,
        }
    }

    /// Required integer no smaller than `min`
    pub fn int_at_least(&mut self, field: &str, value: Option<i64>, min: i64) -> i64 {
        match value {
            None => {
                self.push(field, "This field is required.");
                0
            }
            Some(v) if v < min => {
                self.push(field, format!("Number must be at least {}.", min));
                v
            }
            Some(v) => v,
        }
    }

    /// Value must be one of the allowed choices
    pub fn one_of(&mut self, field: &str, value: &str, choices: &[&str]) {
        if !choices.contains(&value) {
            self.push(field, "Not a valid choice.");
        }
    }

    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_messages_per_field() {
        let mut v = Validator::new();
        v.length("name", "  ", 1, 128);
        v.at_least("price", Some(0.0), 0.01);
        v.at_least("quantity", None, 0.001);
        v.one_of("source", "Costco", &["Manual", "Shopee"]);
        let errors = v.finish().unwrap_err();

        assert_eq!(errors["name"], vec!["This field is required."]);
        assert_eq!(errors["price"], vec!["Number must be at least 0.01."]);
        assert_eq!(errors["quantity"], vec!["This field is required."]);
        assert_eq!(errors["source"], vec!["Not a valid choice."]);
    }

    #[test]
    fn test_length_counts_characters() {
        let mut v = Validator::new();
        v.length("name", "奶油", 2, 128);
        v.max_length("description", Some("短"), 500);
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.length("name", "a", 2, 128);
        let errors = v.finish().unwrap_err();
        assert_eq!(errors["name"], vec!["Field must be between 2 and 128 characters long."]);
    }
}
