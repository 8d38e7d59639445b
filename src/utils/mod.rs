//! Helpers shared by the feature modules.

use libris_http::{error::field_error, AppError};
use serde::{Deserialize, Deserializer};

/// `LIKE` pattern matching `needle` anywhere, with `%`, `_` and `\` taken
/// literally. Pair with `ESCAPE '\'`.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Value for a required field: the submitted one, or on partial updates the
/// stored one.
pub fn pick<T: Clone>(submitted: Option<T>, stored: Option<&T>, partial: bool) -> Option<T> {
    submitted.or_else(|| if partial { stored.cloned() } else { None })
}

/// Value for a nullable field: the submitted one (possibly null), else the
/// stored one, else `default`.
pub fn pick_nullable<T: Clone>(
    submitted: Option<Option<T>>,
    stored: Option<&Option<T>>,
    default: Option<T>,
) -> Option<T> {
    match submitted {
        Some(value) => value,
        None => stored.cloned().unwrap_or(default),
    }
}

/// Collects field-level problems and turns them into one 400 response.
#[derive(Debug, Default)]
pub struct FieldErrors {
    details: Vec<serde_json::Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.details.push(field_error(field, message));
    }

    /// Check a required text field, returning it (empty on failure).
    pub fn text(&mut self, field: &str, value: Option<String>, max_len: Option<usize>) -> String {
        let Some(value) = value else {
            self.push(field, "This field is required.");
            return String::new();
        };
        if value.trim().is_empty() {
            self.push(field, "This field may not be blank.");
        } else if let Some(max) = max_len.filter(|max| value.chars().count() > *max) {
            self.push(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
        }
        value
    }

    /// Check a required non-text field.
    pub fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(field, "This field is required.");
        }
        value
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(self.details, "Validation failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("tolk"), "%tolk%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        rating: Option<Option<f64>>,
    }

    #[test]
    fn double_option_tells_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"rating": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"rating": 4.5}"#).unwrap();

        assert_eq!(absent.rating, None);
        assert_eq!(null.rating, Some(None));
        assert_eq!(set.rating, Some(Some(4.5)));
    }

    #[test]
    fn pick_only_falls_back_on_partial_updates() {
        let stored = "Dune".to_string();
        assert_eq!(pick(None, Some(&stored), true), Some(stored.clone()));
        assert_eq!(pick(None, Some(&stored), false), None);
        assert_eq!(pick(Some("Emma".to_string()), Some(&stored), true).as_deref(), Some("Emma"));

        assert_eq!(pick_nullable(None, Some(&Some(3)), Some(9)), Some(3));
        assert_eq!(pick_nullable(None, None, Some(9)), Some(9));
        assert_eq!(pick_nullable(Some(None), Some(&Some(3)), Some(9)), None);
    }

    #[test]
    fn field_errors_collect_text_problems() {
        let mut errors = FieldErrors::new();
        errors.text("name", None, None);
        errors.text("about", Some("  ".to_string()), None);
        errors.text("title", Some("x".repeat(201)), Some(200));
        assert_eq!(errors.text("ok", Some("fine".to_string()), Some(10)), "fine");
        assert!(!errors.is_empty());

        let err = errors.finish().unwrap_err();
        match err {
            AppError::Validation { details, .. } => assert_eq!(details.len(), 3),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
