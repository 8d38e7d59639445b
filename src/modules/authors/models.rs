use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::utils::{double_option, pick, pick_nullable, FieldErrors};
use libris_http::AppError;

pub const NAME_MAX_LEN: usize = 100;

/// Catalog author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub ratings_count: Option<i64>,
    pub average_rating: Option<f64>,
    pub about: String,
}

/// Body accepted by create, full update and partial update.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuthorPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub ratings_count: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub average_rating: Option<Option<f64>>,
    #[serde(default)]
    pub about: Option<String>,
}

/// Validated column values for an insert or update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuthor {
    pub name: String,
    pub ratings_count: Option<i64>,
    pub average_rating: Option<f64>,
    pub about: String,
}

impl AuthorPayload {
    /// Validate against `stored` (absent on create). With `partial`, omitted
    /// fields keep their stored values.
    pub fn resolve(self, stored: Option<&Author>, partial: bool) -> Result<NewAuthor, AppError> {
        let mut errors = FieldErrors::new();

        let name = errors.text(
            "name",
            pick(self.name, stored.map(|a| &a.name), partial),
            Some(NAME_MAX_LEN),
        );
        let about = errors.text("about", pick(self.about, stored.map(|a| &a.about), partial), None);
        errors.finish()?;

        Ok(NewAuthor {
            name,
            ratings_count: pick_nullable(
                self.ratings_count,
                stored.map(|a| &a.ratings_count),
                None,
            ),
            average_rating: pick_nullable(
                self.average_rating,
                stored.map(|a| &a.average_rating),
                None,
            ),
            about,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Author {
        Author {
            id: 1,
            name: "Ursula K. Le Guin".to_string(),
            ratings_count: Some(120),
            average_rating: Some(4.2),
            about: "Earthsea".to_string(),
        }
    }

    #[test]
    fn create_requires_name_and_about() {
        let err = AuthorPayload::default().resolve(None, false).unwrap_err();
        match err {
            AppError::Validation { details, .. } => assert_eq!(details.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn partial_update_keeps_unsent_fields() {
        let payload: AuthorPayload =
            serde_json::from_str(r#"{"average_rating": null, "about": "Hainish cycle"}"#).unwrap();
        let resolved = payload.resolve(Some(&stored()), true).unwrap();

        assert_eq!(resolved.name, "Ursula K. Le Guin");
        assert_eq!(resolved.ratings_count, Some(120));
        assert_eq!(resolved.average_rating, None);
        assert_eq!(resolved.about, "Hainish cycle");
    }

    #[test]
    fn full_update_rejects_missing_required_fields() {
        let payload: AuthorPayload = serde_json::from_str(r#"{"name": "Le Guin"}"#).unwrap();
        assert!(payload.resolve(Some(&stored()), false).is_err());
    }
}
