use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use utoipa::ToSchema;

use crate::utils::{double_option, pick, pick_nullable, FieldErrors};
use libris_http::AppError;

pub const TITLE_MAX_LEN: usize = 200;

/// Catalog book. `author` is the owning author's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "author")]
    pub author_id: i64,
    pub publication_date: Option<Date>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<i64>,
}

/// Body accepted by create, full update and partial update.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BookPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<i64>,
    /// Defaults to today on create when omitted
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub publication_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub average_rating: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub ratings_count: Option<Option<i64>>,
}

/// Validated column values for an insert or update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub description: String,
    pub author_id: i64,
    pub publication_date: Option<Date>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<i64>,
}

impl BookPayload {
    /// Validate field shapes against `stored` (absent on create). With
    /// `partial`, omitted fields keep their stored values. Author existence
    /// is checked by the caller.
    pub fn resolve(
        self,
        stored: Option<&Book>,
        partial: bool,
        today: Date,
    ) -> Result<NewBook, AppError> {
        let mut errors = FieldErrors::new();

        let title = errors.text(
            "title",
            pick(self.title, stored.map(|b| &b.title), partial),
            Some(TITLE_MAX_LEN),
        );
        let description = errors.text(
            "description",
            pick(self.description, stored.map(|b| &b.description), partial),
            None,
        );
        let author_id = errors.required(
            "author",
            pick(self.author, stored.map(|b| &b.author_id), partial),
        );
        errors.finish()?;

        Ok(NewBook {
            title,
            description,
            author_id: author_id.unwrap_or_default(),
            publication_date: pick_nullable(
                self.publication_date,
                stored.map(|b| &b.publication_date),
                Some(today),
            ),
            average_rating: pick_nullable(
                self.average_rating,
                stored.map(|b| &b.average_rating),
                None,
            ),
            ratings_count: pick_nullable(
                self.ratings_count,
                stored.map(|b| &b.ratings_count),
                None,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn create_defaults_publication_date_to_today() {
        let payload: BookPayload = serde_json::from_str(
            r#"{"title": "The Hobbit", "description": "There and back again", "author": 1}"#,
        )
        .unwrap();
        let book = payload.resolve(None, false, date!(2024 - 08 - 20)).unwrap();

        assert_eq!(book.publication_date, Some(date!(2024 - 08 - 20)));
        assert_eq!(book.author_id, 1);
        assert_eq!(book.average_rating, None);
    }

    #[test]
    fn explicit_null_date_is_kept() {
        let payload: BookPayload = serde_json::from_str(
            r#"{"title": "Beowulf", "description": "Epic", "author": 2, "publication_date": null}"#,
        )
        .unwrap();
        let book = payload.resolve(None, false, date!(2024 - 08 - 20)).unwrap();
        assert_eq!(book.publication_date, None);
    }

    #[test]
    fn missing_author_is_a_field_error() {
        let payload: BookPayload =
            serde_json::from_str(r#"{"title": "Orphan", "description": "No author"}"#).unwrap();
        let err = payload
            .resolve(None, false, date!(2024 - 01 - 01))
            .unwrap_err();
        match err {
            AppError::Validation { details, .. } => {
                assert_eq!(details[0]["field"], "author");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn serialized_shape_uses_author_key() {
        let book = Book {
            id: 4,
            title: "Emma".to_string(),
            description: "Matchmaking".to_string(),
            author_id: 9,
            publication_date: Some(date!(1815 - 12 - 23)),
            average_rating: Some(4.0),
            ratings_count: Some(10),
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["author"], 9);
        assert_eq!(json["publication_date"], "1815-12-23");
        assert!(json.get("author_id").is_none());
    }
}
