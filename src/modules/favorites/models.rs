use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A user's bookmark on one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Favorite {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    #[serde(rename = "book")]
    pub book_id: i64,
}

/// Body of both `POST` and `DELETE /favorites`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FavoriteRequest {
    #[serde(default)]
    pub book_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorite_serializes_with_short_keys() {
        let favorite = Favorite {
            id: 1,
            user_id: 2,
            book_id: 3,
        };
        assert_eq!(
            serde_json::to_value(&favorite).unwrap(),
            serde_json::json!({ "id": 1, "user": 2, "book": 3 })
        );
    }
}
