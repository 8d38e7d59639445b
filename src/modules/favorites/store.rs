//! SQL access for the `favorites` table.

use anyhow::Context;
use libris_db::DbPool;

use super::models::Favorite;
use crate::modules::books::{models::Book, store::SELECT_BOOKS};

/// Outcome of [`add`].
#[derive(Debug)]
pub enum Added {
    Created(Favorite),
    AlreadyPresent,
    /// The user row no longer exists.
    UnknownUser,
}

/// Insert the pair unless it already exists; the unique constraint settles
/// concurrent adds.
pub async fn add(db: &DbPool, user_id: i64, book_id: i64) -> anyhow::Result<Added> {
    let inserted = sqlx::query_as::<_, Favorite>(
        "INSERT INTO favorites (user_id, book_id) VALUES (?, ?)
         ON CONFLICT (user_id, book_id) DO NOTHING
         RETURNING id, user_id, book_id",
    )
    .bind(user_id)
    .bind(book_id)
    .fetch_optional(db)
    .await;

    match inserted {
        Ok(Some(favorite)) => Ok(Added::Created(favorite)),
        Ok(None) => Ok(Added::AlreadyPresent),
        Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => Ok(Added::UnknownUser),
        Err(err) => Err(err).context("failed to add favorite"),
    }
}

/// Returns whether a row was removed.
pub async fn remove(db: &DbPool, user_id: i64, book_id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND book_id = ?")
        .bind(user_id)
        .bind(book_id)
        .execute(db)
        .await
        .context("failed to remove favorite")?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_for_user(db: &DbPool, user_id: i64) -> anyhow::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("failed to count favorites")
}

/// The user's favorited books, in the order they were favorited.
pub async fn books_for_user(db: &DbPool, user_id: i64) -> anyhow::Result<Vec<Book>> {
    let sql = format!(
        "{SELECT_BOOKS}
         WHERE id IN (SELECT book_id FROM favorites WHERE user_id = ?)
         ORDER BY (SELECT f.id FROM favorites f WHERE f.book_id = books.id AND f.user_id = ?)"
    );
    sqlx::query_as::<_, Book>(&sql)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(db)
        .await
        .with_context(|| format!("failed to load favorites of user {user_id}"))
}

/// Every book the user has not favorited, ordered by id.
pub async fn books_excluding_favorites(db: &DbPool, user_id: i64) -> anyhow::Result<Vec<Book>> {
    let sql = format!(
        "{SELECT_BOOKS}
         WHERE id NOT IN (SELECT book_id FROM favorites WHERE user_id = ?)
         ORDER BY id"
    );
    sqlx::query_as::<_, Book>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .with_context(|| format!("failed to load candidate books for user {user_id}"))
}
