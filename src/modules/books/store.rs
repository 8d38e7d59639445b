//! SQL access for the `books` table.

use anyhow::Context;
use libris_db::DbPool;

use super::models::{Book, NewBook};
use crate::utils::like_pattern;

pub(crate) const SELECT_BOOKS: &str = "SELECT id, title, description, author_id, \
     publication_date, average_rating, ratings_count FROM books";
const RETURNING_BOOK: &str = "RETURNING id, title, description, author_id, \
     publication_date, average_rating, ratings_count";

/// Books whose title or author's name contains `search`, ignoring case.
/// Matching runs on the Unicode-lowercased `title_folded` and `name_folded`
/// columns because SQLite's `LIKE` only folds ASCII.
/// An empty or absent search returns the whole catalog.
pub async fn search(db: &DbPool, search: Option<&str>) -> anyhow::Result<Vec<Book>> {
    let books = match search.filter(|s| !s.is_empty()) {
        Some(search) => {
            let pattern = like_pattern(&search.to_lowercase());
            let sql = format!(
                "{SELECT_BOOKS}
                 WHERE title_folded LIKE ? ESCAPE '\\'
                    OR author_id IN (SELECT id FROM authors WHERE name_folded LIKE ? ESCAPE '\\')
                 ORDER BY id"
            );
            sqlx::query_as::<_, Book>(&sql)
                .bind(&pattern)
                .bind(&pattern)
                .fetch_all(db)
                .await
        }
        None => {
            let sql = format!("{SELECT_BOOKS} ORDER BY id");
            sqlx::query_as::<_, Book>(&sql).fetch_all(db).await
        }
    };
    books.context("failed to search books")
}

pub async fn get(db: &DbPool, id: i64) -> anyhow::Result<Option<Book>> {
    let sql = format!("{SELECT_BOOKS} WHERE id = ?");
    sqlx::query_as::<_, Book>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .with_context(|| format!("failed to load book {id}"))
}

pub async fn insert(db: &DbPool, book: &NewBook) -> anyhow::Result<Book> {
    let sql = format!(
        "INSERT INTO books
            (title, title_folded, description, author_id, publication_date, average_rating,
             ratings_count)
         VALUES (?, ?, ?, ?, ?, ?, ?) {RETURNING_BOOK}"
    );
    sqlx::query_as::<_, Book>(&sql)
        .bind(&book.title)
        .bind(book.title.to_lowercase())
        .bind(&book.description)
        .bind(book.author_id)
        .bind(book.publication_date)
        .bind(book.average_rating)
        .bind(book.ratings_count)
        .fetch_one(db)
        .await
        .context("failed to insert book")
}

pub async fn update(db: &DbPool, id: i64, book: &NewBook) -> anyhow::Result<Option<Book>> {
    let sql = format!(
        "UPDATE books SET title = ?, title_folded = ?, description = ?, author_id = ?,
            publication_date = ?, average_rating = ?, ratings_count = ?
         WHERE id = ? {RETURNING_BOOK}"
    );
    sqlx::query_as::<_, Book>(&sql)
        .bind(&book.title)
        .bind(book.title.to_lowercase())
        .bind(&book.description)
        .bind(book.author_id)
        .bind(book.publication_date)
        .bind(book.average_rating)
        .bind(book.ratings_count)
        .bind(id)
        .fetch_optional(db)
        .await
        .with_context(|| format!("failed to update book {id}"))
}

pub async fn delete(db: &DbPool, id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(db)
        .await
        .with_context(|| format!("failed to delete book {id}"))?;
    Ok(result.rows_affected() > 0)
}
