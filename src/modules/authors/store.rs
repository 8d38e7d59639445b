//! SQL access for the `authors` table.

use anyhow::Context;
use libris_db::DbPool;

use super::models::{Author, NewAuthor};
use crate::utils::like_pattern;

const SELECT_AUTHORS: &str =
    "SELECT id, name, ratings_count, average_rating, about FROM authors";
const RETURNING_AUTHOR: &str = "RETURNING id, name, ratings_count, average_rating, about";

/// All authors, optionally narrowed to names containing `search`, ignoring
/// case. Matching runs on `name_folded`, which holds the Unicode-lowercased name.
pub async fn list(db: &DbPool, search: Option<&str>) -> anyhow::Result<Vec<Author>> {
    let authors = match search.filter(|s| !s.is_empty()) {
        Some(search) => {
            let sql = format!("{SELECT_AUTHORS} WHERE name_folded LIKE ? ESCAPE '\\' ORDER BY id");
            sqlx::query_as::<_, Author>(&sql)
                .bind(like_pattern(&search.to_lowercase()))
                .fetch_all(db)
                .await
        }
        None => {
            let sql = format!("{SELECT_AUTHORS} ORDER BY id");
            sqlx::query_as::<_, Author>(&sql).fetch_all(db).await
        }
    };
    authors.context("failed to list authors")
}

pub async fn get(db: &DbPool, id: i64) -> anyhow::Result<Option<Author>> {
    let sql = format!("{SELECT_AUTHORS} WHERE id = ?");
    sqlx::query_as::<_, Author>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .with_context(|| format!("failed to load author {id}"))
}

pub async fn exists(db: &DbPool, id: i64) -> anyhow::Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM authors WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to check author")?;
    Ok(found.is_some())
}

/// Oldest author with exactly this name.
pub async fn find_by_name(db: &DbPool, name: &str) -> anyhow::Result<Option<Author>> {
    let sql = format!("{SELECT_AUTHORS} WHERE name = ? ORDER BY id LIMIT 1");
    sqlx::query_as::<_, Author>(&sql)
        .bind(name)
        .fetch_optional(db)
        .await
        .context("failed to look up author by name")
}

pub async fn insert(db: &DbPool, author: &NewAuthor) -> anyhow::Result<Author> {
    let sql = format!(
        "INSERT INTO authors (name, name_folded, ratings_count, average_rating, about)
         VALUES (?, ?, ?, ?, ?) {RETURNING_AUTHOR}"
    );
    sqlx::query_as::<_, Author>(&sql)
        .bind(&author.name)
        .bind(author.name.to_lowercase())
        .bind(author.ratings_count)
        .bind(author.average_rating)
        .bind(&author.about)
        .fetch_one(db)
        .await
        .context("failed to insert author")
}

pub async fn update(db: &DbPool, id: i64, author: &NewAuthor) -> anyhow::Result<Option<Author>> {
    let sql = format!(
        "UPDATE authors SET name = ?, name_folded = ?, ratings_count = ?, average_rating = ?,
            about = ?
         WHERE id = ? {RETURNING_AUTHOR}"
    );
    sqlx::query_as::<_, Author>(&sql)
        .bind(&author.name)
        .bind(author.name.to_lowercase())
        .bind(author.ratings_count)
        .bind(author.average_rating)
        .bind(&author.about)
        .bind(id)
        .fetch_optional(db)
        .await
        .with_context(|| format!("failed to update author {id}"))
}

/// Delete an author; their books go with them.
pub async fn delete(db: &DbPool, id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM authors WHERE id = ?")
        .bind(id)
        .execute(db)
        .await
        .with_context(|| format!("failed to delete author {id}"))?;
    Ok(result.rows_affected() > 0)
}
