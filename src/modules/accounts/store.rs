//! SQL access for the `users` table.

use anyhow::Context;
use libris_db::DbPool;

use super::models::User;

pub async fn find_by_username(db: &DbPool, username: &str) -> anyhow::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(db)
    .await
    .context("failed to look up user")
}

pub async fn username_taken(db: &DbPool, username: &str) -> anyhow::Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(db)
        .await
        .context("failed to check username")?;
    Ok(found.is_some())
}

/// Emails compare case-insensitively.
pub async fn email_taken(db: &DbPool, email: &str) -> anyhow::Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(db)
            .await
            .context("failed to check email")?;
    Ok(found.is_some())
}

pub async fn count(db: &DbPool) -> anyhow::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
        .context("failed to count users")
}

/// Insert a user. A unique-constraint violation comes back as `Ok(None)`.
pub async fn insert(
    db: &DbPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> anyhow::Result<Option<User>> {
    let inserted = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)
         RETURNING id, username, email, password_hash",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(db)
    .await;

    match inserted {
        Ok(user) => Ok(Some(user)),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Ok(None),
        Err(err) => Err(err).context("failed to insert user"),
    }
}
