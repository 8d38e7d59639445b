//! SQLite connection factory and migration runner for Libris.

use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Shared connection pool handed to every module.
pub type DbPool = SqlitePool;

/// Migration definition contributed by a module
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Open a pool against `url` with foreign keys enforced on every connection.
///
/// In-memory databases live and die with their connection, so they are
/// pinned to a single connection that is never recycled.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<DbPool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url '{url}'"))?
        .foreign_keys(true)
        .create_if_missing(true);

    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{url}'"))?;

    tracing::info!(target: "libris-db", in_memory, "database pool ready");
    Ok(pool)
}

/// Apply pending migrations in the given order, recording each one.
///
/// Each migration runs in its own transaction; already applied ids are skipped.
pub async fn migrate(pool: &DbPool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            module TEXT NOT NULL,
            id TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (module, id)
        )",
    )
    .execute(pool)
    .await
    .context("failed to create migration ledger")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM _migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {module}/{} failed", migration.id))?;
        sqlx::query("INSERT INTO _migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(target: "libris-db", module = %module, id = migration.id, "applied migration");
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<(String, Migration)> {
        vec![(
            "shelf".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE shelf (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
                     CREATE INDEX shelf_label ON shelf (label);",
            },
        )]
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let pool = connect("sqlite::memory:", 5).await.unwrap();

        assert_eq!(migrate(&pool, &sample()).await.unwrap(), 1);
        assert_eq!(migrate(&pool, &sample()).await.unwrap(), 0);

        sqlx::query("INSERT INTO shelf (label) VALUES ('fiction')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        sqlx::raw_sql(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id));",
        )
        .execute(&pool)
        .await
        .unwrap();

        let orphan = sqlx::query("INSERT INTO child (parent_id) VALUES (42)")
            .execute(&pool)
            .await;
        assert!(orphan.is_err());
    }
}
