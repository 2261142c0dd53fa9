use prospect_core::{
    BlockedAuthor, CoreError, DatabaseError, DiscoveredMatch, KeywordEntry, MatchStatus, NewMatch,
    SyncCursor,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info};

#[cfg(test)]
mod tests;

/// Fixed key of the single crawl-progress row.
pub const SYNC_CURSOR_ID: &str = "primary";

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "create_keywords",
        r#"
        CREATE TABLE IF NOT EXISTS keywords (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL,
            keyword TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (product_id, keyword)
        )
        "#,
    ),
    (
        "create_blocked_authors",
        r#"
        CREATE TABLE IF NOT EXISTS blocked_authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER,
            username TEXT NOT NULL
        )
        "#,
    ),
    (
        "create_matches",
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL,
            external_id TEXT NOT NULL,
            title TEXT,
            body_preview TEXT NOT NULL,
            subreddit TEXT NOT NULL,
            url TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            discovered_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            is_new INTEGER NOT NULL DEFAULT 1,
            matched_keyword TEXT NOT NULL,
            UNIQUE (product_id, external_id)
        )
        "#,
    ),
    (
        "create_sync_cursor",
        r#"
        CREATE TABLE IF NOT EXISTS sync_cursor (
            id TEXT PRIMARY KEY,
            last_post_id TEXT NOT NULL,
            last_comment_id TEXT,
            updated_at INTEGER NOT NULL
        )
        "#,
    ),
];

pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

fn sql_err(e: sqlx::Error) -> CoreError {
    CoreError::Database(DatabaseError::Sql(e))
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| {
                CoreError::Database(DatabaseError::ConnectionFailed {
                    reason: e.to_string(),
                })
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                CoreError::Database(DatabaseError::ConnectionFailed {
                    reason: e.to_string(),
                })
            })?;

        self.pool = Some(pool);
        info!("Connected to database");
        Ok(())
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool.as_ref().ok_or_else(|| {
            CoreError::Database(DatabaseError::ConnectionFailed {
                reason: "connect() has not been called".to_string(),
            })
        })
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        let pool = self.pool()?;
        for &(name, sql) in MIGRATIONS {
            sqlx::query(sql).execute(pool).await.map_err(|e| {
                tracing::error!("Migration {} failed: {}", name, e);
                CoreError::Database(DatabaseError::MigrationFailed {
                    migration: name.to_string(),
                })
            })?;
        }
        info!("Database migrations complete");
        Ok(())
    }

    pub async fn add_keyword(&self, product_id: i64, keyword: &str) -> Result<(), CoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT OR IGNORE INTO keywords (product_id, keyword, created_at) VALUES (?, ?, ?)",
        )
        .bind(product_id)
        .bind(keyword)
        .bind(now)
        .execute(self.pool()?)
        .await
        .map_err(sql_err)?;
        Ok(())
    }

    pub async fn get_keywords(&self) -> Result<Vec<KeywordEntry>, CoreError> {
        let rows = sqlx::query("SELECT product_id, keyword FROM keywords ORDER BY id")
            .fetch_all(self.pool()?)
            .await
            .map_err(sql_err)?;

        Ok(rows
            .into_iter()
            .map(|row| KeywordEntry {
                product_id: row.get("product_id"),
                keyword: row.get("keyword"),
            })
            .collect())
    }

    pub async fn add_blocked_author(
        &self,
        product_id: Option<i64>,
        username: &str,
    ) -> Result<(), CoreError> {
        sqlx::query("INSERT INTO blocked_authors (product_id, username) VALUES (?, ?)")
            .bind(product_id)
            .bind(username)
            .execute(self.pool()?)
            .await
            .map_err(sql_err)?;
        Ok(())
    }

    pub async fn get_blocked_authors(&self) -> Result<Vec<BlockedAuthor>, CoreError> {
        let rows = sqlx::query("SELECT product_id, username FROM blocked_authors ORDER BY id")
            .fetch_all(self.pool()?)
            .await
            .map_err(sql_err)?;

        Ok(rows
            .into_iter()
            .map(|row| BlockedAuthor {
                product_id: row.get("product_id"),
                username: row.get("username"),
            })
            .collect())
    }

    /// The (product_id, external_id) pairs already discovered, loaded once
    /// per cycle so deduplication never queries per candidate.
    pub async fn existing_match_keys(&self) -> Result<HashSet<(i64, String)>, CoreError> {
        let rows = sqlx::query("SELECT product_id, external_id FROM matches")
            .fetch_all(self.pool()?)
            .await
            .map_err(sql_err)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("product_id"), row.get("external_id")))
            .collect())
    }

    /// Bulk insert; duplicates hitting the unique key are ignored, so a
    /// replayed cycle is a no-op. Returns the number of rows actually added.
    pub async fn insert_matches(&self, matches: &[NewMatch]) -> Result<u64, CoreError> {
        let pool = self.pool()?;
        let mut inserted = 0;
        for entry in matches {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO matches (
                    product_id, external_id, title, body_preview, subreddit,
                    url, created_at, discovered_at, status, is_new, matched_keyword
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', 1, ?)
                "#,
            )
            .bind(entry.product_id)
            .bind(&entry.external_id)
            .bind(&entry.title)
            .bind(&entry.body_preview)
            .bind(&entry.subreddit)
            .bind(&entry.url)
            .bind(entry.created_at)
            .bind(entry.discovered_at)
            .bind(&entry.matched_keyword)
            .execute(pool)
            .await
            .map_err(sql_err)?;
            inserted += result.rows_affected();
        }
        debug!("Inserted {}/{} new matches", inserted, matches.len());
        Ok(inserted)
    }

    pub async fn get_matches(
        &self,
        product_id: Option<i64>,
    ) -> Result<Vec<DiscoveredMatch>, CoreError> {
        let rows = match product_id {
            Some(product_id) => {
                sqlx::query(
                    "SELECT * FROM matches WHERE product_id = ? ORDER BY discovered_at DESC",
                )
                .bind(product_id)
                .fetch_all(self.pool()?)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM matches ORDER BY discovered_at DESC")
                    .fetch_all(self.pool()?)
                    .await
            }
        }
        .map_err(sql_err)?;

        Ok(rows
            .into_iter()
            .map(|row| DiscoveredMatch {
                id: row.get("id"),
                product_id: row.get("product_id"),
                external_id: row.get("external_id"),
                title: row.get("title"),
                body_preview: row.get("body_preview"),
                subreddit: row.get("subreddit"),
                url: row.get("url"),
                created_at: row.get("created_at"),
                discovered_at: row.get("discovered_at"),
                status: MatchStatus::parse(row.get::<String, _>("status").as_str()),
                is_new: row.get("is_new"),
                matched_keyword: row.get("matched_keyword"),
            })
            .collect())
    }

    pub async fn get_sync_cursor(&self) -> Result<Option<SyncCursor>, CoreError> {
        let row = sqlx::query(
            "SELECT last_post_id, last_comment_id, updated_at FROM sync_cursor WHERE id = ?",
        )
        .bind(SYNC_CURSOR_ID)
        .fetch_optional(self.pool()?)
        .await
        .map_err(sql_err)?;

        Ok(row.map(|row| SyncCursor {
            last_post_id: row.get("last_post_id"),
            last_comment_id: row.get("last_comment_id"),
            updated_at: row.get("updated_at"),
        }))
    }

    pub async fn save_sync_cursor(&self, cursor: &SyncCursor) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_cursor (id, last_post_id, last_comment_id, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                last_post_id = excluded.last_post_id,
                last_comment_id = excluded.last_comment_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(SYNC_CURSOR_ID)
        .bind(&cursor.last_post_id)
        .bind(&cursor.last_comment_id)
        .bind(cursor.updated_at)
        .execute(self.pool()?)
        .await
        .map_err(sql_err)?;
        debug!("Sync cursor advanced to {}", cursor.last_post_id);
        Ok(())
    }
}
