// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions},
    Executor, Row,
};
use tracing::{debug, error, info};

use crate::cache::types::ObjectCache;

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// An in-memory database lives and dies with its only connection, so that
/// connection must never be reaped by the pool.
pub(crate) fn pool_options(url: &str) -> SqlitePoolOptions {
    let options = SqlitePoolOptions::new().max_connections(1);
    if is_memory_url(url) {
        options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options
    }
}

pub struct SqliteCache {
    db: SqlitePool,
}

impl SqliteCache {
    pub async fn new(url: &str) -> Result<Self> {
        info!("Connecting to sqlite object cache at url={}", url);
        if url.starts_with("sqlite://") {
            let path = url.trim_start_matches("sqlite://");
            if !std::path::Path::new(path).exists() {
                debug!("Creating new SQLite database file at {}", path);
                std::fs::File::create(path)?;
            }
        }
        let db = pool_options(url).connect(url).await?;
        let ret = Self { db };

        ret.init().await?;

        Ok(ret)
    }

    async fn init(&self) -> Result<()> {
        let mut tx = self.db.begin().await?;
        tx.execute(
            "CREATE TABLE IF NOT EXISTS object_cache (grp TEXT NOT NULL, key TEXT NOT NULL, value TEXT NOT NULL, expires_at INTEGER NOT NULL, PRIMARY KEY (grp, key))",
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectCache for SqliteCache {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str, group: &str) -> Option<String> {
        let rec = sqlx::query(
            r#"SELECT value FROM object_cache WHERE grp = ? AND key = ? AND expires_at > ?"#,
        )
        .bind(group)
        .bind(key)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.db)
        .await;

        match rec {
            Ok(rec) => rec.map(|row| row.get::<String, _>("value")),
            Err(e) => {
                error!("Error reading cache key={} group={}: {}", key, group, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, group: &str, ttl: Duration) -> bool {
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        let ret = sqlx::query(
            r#"INSERT OR REPLACE INTO object_cache (grp, key, value, expires_at) VALUES (?, ?, ?, ?)"#,
        )
        .bind(group)
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.db)
        .await;

        match ret {
            Ok(_) => true,
            Err(e) => {
                error!("Error writing cache key={} group={}: {}", key, group, e);
                false
            }
        }
    }

    async fn delete(&self, key: &str, group: &str) -> bool {
        let ret = sqlx::query(
            r#"DELETE FROM object_cache WHERE grp = ? AND key = ? AND expires_at > ?"#,
        )
        .bind(group)
        .bind(key)
        .bind(Utc::now().timestamp())
        .execute(&self.db)
        .await;

        match ret {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                error!("Error deleting cache key={} group={}: {}", key, group, e);
                false
            }
        }
    }
}
