// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::time::Duration;

use crate::cache::types::ObjectCache;
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, error};

pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        debug!("Creating redis cache with url: {}", url);
        let client = redis::Client::open(url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                error!("Failed to get redis client: {}", e);
                None
            }
        }
    }
}

fn redis_key(key: &str, group: &str) -> String {
    format!("{}:{}", group, key)
}

#[async_trait]
impl ObjectCache for RedisCache {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str, group: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        match conn.get::<_, Option<String>>(redis_key(key, group)).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to get redis key: {}", e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, group: &str, ttl: Duration) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        // redis refuses EX 0
        let seconds = ttl.as_secs().max(1);
        match conn
            .set_ex::<_, _, ()>(redis_key(key, group), value, seconds)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to set redis key: {}", e);
                false
            }
        }
    }

    async fn delete(&self, key: &str, group: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        match conn.del::<_, i64>(redis_key(key, group)).await {
            Ok(removed) => removed > 0,
            Err(e) => {
                error!("Failed to delete redis key: {}", e);
                false
            }
        }
    }
}
