// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::sync::Arc;

use tracing::info;

use crate::cache::inmem::InMemCache;
use crate::cache::null::NullCache;
use crate::cache::redis::RedisCache;
use crate::cache::sqlite::SqliteCache;
use crate::cache::types::ObjectCache;
use crate::config::CacheConfig;
use crate::types::CacheConfigError;

/// Opens the object cache backend named in the configuration.
pub async fn open_cache(config: &CacheConfig) -> Result<Arc<dyn ObjectCache>, CacheConfigError> {
    let cache: Arc<dyn ObjectCache> = match config.backend.as_str() {
        "inmem" => Arc::new(InMemCache::new()),
        "null" => Arc::new(NullCache::new()),
        "redis" => Arc::new(RedisCache::new(&config.url).map_err(|e| {
            CacheConfigError::Connect {
                backend: config.backend.clone(),
                message: e.to_string(),
            }
        })?),
        "sqlite" => Arc::new(SqliteCache::new(&config.url).await.map_err(|e| {
            CacheConfigError::Connect {
                backend: config.backend.clone(),
                message: e.to_string(),
            }
        })?),
        other => {
            return Err(CacheConfigError::UnknownBackend {
                backend: other.to_string(),
            })
        }
    };
    info!("Using object cache backend={}", cache.name());
    Ok(cache)
}
