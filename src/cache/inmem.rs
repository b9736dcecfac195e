// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::types::ObjectCache;
use async_trait::async_trait;
use tokio::sync::RwLock;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process local cache. Only useful when the diagnostic and the host share a
/// process, which is exactly the case where a round trip proves little.
pub struct InMemCache {
    cache: RwLock<HashMap<(String, String), Entry>>,
}

impl InMemCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemCache {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_key(key: &str, group: &str) -> (String, String) {
    (group.to_string(), key.to_string())
}

#[async_trait]
impl ObjectCache for InMemCache {
    fn name(&self) -> &str {
        "inmem"
    }

    async fn get(&self, key: &str, group: &str) -> Option<String> {
        let k = entry_key(key, group);
        {
            let cache = self.cache.read().await;
            match cache.get(&k) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // expired, purge it
        self.cache.write().await.remove(&k);
        None
    }

    async fn set(&self, key: &str, value: &str, group: &str, ttl: Duration) -> bool {
        self.cache.write().await.insert(
            entry_key(key, group),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        true
    }

    async fn delete(&self, key: &str, group: &str) -> bool {
        match self.cache.write().await.remove(&entry_key(key, group)) {
            Some(entry) => entry.expires_at > Instant::now(),
            None => false,
        }
    }
}
