// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::time::Duration;

use crate::cache::types::ObjectCache;
use async_trait::async_trait;
use tracing::debug;

/// The silent fallback: accepts every write and forgets it.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using null object cache, nothing will persist");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectCache for NullCache {
    fn name(&self) -> &str {
        "null"
    }

    async fn get(&self, _key: &str, _group: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _group: &str, _ttl: Duration) -> bool {
        true
    }

    async fn delete(&self, _key: &str, _group: &str) -> bool {
        false
    }
}
