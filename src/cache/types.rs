// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::time::Duration;

use async_trait::async_trait;

/// The object cache API as seen by the diagnostic. Every entry lives inside a
/// group (namespace) and carries its own time to live.
#[async_trait]
pub trait ObjectCache: Send + Sync {
    fn name(&self) -> &str;
    async fn get(&self, key: &str, group: &str) -> Option<String>;
    /// Returns whether the backend accepted the write. Note that a no-op
    /// backend happily says yes.
    async fn set(&self, key: &str, value: &str, group: &str, ttl: Duration) -> bool;
    async fn delete(&self, key: &str, group: &str) -> bool;
}

/// Values the host stores for boolean `true`.
pub fn is_truthy(value: Option<&str>) -> bool {
    match value {
        Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        None => false,
    }
}
