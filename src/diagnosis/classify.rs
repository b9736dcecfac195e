// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cache technology inferred from the object cache drop-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    Memcached,
    Memcache,
    FileCache,
    Redis,
    Sqlite3,
    Unknown,
}

impl Backend {
    pub fn label(&self) -> &'static str {
        match self {
            Backend::Memcached => "Memcached",
            Backend::Memcache => "Memcache",
            Backend::FileCache => "File Cache",
            Backend::Redis => "Redis",
            Backend::Sqlite3 => "SQLite3",
            Backend::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Backend::Unknown
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct Rule {
    /// Lowercase markers, any of which selects the backend.
    markers: &'static [&'static str],
    backend: Backend,
}

// Order matters: "new memcache" is a prefix of "new memcached".
const RULES: &[Rule] = &[
    Rule {
        markers: &["new memcached", "new \\memcached"],
        backend: Backend::Memcached,
    },
    Rule {
        markers: &["new memcache", "new \\memcache"],
        backend: Backend::Memcache,
    },
    Rule {
        markers: &["filecache", "file cache", "cache-file"],
        backend: Backend::FileCache,
    },
    Rule {
        markers: &["new redis", "new \\redis", "new predis", "new \\predis"],
        backend: Backend::Redis,
    },
    Rule {
        markers: &["new sqlite3", "new \\sqlite3"],
        backend: Backend::Sqlite3,
    },
];

/// Classifies the drop-in source by case-insensitive substring search. The
/// first matching rule wins.
pub fn classify(content: &str) -> Backend {
    let haystack = content.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.markers.iter().any(|m| haystack.contains(m)))
        .map(|rule| rule.backend)
        .unwrap_or(Backend::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_backend() {
        assert_eq!(classify("$m = new Memcached();"), Backend::Memcached);
        assert_eq!(classify("$m = new \\Memcached();"), Backend::Memcached);
        assert_eq!(classify("$m = new Memcache;"), Backend::Memcache);
        assert_eq!(classify("$m = new \\Memcache;"), Backend::Memcache);
        assert_eq!(classify("// WP FileCache drop-in"), Backend::FileCache);
        assert_eq!(classify("Simple File Cache"), Backend::FileCache);
        assert_eq!(classify("$dir = 'cache-file';"), Backend::FileCache);
        assert_eq!(classify("$r = new Redis();"), Backend::Redis);
        assert_eq!(classify("$r = new \\Redis();"), Backend::Redis);
        assert_eq!(classify("$r = new Predis\\Client();"), Backend::Redis);
        assert_eq!(classify("$r = new \\Predis\\Client();"), Backend::Redis);
        assert_eq!(classify("$db = new SQLite3($path);"), Backend::Sqlite3);
        assert_eq!(classify("$db = new \\SQLite3($path);"), Backend::Sqlite3);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("NEW REDIS()"), Backend::Redis);
        assert_eq!(classify("new memCACHED"), Backend::Memcached);
        assert_eq!(classify("FILECACHE"), Backend::FileCache);
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            classify("$a = new Redis(); $b = new Memcached();"),
            Backend::Memcached
        );
        assert_eq!(
            classify("$a = new SQLite3(); $b = new Memcache();"),
            Backend::Memcache
        );
        assert_eq!(
            classify("file cache fallback; $r = new Redis();"),
            Backend::FileCache
        );
        assert_eq!(classify("new SQLite3; new Predis"), Backend::Redis);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(""), Backend::Unknown);
        assert_eq!(classify("<?php // apcu object cache"), Backend::Unknown);
        // needs the constructor, not just the name
        assert_eq!(classify("Redis is great"), Backend::Unknown);
        assert!(!Backend::Unknown.is_known());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Backend::FileCache.to_string(), "File Cache");
        assert_eq!(Backend::Sqlite3.label(), "SQLite3");
        assert_eq!(Backend::Unknown.label(), "Unknown");
    }
}
