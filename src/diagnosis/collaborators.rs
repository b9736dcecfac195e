// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::config::AdminConfig;

/// Capability required to run the diagnostic.
pub const ADMIN_CAPABILITY: &str = "manage_options";

pub trait Authorizer: Send + Sync {
    fn current_user_can(&self, capability: &str) -> bool;
}

/// Grants the admin capability to callers presenting a configured token.
pub struct TokenAuthorizer {
    is_admin: bool,
}

impl TokenAuthorizer {
    pub fn new(token: Option<&str>, admin: &AdminConfig) -> Self {
        let is_admin = match token {
            Some(token) if !token.is_empty() => admin.tokens.iter().any(|t| t == token),
            _ => false,
        };
        Self { is_admin }
    }
}

impl Authorizer for TokenAuthorizer {
    fn current_user_can(&self, capability: &str) -> bool {
        self.is_admin && capability == ADMIN_CAPABILITY
    }
}

/// The object cache drop-in, read as raw text.
pub trait ConfigSource: Send + Sync {
    fn path(&self) -> &str;
    fn is_readable(&self) -> bool;
    fn read_to_string(&self) -> std::io::Result<String>;
}

pub struct FileConfigSource {
    path: PathBuf,
    display: String,
}

impl FileConfigSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        Self { path, display }
    }
}

impl ConfigSource for FileConfigSource {
    fn path(&self) -> &str {
        &self.display
    }

    fn is_readable(&self) -> bool {
        self.path.is_file() && File::open(&self.path).is_ok()
    }

    fn read_to_string(&self) -> std::io::Result<String> {
        // drop-ins are php, but tolerate stray bytes
        let bytes = fs::read(&self.path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Ordered, unbuffered output of a diagnostic run.
pub trait Sink: Send {
    fn emit(&mut self, fragment: String);
}

impl Sink for Vec<String> {
    fn emit(&mut self, fragment: String) {
        self.push(fragment);
    }
}

/// Forwards every fragment as soon as it is produced, for streamed responses.
pub struct ChannelSink {
    tx: UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Sink for ChannelSink {
    fn emit(&mut self, fragment: String) {
        if self.tx.send(fragment).is_err() {
            debug!("Client went away, dropping output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(tokens: &[&str]) -> AdminConfig {
        AdminConfig {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_token_authorizer() {
        let config = admin(&["secret"]);
        assert!(TokenAuthorizer::new(Some("secret"), &config).current_user_can(ADMIN_CAPABILITY));
        assert!(!TokenAuthorizer::new(Some("secret"), &config).current_user_can("edit_posts"));
        assert!(!TokenAuthorizer::new(Some("wrong"), &config).current_user_can(ADMIN_CAPABILITY));
        assert!(!TokenAuthorizer::new(None, &config).current_user_can(ADMIN_CAPABILITY));
        // an empty token never matches, even if configured
        assert!(!TokenAuthorizer::new(Some(""), &admin(&[""])).current_user_can(ADMIN_CAPABILITY));
    }

    #[test]
    fn test_file_config_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("object-cache.php");

        let source = FileConfigSource::new(&path);
        assert!(!source.is_readable());
        assert!(source.read_to_string().is_err());

        fs::write(&path, "<?php $r = new Redis();").unwrap();
        assert!(source.is_readable());
        assert_eq!(source.read_to_string().unwrap(), "<?php $r = new Redis();");
        assert!(source.path().ends_with("object-cache.php"));

        // a directory is not a readable drop-in
        assert!(!FileConfigSource::new(dir.path()).is_readable());
    }

    #[tokio::test]
    async fn test_channel_sink_keeps_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        sink.emit("one".to_string());
        sink.emit("two".to_string());
        drop(sink);
        assert_eq!(rx.recv().await, Some("one".to_string()));
        assert_eq!(rx.recv().await, Some("two".to_string()));
        assert_eq!(rx.recv().await, None);
    }
}
