// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::sync::Arc;
use std::{fs::File, io::BufReader};
use tokio::sync::{RwLock, RwLockReadGuard};

use notify::{RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub debug: bool,
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// The host's object cache drop-in, inspected as plain text.
    #[serde(default = "default_object_cache_file")]
    pub object_cache_file: String,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Installed plugin files, as shown in the admin plugin listing.
    #[serde(default)]
    pub plugins: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: String,
    #[serde(default)]
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "inmem".to_string(),
            url: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AdminConfig {
    /// Tokens that carry the administrative capability.
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProbeConfig {
    /// Run the start step again after reporting the end step.
    #[serde(default)]
    pub rearm_on_end: bool,
}

fn default_object_cache_file() -> String {
    "./wp-content/object-cache.php".to_string()
}

impl Config {
    pub fn read(path: &str) -> anyhow::Result<Self> {
        let file = File::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open config file {}: {}", path, e))?;
        let reader = BufReader::new(file);
        let config: Config = serde_yaml::from_reader(reader)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {}", path, e))?;
        let config = config.postprocess();
        Ok(config)
    }

    fn postprocess(mut self) -> Self {
        if self.object_cache_file.starts_with("$HOME") {
            if let Ok(home) = std::env::var("HOME") {
                self.object_cache_file = self.object_cache_file.replace("$HOME", &home);
            }
        }
        self
    }

    pub fn empty() -> Self {
        Self {
            debug: false,
            server: ServerConfig {
                port: 8007,
                host: "0.0.0.0".to_string(),
            },
            cache: CacheConfig::default(),
            object_cache_file: default_object_cache_file(),
            admin: AdminConfig::default(),
            probe: ProbeConfig::default(),
            plugins: Vec::new(),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_config(Config::empty())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub async fn load_config(&self, path: &str) -> anyhow::Result<()> {
        let config = Config::read(path)?;
        let mut write_lock = self.config.write().await;
        *write_lock = config;
        Ok(())
    }

    pub async fn get_config(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().await
    }

    /// Start watching the config file for changes and automatically reload it.
    /// The cache backend is opened once at startup and is not affected.
    pub async fn watch_config(&self, path: &str) -> anyhow::Result<()> {
        let config_path = Path::new(path).to_path_buf();
        let config = self.config.clone();
        let path_string = path.to_string();

        tokio::spawn(async move {
            let (tx, mut rx) = tokio::sync::mpsc::channel(100);

            let watcher =
                notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                    Ok(event) => {
                        let _ = tx.blocking_send(event);
                    }
                    Err(e) => {
                        error!("Error receiving event: {}", e);
                    }
                });
            let mut watcher = match watcher {
                Ok(watcher) => watcher,
                Err(e) => {
                    error!("Failed to create file watcher: {}", e);
                    return;
                }
            };

            if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
                error!("Failed to watch config file: {}", e);
                return;
            }

            info!("Started watching config_file={}", path_string);

            while let Some(event) = rx.recv().await {
                if let notify::EventKind::Access(notify::event::AccessKind::Close(
                    notify::event::AccessMode::Write,
                )) = event.kind
                {
                    info!("Write close event detected, reloading config...");
                    Self::reload_config_static(&config, &path_string).await;
                }
            }
            error!("Config watcher channel closed for {}", path_string);
        });

        Ok(())
    }

    async fn reload_config_static(config: &Arc<RwLock<Config>>, path: &str) {
        info!("Reloading config from {}", path);
        let new_config = match Config::read(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to reload config: {}", e);
                return;
            }
        };
        let mut write_lock = config.write().await;
        *write_lock = new_config;
        info!("Config reloaded successfully from {}", path);
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
