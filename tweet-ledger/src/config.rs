//! Configuration for the tweet ledger

use crate::types::Principal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Owner principal for a fresh ledger
    #[serde(default)]
    pub owner: Option<String>,

    /// Metrics listen address
    pub metrics_listen_addr: String,

    /// Actor mailbox capacity (bounded for backpressure)
    pub mailbox_capacity: usize,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/tweet-ledger"),
            service_name: "tweet-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            owner: None,
            metrics_listen_addr: "0.0.0.0:9090".to_string(),
            mailbox_capacity: 1000,
            rocksdb: RocksDBConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Compress the event log with zstd
    pub compress_events: bool,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_background_jobs: 2,
            compress_events: true,
            enable_statistics: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("TWEET_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(owner) = std::env::var("TWEET_LEDGER_OWNER") {
            config.owner = Some(owner);
        }

        if let Ok(addr) = std::env::var("TWEET_LEDGER_METRICS_ADDR") {
            config.metrics_listen_addr = addr;
        }

        if let Ok(capacity) = std::env::var("TWEET_LEDGER_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid TWEET_LEDGER_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        Ok(config)
    }

    /// Configured owner, if any
    pub fn owner_principal(&self) -> Option<Principal> {
        self.owner.as_deref().map(Principal::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "tweet-ledger");
        assert_eq!(config.mailbox_capacity, 1000);
        assert!(config.owner_principal().is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/var/lib/tweet-ledger"
service_name = "tweet-ledger"
service_version = "0.1.0"
owner = "deployer"
metrics_listen_addr = "127.0.0.1:9100"
mailbox_capacity = 16

[rocksdb]
write_buffer_size_mb = 32
max_background_jobs = 1
compress_events = false
enable_statistics = true
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.owner_principal(), Some(Principal::new("deployer")));
        assert_eq!(config.mailbox_capacity, 16);
        assert!(!config.rocksdb.compress_events);
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "data_dir = ").unwrap();

        assert!(matches!(Config::from_file(&path), Err(crate::Error::Config(_))));
    }
}
