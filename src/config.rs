//! Configuration for LogKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LogKvError, Result};

/// Main configuration for a LogKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── logkv.data         (canonical append log)
    ///     └── logkv.data.merge   (only while a merge is running)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the append log
    pub sync_strategy: SyncStrategy,
}

/// Append log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Never fsync explicitly; the OS flushes on its own schedule
    Never,

    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced appends (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./logkv_data"),
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(LogKvError::Config(
                "sync strategy EveryNEntries requires count > 0".to_string(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(LogKvError::Config("data_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the append log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
