//! Configuration for bolty
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::codec::Codec;

/// Main configuration for a bolty store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // File Configuration
    // -------------------------------------------------------------------------
    /// Path of the database file (created on first open)
    pub path: PathBuf,

    /// Permission bits used when the file is created (Unix only)
    pub file_mode: u32,

    /// Backend page cache size in bytes (None = redb default)
    pub cache_size: Option<usize>,

    // -------------------------------------------------------------------------
    // Commit Configuration
    // -------------------------------------------------------------------------
    /// How each committed write transaction reaches disk
    pub durability: CommitDurability,

    /// How long a writer waits for the write lock (None = wait forever)
    pub write_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Value Configuration
    // -------------------------------------------------------------------------
    /// Encoding used by `set` / `get_as`
    pub codec: Codec,

    // -------------------------------------------------------------------------
    // Scan Configuration
    // -------------------------------------------------------------------------
    /// Max records pulled from the backend per prefix-scan batch
    pub scan_batch_size: usize,
}

/// Commit durability mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitDurability {
    /// fsync on every commit (safest, slowest)
    #[default]
    SyncPerCommit,

    /// Commits become durable later, in batches; `close()` forces a final sync
    Batched,
}

impl CommitDurability {
    pub(crate) fn to_redb(self) -> redb::Durability {
        match self {
            CommitDurability::SyncPerCommit => redb::Durability::Immediate,
            CommitDurability::Batched => redb::Durability::Eventual,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./bolty.db"),
            file_mode: 0o600,
            cache_size: None,
            durability: CommitDurability::SyncPerCommit,
            write_timeout: None,
            codec: Codec::Json,
            scan_batch_size: 1000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the database file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the permission bits for a newly created file
    pub fn file_mode(mut self, mode: u32) -> Self {
        self.config.file_mode = mode;
        self
    }

    /// Set the backend cache size (in bytes)
    pub fn cache_size(mut self, bytes: usize) -> Self {
        self.config.cache_size = Some(bytes);
        self
    }

    /// Set the commit durability mode
    pub fn durability(mut self, durability: CommitDurability) -> Self {
        self.config.durability = durability;
        self
    }

    /// Set the write-lock acquisition timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = Some(timeout);
        self
    }

    /// Set the value codec
    pub fn codec(mut self, codec: Codec) -> Self {
        self.config.codec = codec;
        self
    }

    /// Set the prefix-scan batch size (clamped to at least 1)
    pub fn scan_batch_size(mut self, size: usize) -> Self {
        self.config.scan_batch_size = size.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
