//! Configuration for SkipKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a SkipKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the snapshot file
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── backup.txt       (text snapshot)
    ///     └── backup.bin       (binary snapshot)
    pub data_dir: PathBuf,

    /// On-disk encoding of snapshots
    pub snapshot_format: SnapshotFormat,

    /// Period of the background snapshot task (zero disables it)
    pub snapshot_interval: Duration,

    /// Load the snapshot file (if any) when the engine opens
    pub restore_on_open: bool,

    // -------------------------------------------------------------------------
    // Router Configuration
    // -------------------------------------------------------------------------
    /// Number of worker threads serving read-only commands
    pub read_workers: usize,
}

/// Snapshot file encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Two-line `key:value` text format. Keys, values and members must not
    /// contain the `:`, `,`, `$` or `||` delimiters.
    Text,

    /// Length-prefixed, checksummed bincode image. Any content round-trips.
    Binary,
}

impl SnapshotFormat {
    /// File name used for this format inside `data_dir`
    pub fn file_name(self) -> &'static str {
        match self {
            SnapshotFormat::Text => "backup.txt",
            SnapshotFormat::Binary => "backup.bin",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./backup"),
            snapshot_format: SnapshotFormat::Text,
            snapshot_interval: Duration::from_secs(20),
            restore_on_open: true,
            read_workers: 3,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(self.snapshot_format.file_name())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (where the snapshot lives)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the snapshot file format
    pub fn snapshot_format(mut self, format: SnapshotFormat) -> Self {
        self.config.snapshot_format = format;
        self
    }

    /// Set the periodic snapshot interval
    pub fn snapshot_interval(mut self, interval: Duration) -> Self {
        self.config.snapshot_interval = interval;
        self
    }

    /// Enable or disable restoring from the snapshot on open
    pub fn restore_on_open(mut self, restore: bool) -> Self {
        self.config.restore_on_open = restore;
        self
    }

    /// Set the number of read workers (must be at least one)
    pub fn read_workers(mut self, count: usize) -> Self {
        self.config.read_workers = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
