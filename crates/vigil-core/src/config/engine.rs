use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the engine keeps its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineTarget {
    /// Durable store in the given directory
    Path(PathBuf),

    /// Ephemeral store, discarded on close
    Memory,
}

/// Configuration for the embedded engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub target: EngineTarget,

    /// Maximum map size for LMDB (in bytes)
    /// Default: 1GB
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Sync mode for durability. Ignored for `EngineTarget::Memory`.
    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Maximum number of concurrent read transactions
    /// Default: 126
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,

    /// How long `begin_read` waits for a free reader slot (default: 30000)
    #[serde(default = "default_read_slot_timeout")]
    pub read_slot_timeout_ms: u64,

    /// How often the background sweeper deletes expired keys (default: 1000)
    ///
    /// Zero disables the sweeper; expired keys stay invisible to reads but
    /// are only removed by an explicit `purge_expired()`.
    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// `fsync()` on every commit.
    Full,

    /// Skips syncing the meta page on each commit (default).
    ///
    /// Survives process crashes; an OS crash may lose the last transaction
    /// but leaves the store consistent.
    #[default]
    NoMetaSync,

    /// Leaves flushing to the OS page cache. Test workloads only.
    NoSync,
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024
}

fn default_max_readers() -> u32 {
    126
}

fn default_read_slot_timeout() -> u64 {
    30_000
}

fn default_sweep_interval() -> u64 {
    1000
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_target(EngineTarget::Path(path.into()))
    }

    pub fn in_memory() -> Self {
        Self::with_target(EngineTarget::Memory)
    }

    fn with_target(target: EngineTarget) -> Self {
        Self {
            target,
            map_size: default_map_size(),
            sync_mode: SyncMode::default(),
            max_readers: default_max_readers(),
            read_slot_timeout_ms: default_read_slot_timeout(),
            expiry_sweep_interval_ms: default_sweep_interval(),
        }
    }

    pub fn with_map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn with_max_readers(mut self, max_readers: u32) -> Self {
        self.max_readers = max_readers;
        self
    }

    pub fn with_read_slot_timeout(mut self, timeout_ms: u64) -> Self {
        self.read_slot_timeout_ms = timeout_ms;
        self
    }

    /// Set the sweep interval in milliseconds; 0 disables the sweeper
    pub fn with_sweep_interval(mut self, interval_ms: u64) -> Self {
        self.expiry_sweep_interval_ms = interval_ms;
        self
    }
}
