pub mod engine;
pub mod retention;

pub use engine::{EngineConfig, EngineTarget, SyncMode};
pub use retention::RetentionConfig;

use crate::error::{Result, VigilError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration file
///
/// ```json
/// {
///   "engine": { "target": { "path": "./state" }, "sync_mode": "Full" },
///   "retention": { "origin_mark_ttl_secs": 600 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VigilConfig {
    pub engine: EngineConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

impl VigilConfig {
    pub fn new(engine: EngineConfig) -> Self {
        Self {
            engine,
            retention: RetentionConfig::default(),
        }
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| VigilError::Config(format!("{}: {}", path.display(), e)))
    }
}
