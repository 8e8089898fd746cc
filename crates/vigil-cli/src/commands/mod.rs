pub mod get;
pub mod purge;
pub mod scan;
pub mod status;
pub mod ttl;

use anyhow::{bail, Context, Result};
use std::path::Path;
use vigil::prelude::*;

/// Engine settings from `--config`, or a durable store at `--db-path`
pub fn engine_config(db_path: &Path, config: Option<&Path>) -> Result<EngineConfig> {
    let engine = match config {
        Some(file) => {
            VigilConfig::load(file)
                .with_context(|| format!("Failed to load config {}", file.display()))?
                .engine
        }
        None => EngineConfig::new(db_path),
    };

    if let EngineTarget::Path(dir) = &engine.target {
        if !dir.exists() {
            bail!("State directory {} does not exist", dir.display());
        }
    }

    // Expired entries are purged explicitly by `purge`
    Ok(engine.with_sweep_interval(0))
}

pub fn open(engine: EngineConfig) -> Result<()> {
    EngineHandle::init(engine).context("Failed to open state directory")?;
    Ok(())
}

pub fn close() -> Result<()> {
    EngineHandle::close().context("Failed to close state directory")?;
    Ok(())
}

/// Render a stored value: pretty JSON when it parses, text otherwise
pub fn render(value: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(value) {
        Ok(doc) => serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string()),
        Err(_) => String::from_utf8_lossy(value).into_owned(),
    }
}
