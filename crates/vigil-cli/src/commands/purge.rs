use anyhow::{Context, Result};
use vigil::prelude::*;

pub fn execute() -> Result<()> {
    let store = EngineHandle::client()?;
    let purged = store
        .purge_expired()
        .context("Failed to purge expired entries")?;
    tracing::info!("Purged {} expired entries", purged);
    println!("✓ Purged {} expired entr{}", purged, if purged == 1 { "y" } else { "ies" });
    Ok(())
}
