//! Status command implementation

use anyhow::{Context, Result};
use vigil::prelude::*;

pub fn execute() -> Result<()> {
    let store = EngineHandle::client()?;
    tracing::info!("Checking store status: {}", store.path().display());

    let meta = store.meta().context("Failed to read store metadata")?;

    println!("\nStore Status");
    println!("{}", "=".repeat(60));
    if store.is_in_memory() {
        println!("Path: (in memory)");
    } else {
        println!("Path: {}", store.path().display());
    }
    println!("Schema Version: {}", meta.schema_version);
    println!("Created: {}", meta.created_at);
    println!("Last Write: {}", meta.updated_at);

    println!("\nKeys:");
    println!("  Live: {}", meta.live_keys);
    let expired = meta.stored_keys.saturating_sub(meta.live_keys);
    if expired > 0 {
        println!("  Expired, not yet purged: {}", expired);
        println!("Run 'vigil purge' to reclaim them");
    } else {
        println!("\n✓ No expired entries");
    }

    Ok(())
}
