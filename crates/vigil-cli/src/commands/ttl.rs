use anyhow::{Context, Result};
use vigil::prelude::*;

pub fn execute(key: &str) -> Result<()> {
    let coordinator = Coordinator::global();
    match coordinator.with_read(None, |tx| tx.ttl(key)) {
        Ok(Some(remaining)) => println!("{}: expires in {}s", key, remaining.as_secs()),
        Ok(None) => println!("{}: no expiry", key),
        Err(e) if e.is_not_found() => println!("(not found) {}", key),
        Err(e) => return Err(e).context("Failed to read key"),
    }
    Ok(())
}
