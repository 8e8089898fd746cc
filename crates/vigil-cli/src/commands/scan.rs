//! Scan command implementation

use anyhow::{Context, Result};
use vigil::prelude::*;

pub fn execute(pattern: &str, limit: Option<usize>, values: bool) -> Result<()> {
    tracing::debug!("Scanning keys matching {}", pattern);

    let coordinator = Coordinator::global();
    let limit = limit.unwrap_or(usize::MAX);
    let mut shown = 0usize;

    coordinator
        .with_read(None, |tx| {
            tx.ascend_keys(pattern, |key, value| {
                if shown >= limit {
                    return false;
                }
                if values {
                    println!("{} = {}", key, super::render(value));
                } else {
                    println!("{}", key);
                }
                shown += 1;
                true
            })
        })
        .context("Failed to scan keys")?;

    println!("\n{} key(s)", shown);
    Ok(())
}
