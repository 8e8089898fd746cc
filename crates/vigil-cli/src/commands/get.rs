use anyhow::{Context, Result};
use std::io::Write;
use vigil::prelude::*;

pub fn execute(key: &str, raw: bool) -> Result<()> {
    let coordinator = Coordinator::global();
    let value = match coordinator.with_read(None, |tx| tx.get(key)) {
        Ok(value) => value,
        Err(e) if e.is_not_found() => {
            println!("(not found) {}", key);
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read key"),
    };

    if raw {
        std::io::stdout().write_all(&value)?;
    } else {
        println!("{}", super::render(&value));
    }
    Ok(())
}
