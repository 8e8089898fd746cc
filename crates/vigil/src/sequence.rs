//! Per-key counters and set-once markers
//!
//! Values are stored as decimal text.

use std::time::Duration;
use vigil_core::{Result, VigilError};

use crate::transaction::{Coordinator, TxnContext};

#[derive(Clone)]
pub struct SequenceCounter {
    coordinator: Coordinator,
}

fn parse(key: &str, raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| VigilError::Serialization(format!("{} does not hold an integer", key)))
}

impl SequenceCounter {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    /// Bump the counter and return its new value; an absent counter starts at 1
    pub fn increment(&self, ctx: Option<&mut TxnContext<'_>>, key: &str) -> Result<i64> {
        self.coordinator.with_read_write(ctx, |tx| {
            let current = match tx.get(key) {
                Ok(raw) => parse(key, &raw)?,
                Err(e) if e.is_not_found() => 0,
                Err(e) => return Err(e),
            };
            let next = current.checked_add(1).ok_or_else(|| {
                VigilError::InvalidState(format!("counter {} is at its maximum", key))
            })?;
            tx.set(key, next.to_string().as_bytes(), None)?;
            Ok(next)
        })
    }

    /// Current value; 0 when the counter does not exist
    pub fn get(&self, ctx: Option<&mut TxnContext<'_>>, key: &str) -> Result<i64> {
        self.coordinator.with_read(ctx, |tx| match tx.get(key) {
            Ok(raw) => parse(key, &raw),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e),
        })
    }

    /// Reset the counter; clearing an absent counter succeeds
    pub fn clear(&self, ctx: Option<&mut TxnContext<'_>>, key: &str) -> Result<()> {
        self.unset(ctx, key)
    }

    /// Store `value` only if `key` is absent; true when this call stored it
    pub fn set_if_absent(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        key: &str,
        value: i64,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.coordinator.with_read_write(ctx, |tx| {
            if tx.exists(key)? {
                return Ok(false);
            }
            tx.set(key, value.to_string().as_bytes(), ttl)?;
            Ok(true)
        })
    }

    /// Read a marker stored by `set_if_absent`; `NotFound` if absent
    pub fn read(&self, ctx: Option<&mut TxnContext<'_>>, key: &str) -> Result<i64> {
        self.coordinator
            .with_read(ctx, |tx| tx.get(key).and_then(|raw| parse(key, &raw)))
    }

    /// Delete `key`; absent is success
    pub fn unset(&self, ctx: Option<&mut TxnContext<'_>>, key: &str) -> Result<()> {
        self.coordinator
            .with_read_write(ctx, |tx| tx.delete_all(&[key]).map(|_| ()))
    }
}
