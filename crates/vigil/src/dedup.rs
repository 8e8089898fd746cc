//! Seen-once marks with automatic expiry

use std::time::Duration;
use vigil_core::Result;

use crate::transaction::{Coordinator, TxnContext};

/// Presence-only marks: a key exists once its event was handled
///
/// `check_seen` followed by `mark_seen` is two transactions, so two
/// concurrent callers can both see "unseen" before either marks. Use
/// `claim` where a duplicate must never slip through.
#[derive(Clone)]
pub struct DedupTracker {
    coordinator: Coordinator,
}

impl DedupTracker {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    /// True when `key` has not been marked (or its mark expired)
    ///
    /// An engine failure reads as "already seen" so a fault never causes a
    /// repeat notification. The failure is logged at warn.
    pub fn check_seen(&self, ctx: Option<&mut TxnContext<'_>>, key: &str) -> bool {
        match self.coordinator.with_read(ctx, |tx| tx.exists(key)) {
            Ok(present) => !present,
            Err(e) => {
                tracing::warn!("Seen check for {} failed, treating as seen: {}", key, e);
                false
            }
        }
    }

    /// Mark `key` as seen for `ttl`; true when a live mark was replaced
    pub fn mark_seen(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.coordinator
            .with_read_write(ctx, |tx| tx.set(key, &[], ttl))
    }

    /// Mark `key` unless already marked, in one write transaction
    ///
    /// True when this call placed the mark. An existing mark keeps its
    /// original expiry.
    pub fn claim(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.coordinator.with_read_write(ctx, |tx| {
            if tx.exists(key)? {
                return Ok(false);
            }
            tx.set(key, &[], ttl)?;
            Ok(true)
        })
    }
}
