//! Background expiry sweeper
//!
//! Reads already hide expired entries; the sweeper reclaims their space so
//! TTL'd marks do not accumulate forever.

use lmdb::{Database, Environment, Transaction};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use vigil_core::{Clock, Result};

use crate::envelope;
use crate::map_lmdb;
use crate::read_gate::ReadGate;
use crate::txn::expired_keys;

/// Keys deleted per write transaction
const SWEEP_BATCH: usize = 1000;

/// Delete every key expired at `now`; returns the count
///
/// Candidates are collected under a read snapshot so the writer lock is
/// only held for short delete batches.
pub(crate) fn sweep(env: &Environment, db: Database, gate: &ReadGate, now: i64) -> Result<usize> {
    let candidates = {
        let _permit = gate.acquire_blocking()?;
        let txn = env.begin_ro_txn().map_err(map_lmdb)?;
        expired_keys(&txn, db, now)?
    };
    if candidates.is_empty() {
        return Ok(0);
    }
    delete_expired(env, db, &candidates, now)
}

/// Delete the candidates that are still expired at `now`
///
/// A key rewritten since it was collected is left alone.
pub(crate) fn delete_expired(
    env: &Environment,
    db: Database,
    candidates: &[Vec<u8>],
    now: i64,
) -> Result<usize> {
    let mut removed = 0;
    for batch in candidates.chunks(SWEEP_BATCH) {
        let mut txn = env.begin_rw_txn().map_err(map_lmdb)?;
        for key in batch {
            let still_expired = match txn.get(db, key) {
                Ok(raw) => envelope::decode(raw)?.is_expired(now),
                Err(lmdb::Error::NotFound) => false,
                Err(e) => return Err(map_lmdb(e)),
            };
            if still_expired {
                txn.del(db, key, None).map_err(map_lmdb)?;
                removed += 1;
            }
        }
        txn.commit().map_err(map_lmdb)?;
    }
    Ok(removed)
}

pub(crate) struct Sweeper {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub(crate) fn spawn(
        env: Arc<Environment>,
        db: Database,
        gate: ReadGate,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("vigil-sweeper".into())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        match sweep(&env, db, &gate, clock.now_millis()) {
                            Ok(0) => {}
                            Ok(n) => tracing::debug!("Swept {} expired keys", n),
                            Err(e) => tracing::warn!("Expiry sweep failed: {}", e),
                        }
                    }
                    // Stop requested or the store is gone
                    _ => break,
                }
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub(crate) fn stop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Expiry sweeper thread panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
