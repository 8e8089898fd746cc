//! Reader slot gate
//!
//! LMDB keeps a fixed table of `max_readers` reader slots and fails
//! `begin_ro_txn` with `MDB_READERS_FULL` once they are all taken. The gate
//! hands out one permit per slot so callers wait for a free slot instead.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use vigil_core::{Result, VigilError};

const MAX_BACKOFF_MS: u64 = 32;

#[derive(Clone)]
pub(crate) struct ReadGate {
    semaphore: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl ReadGate {
    pub(crate) fn new(slots: u32, acquire_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(slots.max(1) as usize)),
            acquire_timeout,
        }
    }

    /// Block until a slot is free, backing off 1ms, 2ms, 4ms, ... up to 32ms
    ///
    /// Fails with `Timeout` once `acquire_timeout` has passed.
    pub(crate) fn acquire_blocking(&self) -> Result<OwnedSemaphorePermit> {
        let deadline = Instant::now() + self.acquire_timeout;
        let mut backoff_ms = 1u64;

        loop {
            match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => return Ok(permit),
                Err(_) => {
                    if Instant::now() >= deadline {
                        return Err(VigilError::Timeout(format!(
                            "no free reader slot after {:?}",
                            self.acquire_timeout
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
            }
        }
    }

    pub(crate) fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permit_released_on_drop() {
        let gate = ReadGate::new(2, Duration::from_millis(10));
        let first = gate.acquire_blocking().unwrap();
        let _second = gate.acquire_blocking().unwrap();
        assert_eq!(gate.available(), 0);

        drop(first);
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn test_acquire_times_out_when_exhausted() {
        let gate = ReadGate::new(1, Duration::from_millis(20));
        let _held = gate.acquire_blocking().unwrap();

        let started = Instant::now();
        assert!(matches!(gate.acquire_blocking(), Err(VigilError::Timeout(_))));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_waiter_gets_slot_when_freed() {
        let gate = ReadGate::new(1, Duration::from_secs(5));
        let held = gate.acquire_blocking().unwrap();

        let waiter = {
            let gate = gate.clone();
            std::thread::spawn(move || gate.acquire_blocking().map(|_| ()))
        };
        std::thread::sleep(Duration::from_millis(20));
        drop(held);

        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn test_zero_slots_still_admits_one_reader() {
        let gate = ReadGate::new(0, Duration::from_millis(10));
        assert_eq!(gate.available(), 1);
    }
}
