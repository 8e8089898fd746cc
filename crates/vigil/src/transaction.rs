//! Transaction coordination with explicit context reuse
//!
//! Every entry point takes an optional `TxnContext`. Passing `None` opens a
//! fresh transaction owned by that call; passing `Some(ctx)` reuses the
//! caller's transaction, so nested helpers never try to open a second one.
//!
//! ```no_run
//! use vigil::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let coordinator = Coordinator::global();
//! coordinator.with_read_write(None, |tx| {
//!     tx.set("a", b"1", None)?;
//!     // Nested call joins the open transaction; only the outer call commits
//!     coordinator.with_read_write(Some(tx), |tx| {
//!         tx.set("b", b"2", None)?;
//!         Ok(())
//!     })
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! Only the value returned by the outermost `with_read_write` says whether
//! the writes persisted: commit runs after the callback returns and can
//! still fail (for example when storage is exhausted).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use vigil_core::{Result, StateRead, StateWrite, VigilError};
use vigil_lmdb::{LmdbReadTxn, LmdbStore, LmdbWriteTxn};

use crate::engine::EngineHandle;

/// An open transaction, passed explicitly down a call chain
pub enum TxnContext<'env> {
    Read(LmdbReadTxn<'env>),
    Write(LmdbWriteTxn<'env>),
}

impl<'env> TxnContext<'env> {
    pub fn is_writable(&self) -> bool {
        matches!(self, TxnContext::Write(_))
    }

    fn reader(&self) -> &dyn StateRead {
        match self {
            TxnContext::Read(txn) => txn,
            TxnContext::Write(txn) => txn,
        }
    }

    fn writer(&mut self) -> Result<&mut LmdbWriteTxn<'env>> {
        match self {
            TxnContext::Write(txn) => Ok(txn),
            TxnContext::Read(_) => Err(VigilError::NotWritable),
        }
    }

    /// Point read; `NotFound` if absent or expired
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.reader().get(key)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        String::from_utf8(self.get(key)?).map_err(|e| VigilError::Serialization(e.to_string()))
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        Ok(serde_json::from_slice(&self.get(key)?)?)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        self.reader().exists(key)
    }

    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.reader().ttl(key)
    }

    /// Store a value; returns true when a live entry was replaced
    pub fn set(&mut self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<bool> {
        Ok(self.writer()?.set(key, value, ttl)?.is_some())
    }

    pub fn set_json<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes, ttl)
    }

    /// Remove a key, returning its value; `NotFound` if absent
    pub fn delete(&mut self, key: &str) -> Result<Vec<u8>> {
        self.writer()?.delete(key)
    }

    /// Remove several keys, treating absent ones as already removed
    ///
    /// Every delete is attempted even after a failure; the first failure that
    /// is not `NotFound` is returned. On success, yields how many keys
    /// actually existed.
    pub fn delete_all<K: AsRef<str>>(&mut self, keys: &[K]) -> Result<usize> {
        let writer = self.writer()?;
        let mut removed = 0;
        let mut first_err = None;
        for key in keys {
            match writer.delete(key.as_ref()) {
                Ok(_) => removed += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    pub fn ascend_keys<F>(&self, pattern: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&str, &[u8]) -> bool,
    {
        self.reader().ascend_keys(pattern, &mut f)
    }

    pub fn ascend_index<F>(&self, index: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&str, &[u8]) -> bool,
    {
        self.reader().ascend_index(index, &mut f)
    }

    /// Commit a write transaction; a read transaction is simply released
    pub fn commit(self) -> Result<()> {
        match self {
            TxnContext::Write(txn) => {
                let info = txn.commit().map_err(|e| {
                    tracing::warn!("Commit failed: {}", e);
                    e
                })?;
                tracing::trace!(
                    "Committed {} writes, {} deletes",
                    info.keys_written,
                    info.keys_deleted
                );
                Ok(())
            }
            TxnContext::Read(_) => Ok(()),
        }
    }

    /// Discard every change made in this transaction
    pub fn rollback(self) {
        if let TxnContext::Write(txn) = self {
            txn.abort();
        }
    }
}

#[derive(Clone)]
enum Backend {
    Global,
    Store(Arc<LmdbStore>),
}

/// Runs callbacks inside read or read-write transactions
#[derive(Clone)]
pub struct Coordinator {
    backend: Backend,
}

impl Coordinator {
    /// Use the process-wide engine, looked up on every call
    pub fn global() -> Self {
        Self {
            backend: Backend::Global,
        }
    }

    /// Use a specific engine
    pub fn with_store(store: Arc<LmdbStore>) -> Self {
        Self {
            backend: Backend::Store(store),
        }
    }

    pub fn store(&self) -> Result<Arc<LmdbStore>> {
        match &self.backend {
            Backend::Global => EngineHandle::client(),
            Backend::Store(store) => Ok(store.clone()),
        }
    }

    /// Run `f` with read access
    ///
    /// Reuses `ctx` when given, whether it is a read or a write transaction
    /// (reads inside a write see its uncommitted changes). Otherwise opens a
    /// read-only transaction that is discarded afterwards.
    pub fn with_read<T, F>(&self, ctx: Option<&mut TxnContext<'_>>, f: F) -> Result<T>
    where
        F: FnOnce(&mut TxnContext<'_>) -> Result<T>,
    {
        if let Some(ctx) = ctx {
            return f(ctx);
        }

        let store = self.store()?;
        let mut ctx = TxnContext::Read(store.begin_read()?);
        f(&mut ctx)
    }

    /// Run `f` with write access
    ///
    /// With no `ctx`, opens a write transaction (waiting for any other writer),
    /// commits if `f` succeeds and rolls back otherwise, returning `f`'s error
    /// unchanged. `VigilError::Rollback` is the way to abort deliberately.
    ///
    /// With a write `ctx`, joins it; the call that opened the transaction
    /// decides its fate. With a read `ctx`, fails with `NotWritable` before
    /// running `f`.
    pub fn with_read_write<T, F>(&self, ctx: Option<&mut TxnContext<'_>>, f: F) -> Result<T>
    where
        F: FnOnce(&mut TxnContext<'_>) -> Result<T>,
    {
        if let Some(ctx) = ctx {
            if !ctx.is_writable() {
                return Err(VigilError::NotWritable);
            }
            return f(ctx);
        }

        let store = self.store()?;
        let mut ctx = TxnContext::Write(store.begin_write()?);
        match f(&mut ctx) {
            Ok(value) => {
                ctx.commit()?;
                Ok(value)
            }
            Err(e) => {
                ctx.rollback();
                if e.is_rollback() {
                    tracing::debug!("Transaction rolled back on request");
                } else {
                    tracing::debug!("Transaction rolled back: {}", e);
                }
                Err(e)
            }
        }
    }

    /// `with_read` on tokio's blocking pool, for async workers
    pub async fn with_read_async<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TxnContext<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let coordinator = self.clone();
        tokio::task::spawn_blocking(move || coordinator.with_read(None, f))
            .await
            .map_err(|e| VigilError::Other(anyhow::anyhow!("read task failed: {}", e)))?
    }

    /// `with_read_write` on tokio's blocking pool, for async workers
    pub async fn with_read_write_async<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TxnContext<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let coordinator = self.clone();
        tokio::task::spawn_blocking(move || coordinator.with_read_write(None, f))
            .await
            .map_err(|e| VigilError::Other(anyhow::anyhow!("write task failed: {}", e)))?
    }
}
