use lmdb::{Cursor, Database, RoTransaction, RwTransaction, Transaction, WriteFlags};
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use vigil_core::{
    pattern, Clock, CommitInfo, Result, StateRead, StateWrite, VigilError,
};

use crate::envelope::{self, Entry};
use crate::index::IndexRegistry;
use crate::keys::meta_keys;
use crate::map_lmdb;

/// Read-only transaction
///
/// Sees a consistent snapshot taken when it began. Never blocks writers or
/// other readers. Holds one reader slot until dropped.
pub struct LmdbReadTxn<'env> {
    txn: RoTransaction<'env>,
    db: Database,
    indexes: &'env IndexRegistry,
    clock: &'env dyn Clock,
    // After `txn` so the LMDB slot is released before the permit
    _permit: OwnedSemaphorePermit,
}

impl<'env> LmdbReadTxn<'env> {
    pub(crate) fn new(
        txn: RoTransaction<'env>,
        db: Database,
        indexes: &'env IndexRegistry,
        clock: &'env dyn Clock,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            txn,
            db,
            indexes,
            clock,
            _permit: permit,
        }
    }
}

impl StateRead for LmdbReadTxn<'_> {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        get_live(&self.txn, self.db, key, self.clock.now_millis())
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        ttl_of(&self.txn, self.db, key, self.clock.now_millis())
    }

    fn ascend_keys(&self, pattern: &str, f: &mut dyn FnMut(&str, &[u8]) -> bool) -> Result<()> {
        scan(&self.txn, self.db, pattern, self.clock.now_millis(), f)
    }

    fn ascend_index(&self, index: &str, f: &mut dyn FnMut(&str, &[u8]) -> bool) -> Result<()> {
        let pattern = self.indexes.pattern(index)?;
        self.ascend_keys(&pattern, f)
    }
}

/// Read-write transaction
///
/// Only one exists at a time across the process; beginning a second one
/// blocks until the first commits or aborts. Dropping without commit aborts.
pub struct LmdbWriteTxn<'env> {
    txn: RwTransaction<'env>,
    db: Database,
    meta_db: Database,
    indexes: &'env IndexRegistry,
    clock: &'env dyn Clock,
    stats: CommitInfo,
}

impl<'env> LmdbWriteTxn<'env> {
    pub(crate) fn new(
        txn: RwTransaction<'env>,
        db: Database,
        meta_db: Database,
        indexes: &'env IndexRegistry,
        clock: &'env dyn Clock,
    ) -> Self {
        Self {
            txn,
            db,
            meta_db,
            indexes,
            clock,
            stats: CommitInfo::default(),
        }
    }

    /// Raw entry including expired ones
    fn raw_entry(&self, key: &str) -> Result<Option<(Option<i64>, Vec<u8>)>> {
        match self.txn.get(self.db, &key) {
            Ok(raw) => {
                let entry = envelope::decode(raw)?;
                Ok(Some((entry.expires_at, entry.payload.to_vec())))
            }
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(map_lmdb(e)),
        }
    }
}

impl StateRead for LmdbWriteTxn<'_> {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        get_live(&self.txn, self.db, key, self.clock.now_millis())
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        ttl_of(&self.txn, self.db, key, self.clock.now_millis())
    }

    fn ascend_keys(&self, pattern: &str, f: &mut dyn FnMut(&str, &[u8]) -> bool) -> Result<()> {
        scan(&self.txn, self.db, pattern, self.clock.now_millis(), f)
    }

    fn ascend_index(&self, index: &str, f: &mut dyn FnMut(&str, &[u8]) -> bool) -> Result<()> {
        let pattern = self.indexes.pattern(index)?;
        self.ascend_keys(&pattern, f)
    }
}

impl StateWrite for LmdbWriteTxn<'_> {
    fn set(&mut self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now_millis();
        let previous = match self.raw_entry(key)? {
            Some((expires_at, payload)) => {
                let live = !matches!(expires_at, Some(at) if at <= now);
                live.then_some(payload)
            }
            None => None,
        };

        let encoded = envelope::encode(value, envelope::expiry_for(ttl, now));
        self.txn
            .put(self.db, &key, &encoded, WriteFlags::empty())
            .map_err(map_lmdb)?;

        self.stats.keys_written += 1;
        Ok(previous)
    }

    fn delete(&mut self, key: &str) -> Result<Vec<u8>> {
        let now = self.clock.now_millis();
        let Some((expires_at, payload)) = self.raw_entry(key)? else {
            return Err(VigilError::NotFound(key.to_string()));
        };

        self.txn.del(self.db, &key, None).map_err(map_lmdb)?;

        if matches!(expires_at, Some(at) if at <= now) {
            // Already logically gone; the physical delete is housekeeping
            return Err(VigilError::NotFound(key.to_string()));
        }
        self.stats.keys_deleted += 1;
        Ok(payload)
    }

    fn commit(mut self) -> Result<CommitInfo> {
        if self.stats.keys_written + self.stats.keys_deleted > 0 {
            self.txn
                .put(
                    self.meta_db,
                    &meta_keys::UPDATED_AT,
                    &chrono::Utc::now().to_rfc3339(),
                    WriteFlags::empty(),
                )
                .map_err(map_lmdb)?;
        }

        self.txn.commit().map_err(map_lmdb)?;
        Ok(self.stats)
    }

    fn abort(self) {
        self.txn.abort();
    }
}

fn get_live<T: Transaction>(txn: &T, db: Database, key: &str, now: i64) -> Result<Vec<u8>> {
    match txn.get(db, &key) {
        Ok(raw) => {
            let entry = envelope::decode(raw)?;
            if entry.is_expired(now) {
                return Err(VigilError::NotFound(key.to_string()));
            }
            Ok(entry.payload.to_vec())
        }
        Err(lmdb::Error::NotFound) => Err(VigilError::NotFound(key.to_string())),
        Err(e) => Err(map_lmdb(e)),
    }
}

fn ttl_of<T: Transaction>(
    txn: &T,
    db: Database,
    key: &str,
    now: i64,
) -> Result<Option<Duration>> {
    match txn.get(db, &key) {
        Ok(raw) => {
            let entry = envelope::decode(raw)?;
            if entry.is_expired(now) {
                return Err(VigilError::NotFound(key.to_string()));
            }
            Ok(entry.remaining(now))
        }
        Err(lmdb::Error::NotFound) => Err(VigilError::NotFound(key.to_string())),
        Err(e) => Err(map_lmdb(e)),
    }
}

/// Visit raw entries in key order from the first key at or after `start`
///
/// An empty `start` begins at the first key. Ends at the last key or when
/// `f` returns false; an empty range is not an error.
pub(crate) fn walk<'txn, T: Transaction>(
    txn: &'txn T,
    db: Database,
    start: &[u8],
    mut f: impl FnMut(&'txn [u8], &'txn [u8]) -> Result<bool>,
) -> Result<()> {
    let cursor = txn.open_ro_cursor(db).map_err(map_lmdb)?;
    let mut step = if start.is_empty() {
        cursor.get(None, None, lmdb_sys::MDB_FIRST)
    } else {
        cursor.get(Some(start), None, lmdb_sys::MDB_SET_RANGE)
    };

    loop {
        let (key, raw) = match step {
            Ok((Some(key), raw)) => (key, raw),
            Ok((None, _)) => {
                return Err(VigilError::Transaction("cursor returned no key".into()))
            }
            Err(lmdb::Error::NotFound) => return Ok(()),
            Err(e) => return Err(map_lmdb(e)),
        };
        if !f(key, raw)? {
            return Ok(());
        }
        step = cursor.get(None, None, lmdb_sys::MDB_NEXT);
    }
}

/// Walk live entries matching `pattern` in key order
fn scan<T: Transaction>(
    txn: &T,
    db: Database,
    pattern: &str,
    now: i64,
    f: &mut dyn FnMut(&str, &[u8]) -> bool,
) -> Result<()> {
    let prefix = pattern::literal_prefix(pattern).as_bytes();

    walk(txn, db, prefix, |key_bytes, raw| {
        if !key_bytes.starts_with(prefix) {
            return Ok(false);
        }
        // Keys are always written from &str
        let Ok(key) = std::str::from_utf8(key_bytes) else {
            return Ok(true);
        };
        if !pattern::matches(pattern, key) {
            return Ok(true);
        }
        let entry: Entry<'_> = envelope::decode(raw)?;
        if entry.is_expired(now) {
            return Ok(true);
        }
        Ok(f(key, entry.payload))
    })
}

/// Collect every expired key; used by the sweeper
pub(crate) fn expired_keys<T: Transaction>(txn: &T, db: Database, now: i64) -> Result<Vec<Vec<u8>>> {
    let mut expired = Vec::new();
    walk(txn, db, &[], |key, raw| {
        if envelope::decode(raw)?.is_expired(now) {
            expired.push(key.to_vec());
        }
        Ok(true)
    })?;
    Ok(expired)
}
