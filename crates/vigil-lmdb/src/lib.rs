//! LMDB-backed engine for the vigil state layer
//!
//! Provides an ordered, transactional KV store with the extras the domain
//! layer relies on:
//! - Per-key expiry (stored as a value header, enforced on read)
//! - Background sweeping of expired keys
//! - Named glob-pattern indexes for ordered iteration by record family
//! - Single-writer semantics (LMDB's writer lock), concurrent readers gated
//!   to the reader table size
//! - Durable directory or throwaway in-memory target

pub mod envelope;
pub mod index;
pub mod keys;
mod read_gate;
pub mod store;
pub mod sweeper;
pub mod txn;

pub use index::IndexRegistry;
pub use store::{LmdbStore, StoreMeta};
pub use txn::{LmdbReadTxn, LmdbWriteTxn};

use vigil_core::VigilError;

pub(crate) fn map_lmdb(err: lmdb::Error) -> VigilError {
    match err {
        lmdb::Error::MapFull => VigilError::StorageFull,
        other => VigilError::Transaction(other.to_string()),
    }
}
