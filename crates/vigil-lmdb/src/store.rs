use lmdb::{Database, DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vigil_core::{
    Clock, EngineConfig, EngineTarget, Result, SyncMode, SystemClock, VigilError,
};

use crate::envelope;
use crate::index::IndexRegistry;
use crate::keys::{meta_keys, DATA_DB, META_DB, SCHEMA_VERSION};
use crate::map_lmdb;
use crate::read_gate::ReadGate;
use crate::sweeper::{self, Sweeper};
use crate::txn::{walk, LmdbReadTxn, LmdbWriteTxn};

/// Metadata about the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,

    /// Creation timestamp (RFC 3339)
    pub created_at: String,

    /// Last commit that changed data (RFC 3339)
    pub updated_at: String,

    /// Keys that have not expired
    pub live_keys: usize,

    /// Physically stored keys, including expired ones awaiting a sweep
    pub stored_keys: usize,
}

/// LMDB-backed ordered KV store
///
/// One writer at a time (LMDB's writer lock). Readers beyond `max_readers`
/// wait for a free slot instead of failing. Values carry an optional expiry; a background thread removes
/// expired keys.
pub struct LmdbStore {
    // Declared first so the sweeper thread is joined before the environment drops
    sweeper: Mutex<Option<Sweeper>>,
    env: Arc<Environment>,
    data_db: Database,
    meta_db: Database,
    read_gate: ReadGate,
    indexes: IndexRegistry,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
    path: PathBuf,
    // Backing directory of an in-memory store, removed on drop
    _scratch: Option<TempDir>,
}

impl LmdbStore {
    pub fn open(cfg: EngineConfig) -> Result<Self> {
        Self::open_with_clock(cfg, Arc::new(SystemClock))
    }

    /// Open with a custom clock driving expiry
    pub fn open_with_clock(cfg: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let (path, scratch, sync_mode) = match &cfg.target {
            EngineTarget::Path(path) => {
                std::fs::create_dir_all(path)?;
                (path.clone(), None, cfg.sync_mode)
            }
            EngineTarget::Memory => {
                let dir = tempfile::Builder::new().prefix("vigil-mem-").tempdir()?;
                (dir.path().to_path_buf(), Some(dir), SyncMode::NoSync)
            }
        };

        let mut env_builder = Environment::new();
        env_builder.set_max_dbs(2);
        env_builder.set_map_size(cfg.map_size);
        env_builder.set_max_readers(cfg.max_readers);

        // Read transactions belong to their handle, not the opening thread
        let mut flags = EnvironmentFlags::NO_TLS;
        match sync_mode {
            SyncMode::Full => {}
            SyncMode::NoMetaSync => flags.insert(EnvironmentFlags::NO_META_SYNC),
            SyncMode::NoSync => flags.insert(EnvironmentFlags::NO_SYNC),
        }
        env_builder.set_flags(flags);

        let env = env_builder
            .open(&path)
            .map_err(|e| VigilError::Io(std::io::Error::other(e)))?;

        let data_db = env
            .create_db(Some(DATA_DB), DatabaseFlags::empty())
            .map_err(map_lmdb)?;
        let meta_db = env
            .create_db(Some(META_DB), DatabaseFlags::empty())
            .map_err(map_lmdb)?;

        Self::init_meta(&env, meta_db)?;

        let env = Arc::new(env);
        let read_gate = ReadGate::new(
            cfg.max_readers,
            Duration::from_millis(cfg.read_slot_timeout_ms),
        );
        let sweeper = match cfg.expiry_sweep_interval_ms {
            0 => None,
            ms => Some(Sweeper::spawn(
                env.clone(),
                data_db,
                read_gate.clone(),
                clock.clone(),
                Duration::from_millis(ms),
            )?),
        };

        tracing::info!(
            "Opened store at {} ({})",
            path.display(),
            if scratch.is_some() { "memory" } else { "durable" }
        );

        Ok(Self {
            sweeper: Mutex::new(sweeper),
            env,
            data_db,
            meta_db,
            read_gate,
            indexes: IndexRegistry::new(),
            clock,
            closed: AtomicBool::new(false),
            path,
            _scratch: scratch,
        })
    }

    fn init_meta(env: &Environment, meta_db: Database) -> Result<()> {
        let mut txn = env.begin_rw_txn().map_err(map_lmdb)?;

        match txn.get(meta_db, &meta_keys::SCHEMA_VERSION) {
            Ok(bytes) => {
                let found = std::str::from_utf8(bytes)
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok())
                    .ok_or_else(|| {
                        VigilError::Serialization("unreadable schema version".into())
                    })?;
                if found > SCHEMA_VERSION {
                    return Err(VigilError::InvalidState(format!(
                        "store schema version {} is newer than supported {}",
                        found, SCHEMA_VERSION
                    )));
                }
            }
            Err(lmdb::Error::NotFound) => {
                txn.put(
                    meta_db,
                    &meta_keys::SCHEMA_VERSION,
                    &SCHEMA_VERSION.to_string(),
                    WriteFlags::empty(),
                )
                .map_err(map_lmdb)?;
            }
            Err(e) => return Err(map_lmdb(e)),
        }

        let now = chrono::Utc::now().to_rfc3339();
        if txn.get(meta_db, &meta_keys::CREATED_AT).is_err() {
            txn.put(meta_db, &meta_keys::CREATED_AT, &now, WriteFlags::empty())
                .map_err(map_lmdb)?;
        }
        txn.put(meta_db, &meta_keys::UPDATED_AT, &now, WriteFlags::empty())
            .map_err(map_lmdb)?;

        txn.commit().map_err(map_lmdb)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(VigilError::NotInitialized);
        }
        Ok(())
    }

    /// Begin a read-only transaction
    ///
    /// Waits up to `read_slot_timeout_ms` for a reader slot, then fails with
    /// `Timeout`.
    pub fn begin_read(&self) -> Result<LmdbReadTxn<'_>> {
        self.ensure_open()?;
        let permit = self.read_gate.acquire_blocking()?;
        let txn = self.env.begin_ro_txn().map_err(map_lmdb)?;
        Ok(LmdbReadTxn::new(
            txn,
            self.data_db,
            &self.indexes,
            self.clock.as_ref(),
            permit,
        ))
    }

    /// Begin a read-write transaction
    ///
    /// Blocks while another write transaction is open.
    pub fn begin_write(&self) -> Result<LmdbWriteTxn<'_>> {
        self.ensure_open()?;
        let txn = self.env.begin_rw_txn().map_err(map_lmdb)?;
        Ok(LmdbWriteTxn::new(
            txn,
            self.data_db,
            self.meta_db,
            &self.indexes,
            self.clock.as_ref(),
        ))
    }

    /// Register a pattern index; false if the name already exists
    pub fn create_index(&self, name: &str, pattern: &str) -> Result<bool> {
        self.ensure_open()?;
        let created = self.indexes.create(name, pattern);
        if created {
            tracing::debug!("Created index {} on {}", name, pattern);
        }
        Ok(created)
    }

    pub fn drop_index(&self, name: &str) -> bool {
        self.indexes.drop_index(name)
    }

    pub fn indexes(&self) -> Vec<String> {
        self.indexes.names()
    }

    /// Delete all expired keys now instead of waiting for the sweeper
    pub fn purge_expired(&self) -> Result<usize> {
        self.ensure_open()?;
        sweeper::sweep(
            &self.env,
            self.data_db,
            &self.read_gate,
            self.clock.now_millis(),
        )
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Directory backing the environment
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_in_memory(&self) -> bool {
        self._scratch.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn meta(&self) -> Result<StoreMeta> {
        self.ensure_open()?;
        let _permit = self.read_gate.acquire_blocking()?;
        let txn = self.env.begin_ro_txn().map_err(map_lmdb)?;

        let now = self.clock.now_millis();
        let (mut live_keys, mut stored_keys) = (0usize, 0usize);
        walk(&txn, self.data_db, &[], |_, raw| {
            stored_keys += 1;
            if !envelope::decode(raw)?.is_expired(now) {
                live_keys += 1;
            }
            Ok(true)
        })?;

        let read = |key: &str| -> Result<Option<String>> {
            match txn.get(self.meta_db, &key) {
                Ok(bytes) => Ok(Some(String::from_utf8_lossy(bytes).into_owned())),
                Err(lmdb::Error::NotFound) => Ok(None),
                Err(e) => Err(map_lmdb(e)),
            }
        };

        let schema_version = read(meta_keys::SCHEMA_VERSION)?
            .and_then(|s| s.parse().ok())
            .unwrap_or(SCHEMA_VERSION);
        let created_at = read(meta_keys::CREATED_AT)?.unwrap_or_default();
        let updated_at = read(meta_keys::UPDATED_AT)?.unwrap_or_default();

        Ok(StoreMeta {
            schema_version,
            created_at,
            updated_at,
            live_keys,
            stored_keys,
        })
    }

    /// Stop the sweeper, flush, and refuse new transactions
    ///
    /// Idempotent. Transactions already open finish normally.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(mut sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
        }

        if !self.is_in_memory() {
            self.env.sync(true).map_err(map_lmdb)?;
        }

        tracing::info!("Closed store at {}", self.path.display());
        Ok(())
    }
}
