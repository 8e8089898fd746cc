//! Process-wide engine handle
//!
//! Exactly one engine per process, with an explicit lifecycle:
//! `init` → any number of `client` lookups → `close`. Nothing constructs the
//! engine implicitly; every lookup before `init` or after `close` fails with
//! `NotInitialized`.
//!
//! A closed engine whose clones are still alive keeps its LMDB environment
//! open, and LMDB forbids two environments on the same files in one process.
//! Re-opening that directory is refused until the last clone drops.

use parking_lot::RwLock;
use std::path::Path;
use std::sync::{Arc, Weak};
use vigil_core::{Clock, EngineConfig, EngineTarget, Result, VigilError};
use vigil_lmdb::LmdbStore;

struct Slot {
    current: Option<Arc<LmdbStore>>,
    // Closed engines, tracked until their clones are gone
    retired: Vec<Weak<LmdbStore>>,
}

static ENGINE: RwLock<Slot> = parking_lot::const_rwlock(Slot {
    current: None,
    retired: Vec::new(),
});

pub struct EngineHandle;

impl EngineHandle {
    /// Open the process-wide engine
    pub fn init(config: EngineConfig) -> Result<()> {
        let target = config.target.clone();
        Self::install(&target, || LmdbStore::open(config))
    }

    /// Open the process-wide engine with a custom expiry clock
    pub fn init_with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<()> {
        let target = config.target.clone();
        Self::install(&target, || LmdbStore::open_with_clock(config, clock))
    }

    fn install(target: &EngineTarget, open: impl FnOnce() -> Result<LmdbStore>) -> Result<()> {
        let mut slot = ENGINE.write();
        if slot.current.is_some() {
            return Err(VigilError::AlreadyInitialized);
        }

        slot.retired.retain(|engine| engine.strong_count() > 0);
        if let EngineTarget::Path(path) = target {
            let in_use = slot
                .retired
                .iter()
                .filter_map(Weak::upgrade)
                .any(|engine| same_dir(path, engine.path()));
            if in_use {
                return Err(VigilError::InvalidState(format!(
                    "engine at {} was closed but is still referenced",
                    path.display()
                )));
            }
        }

        slot.current = Some(Arc::new(open()?));
        Ok(())
    }

    /// The current engine
    pub fn client() -> Result<Arc<LmdbStore>> {
        ENGINE.read().current.clone().ok_or(VigilError::NotInitialized)
    }

    pub fn is_initialized() -> bool {
        ENGINE.read().current.is_some()
    }

    /// Tear down the engine. Closing an engine that is not open is a no-op.
    ///
    /// Clones handed out by `client` stop accepting new transactions.
    pub fn close() -> Result<()> {
        let engine = {
            let mut slot = ENGINE.write();
            let engine = slot.current.take();
            if let Some(engine) = &engine {
                slot.retired.push(Arc::downgrade(engine));
            }
            engine
        };
        match engine {
            Some(engine) => engine.close(),
            None => Ok(()),
        }
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
