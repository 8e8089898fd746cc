//! Vigil: crash-consistent state for platform-change monitoring
//!
//! Remembers, across restarts, which producers each group tracks and which
//! events were already announced, so a notification goes out at most once.
//!
//! - **Engine**: one process-wide LMDB environment ([`EngineHandle`])
//! - **Coordinator**: read / read-write transactions with explicit
//!   context reuse for nested calls ([`Coordinator`], [`TxnContext`])
//! - **Repository**: producer, live session, post and credential records
//! - **Dedup / sequence**: seen-once marks with expiry and per-key counters
//!
//! # Quick Start
//!
//! ```no_run
//! use vigil::prelude::*;
//!
//! # fn main() -> Result<()> {
//! EngineHandle::init(EngineConfig::new("./state"))?;
//!
//! let keys = KeySet::new("bilibili");
//! let coordinator = Coordinator::global();
//! PatternIndexRegistry::new(coordinator.clone(), keys.clone()).start()?;
//!
//! let repo = StateRepository::new(coordinator, keys, RetentionConfig::default());
//! if repo.check_post_seen(None, 1001) {
//!     // notify, then remember it
//!     repo.mark_post_seen(None, 1001)?;
//! }
//!
//! EngineHandle::close()?;
//! # Ok(())
//! # }
//! ```

pub mod concern;
pub mod dedup;
pub mod engine;
pub mod index_registry;
pub mod model;
pub mod prelude;
pub mod repository;
pub mod sequence;
pub mod transaction;

pub use vigil_core::{
    named_key, Clock, CommitInfo, EngineConfig, EngineTarget, KeyFamily, KeyPattern, KeySet,
    ManualClock, Result, RetentionConfig, SyncMode, SystemClock, VigilConfig, VigilError,
};

pub use vigil_lmdb::{LmdbStore, StoreMeta};

pub use concern::ConcernTracker;
pub use dedup::DedupTracker;
pub use engine::EngineHandle;
pub use index_registry::PatternIndexRegistry;
pub use model::{
    ConcernKind, Cookie, CredentialBundle, GroupConcern, LiveSession, LiveStatus, PostRecord,
    ProducerInfo, ProducerStat,
};
pub use repository::StateRepository;
pub use sequence::SequenceCounter;
pub use transaction::{Coordinator, TxnContext};
