//! Vigil Prelude
//!
//! ```
//! use vigil::prelude::*;
//! ```

// Core types
pub use crate::{CommitInfo, Result, VigilError};

// Configs
pub use crate::{EngineConfig, EngineTarget, RetentionConfig, SyncMode, VigilConfig};

// Engine and transactions
pub use crate::{Coordinator, EngineHandle, LmdbStore, TxnContext};

// Keys
pub use crate::{named_key, KeyFamily, KeySet, PatternIndexRegistry};

// State
pub use crate::{ConcernTracker, DedupTracker, SequenceCounter, StateRepository};

// Records
pub use crate::{
    ConcernKind, CredentialBundle, GroupConcern, LiveSession, PostRecord, ProducerInfo,
    ProducerStat,
};

pub use std::sync::Arc;
pub use std::time::Duration;
