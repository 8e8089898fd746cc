//! Vigil Core: traits and types for the vigil state layer
//!
//! This crate defines the pieces shared by the engine binding and the
//! domain layer:
//! - Error taxonomy distinguishing "absent" from real failures
//! - Engine and retention configuration
//! - Key namespace: composed `tag:seg:seg` keys and their wildcard patterns
//! - Glob matching used by pattern indexes
//! - A clock abstraction so expiry can be driven by tests

pub mod clock;
pub mod config;
pub mod error;
pub mod keys;
pub mod pattern;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, EngineTarget, RetentionConfig, SyncMode, VigilConfig};
pub use error::{Result, VigilError};
pub use keys::{named_key, KeyFamily, KeyPattern, KeySet};
pub use traits::{CommitInfo, StateRead, StateWrite};
