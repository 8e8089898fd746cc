use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifetimes of the TTL'd records kept by the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Live session record (default: 7 days)
    #[serde(default = "default_live_session_ttl")]
    pub live_session_ttl_secs: u64,

    /// Seen-once mark for a post (default: 120 hours)
    #[serde(default = "default_post_mark_ttl")]
    pub post_mark_ttl_secs: u64,

    /// Per-group origin mark suppressing near-simultaneous repeats (default: 15 minutes)
    #[serde(default = "default_origin_mark_ttl")]
    pub origin_mark_ttl_secs: u64,
}

fn default_live_session_ttl() -> u64 {
    7 * 24 * 3600
}

fn default_post_mark_ttl() -> u64 {
    120 * 3600
}

fn default_origin_mark_ttl() -> u64 {
    15 * 60
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            live_session_ttl_secs: default_live_session_ttl(),
            post_mark_ttl_secs: default_post_mark_ttl(),
            origin_mark_ttl_secs: default_origin_mark_ttl(),
        }
    }
}

impl RetentionConfig {
    pub fn live_session_ttl(&self) -> Duration {
        Duration::from_secs(self.live_session_ttl_secs)
    }

    pub fn post_mark_ttl(&self) -> Duration {
        Duration::from_secs(self.post_mark_ttl_secs)
    }

    pub fn origin_mark_ttl(&self) -> Duration {
        Duration::from_secs(self.origin_mark_ttl_secs)
    }
}
