//! Key namespace
//!
//! Every record lives in one flat key space. A key is the colon-joined
//! string of a type tag followed by identifier segments in their natural
//! textual form (integers as decimal, booleans as `true`/`false`, strings
//! verbatim). The rendering is part of the persisted format: changing it
//! orphans existing data.

use std::fmt::{Display, Write};

pub const SEPARATOR: char = ':';

/// Build `tag:seg1:seg2:...`
pub fn named_key(tag: &str, segments: &[&dyn Display]) -> String {
    let mut key = String::from(tag);
    for segment in segments {
        key.push(SEPARATOR);
        // Writing into a String cannot fail
        let _ = write!(key, "{}", segment);
    }
    key
}

/// Record families, one tag each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyFamily {
    GroupConcernState,
    ProducerInfo,
    ProducerStat,
    LiveSession,
    PostRecord,
    PostSeen,
    OriginMark,
    NotLiveCount,
    FirstSeen,
    Fresh,
    SessionCookie,
}

impl KeyFamily {
    pub const ALL: [KeyFamily; 11] = [
        KeyFamily::GroupConcernState,
        KeyFamily::ProducerInfo,
        KeyFamily::ProducerStat,
        KeyFamily::LiveSession,
        KeyFamily::PostRecord,
        KeyFamily::PostSeen,
        KeyFamily::OriginMark,
        KeyFamily::NotLiveCount,
        KeyFamily::FirstSeen,
        KeyFamily::Fresh,
        KeyFamily::SessionCookie,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyFamily::GroupConcernState => "GroupConcernState",
            KeyFamily::ProducerInfo => "ProducerInfo",
            KeyFamily::ProducerStat => "ProducerStat",
            KeyFamily::LiveSession => "LiveSession",
            KeyFamily::PostRecord => "PostRecord",
            KeyFamily::PostSeen => "PostSeen",
            KeyFamily::OriginMark => "OriginMark",
            KeyFamily::NotLiveCount => "NotLiveCount",
            KeyFamily::FirstSeen => "FirstSeen",
            KeyFamily::Fresh => "Fresh",
            KeyFamily::SessionCookie => "SessionCookie",
        }
    }
}

/// Builder for the keys of one family
///
/// Also yields the wildcard pattern used to register a range index over
/// the family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    tag: String,
}

impl KeyPattern {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// Index name, identical to the tag
    pub fn name(&self) -> &str {
        &self.tag
    }

    pub fn key(&self, segments: &[&dyn Display]) -> String {
        named_key(&self.tag, segments)
    }

    /// `tag:prefix...:*`, matching every key of the family under the prefix
    pub fn wildcard(&self, prefix: &[&dyn Display]) -> String {
        let mut pattern = self.key(prefix);
        pattern.push(SEPARATOR);
        pattern.push('*');
        pattern
    }
}

/// All key builders for one platform
///
/// Tags are `<platform>.<Family>`, so two platforms watching producers with
/// colliding ids never share a key.
#[derive(Debug, Clone)]
pub struct KeySet {
    platform: String,
}

impl KeySet {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn pattern(&self, family: KeyFamily) -> KeyPattern {
        KeyPattern::new(format!("{}.{}", self.platform, family.as_str()))
    }

    pub fn group_concern_state_key(&self, group: i64, producer: i64) -> String {
        self.pattern(KeyFamily::GroupConcernState)
            .key(&[&group, &producer])
    }

    pub fn producer_info_key(&self, producer: i64) -> String {
        self.pattern(KeyFamily::ProducerInfo).key(&[&producer])
    }

    pub fn producer_stat_key(&self, producer: i64) -> String {
        self.pattern(KeyFamily::ProducerStat).key(&[&producer])
    }

    pub fn live_session_key(&self, producer: i64) -> String {
        self.pattern(KeyFamily::LiveSession).key(&[&producer])
    }

    pub fn post_record_key(&self, producer: i64) -> String {
        self.pattern(KeyFamily::PostRecord).key(&[&producer])
    }

    pub fn post_seen_key(&self, post: i64) -> String {
        self.pattern(KeyFamily::PostSeen).key(&[&post])
    }

    pub fn origin_mark_key(&self, group: i64, item: &str) -> String {
        self.pattern(KeyFamily::OriginMark).key(&[&group, &item])
    }

    pub fn not_live_count_key(&self, producer: i64) -> String {
        self.pattern(KeyFamily::NotLiveCount).key(&[&producer])
    }

    pub fn first_seen_key(&self, producer: i64) -> String {
        self.pattern(KeyFamily::FirstSeen).key(&[&producer])
    }

    pub fn fresh_key(&self, kind: &str) -> String {
        self.pattern(KeyFamily::Fresh).key(&[&kind])
    }

    pub fn session_cookie_key(&self, account: &str) -> String {
        self.pattern(KeyFamily::SessionCookie).key(&[&account])
    }
}
