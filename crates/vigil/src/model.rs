//! Persisted domain records
//!
//! All of these are stored as JSON documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Display attributes of a watched producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerInfo {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProducerInfo {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar_url: None,
        }
    }
}

/// Rolling statistics for a producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerStat {
    pub id: i64,
    pub followers: i64,
    pub following: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    Offline,
    Live,
    Rotating,
}

/// A producer's current live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSession {
    pub producer: ProducerInfo,
    pub room_id: i64,
    pub title: String,
    pub status: LiveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Unix seconds the session went live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
}

/// The latest post seen from a producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub producer: ProducerInfo,
    pub post_id: i64,
    /// Unix seconds
    pub published_at: i64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub http_only: bool,
    /// Unix seconds; 0 for a session cookie
    #[serde(default)]
    pub expires: i64,
}

/// Login credentials for one account
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub domains: Vec<String>,
}

impl CredentialBundle {
    /// Expiry of the bundle, taken from its first cookie; `None` never expires
    pub fn expires_at(&self) -> Option<i64> {
        self.cookies
            .first()
            .map(|c| c.expires)
            .filter(|expires| *expires != 0)
    }
}

/// What a group wants to hear about a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcernKind {
    Live,
    Post,
}

/// One group's subscription to one producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConcern {
    pub group: i64,
    pub producer: i64,
    pub kinds: BTreeSet<ConcernKind>,
}
