//! On-disk value layout
//!
//! ```text
//! +----------------------+------------------+
//! | expires_at (u64, BE) | payload          |
//! +----------------------+------------------+
//! ```
//!
//! `expires_at` is in unix milliseconds; 0 means the entry never expires.

use std::time::Duration;
use vigil_core::{Result, VigilError};

pub const HEADER_LEN: usize = 8;

/// A decoded stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub expires_at: Option<i64>,
    pub payload: &'a [u8],
}

impl<'a> Entry<'a> {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now_millis)
    }

    /// Time left before expiry; `None` for entries without a TTL
    pub fn remaining(&self, now_millis: i64) -> Option<Duration> {
        self.expires_at
            .map(|at| Duration::from_millis((at - now_millis).max(0) as u64))
    }
}

/// Absolute expiry for a TTL; a zero TTL means "no expiry"
pub fn expiry_for(ttl: Option<Duration>, now_millis: i64) -> Option<i64> {
    match ttl {
        Some(ttl) if !ttl.is_zero() => {
            Some(now_millis.saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64))
        }
        _ => None,
    }
}

pub fn encode(payload: &[u8], expires_at: Option<i64>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    let header = expires_at.map(|at| at.max(1) as u64).unwrap_or(0);
    buf.extend_from_slice(&header.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

pub fn decode(raw: &[u8]) -> Result<Entry<'_>> {
    if raw.len() < HEADER_LEN {
        return Err(VigilError::Serialization(format!(
            "stored value too short: {} bytes",
            raw.len()
        )));
    }
    let (header, payload) = raw.split_at(HEADER_LEN);
    let mut bytes = [0u8; HEADER_LEN];
    bytes.copy_from_slice(header);
    let expires_at = match u64::from_be_bytes(bytes) {
        0 => None,
        at => Some(at as i64),
    };
    Ok(Entry {
        expires_at,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_expiry() {
        let raw = encode(b"value", None);
        let entry = decode(&raw).unwrap();
        assert_eq!(entry.payload, b"value");
        assert_eq!(entry.expires_at, None);
        assert!(!entry.is_expired(i64::MAX));
        assert_eq!(entry.remaining(0), None);
    }

    #[test]
    fn test_expiry_boundary() {
        let raw = encode(b"", Some(1_000));
        let entry = decode(&raw).unwrap();
        assert!(entry.payload.is_empty());
        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1_000));
        assert_eq!(entry.remaining(400), Some(Duration::from_millis(600)));
        assert_eq!(entry.remaining(5_000), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_ttl_means_no_expiry() {
        assert_eq!(expiry_for(Some(Duration::ZERO), 10), None);
        assert_eq!(expiry_for(None, 10), None);
        assert_eq!(expiry_for(Some(Duration::from_secs(1)), 10), Some(1_010));
    }

    #[test]
    fn test_truncated_value_rejected() {
        assert!(matches!(
            decode(&[0, 1, 2]),
            Err(VigilError::Serialization(_))
        ));
    }
}
