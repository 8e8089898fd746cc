//! Domain state repository
//!
//! Each method is one coordinator call: writes go through
//! `with_read_write`, reads through `with_read`. Every method takes an
//! optional context so callers can fold several operations into one
//! transaction.

use serde::de::DeserializeOwned;
use std::time::Duration;
use vigil_core::{KeyFamily, KeySet, Result, RetentionConfig, VigilError};

use crate::dedup::DedupTracker;
use crate::model::{CredentialBundle, LiveSession, PostRecord, ProducerInfo, ProducerStat};
use crate::sequence::SequenceCounter;
use crate::transaction::{Coordinator, TxnContext};

/// Decode every entry of an index, stopping at the first malformed document
pub(crate) fn collect_index<T: DeserializeOwned>(
    tx: &TxnContext<'_>,
    index: &str,
) -> Result<Vec<T>> {
    collect_with(|f| tx.ascend_index(index, f))
}

pub(crate) fn collect_keys<T: DeserializeOwned>(
    tx: &TxnContext<'_>,
    pattern: &str,
) -> Result<Vec<T>> {
    collect_with(|f| tx.ascend_keys(pattern, f))
}

fn collect_with<T, W>(walk: W) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    W: FnOnce(&mut dyn FnMut(&str, &[u8]) -> bool) -> Result<()>,
{
    let mut items = Vec::new();
    let mut failure = None;
    walk(&mut |key: &str, value: &[u8]| match serde_json::from_slice(value) {
        Ok(item) => {
            items.push(item);
            true
        }
        Err(e) => {
            failure = Some(VigilError::Serialization(format!("{}: {}", key, e)));
            false
        }
    })?;
    match failure {
        Some(e) => Err(e),
        None => Ok(items),
    }
}

#[derive(Clone)]
pub struct StateRepository {
    coordinator: Coordinator,
    keys: KeySet,
    retention: RetentionConfig,
    dedup: DedupTracker,
    sequence: SequenceCounter,
}

impl StateRepository {
    pub fn new(coordinator: Coordinator, keys: KeySet, retention: RetentionConfig) -> Self {
        Self {
            dedup: DedupTracker::new(coordinator.clone()),
            sequence: SequenceCounter::new(coordinator.clone()),
            coordinator,
            keys,
            retention,
        }
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    fn index(&self, family: KeyFamily) -> String {
        self.keys.pattern(family).name().to_string()
    }

    fn now_secs(&self) -> Result<i64> {
        Ok(self.coordinator.store()?.clock().now_secs())
    }

    // Producer info and stats

    pub fn add_producer_info(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        info: &ProducerInfo,
    ) -> Result<()> {
        let key = self.keys.producer_info_key(info.id);
        self.coordinator
            .with_read_write(ctx, |tx| tx.set_json(&key, info, None).map(|_| ()))
    }

    pub fn get_producer_info(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        id: i64,
    ) -> Result<ProducerInfo> {
        let key = self.keys.producer_info_key(id);
        self.coordinator.with_read(ctx, |tx| tx.get_json(&key))
    }

    /// Every stored producer, in key order
    pub fn list_producer_infos(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
    ) -> Result<Vec<ProducerInfo>> {
        let index = self.index(KeyFamily::ProducerInfo);
        self.coordinator
            .with_read(ctx, |tx| collect_index(tx, &index))
    }

    pub fn add_producer_stat(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        stat: &ProducerStat,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = self.keys.producer_stat_key(stat.id);
        self.coordinator
            .with_read_write(ctx, |tx| tx.set_json(&key, stat, ttl).map(|_| ()))
    }

    pub fn get_producer_stat(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        id: i64,
    ) -> Result<ProducerStat> {
        let key = self.keys.producer_stat_key(id);
        self.coordinator.with_read(ctx, |tx| tx.get_json(&key))
    }

    // Live sessions

    /// Store a live session and refresh its producer's info in the same
    /// transaction
    pub fn add_live_session(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        session: &LiveSession,
    ) -> Result<()> {
        let id = session.producer.id;
        let info_key = self.keys.producer_info_key(id);
        let live_key = self.keys.live_session_key(id);
        let ttl = self.retention.live_session_ttl();
        self.coordinator.with_read_write(ctx, |tx| {
            tx.set_json(&info_key, &session.producer, None)?;
            tx.set_json(&live_key, session, Some(ttl))?;
            Ok(())
        })
    }

    pub fn get_live_session(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        id: i64,
    ) -> Result<LiveSession> {
        let key = self.keys.live_session_key(id);
        self.coordinator.with_read(ctx, |tx| tx.get_json(&key))
    }

    pub fn list_live_sessions(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
    ) -> Result<Vec<LiveSession>> {
        let index = self.index(KeyFamily::LiveSession);
        self.coordinator
            .with_read(ctx, |tx| collect_index(tx, &index))
    }

    /// Remove a live session; a missing session is not an error
    pub fn delete_live_session(&self, ctx: Option<&mut TxnContext<'_>>, id: i64) -> Result<()> {
        let key = self.keys.live_session_key(id);
        self.coordinator
            .with_read_write(ctx, |tx| tx.delete_all(&[key]).map(|_| ()))
    }

    // Post records

    /// Store a post record and refresh its producer's info in the same
    /// transaction
    pub fn add_post_record(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        record: &PostRecord,
    ) -> Result<()> {
        let id = record.producer.id;
        let info_key = self.keys.producer_info_key(id);
        let post_key = self.keys.post_record_key(id);
        self.coordinator.with_read_write(ctx, |tx| {
            tx.set_json(&info_key, &record.producer, None)?;
            tx.set_json(&post_key, record, None)?;
            Ok(())
        })
    }

    pub fn get_post_record(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        id: i64,
    ) -> Result<PostRecord> {
        let key = self.keys.post_record_key(id);
        self.coordinator.with_read(ctx, |tx| tx.get_json(&key))
    }

    pub fn delete_post_record(&self, ctx: Option<&mut TxnContext<'_>>, id: i64) -> Result<()> {
        let key = self.keys.post_record_key(id);
        self.coordinator
            .with_read_write(ctx, |tx| tx.delete_all(&[key]).map(|_| ()))
    }

    pub fn delete_post_and_live(&self, ctx: Option<&mut TxnContext<'_>>, id: i64) -> Result<()> {
        let keys = [self.keys.live_session_key(id), self.keys.post_record_key(id)];
        self.coordinator
            .with_read_write(ctx, |tx| tx.delete_all(&keys).map(|_| ()))
    }

    /// Drop every per-producer record; used when a producer is untracked
    pub fn clear_producer(&self, ctx: Option<&mut TxnContext<'_>>, id: i64) -> Result<usize> {
        let keys = [
            self.keys.live_session_key(id),
            self.keys.post_record_key(id),
            self.keys.first_seen_key(id),
            self.keys.producer_info_key(id),
            self.keys.not_live_count_key(id),
        ];
        self.coordinator
            .with_read_write(ctx, |tx| tx.delete_all(&keys))
    }

    // Post dedup

    /// True when the post has not been notified yet
    pub fn check_post_seen(&self, ctx: Option<&mut TxnContext<'_>>, post_id: i64) -> bool {
        self.dedup
            .check_seen(ctx, &self.keys.post_seen_key(post_id))
    }

    /// Mark a post notified; true when it was already marked
    pub fn mark_post_seen(&self, ctx: Option<&mut TxnContext<'_>>, post_id: i64) -> Result<bool> {
        self.dedup.mark_seen(
            ctx,
            &self.keys.post_seen_key(post_id),
            Some(self.retention.post_mark_ttl()),
        )
    }

    /// Place a short-lived mark suppressing a repeat notification of `item`
    /// in `group`; true when this call placed it
    pub fn set_origin_mark_if_absent(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        group: i64,
        item: &str,
    ) -> Result<bool> {
        self.dedup.claim(
            ctx,
            &self.keys.origin_mark_key(group, item),
            Some(self.retention.origin_mark_ttl()),
        )
    }

    /// True when the caller should refresh `kind` now
    ///
    /// The slot stays taken for `interval`, so concurrent pollers refresh
    /// at most once per interval.
    pub fn try_freshen(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        kind: &str,
        interval: Duration,
    ) -> Result<bool> {
        self.dedup
            .claim(ctx, &self.keys.fresh_key(kind), Some(interval))
    }

    // Offline streak

    /// Bump the "still offline" streak
    ///
    /// Returns 0 when the counter could not be updated; the failure is
    /// logged, not propagated. Use `SequenceCounter::increment` directly to
    /// tell a failure apart from a count.
    pub fn inc_not_live_count(&self, ctx: Option<&mut TxnContext<'_>>, id: i64) -> i64 {
        let key = self.keys.not_live_count_key(id);
        self.sequence.increment(ctx, &key).unwrap_or_else(|e| {
            tracing::warn!("Not-live counter {} failed, reporting 0: {}", key, e);
            0
        })
    }

    pub fn clear_not_live_count(&self, ctx: Option<&mut TxnContext<'_>>, id: i64) -> Result<()> {
        self.sequence
            .clear(ctx, &self.keys.not_live_count_key(id))
    }

    // First-seen timestamps

    /// Record when a producer was first observed; later calls keep the
    /// original. True when this call stored it.
    pub fn set_first_seen_if_absent(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        id: i64,
        timestamp: i64,
    ) -> Result<bool> {
        self.sequence
            .set_if_absent(ctx, &self.keys.first_seen_key(id), timestamp, None)
    }

    pub fn get_first_seen(&self, ctx: Option<&mut TxnContext<'_>>, id: i64) -> Result<i64> {
        self.sequence.read(ctx, &self.keys.first_seen_key(id))
    }

    pub fn unset_first_seen(&self, ctx: Option<&mut TxnContext<'_>>, id: i64) -> Result<()> {
        self.sequence.unset(ctx, &self.keys.first_seen_key(id))
    }

    // Credentials

    /// Replace an account's credentials
    ///
    /// The record expires together with the bundle's first cookie. A bundle
    /// that has already expired is rejected.
    pub fn set_credentials(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        account: &str,
        bundle: &CredentialBundle,
    ) -> Result<()> {
        let ttl = match bundle.expires_at() {
            None => None,
            Some(expires_at) => {
                let remaining = expires_at - self.now_secs()?;
                if remaining <= 0 {
                    return Err(VigilError::InvalidState(format!(
                        "credentials for {} expired {}s ago",
                        account, -remaining
                    )));
                }
                Some(Duration::from_secs(remaining as u64))
            }
        };
        let key = self.keys.session_cookie_key(account);
        self.coordinator
            .with_read_write(ctx, |tx| tx.set_json(&key, bundle, ttl).map(|_| ()))
    }

    pub fn get_credentials(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        account: &str,
    ) -> Result<CredentialBundle> {
        let key = self.keys.session_cookie_key(account);
        self.coordinator.with_read(ctx, |tx| tx.get_json(&key))
    }
}
