//! Group concern tracking
//!
//! Records which producers each subscriber group follows, and for which
//! kinds of change. One document per (group, producer) pair.

use std::collections::BTreeSet;
use vigil_core::{KeyFamily, KeySet, Result};

use crate::model::{ConcernKind, GroupConcern};
use crate::repository::{collect_index, collect_keys};
use crate::transaction::{Coordinator, TxnContext};

#[derive(Clone)]
pub struct ConcernTracker {
    coordinator: Coordinator,
    keys: KeySet,
}

impl ConcernTracker {
    pub fn new(coordinator: Coordinator, keys: KeySet) -> Self {
        Self { coordinator, keys }
    }

    /// Follow `producer` in `group` for `kind`; false if already followed
    pub fn add_concern(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        group: i64,
        producer: i64,
        kind: ConcernKind,
    ) -> Result<bool> {
        let key = self.keys.group_concern_state_key(group, producer);
        self.coordinator.with_read_write(ctx, |tx| {
            let mut concern = match tx.get_json::<GroupConcern>(&key) {
                Ok(concern) => concern,
                Err(e) if e.is_not_found() => GroupConcern {
                    group,
                    producer,
                    kinds: BTreeSet::new(),
                },
                Err(e) => return Err(e),
            };
            if !concern.kinds.insert(kind) {
                return Ok(false);
            }
            tx.set_json(&key, &concern, None)?;
            Ok(true)
        })
    }

    /// Stop following `producer` in `group` for `kind`
    ///
    /// The document is removed once no kind is left. False if `kind` was not
    /// followed.
    pub fn remove_concern(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        group: i64,
        producer: i64,
        kind: ConcernKind,
    ) -> Result<bool> {
        let key = self.keys.group_concern_state_key(group, producer);
        self.coordinator.with_read_write(ctx, |tx| {
            let mut concern = match tx.get_json::<GroupConcern>(&key) {
                Ok(concern) => concern,
                Err(e) if e.is_not_found() => return Ok(false),
                Err(e) => return Err(e),
            };
            if !concern.kinds.remove(&kind) {
                return Ok(false);
            }
            if concern.kinds.is_empty() {
                tx.delete(&key)?;
            } else {
                tx.set_json(&key, &concern, None)?;
            }
            Ok(true)
        })
    }

    /// `NotFound` when the group does not follow the producer
    pub fn get_concern(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        group: i64,
        producer: i64,
    ) -> Result<GroupConcern> {
        let key = self.keys.group_concern_state_key(group, producer);
        self.coordinator.with_read(ctx, |tx| tx.get_json(&key))
    }

    pub fn list_group_concerns(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        group: i64,
    ) -> Result<Vec<GroupConcern>> {
        let pattern = self
            .keys
            .pattern(KeyFamily::GroupConcernState)
            .wildcard(&[&group]);
        self.coordinator
            .with_read(ctx, |tx| collect_keys(tx, &pattern))
    }

    pub fn list_all_concerns(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
    ) -> Result<Vec<GroupConcern>> {
        let index = self
            .keys
            .pattern(KeyFamily::GroupConcernState)
            .name()
            .to_string();
        self.coordinator
            .with_read(ctx, |tx| collect_index(tx, &index))
    }

    /// Drop every concern of a group, e.g. when the bot leaves it
    pub fn remove_group(&self, ctx: Option<&mut TxnContext<'_>>, group: i64) -> Result<usize> {
        let pattern = self
            .keys
            .pattern(KeyFamily::GroupConcernState)
            .wildcard(&[&group]);
        self.coordinator.with_read_write(ctx, |tx| {
            let mut keys = Vec::new();
            tx.ascend_keys(&pattern, |key, _| {
                keys.push(key.to_string());
                true
            })?;
            tx.delete_all(&keys)
        })
    }

    /// Producers followed for `kind` by at least one group
    pub fn tracked_producers(
        &self,
        ctx: Option<&mut TxnContext<'_>>,
        kind: ConcernKind,
    ) -> Result<BTreeSet<i64>> {
        let concerns = self.list_all_concerns(ctx)?;
        Ok(concerns
            .into_iter()
            .filter(|c| c.kinds.contains(&kind))
            .map(|c| c.producer)
            .collect())
    }
}
