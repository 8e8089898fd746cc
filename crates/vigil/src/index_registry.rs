//! Start-up registration of per-family range indexes

use vigil_core::{KeyFamily, KeySet, Result};

use crate::transaction::Coordinator;

/// Families iterated by tag
pub const INDEXED_FAMILIES: [KeyFamily; 7] = [
    KeyFamily::GroupConcernState,
    KeyFamily::LiveSession,
    KeyFamily::Fresh,
    KeyFamily::ProducerInfo,
    KeyFamily::ProducerStat,
    KeyFamily::PostSeen,
    KeyFamily::PostRecord,
];

pub struct PatternIndexRegistry {
    coordinator: Coordinator,
    keys: KeySet,
}

impl PatternIndexRegistry {
    pub fn new(coordinator: Coordinator, keys: KeySet) -> Self {
        Self { coordinator, keys }
    }

    /// Register `tag` -> `tag:*` for every indexed family
    ///
    /// Must run after the engine is open and before anything iterates by
    /// tag. Indexes that already exist are kept, so running it again is
    /// harmless. Returns how many indexes were newly created.
    pub fn start(&self) -> Result<usize> {
        let store = self.coordinator.store()?;
        let mut created = 0;
        for family in INDEXED_FAMILIES {
            let pattern = self.keys.pattern(family);
            if store.create_index(pattern.name(), &pattern.wildcard(&[]))? {
                created += 1;
            }
        }
        tracing::debug!(
            "Registered {} pattern indexes for platform {}",
            created,
            self.keys.platform()
        );
        Ok(created)
    }

    /// Index name for a family, as accepted by `ascend_index`
    pub fn index_name(&self, family: KeyFamily) -> String {
        self.keys.pattern(family).name().to_string()
    }
}
