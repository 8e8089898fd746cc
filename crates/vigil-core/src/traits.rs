use crate::error::Result;
use std::time::Duration;

/// Summary of a committed write transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    pub keys_written: usize,
    pub keys_deleted: usize,
}

/// Read access shared by read-only and read-write engine transactions
///
/// Expired entries are indistinguishable from absent ones through every
/// method here.
pub trait StateRead {
    /// Point read; `NotFound` if the key is absent or expired
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    fn exists(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remaining lifetime; `None` when the key never expires
    fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Visit live entries whose key matches `pattern`, in ascending key order,
    /// until `f` returns false
    fn ascend_keys(&self, pattern: &str, f: &mut dyn FnMut(&str, &[u8]) -> bool) -> Result<()>;

    /// Same as `ascend_keys` with the pattern of a registered index
    fn ascend_index(&self, index: &str, f: &mut dyn FnMut(&str, &[u8]) -> bool) -> Result<()>;
}

/// Write access of a read-write engine transaction
pub trait StateWrite: StateRead {
    /// Store `value`, replacing any previous entry. Returns the previous live
    /// value, so `Some` means a prior entry was replaced.
    fn set(&mut self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<Option<Vec<u8>>>;

    /// Remove a key, returning its value; `NotFound` if absent or expired
    fn delete(&mut self, key: &str) -> Result<Vec<u8>>;

    fn commit(self) -> Result<CommitInfo>
    where
        Self: Sized;

    fn abort(self)
    where
        Self: Sized;
}
