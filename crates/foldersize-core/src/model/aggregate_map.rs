/// Per-directory cumulative byte totals for one scan or export pass.
///
/// Each directory path is written exactly once, by the task that finished
/// computing that directory. Concurrent writers therefore never touch the
/// same key; the lock only makes the insertion itself safe.
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::trace;

#[derive(Debug, Default)]
pub struct AggregateSizeMap {
    totals: RwLock<HashMap<PathBuf, u64>>,
}

impl AggregateSizeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the final total for `dir`.
    ///
    /// Entries are write-once: a second record for the same path keeps the
    /// first value and returns `false`.
    pub fn record(&self, dir: &Path, total: u64) -> bool {
        let mut totals = self.totals.write();
        if totals.contains_key(dir) {
            trace!("ignoring duplicate total for {}", dir.display());
            return false;
        }
        totals.insert(dir.to_path_buf(), total);
        true
    }

    /// Recorded total for `dir`, if that directory finished.
    pub fn get(&self, dir: &Path) -> Option<u64> {
        self.totals.read().get(dir).copied()
    }

    /// Recorded total, or 0 for a directory that was never recorded
    /// (cancelled subtree, unreadable directory).
    pub fn get_or_zero(&self, dir: &Path) -> u64 {
        self.get(dir).unwrap_or(0)
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.totals.read().contains_key(dir)
    }

    pub fn len(&self) -> usize {
        self.totals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.read().is_empty()
    }

    /// Copy out all totals. Used for comparisons and diagnostics.
    pub fn snapshot(&self) -> HashMap<PathBuf, u64> {
        self.totals.read().clone()
    }
}
