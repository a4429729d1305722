/// Parallel recursive aggregation on a rayon pool.
///
/// For each directory: list it, sum the immediate files on the current
/// thread, fan one task out per subdirectory, join them all, then record the
/// directory's total. Every directory is computed by exactly one task (the
/// task spawned for it by its parent), so every map key has a single writer.
///
/// Width is bounded by rayon's work-stealing pool; depth follows the tree.
/// A task that observes cancellation returns an empty subtotal without
/// recording anything for its subtree, and parents tolerate the gap.
use super::{SizeAggregator, Subtotal};
use crate::model::{AggregateSizeMap, Entry};
use crate::walker;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Fan-out aggregator. Runs on `pool` when one is supplied, otherwise on
/// rayon's global pool.
#[derive(Clone, Default)]
pub struct ParallelAggregator {
    pool: Option<Arc<ThreadPool>>,
}

impl ParallelAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Total for one directory. Callers already inside the pool (the
    /// scanner fanning out over the scan root's children) use this directly.
    pub fn directory_total(dir: &Path, sizes: &AggregateSizeMap, cancel: &AtomicBool) -> Subtotal {
        if cancel.load(Ordering::Relaxed) {
            return Subtotal::default();
        }

        let listing = match walker::read_children(dir, cancel) {
            Ok(listing) => listing,
            Err(err) => {
                // Unreadable directory: it exists with nothing countable below it.
                trace!("cannot list {}: {err}", dir.display());
                walker::Listing::default()
            }
        };

        let own = file_subtotal(&listing.files);

        let nested = listing
            .dirs
            .par_iter()
            .map(|sub| Self::directory_total(&sub.path, sizes, cancel))
            .reduce(Subtotal::default, |a, b| a + b);

        if cancel.load(Ordering::Relaxed) {
            return Subtotal::default();
        }

        let total = own + nested;
        sizes.record(dir, total.bytes);
        total
    }
}

/// Bytes and regular-file count of the immediate files of a listing.
pub(crate) fn file_subtotal(files: &[Entry]) -> Subtotal {
    files.iter().fold(Subtotal::default(), |acc, f| Subtotal {
        bytes: acc.bytes + f.size_bytes,
        files: acc.files + u64::from(f.is_regular_file()),
    })
}

impl SizeAggregator for ParallelAggregator {
    fn aggregate(
        &self,
        root: &Path,
        sizes: &AggregateSizeMap,
        cancel: &Arc<AtomicBool>,
    ) -> Subtotal {
        match &self.pool {
            Some(pool) => pool.install(|| Self::directory_total(root, sizes, cancel)),
            None => Self::directory_total(root, sizes, cancel),
        }
    }
}
