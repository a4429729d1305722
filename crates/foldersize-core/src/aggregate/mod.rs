/// Size aggregation: per-directory cumulative byte totals.
///
/// Two interchangeable strategies fill an [`AggregateSizeMap`]:
/// - [`ParallelAggregator`]: recursive fan-out on a rayon pool, one task per
///   subdirectory, joined before the parent's total is recorded. Used by the
///   interactive scan.
/// - [`PostOrderAggregator`]: a single pre-order walk driven through an
///   explicit stack of open directories; totals are finalised and propagated
///   to the parent when a directory is left. Used by the export pipeline.
///
/// For the same filesystem snapshot both produce identical maps: every
/// directory's total is the sum of its regular files plus the totals of its
/// immediate subdirectories. Links, special files, and entries whose stat
/// fails contribute 0.
pub mod parallel;
pub mod post_order;

use crate::model::AggregateSizeMap;
use std::ops::{Add, AddAssign};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use parallel::ParallelAggregator;
pub use post_order::PostOrderAggregator;

/// Bytes and regular-file count of a finished subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subtotal {
    pub bytes: u64,
    pub files: u64,
}

impl Add for Subtotal {
    type Output = Subtotal;

    fn add(self, rhs: Subtotal) -> Subtotal {
        Subtotal {
            bytes: self.bytes + rhs.bytes,
            files: self.files + rhs.files,
        }
    }
}

impl AddAssign for Subtotal {
    fn add_assign(&mut self, rhs: Subtotal) {
        self.bytes += rhs.bytes;
        self.files += rhs.files;
    }
}

/// A strategy that computes the subtree totals below `root`.
pub trait SizeAggregator {
    /// Aggregate `root`, recording every finished directory in `sizes`.
    ///
    /// Returns the root's subtotal. If `cancel` is raised, unfinished
    /// directories are not recorded and the returned subtotal is partial.
    fn aggregate(&self, root: &Path, sizes: &AggregateSizeMap, cancel: &Arc<AtomicBool>)
        -> Subtotal;

    /// Convenience: aggregate into a fresh map.
    fn build_map(&self, root: &Path) -> AggregateSizeMap {
        let sizes = AggregateSizeMap::new();
        self.aggregate(root, &sizes, &Arc::new(AtomicBool::new(false)));
        sizes
    }
}
