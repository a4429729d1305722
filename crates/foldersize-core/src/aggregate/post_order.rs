/// Iterative post-order aggregation over a pre-order walk.
///
/// No recursion: the directories that are currently "open" live on an
/// explicit stack, each with a running total.
///
/// - entering a directory pushes it with a total of 0;
/// - a file adds its size to the directory on top of the stack;
/// - before any entry at depth `d` is handled, every open directory at
///   depth `>= d` is finished: popped, recorded, and added into the new top.
///
/// Memory is bounded by tree depth, not tree size.
use super::{SizeAggregator, Subtotal};
use crate::model::AggregateSizeMap;
use crate::walker::{self, WalkEntry};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Explicit-stack aggregator.
#[derive(Debug, Clone, Copy)]
pub struct PostOrderAggregator {
    /// Threads used by the underlying walk for directory reads.
    /// 1 keeps everything on the calling thread.
    pub read_threads: usize,
}

impl Default for PostOrderAggregator {
    fn default() -> Self {
        Self { read_threads: 1 }
    }
}

struct OpenDir {
    path: PathBuf,
    depth: usize,
    total: Subtotal,
}

impl PostOrderAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an arbitrary pre-order stream into `sizes`.
    ///
    /// Split out from [`SizeAggregator::aggregate`] so the stack discipline
    /// can be exercised without a filesystem.
    pub fn fold<I>(entries: I, sizes: &AggregateSizeMap, cancel: &AtomicBool) -> Subtotal
    where
        I: IntoIterator<Item = WalkEntry>,
    {
        let mut open: Vec<OpenDir> = Vec::new();
        let mut root_total = Subtotal::default();

        for entry in entries {
            while open.last().is_some_and(|d| d.depth >= entry.depth) {
                close_top(&mut open, sizes, &mut root_total);
            }

            if entry.is_directory() {
                open.push(OpenDir {
                    path: entry.path,
                    depth: entry.depth,
                    total: Subtotal::default(),
                });
            } else if let Some(top) = open.last_mut() {
                top.total += Subtotal {
                    bytes: entry.size_bytes,
                    files: u64::from(entry.error.is_none() && entry.kind.is_regular()),
                };
            }
        }

        if cancel.load(Ordering::Relaxed) {
            // The stream was cut short; what is still open is incomplete.
            debug!("post-order aggregation cancelled with {} open directories", open.len());
            return root_total;
        }

        while !open.is_empty() {
            close_top(&mut open, sizes, &mut root_total);
        }
        root_total
    }
}

/// Finish the directory on top of the stack and propagate its total.
fn close_top(open: &mut Vec<OpenDir>, sizes: &AggregateSizeMap, root_total: &mut Subtotal) {
    let Some(done) = open.pop() else {
        return;
    };
    sizes.record(&done.path, done.total.bytes);
    match open.last_mut() {
        Some(parent) => parent.total += done.total,
        None => *root_total = done.total,
    }
}

impl SizeAggregator for PostOrderAggregator {
    fn aggregate(
        &self,
        root: &Path,
        sizes: &AggregateSizeMap,
        cancel: &Arc<AtomicBool>,
    ) -> Subtotal {
        let stream = walker::walk(root, self.read_threads, cancel.clone());
        Self::fold(stream, sizes, cancel)
    }
}
