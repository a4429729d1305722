/// Full-subtree walk built on `jwalk`.
///
/// `jwalk` yields entries in depth-first pre-order even when directory reads
/// run in parallel, and reports the depth of every entry. That is all the
/// post-order aggregator and the export count pass need: a directory is
/// finished as soon as an entry at the same or a shallower depth appears.
///
/// Cancellation is cooperative at two levels:
/// - inside `jwalk`, every directory read checks the flag and drops the
///   children of a directory read after cancellation, so no further
///   descent happens;
/// - the iterator re-checks the flag at every directory entry and every
///   [`CANCEL_CHECK_INTERVAL`] entries, and ends the stream once it is set.
use super::CANCEL_CHECK_INTERVAL;
use crate::model::EntryKind;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

type JwalkItem = Result<jwalk::DirEntry<((), ())>, jwalk::Error>;

/// One entry of a walk.
#[derive(Debug)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// 0 for the walk root.
    pub depth: usize,
    pub kind: EntryKind,
    /// Bytes for regular files, 0 otherwise (and 0 when `error` is set).
    pub size_bytes: u64,
    pub last_modified: Option<SystemTime>,
    /// Stat failure for this entry. The entry is still reported so the
    /// stream shape stays intact; consumers count it as size 0.
    pub error: Option<io::Error>,
}

impl WalkEntry {
    #[inline]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Iterator over a subtree in pre-order. Created by [`walk`].
pub struct Walk {
    inner: Box<dyn Iterator<Item = JwalkItem>>,
    cancel: Arc<AtomicBool>,
    yielded: usize,
    /// Directory reads that failed (access denied and the like).
    read_errors: u64,
}

impl Walk {
    /// Number of directories whose children could not be read so far.
    pub fn read_errors(&self) -> u64 {
        self.read_errors
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Walk `root` in pre-order without following links.
///
/// `threads <= 1` reads directories serially; larger values read them on a
/// dedicated rayon pool of that size. Output order is the same either way.
pub fn walk(root: &Path, threads: usize, cancel: Arc<AtomicBool>) -> Walk {
    let parallelism = if threads <= 1 {
        jwalk::Parallelism::Serial
    } else {
        jwalk::Parallelism::RayonNewPool(threads)
    };

    let read_cancel = cancel.clone();
    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .parallelism(parallelism)
        .process_read_dir(move |_depth, _path, _state, children| {
            if read_cancel.load(Ordering::Relaxed) {
                children.clear();
            }
        });

    Walk {
        inner: Box::new(walker.into_iter()),
        cancel,
        yielded: 0,
        read_errors: 0,
    }
}

impl Iterator for Walk {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        loop {
            if self.yielded.is_multiple_of(CANCEL_CHECK_INTERVAL) && self.cancelled() {
                return None;
            }

            let dent = match self.inner.next()? {
                Ok(d) => d,
                Err(err) => {
                    self.read_errors += 1;
                    let path = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    debug!("walk: cannot read {path}: {err}");
                    continue;
                }
            };

            let path = dent.path();
            let entry = match fs::symlink_metadata(&path) {
                Ok(meta) => {
                    let kind = EntryKind::from_metadata(&meta);
                    WalkEntry {
                        depth: dent.depth,
                        size_bytes: if kind == EntryKind::File { meta.len() } else { 0 },
                        last_modified: meta.modified().ok(),
                        kind,
                        error: None,
                        path,
                    }
                }
                Err(err) => WalkEntry {
                    depth: dent.depth,
                    kind: if dent.file_type().is_dir() {
                        EntryKind::Directory
                    } else {
                        EntryKind::Other
                    },
                    size_bytes: 0,
                    last_modified: None,
                    error: Some(err),
                    path,
                },
            };

            self.yielded += 1;
            if entry.is_directory() && self.cancelled() {
                return None;
            }
            return Some(entry);
        }
    }
}
