/// Directory walker: lists directory children and streams whole subtrees.
///
/// Two entry points:
/// - [`read_children`] / [`list`]: one directory, split into subdirectories
///   and files, each in case-insensitive name order.
/// - [`walk`]: a `jwalk`-backed pre-order stream over a full subtree (see
///   [`stream`]).
///
/// Per-entry stat failures (permission denied, broken links, entries deleted
/// mid-listing) exclude that entry from the listing and never abort it.
pub mod stream;

use crate::model::Entry;
use crate::sort::compare_names;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

pub use stream::{walk, Walk, WalkEntry};

/// Number of entries between cancellation checks inside one directory.
///
/// Directory boundaries are always checked; this bounds the latency of a
/// cancel request inside very large directories.
pub const CANCEL_CHECK_INTERVAL: usize = 1_000;

/// The children of one directory, each list in case-insensitive name order.
#[derive(Debug, Default, Clone)]
pub struct Listing {
    pub dirs: Vec<Entry>,
    pub files: Vec<Entry>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirs.len() + self.files.len()
    }
}

/// List the immediate children of `dir`.
///
/// Returns `Err` only when `dir` itself cannot be opened. When `cancel` is
/// raised mid-listing the partial listing is returned; callers re-check the
/// flag and discard it.
pub fn read_children(dir: &Path, cancel: &AtomicBool) -> io::Result<Listing> {
    let mut listing = Listing::default();

    for (seen, dent) in fs::read_dir(dir)?.enumerate() {
        if seen > 0 && seen.is_multiple_of(CANCEL_CHECK_INTERVAL) && cancel.load(Ordering::Relaxed)
        {
            trace!("listing of {} interrupted by cancellation", dir.display());
            break;
        }

        let dent = match dent {
            Ok(d) => d,
            Err(err) => {
                trace!("skipping unreadable entry in {}: {err}", dir.display());
                continue;
            }
        };

        let path = dent.path();
        let meta = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(err) => {
                trace!("skipping {}: {err}", path.display());
                continue;
            }
        };

        let entry = Entry::from_metadata(path, &meta);
        if entry.is_directory() {
            listing.dirs.push(entry);
        } else {
            listing.files.push(entry);
        }
    }

    listing.dirs.sort_by(|a, b| compare_names(&a.name, &b.name));
    listing.files.sort_by(|a, b| compare_names(&a.name, &b.name));
    Ok(listing)
}

/// List `dir`, absorbing an unreadable directory as an empty listing.
pub fn list(dir: &Path) -> Listing {
    let never = AtomicBool::new(false);
    match read_children(dir, &never) {
        Ok(listing) => listing,
        Err(err) => {
            trace!("cannot list {}: {err}", dir.display());
            Listing::default()
        }
    }
}
