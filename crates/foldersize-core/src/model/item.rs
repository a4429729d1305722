/// Presentation-facing result row: one per immediate child of a scanned
/// directory. Subdirectories carry their full recursive total.
use super::entry::Entry;
use compact_str::CompactString;
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeItem {
    pub name: CompactString,
    /// Byte total. `None` means the size is unknown; such items sort after
    /// every item with a known size.
    pub bytes: Option<u64>,
    pub is_directory: bool,
    pub path: PathBuf,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

impl SizeItem {
    /// Item for a listed file, sized from the listing.
    pub fn file(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            bytes: Some(entry.size_bytes),
            is_directory: false,
            path: entry.path.clone(),
            modified: entry.last_modified,
        }
    }

    /// Item for a listed directory with its computed subtree total.
    pub fn directory(entry: &Entry, total: u64) -> Self {
        Self {
            name: entry.name.clone(),
            bytes: Some(total),
            is_directory: true,
            path: entry.path.clone(),
            modified: entry.last_modified,
        }
    }

    /// Known size, or 0 when unknown.
    #[inline]
    pub fn size_or_zero(&self) -> u64 {
        self.bytes.unwrap_or(0)
    }

    /// Two items describe the same child when name and kind match.
    #[inline]
    pub fn same_child(&self, other: &SizeItem) -> bool {
        self.is_directory == other.is_directory && self.name == other.name
    }
}
