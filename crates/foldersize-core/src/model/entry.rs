/// A single filesystem entry as seen by one directory listing.
///
/// Entries are produced by the walker per listing call and are never
/// mutated afterwards. Only the name is stored inline; the full path is
/// kept alongside because every consumer (aggregation, export) needs it.
use compact_str::CompactString;
use std::fs::Metadata;
use std::path::PathBuf;
use std::time::SystemTime;

/// Classification of an entry, taken from `symlink_metadata` (links are
/// never followed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    /// A regular file; the only kind that contributes bytes.
    File,
    /// Symlinks, sockets, devices and the like. Listed with the files but
    /// always sized 0.
    Other,
}

impl EntryKind {
    /// Classify from metadata obtained without following links.
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_dir() {
            Self::Directory
        } else if ft.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    #[inline]
    pub fn is_regular(self) -> bool {
        self == Self::File
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    /// File or directory name only.
    pub name: CompactString,
    /// Full path (parent joined with `name`).
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Logical size in bytes. Always 0 for directories and non-regular files.
    pub size_bytes: u64,
    pub last_modified: Option<SystemTime>,
}

impl Entry {
    /// Build an entry from a path and its (non-following) metadata.
    pub fn from_metadata(path: PathBuf, meta: &Metadata) -> Self {
        let kind = EntryKind::from_metadata(meta);
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));
        Self {
            name,
            size_bytes: if kind == EntryKind::File { meta.len() } else { 0 },
            last_modified: meta.modified().ok(),
            kind,
            path,
        }
    }

    #[inline]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[inline]
    pub fn is_regular_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}
