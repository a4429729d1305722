/// Logical report rows shared by every output format.
use crate::model::size::human;
use crate::model::Entry;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Column titles, in output order.
pub const HEADER: [&str; 6] = [
    "Type",
    "Depth",
    "Path",
    "Size (bytes)",
    "Formatted Size",
    "Last Modified",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RowKind {
    Folder,
    File,
}

impl RowKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Folder => "Folder",
            Self::File => "File",
        }
    }
}

/// One line of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub kind: RowKind,
    /// Directories between this entry and the export root (root = 0).
    pub depth: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub formatted_size: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`; empty when unknown.
    pub last_modified: String,
}

impl ExportRow {
    pub fn folder(path: &Path, depth: usize, total: u64, modified: Option<SystemTime>) -> Self {
        Self {
            kind: RowKind::Folder,
            depth,
            path: path.to_path_buf(),
            size_bytes: total,
            formatted_size: human(total),
            last_modified: format_timestamp(modified),
        }
    }

    pub fn file(entry: &Entry, depth: usize) -> Self {
        Self {
            kind: RowKind::File,
            depth,
            path: entry.path.clone(),
            size_bytes: entry.size_bytes,
            formatted_size: human(entry.size_bytes),
            last_modified: format_timestamp(entry.last_modified),
        }
    }
}

/// Render a modification time in local time.
pub fn format_timestamp(time: Option<SystemTime>) -> String {
    time.map(|t| {
        DateTime::<Local>::from(t)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    })
    .unwrap_or_default()
}
