/// Export pipeline: writes a folder-size report for a whole subtree.
///
/// Two passes keep progress honest without holding the report in memory:
///
/// 1. **count**: one walk computes how many rows will be written
///    ([`count_entries`]);
/// 2. **write**: directory totals are aggregated (or taken from a map the
///    caller already has), then the tree is traversed in pre-order and each
///    row is handed straight to the output sink. Progress is reported after
///    every row.
///
/// Row order inside a directory: the folder row, then its files in
/// case-insensitive name order one level deeper, then each subdirectory's
/// block in the same order. The traversal keeps pending directories on an
/// explicit stack, so tree depth never translates into call depth.
///
/// Export runs on the calling thread and cannot be cancelled.
pub mod destination;
pub mod progress;
pub mod row;
mod sink;

use crate::aggregate::{PostOrderAggregator, SizeAggregator};
use crate::error::ExportError;
use crate::model::AggregateSizeMap;
use crate::walker;
use serde::Serialize;
use sink::{CsvSink, RowSink};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, info};

pub use destination::{default_report_name, unique_destination};
pub use progress::ProgressTracker;
pub use row::{ExportRow, RowKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// UTF-8 text with BOM.
    #[default]
    Csv,
    /// Single-sheet workbook. Requires the `xlsx` feature.
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Guess the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

/// What to write and how.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Emit one row per regular file in addition to the folder rows.
    pub include_files: bool,
    pub format: ExportFormat,
    /// Directory totals to reuse instead of recomputing them. Must be keyed
    /// by the same absolute paths the export walks; missing entries read as 0.
    pub sizes: Option<Arc<AggregateSizeMap>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_files: true,
            format: ExportFormat::Csv,
            sizes: None,
        }
    }
}

/// Outcome of a finished export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub destination: PathBuf,
    pub rows: u64,
    /// Aggregate size of the export root.
    pub total_bytes: u64,
}

/// Absolute, lexically normalised form of `root`: `.` is dropped and `..`
/// removes the preceding component. Symlinks are not resolved.
///
/// Every path written to a report derives from this.
pub fn resolve_root(root: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(root)?;
    let mut normalised = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalised.pop();
            }
            other => normalised.push(other.as_os_str()),
        }
    }
    Ok(normalised)
}

fn absolute_root(root: &Path) -> Result<PathBuf, ExportError> {
    resolve_root(root).map_err(|source| ExportError::RootUnavailable {
        path: root.to_path_buf(),
        source,
    })
}

/// Number of rows an export of `root` will contain.
///
/// `1 + subdirectories` plus, with `include_files`, one per regular file.
/// A root that is not a directory counts as a single row. Entries that
/// cannot be stat'ed are not counted, matching the write pass.
pub fn count_entries(root: &Path, include_files: bool) -> Result<u64, ExportError> {
    let root = absolute_root(root)?;
    let meta = fs::metadata(&root).map_err(|source| ExportError::RootUnavailable {
        path: root.clone(),
        source,
    })?;
    if !meta.is_dir() {
        return Ok(1);
    }

    let never = Arc::new(AtomicBool::new(false));
    let mut walk = walker::walk(&root, 1, never);
    let below = walk
        .by_ref()
        .skip(1)
        .filter(|e| e.error.is_none())
        .filter(|e| e.is_directory() || (include_files && e.kind.is_regular()))
        .count() as u64;
    if walk.read_errors() > 0 {
        debug!(
            "count pass for {}: {} unreadable directories",
            root.display(),
            walk.read_errors()
        );
    }
    Ok(1 + below)
}

/// Write a report without progress reporting.
pub fn export(
    root: &Path,
    target: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    export_with_progress(root, target, options, |_| {})
}

/// Write a report of `root` to `target`, calling `on_progress` with the
/// completed percentage after every row.
///
/// Reported percentages never decrease and the last one is exactly 100.
/// An existing `target` is overwritten; see [`unique_destination`].
pub fn export_with_progress<F>(
    root: &Path,
    target: &Path,
    options: &ExportOptions,
    mut on_progress: F,
) -> Result<ExportSummary, ExportError>
where
    F: FnMut(u8),
{
    let start = Instant::now();
    let root = absolute_root(root)?;
    let meta = fs::metadata(&root).map_err(|source| ExportError::RootUnavailable {
        path: root.clone(),
        source,
    })?;

    let total_rows = count_entries(&root, options.include_files)?;
    debug!("export of {}: {total_rows} rows expected", root.display());

    let mut sink = open_sink(options.format, target)?;
    let mut progress = ProgressTracker::new(total_rows);
    let mut emit = |sink: &mut Box<dyn RowSink>, row: ExportRow| -> Result<(), ExportError> {
        sink.write_row(&row)?;
        on_progress(progress.advance());
        Ok(())
    };

    let total_bytes = if meta.is_dir() {
        let sizes = match &options.sizes {
            Some(sizes) => sizes.clone(),
            None => {
                let started = Instant::now();
                let sizes = PostOrderAggregator::default().build_map(&root);
                debug!(
                    "export sizes aggregated: {} directories in {:?}",
                    sizes.len(),
                    started.elapsed()
                );
                Arc::new(sizes)
            }
        };

        let mut pending = vec![PendingDir {
            path: root.clone(),
            depth: 0,
            modified: meta.modified().ok(),
        }];
        while let Some(dir) = pending.pop() {
            let total = sizes.get_or_zero(&dir.path);
            emit(
                &mut sink,
                ExportRow::folder(&dir.path, dir.depth, total, dir.modified),
            )?;

            let listing = walker::list(&dir.path);
            if options.include_files {
                for file in listing.files.iter().filter(|f| f.is_regular_file()) {
                    emit(&mut sink, ExportRow::file(file, dir.depth + 1))?;
                }
            }
            pending.extend(listing.dirs.into_iter().rev().map(|sub| PendingDir {
                path: sub.path,
                depth: dir.depth + 1,
                modified: sub.last_modified,
            }));
        }
        sizes.get_or_zero(&root)
    } else {
        let size = if meta.is_file() { meta.len() } else { 0 };
        emit(
            &mut sink,
            ExportRow {
                kind: RowKind::File,
                depth: 0,
                path: root.clone(),
                size_bytes: size,
                formatted_size: crate::human(size),
                last_modified: row::format_timestamp(meta.modified().ok()),
            },
        )?;
        size
    };

    sink.finish()?;
    if let Some(pct) = progress.finish() {
        on_progress(pct);
    }

    let rows = progress.written();
    info!(
        "exported {rows} rows for {} to {} in {:?}",
        root.display(),
        target.display(),
        start.elapsed()
    );
    Ok(ExportSummary {
        destination: target.to_path_buf(),
        rows,
        total_bytes,
    })
}

struct PendingDir {
    path: PathBuf,
    depth: usize,
    modified: Option<SystemTime>,
}

fn open_sink(format: ExportFormat, target: &Path) -> Result<Box<dyn RowSink>, ExportError> {
    match format {
        ExportFormat::Csv => Ok(Box::new(CsvSink::create(target)?)),
        #[cfg(feature = "xlsx")]
        ExportFormat::Xlsx => Ok(Box::new(sink::XlsxSink::create(target)?)),
        #[cfg(not(feature = "xlsx"))]
        ExportFormat::Xlsx => Err(ExportError::FormatUnavailable("xlsx")),
    }
}
