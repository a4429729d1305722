/// foldersize core: scanning, size aggregation, and report export.
///
/// This crate contains all business logic with zero UI dependencies.
/// Frontends (the bundled CLI, or a GUI) consume it through the scanner's
/// message channel and the export functions.
///
/// # Modules
///
/// - [`model`]: Entries, presentation items, the aggregate size map, size formatting.
/// - [`walker`]: Directory listing and cancellable pre-order walks.
/// - [`aggregate`]: Per-directory size totals (parallel fan-out and iterative post-order).
/// - [`scanner`]: Background scans with generations, partial results, and cancellation.
/// - [`sort`]: Ordering policies for sibling results.
/// - [`export`]: Two-pass CSV/XLSX report export with progress.
pub mod aggregate;
pub mod error;
pub mod export;
pub mod model;
pub mod scanner;
pub mod sort;
pub mod walker;

pub use error::{ExportError, ScanError};
pub use model::size::human;
