/// Error types surfaced by the engine.
///
/// Per-entry filesystem failures (permission denied, vanished entries,
/// broken links) never reach these types: they are absorbed where they
/// happen. Only failures that end a scan or an export are represented here.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Terminal failure of a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root could not be stat'ed or listed.
    #[error("cannot read scan root {}: {source}", path.display())]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The scan root exists but is not a directory.
    #[error("scan root {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// The scan root disappeared while the scan was running.
    #[error("scan root {} disappeared during the scan", path.display())]
    RootVanished { path: PathBuf },

    /// The scan orchestration thread could not be started.
    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[source] io::Error),

    /// The worker pool could not be built.
    #[error("failed to build scan worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of an export. Any error aborts the whole export; the partially
/// written destination is not guaranteed to be valid.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The export root could not be stat'ed.
    #[error("cannot read export root {}: {source}", path.display())]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination file could not be created.
    #[error("cannot create report {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing to the destination failed.
    #[error("cannot write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "xlsx")]
    #[error("spreadsheet encoding failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// The requested format was compiled out.
    #[error("report format {0} is not available in this build")]
    FormatUnavailable(&'static str),
}
