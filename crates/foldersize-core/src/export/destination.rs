/// Report file naming.
use super::ExportFormat;
use std::path::{Path, PathBuf};

/// `<root-name>_folder_size_report.<ext>`; roots without a final component
/// (such as `/`) use `folder_size`.
pub fn default_report_name(root: &Path, format: ExportFormat) -> String {
    let base = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "folder_size".to_owned());
    format!("{base}_folder_size_report.{}", format.extension())
}

/// First path among `path`, `stem(1).ext`, `stem(2).ext`, … that does not
/// exist yet.
pub fn unique_destination(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1u64..)
        .map(|n| {
            let name = match &ext {
                Some(ext) => format!("{stem}({n}).{ext}"),
                None => format!("{stem}({n})"),
            };
            path.with_file_name(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
