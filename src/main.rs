//! foldersize: folder size analyser and report exporter.
//!
//! Thin binary entry point. All logic lives in the `foldersize-core` crate;
//! this file only parses arguments, drives the engine, and prints results.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use foldersize_core::export::{
    default_report_name, export_with_progress, resolve_root, unique_destination, ExportFormat,
    ExportOptions,
};
use foldersize_core::model::size::format_count;
use foldersize_core::scanner::{ScanConfig, ScanScheduler, ScanState, ScanView};
use foldersize_core::sort::SortMode;
use foldersize_core::human;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "foldersize",
    version,
    about = "Per-folder size analysis with CSV/XLSX report export"
)]
struct Cli {
    /// Log debug detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Size every immediate child of a folder.
    Scan {
        path: PathBuf,
        /// Result order.
        #[arg(long, value_enum, default_value_t = SortArg::Size)]
        sort: SortArg,
        /// Print the result as JSON on stdout.
        #[arg(long)]
        json: bool,
        /// Worker threads (default: logical CPU count).
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Write a recursive folder-size report.
    Export {
        root: PathBuf,
        /// Report file. Defaults to `<root-name>_folder_size_report.<ext>`
        /// in the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Report format. Inferred from `--output` when omitted.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Folder rows only.
        #[arg(long)]
        no_files: bool,
        /// Replace an existing report instead of picking `name(n).ext`.
        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum SortArg {
    Size,
    Name,
    Modified,
}

impl From<SortArg> for SortMode {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Size => SortMode::SizeDescending,
            SortArg::Name => SortMode::NameAscending,
            SortArg::Modified => SortMode::ModifiedDescending,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Scan {
            path,
            sort,
            json,
            threads,
        } => run_scan(&path, sort.into(), json, threads),
        Command::Export {
            root,
            output,
            format,
            no_files,
            overwrite,
        } => run_export(&root, output, format, !no_files, overwrite),
    }
}

fn run_scan(path: &Path, sort: SortMode, json: bool, threads: Option<usize>) -> Result<()> {
    let mut config = ScanConfig::default();
    if let Some(threads) = threads {
        config.threads = threads.max(1);
    }
    let mut scheduler = ScanScheduler::with_config(config)?;
    let handle = scheduler.start_scan(path)?;

    let mut view = ScanView::new(sort);
    view.begin(handle.generation());
    while !view.is_finished() {
        let msg = scheduler
            .receiver()
            .recv()
            .context("scan thread stopped without reporting a result")?;
        view.apply(msg);
        if !json && !view.is_finished() {
            eprint!("\r{} entries sized", format_count(view.items().len() as u64));
        }
    }
    if !json {
        eprintln!();
    }

    match view.state() {
        ScanState::Completed => {}
        ScanState::Cancelled => bail!("scan of {} was cancelled", path.display()),
        _ => match view.error() {
            Some(err) => bail!("{err}"),
            None => bail!("scan of {} failed", path.display()),
        },
    }

    if json {
        let report = serde_json::json!({
            "root": path,
            "sort": view.sort(),
            "total_bytes": view.total_bytes(),
            "file_count": view.file_count(),
            "duration_ms": view.duration().map(|d| d.as_millis() as u64),
            "items": view.items(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    for item in view.items() {
        let marker = if item.is_directory { "/" } else { "" };
        writeln!(
            out,
            "{:>12}  {}{}",
            human(item.size_or_zero()),
            item.name,
            marker
        )?;
    }
    writeln!(
        out,
        "{:>12}  total ({} files)",
        human(view.total_bytes()),
        format_count(view.file_count())
    )?;
    Ok(())
}

fn run_export(
    root: &Path,
    output: Option<PathBuf>,
    format: Option<FormatArg>,
    include_files: bool,
    overwrite: bool,
) -> Result<()> {
    let format: ExportFormat = match (format, &output) {
        (Some(f), _) => f.into(),
        (None, Some(out)) => ExportFormat::from_path(out).unwrap_or_default(),
        (None, None) => ExportFormat::default(),
    };

    let absolute = resolve_root(root)
        .with_context(|| format!("cannot resolve {}", root.display()))?;
    let target = output.unwrap_or_else(|| PathBuf::from(default_report_name(&absolute, format)));
    let target = if overwrite {
        target
    } else {
        unique_destination(&target)
    };

    let options = ExportOptions {
        include_files,
        format,
        sizes: None,
    };

    let mut shown = None;
    let summary = export_with_progress(&absolute, &target, &options, |pct| {
        if shown != Some(pct) {
            shown = Some(pct);
            eprint!("\rexporting... {pct:>3}%");
        }
    })
    .with_context(|| format!("export of {} failed", absolute.display()))?;
    eprintln!();

    println!(
        "wrote {} rows ({} total) to {}",
        format_count(summary.rows),
        human(summary.total_bytes),
        summary.destination.display()
    );
    Ok(())
}
