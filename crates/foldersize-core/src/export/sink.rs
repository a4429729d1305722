/// Output formats behind one row-at-a-time interface.
use super::row::{ExportRow, HEADER};
use crate::error::ExportError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Receives report rows in order.
pub(crate) trait RowSink {
    fn write_row(&mut self, row: &ExportRow) -> Result<(), ExportError>;

    /// Flush or save the report. Nothing is guaranteed on disk before this.
    fn finish(self: Box<Self>) -> Result<(), ExportError>;
}

const BOM: &str = "\u{feff}";

/// UTF-8 CSV with a leading byte-order mark.
///
/// Only the path column is quoted (embedded quotes doubled); the other
/// columns never contain separators.
pub(crate) struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<BufWriter<File>>,
}

impl CsvSink {
    pub(crate) fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path).map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = BufWriter::new(file);
        out.write_all(BOM.as_bytes())
            .map_err(|source| ExportError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Never)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(out);
        writer.write_record(HEADER)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }
}

/// Wrap a field in double quotes, doubling any quote inside it.
pub(crate) fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

impl RowSink for CsvSink {
    fn write_row(&mut self, row: &ExportRow) -> Result<(), ExportError> {
        let depth = row.depth.to_string();
        let path = quote(&row.path.to_string_lossy());
        let size = row.size_bytes.to_string();
        self.writer.write_record([
            row.kind.label(),
            depth.as_str(),
            path.as_str(),
            size.as_str(),
            row.formatted_size.as_str(),
            row.last_modified.as_str(),
        ])?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), ExportError> {
        self.writer.flush().map_err(|source| ExportError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(feature = "xlsx")]
pub(crate) use xlsx::XlsxSink;

#[cfg(feature = "xlsx")]
mod xlsx {
    use super::RowSink;
    use crate::error::ExportError;
    use crate::export::row::{ExportRow, HEADER};
    use rust_xlsxwriter::{Format, Workbook, Worksheet};
    use std::path::{Path, PathBuf};

    const SHEET_NAME: &str = "Folder Size";
    const COLUMN_WIDTHS: [f64; 6] = [10.0, 8.0, 80.0, 16.0, 16.0, 20.0];

    /// Single-sheet workbook in constant-memory mode.
    ///
    /// Each row is flushed to a temporary file once the next one starts, so
    /// memory stays flat however large the tree is. Rows must therefore be
    /// written strictly in order. The workbook is assembled on
    /// [`RowSink::finish`].
    pub(crate) struct XlsxSink {
        path: PathBuf,
        workbook: Workbook,
        next_row: u32,
    }

    impl XlsxSink {
        pub(crate) fn create(path: &Path) -> Result<Self, ExportError> {
            let mut workbook = Workbook::new();
            let sheet = workbook.add_worksheet_with_constant_memory();
            sheet.set_name(SHEET_NAME)?;

            let bold = Format::new().set_bold();
            for (col, title) in (0u16..).zip(HEADER) {
                sheet.set_column_width(col, COLUMN_WIDTHS[usize::from(col)])?;
                sheet.write_string_with_format(0, col, title, &bold)?;
            }
            sheet.set_freeze_panes(1, 0)?;

            Ok(Self {
                path: path.to_path_buf(),
                workbook,
                next_row: 1,
            })
        }

        fn sheet(&mut self) -> Result<&mut Worksheet, ExportError> {
            Ok(self.workbook.worksheet_from_index(0)?)
        }
    }

    impl RowSink for XlsxSink {
        fn write_row(&mut self, row: &ExportRow) -> Result<(), ExportError> {
            let r = self.next_row;
            let sheet = self.sheet()?;
            sheet.write_string(r, 0, row.kind.label())?;
            sheet.write_number(r, 1, row.depth as f64)?;
            sheet.write_string(r, 2, row.path.to_string_lossy())?;
            sheet.write_number(r, 3, row.size_bytes as f64)?;
            sheet.write_string(r, 4, &row.formatted_size)?;
            sheet.write_string(r, 5, &row.last_modified)?;
            self.next_row += 1;
            Ok(())
        }

        fn finish(mut self: Box<Self>) -> Result<(), ExportError> {
            // Header plus every data row.
            let last_row = self.next_row - 1;
            self.sheet()?.autofilter(0, 0, last_row, 5)?;
            self.workbook.save(&self.path)?;
            Ok(())
        }
    }
}
