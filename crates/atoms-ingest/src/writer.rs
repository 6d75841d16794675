//! Delimited file writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use atoms_model::RecordTable;
use atoms_standards::OutputSettings;

use crate::error::{IngestError, Result};
use crate::reader::delimiter_byte;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub delimiter: u8,
    pub quote_all: bool,
    /// Append one delimiter after the last field of every line.
    pub trailing_delimiter: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b'|',
            quote_all: true,
            trailing_delimiter: false,
        }
    }
}

impl WriteOptions {
    pub fn from_settings(settings: &OutputSettings) -> Result<Self> {
        Ok(Self {
            delimiter: delimiter_byte(settings.delimiter)?,
            quote_all: settings.quote_all,
            trailing_delimiter: settings.trailing_delimiter,
        })
    }

    /// Same delimiter, quoting only where a field requires it.
    pub fn unquoted(self) -> Self {
        Self {
            quote_all: false,
            ..self
        }
    }
}

/// Encodes one record at a time so the trailing delimiter can be appended
/// after the csv writer has applied quoting.
struct LineEncoder {
    builder: csv::WriterBuilder,
    options: WriteOptions,
}

impl LineEncoder {
    fn new(options: WriteOptions) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder
            .delimiter(options.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(if options.quote_all {
                csv::QuoteStyle::Always
            } else {
                csv::QuoteStyle::Necessary
            });
        Self { builder, options }
    }

    fn encode<I, S>(&self, path: &Path, fields: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let csv_err = |source: csv::Error| IngestError::CsvWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = self.builder.from_writer(Vec::new());
        writer.write_record(fields).map_err(csv_err)?;
        let mut line = writer
            .into_inner()
            .map_err(|e| IngestError::write(path, e.into_error()))?;
        if self.options.trailing_delimiter {
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            line.push(self.options.delimiter);
            line.push(b'\n');
        }
        Ok(line)
    }
}

/// Write `table` (header plus rows) to `path`, creating parent directories.
pub fn write_table(path: &Path, table: &RecordTable, options: &WriteOptions) -> Result<()> {
    let mut out = create(path)?;
    write_records(path, &mut out, table, options)?;
    out.flush().map_err(|e| IngestError::write(path, e))?;
    tracing::debug!(path = %path.display(), rows = table.len(), "wrote table");
    Ok(())
}

/// Write `table` to any writer; `path` is only used in error messages.
pub fn write_records<W: Write>(
    path: &Path,
    out: &mut W,
    table: &RecordTable,
    options: &WriteOptions,
) -> Result<()> {
    let encoder = LineEncoder::new(*options);
    let header = encoder.encode(path, table.columns())?;
    out.write_all(&header)
        .map_err(|e| IngestError::write(path, e))?;
    for row in table.rows() {
        let line = encoder.encode(path, row)?;
        out.write_all(&line).map_err(|e| IngestError::write(path, e))?;
    }
    Ok(())
}

/// One section of a consolidated file: all rows of one subtype.
pub struct ConsolidatedSection<'a> {
    pub subtype: &'a str,
    pub table: &'a RecordTable,
}

/// Write headerless `subtype|period|values...` lines for every section, in order.
///
/// Fields are only quoted when they contain the delimiter, a quote or a newline.
pub fn write_consolidated(
    path: &Path,
    period: &str,
    sections: &[ConsolidatedSection<'_>],
    options: &WriteOptions,
) -> Result<usize> {
    let encoder = LineEncoder::new(options.unquoted());
    let mut out = create(path)?;
    let mut lines = 0;
    for section in sections {
        for row in section.table.rows() {
            let fields = [section.subtype, period]
                .into_iter()
                .chain(row.iter().map(String::as_str));
            let line = encoder.encode(path, fields)?;
            out.write_all(&line).map_err(|e| IngestError::write(path, e))?;
            lines += 1;
        }
    }
    out.flush().map_err(|e| IngestError::write(path, e))?;
    tracing::info!(path = %path.display(), lines, "wrote consolidated file");
    Ok(lines)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IngestError::write(parent, e))?;
    }
    let file = File::create(path).map_err(|e| IngestError::write(path, e))?;
    Ok(BufWriter::new(file))
}
