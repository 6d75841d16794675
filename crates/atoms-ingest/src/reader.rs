//! Delimited file reading into a [`RecordTable`].
//!
//! Every cell stays a string. Rows shorter than the header are padded with
//! empty cells, longer rows are truncated, and blank lines are skipped.

use std::path::Path;

use atoms_model::RecordTable;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::{IngestError, Result};

/// Maximum input size (200 MB).
pub const MAX_INPUT_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Delimiters tried when sniffing, in tie-break order.
pub const SNIFF_CANDIDATES: [u8; 4] = [b',', b';', b'|', b'\t'];

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Fixed delimiter; sniffed from the header line when `None`.
    pub delimiter: Option<u8>,
    /// Decoder for input that is not valid UTF-8.
    pub fallback_encoding: &'static Encoding,
    pub max_size: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            fallback_encoding: WINDOWS_1252,
            max_size: MAX_INPUT_FILE_SIZE,
        }
    }
}

impl ReadOptions {
    /// Build options from configuration values.
    pub fn from_settings(delimiter: Option<char>, encoding: Option<&str>) -> Result<Self> {
        let delimiter = delimiter.map(delimiter_byte).transpose()?;
        let fallback_encoding = match encoding.map(str::trim).filter(|label| !label.is_empty()) {
            Some(label) => Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                IngestError::UnknownEncoding {
                    label: label.to_string(),
                }
            })?,
            None => WINDOWS_1252,
        };
        Ok(Self {
            delimiter,
            fallback_encoding,
            ..Self::default()
        })
    }
}

/// Convert a configured delimiter to the single byte the csv crate expects.
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() && !matches!(delimiter, '"' | '\n' | '\r') {
        Ok(delimiter as u8)
    } else {
        Err(IngestError::InvalidDelimiter { delimiter })
    }
}

/// A table read from disk plus how it was decoded.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: RecordTable,
    pub delimiter: u8,
    pub encoding: &'static str,
    pub padded_rows: usize,
    pub truncated_rows: usize,
}

/// Check file size before loading.
pub fn check_file_size(path: &Path, max_size: u64) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| IngestError::read(path, e))?;
    if metadata.len() > max_size {
        return Err(IngestError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size,
        });
    }
    Ok(())
}

/// Decode raw bytes to text.
///
/// UTF-16 byte order marks are rejected. A UTF-8 BOM is stripped. Input
/// that is not valid UTF-8 is decoded with `fallback`.
pub fn decode(path: &Path, bytes: &[u8], fallback: &'static Encoding) -> Result<(String, &'static str)> {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Err(IngestError::UnsupportedEncoding {
            path: path.to_path_buf(),
            encoding: "UTF-16 LE",
        });
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Err(IngestError::UnsupportedEncoding {
            path: path.to_path_buf(),
            encoding: "UTF-16 BE",
        });
    }
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok((text.to_string(), UTF_8.name())),
        Err(_) => {
            let (text, used, had_errors) = fallback.decode(bytes);
            if had_errors {
                tracing::warn!(
                    path = %path.display(),
                    encoding = used.name(),
                    "input contains bytes invalid in the fallback encoding"
                );
            }
            Ok((text.into_owned(), used.name()))
        }
    }
}

/// Pick the candidate delimiter that occurs most often in `header_line`
/// outside quotes. Ties favour [`SNIFF_CANDIDATES`] order; no hit means `,`.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let mut counts = [0usize; SNIFF_CANDIDATES.len()];
    let mut in_quotes = false;
    for byte in header_line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = SNIFF_CANDIDATES.iter().position(|c| *c == byte) {
            counts[pos] += 1;
        }
    }
    let mut best = 0;
    for (pos, count) in counts.iter().enumerate() {
        if *count > counts[best] {
            best = pos;
        }
    }
    SNIFF_CANDIDATES[best]
}

/// Read a delimited file into a [`RecordTable`].
pub fn read_table(path: &Path, options: &ReadOptions) -> Result<LoadedTable> {
    check_file_size(path, options.max_size)?;
    let bytes = std::fs::read(path).map_err(|e| IngestError::read(path, e))?;
    let (text, encoding) = decode(path, &bytes, options.fallback_encoding)?;
    let mut loaded = parse_text(path, &text, options.delimiter)?;
    loaded.encoding = encoding;
    tracing::debug!(
        path = %path.display(),
        rows = loaded.table.len(),
        columns = loaded.table.width(),
        delimiter = %(loaded.delimiter as char).escape_default(),
        encoding,
        "read input table"
    );
    Ok(loaded)
}

/// Parse already-decoded text. `path` is only used in messages.
pub fn parse_text(path: &Path, text: &str, delimiter: Option<u8>) -> Result<LoadedTable> {
    let Some(header_line) = text.lines().find(|line| !line.trim().is_empty()) else {
        return Err(IngestError::EmptyFile {
            path: path.to_path_buf(),
        });
    };
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(header_line));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let mut header: Option<Vec<String>> = None;
    for record in records.by_ref() {
        let record = record.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        header = Some(record.iter().map(str::to_string).collect());
        break;
    }
    let Some(header) = header else {
        return Err(IngestError::EmptyFile {
            path: path.to_path_buf(),
        });
    };
    let columns = header_columns(header);
    let width = columns.len();

    let mut rows = Vec::new();
    let mut padded_rows = 0;
    let mut truncated_rows = 0;
    for record in records {
        let record = record.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        if is_blank_line(&record) {
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.len() < width {
            padded_rows += 1;
            row.resize(width, String::new());
        } else if row.len() > width {
            // A trailing delimiter leaves one empty extra field; not worth a warning.
            if row[width..].iter().any(|field| !field.is_empty()) {
                truncated_rows += 1;
            }
            row.truncate(width);
        }
        rows.push(row);
    }
    if truncated_rows > 0 {
        tracing::warn!(
            path = %path.display(),
            rows = truncated_rows,
            "rows wider than the header were truncated"
        );
    }

    Ok(LoadedTable {
        table: RecordTable::from_rows(columns, rows)?,
        delimiter,
        encoding: UTF_8.name(),
        padded_rows,
        truncated_rows,
    })
}

/// Clean header names: strip BOM and whitespace, drop trailing empty names
/// left by a trailing delimiter, name remaining blanks and suffix duplicates.
fn header_columns(raw: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = raw
        .into_iter()
        .map(|name| name.trim_matches('\u{feff}').trim().to_string())
        .collect();
    while names.last().is_some_and(String::is_empty) {
        names.pop();
    }

    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// A line with no delimiter and nothing but whitespace. Rows of empty
/// fields (`;;`) are data and are kept.
fn is_blank_line(record: &csv::StringRecord) -> bool {
    record.len() <= 1 && record.iter().all(|field| field.trim().is_empty())
}
