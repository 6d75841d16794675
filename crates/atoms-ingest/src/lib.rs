//! Delimited file I/O for regulatory extracts.
//!
//! - **Reading**: UTF-8 or a fallback `encoding_rs` encoding, BOM handling,
//!   delimiter sniffing, ragged rows padded or truncated
//! - **Writing**: configurable delimiter, full quoting and trailing delimiter,
//!   plus the headerless consolidated format
//! - **Discovery**: picks the input file for each subtype of a period

mod discovery;
mod error;
mod reader;
mod writer;

// === Error Types ===
pub use error::{IngestError, Result};

// === Reading ===
pub use reader::{
    LoadedTable, MAX_INPUT_FILE_SIZE, ReadOptions, SNIFF_CANDIDATES, check_file_size, decode,
    delimiter_byte, parse_text, read_table, sniff_delimiter,
};

// === Writing ===
pub use writer::{
    ConsolidatedSection, WriteOptions, write_consolidated, write_records, write_table,
};

// === Discovery ===
pub use discovery::{
    DiscoveredFile, Discovery, InputName, discover_inputs, list_files, parse_input_name,
};
