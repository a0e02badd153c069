//! Output formats for decoded records.
//!
//! Three formats are available:
//!
//! - **Delimited text** ([`DelimitedFormat`]): configurable delimiter, quote
//!   character and row terminator
//! - **CSV** ([`CsvFormat`]): RFC 4180 via the `csv` crate
//! - **XML** ([`XmlFormat`]): one document holding every record
//!
//! Delimited text and CSV can be appended to chunk by chunk. XML can only be
//! written in one go through [`save`] or [`write_set`].

pub mod csv;
pub mod delimited;
pub mod xml;

use std::{fs::File, io::Write, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

pub use self::{csv::CsvFormat, delimited::DelimitedFormat, xml::XmlFormat};
use crate::{
    batch::ParsedRecordSet,
    decode::FieldValue,
    error::{ConfigError, ParseResult},
    writer::RecordWriter,
};

/// Row-oriented output format.
///
/// `begin` and `finish` bracket the rows; [`RecordWriter`] calls each exactly once.
pub trait RecordFormat {
    /// Writes the header or document prologue.
    fn begin<W: Write>(&mut self, writer: &mut W, names: &[String]) -> ParseResult<()>;

    /// Writes one row. `None` marks a field that failed to decode.
    fn write_row<W: Write>(
        &mut self,
        writer: &mut W,
        index: usize,
        values: &[Option<&FieldValue>],
    ) -> ParseResult<()>;

    /// Writes the document epilogue, if any.
    ///
    /// Default implementation is a no-op.
    fn finish<W: Write>(&mut self, _writer: &mut W) -> ParseResult<()> {
        Ok(())
    }
}

/// Format selector for runtime dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Delimited text, tab-separated by default.
    #[default]
    Delimited,
    Csv,
    /// Whole-document XML; not available in chunked mode.
    Xml,
}

impl OutputFormat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::Csv => "CSV",
            Self::Xml => "XML",
        }
    }

    /// Whether the format can be appended to chunk by chunk.
    #[must_use]
    pub const fn supports_streaming(&self) -> bool {
        !matches!(self, Self::Xml)
    }

    /// Determines the format from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "tsv" | "dat" => Some(Self::Delimited),
            "csv" => Some(Self::Csv),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delimited" | "txt" | "text" => Ok(Self::Delimited),
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

/// What happens to records with a field that failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedRecords {
    /// Leave the record out of the output.
    #[default]
    Skip,
    /// Write the fields that decoded and leave the failed ones blank.
    EmitPartial,
}

/// Formatting options shared by every output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Write a header row of field names (delimited text and CSV).
    pub include_header: bool,
    /// Wrap every value in the quote character.
    pub quote: bool,
    pub delimiter: String,
    pub quote_char: char,
    /// Delimited text row terminator.
    pub row_terminator: String,
    pub failed_records: FailedRecords,
}

/// Default delimited row terminator. A sentinel rather than a bare newline, so
/// decoded text containing newline-like characters stays on one row.
pub const DEFAULT_ROW_TERMINATOR: &str = "¬\r\n";

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Delimited,
            include_header: true,
            quote: true,
            delimiter: "\t".to_string(),
            quote_char: '"',
            row_terminator: DEFAULT_ROW_TERMINATOR.to_string(),
            failed_records: FailedRecords::Skip,
        }
    }
}

impl OutputOptions {
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }

    #[must_use]
    pub fn with_quote(mut self, quote: bool) -> Self {
        self.quote = quote;
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub fn with_quote_char(mut self, quote_char: char) -> Self {
        self.quote_char = quote_char;
        self
    }

    #[must_use]
    pub fn with_row_terminator(mut self, row_terminator: impl Into<String>) -> Self {
        self.row_terminator = row_terminator.into();
        self
    }

    #[must_use]
    pub fn with_failed_records(mut self, failed_records: FailedRecords) -> Self {
        self.failed_records = failed_records;
        self
    }
}

/// Writes a whole record set, header and epilogue included, to `output`.
///
/// Returns the number of rows written.
pub fn write_set<W: Write>(
    output: W,
    set: &ParsedRecordSet,
    options: &OutputOptions,
) -> ParseResult<usize> {
    match options.format {
        OutputFormat::Delimited => write_typed(output, DelimitedFormat::new(options), set, options),
        OutputFormat::Csv => write_typed(output, CsvFormat::new(options), set, options),
        OutputFormat::Xml => write_typed(output, XmlFormat::new(), set, options),
    }
}

/// Writes a whole record set to a new file at `path` (truncating an existing one).
pub fn save(
    set: &ParsedRecordSet,
    path: impl AsRef<Path>,
    options: &OutputOptions,
) -> ParseResult<usize> {
    let file = File::create(path)?;
    write_set(file, set, options)
}

fn write_typed<W: Write, F: RecordFormat>(
    output: W,
    format: F,
    set: &ParsedRecordSet,
    options: &OutputOptions,
) -> ParseResult<usize> {
    let mut writer = RecordWriter::new(output, format);
    writer.write_header(set.field_names())?;
    writer.write_set(set, options.failed_records)?;
    writer.finish()?;
    Ok(writer.records_written())
}
