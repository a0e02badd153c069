//! Buffered writer for decoded records.
//!
//! Provides [`RecordWriter`], which writes records in any [`RecordFormat`] to
//! any type implementing [`Write`].

use std::io::{BufWriter, Write};

use crate::{
    batch::ParsedRecordSet,
    decode::FieldValue,
    error::ParseResult,
    record::{DecodeFailure, ParsedRecord},
    sink::{FailedRecords, RecordFormat},
};

/// Buffered record writer.
///
/// The header (or document prologue) is written at most once, so the same
/// writer can take several record sets in a row and produce the same bytes as
/// a single write of their concatenation.
///
/// # Type Parameters
///
/// - `W`: target stream (implements [`Write`])
/// - `F`: row format (implements [`RecordFormat`])
///
/// # Example
///
/// ```ignore
/// use ebcdic_parser::{sink::{DelimitedFormat, OutputOptions}, writer::RecordWriter};
/// use std::fs::File;
///
/// let file = File::create("output.txt")?;
/// let mut writer = RecordWriter::new(file, DelimitedFormat::new(&OutputOptions::default()));
///
/// writer.write_header(set.field_names())?;
/// writer.write_set(&set, FailedRecords::Skip)?;
/// writer.finish()?;
/// ```
pub struct RecordWriter<W: Write, F: RecordFormat> {
    inner: BufWriter<W>,
    format: F,
    /// Rows written so far, partial rows included.
    records_written: usize,
    header_written: bool,
    finished: bool,
}

impl<W: Write, F: RecordFormat> RecordWriter<W, F> {
    pub fn new(writer: W, format: F) -> Self {
        Self {
            inner: BufWriter::new(writer),
            format,
            records_written: 0,
            header_written: false,
            finished: false,
        }
    }

    /// Creates a writer with the given buffer size.
    pub fn with_capacity(capacity: usize, writer: W, format: F) -> Self {
        Self {
            inner: BufWriter::with_capacity(capacity, writer),
            format,
            records_written: 0,
            header_written: false,
            finished: false,
        }
    }

    /// Writes the header once; later calls are no-ops.
    pub fn write_header(&mut self, names: &[String]) -> ParseResult<()> {
        if !self.header_written {
            self.format.begin(&mut self.inner, names)?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Writes one decoded record.
    pub fn write(&mut self, index: usize, record: &ParsedRecord) -> ParseResult<()> {
        let values: Vec<Option<&FieldValue>> = record.values().iter().map(Some).collect();
        self.format.write_row(&mut self.inner, index, &values)?;
        self.records_written += 1;
        Ok(())
    }

    /// Writes the fields of a failed record that did decode; the rest are left blank.
    pub fn write_partial(&mut self, index: usize, failure: &DecodeFailure) -> ParseResult<()> {
        let values: Vec<Option<&FieldValue>> = failure.values().collect();
        self.format.write_row(&mut self.inner, index, &values)?;
        self.records_written += 1;
        Ok(())
    }

    /// Writes every record of a set in order. Returns the number of rows written.
    pub fn write_set(&mut self, set: &ParsedRecordSet, failed: FailedRecords) -> ParseResult<usize> {
        let before = self.records_written;
        for (index, outcome) in set.iter() {
            match (outcome, failed) {
                (Ok(record), _) => self.write(index, record)?,
                (Err(failure), FailedRecords::EmitPartial) => self.write_partial(index, failure)?,
                (Err(_), FailedRecords::Skip) => {}
            }
        }
        Ok(self.records_written - before)
    }

    /// Closes the document (if the format has an epilogue) and flushes.
    ///
    /// Later calls only flush.
    pub fn finish(&mut self) -> ParseResult<()> {
        if !self.finished {
            self.format.finish(&mut self.inner)?;
            self.finished = true;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> ParseResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// Extracts the inner writer (flushing first).
    pub fn into_inner(self) -> std::result::Result<W, std::io::IntoInnerError<BufWriter<W>>> {
        self.inner.into_inner()
    }
}
