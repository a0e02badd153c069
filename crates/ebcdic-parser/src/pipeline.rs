//! Streaming conversion of large inputs.
//!
//! [`StreamingPipeline`] reads the source in aligned chunks of
//! `chunk_record_count * line_size` bytes, parses each chunk with the
//! [`EbcdicParser`] and appends the rows to the output before reading the
//! next one. Only one chunk is held in memory at a time.
//!
//! Chunks are processed strictly in order and the header is written once, so
//! the output is byte-for-byte the same as [`sink::write_set`] over the whole
//! input parsed in one go, whatever the chunk size.
//!
//! Progress goes to a [`ProgressObserver`]; a [`CancellationToken`] stops the
//! run between chunks.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    batch::{EbcdicParser, ParsedRecordSet},
    codepage::CodePage,
    error::{ConfigError, FieldDecodeError, ParseError, ParseResult},
    reader::{self, ChunkReader},
    sink::{
        self, CsvFormat, DelimitedFormat, FailedRecords, OutputFormat, OutputOptions, RecordFormat,
    },
    template::LineTemplate,
    writer::RecordWriter,
};

/// Records per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_RECORD_COUNT: usize = 100_000;

// ============================================================================
// Configuration
// ============================================================================

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records per chunk, at least 1.
    pub chunk_record_count: usize,
    #[serde(flatten)]
    pub output: OutputOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { chunk_record_count: DEFAULT_CHUNK_RECORD_COUNT, output: OutputOptions::default() }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_chunk_record_count(mut self, chunk_record_count: usize) -> Self {
        self.chunk_record_count = chunk_record_count;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output.format = format;
        self
    }

    #[must_use]
    pub fn with_header(mut self, include_header: bool) -> Self {
        self.output.include_header = include_header;
        self
    }

    #[must_use]
    pub fn with_quote(mut self, quote: bool) -> Self {
        self.output.quote = quote;
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.output.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub fn with_quote_char(mut self, quote_char: char) -> Self {
        self.output.quote_char = quote_char;
        self
    }

    #[must_use]
    pub fn with_row_terminator(mut self, row_terminator: impl Into<String>) -> Self {
        self.output.row_terminator = row_terminator.into();
        self
    }

    #[must_use]
    pub fn with_failed_records(mut self, failed_records: FailedRecords) -> Self {
        self.output.failed_records = failed_records;
        self
    }
}

// ============================================================================
// Progress reporting
// ============================================================================

/// Progress after one chunk has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Zero-based chunk number.
    pub index: usize,
    pub total_chunks: usize,
    /// Records in this chunk.
    pub records: usize,
    /// Rows written for this chunk.
    pub written: usize,
    /// Records in this chunk with at least one failed field.
    pub failed: usize,
    /// Input bytes consumed so far.
    pub bytes_done: u64,
    pub total_bytes: u64,
}

/// One field of one record that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Index of the record in the whole input.
    pub record_index: usize,
    pub field: String,
    /// Byte offset of the field within the record.
    pub offset: usize,
    pub error: FieldDecodeError,
}

impl FailureReport {
    /// Reports for every failed field of a record set, in input order.
    #[must_use]
    pub fn collect(set: &ParsedRecordSet) -> Vec<Self> {
        set.failures()
            .flat_map(|(record_index, failure)| {
                failure.errors().map(move |e| Self {
                    record_index,
                    field: e.field.clone(),
                    offset: e.offset,
                    error: e.error.clone(),
                })
            })
            .collect()
    }
}

/// Totals of one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Records read from the input.
    pub records: usize,
    /// Rows written to the output.
    pub written: usize,
    pub chunks: usize,
    /// Records with at least one failed field.
    pub failed_records: usize,
    /// Every field failure, in input order.
    pub failures: Vec<FailureReport>,
}

/// Receives progress events from the pipeline.
///
/// All methods default to no-ops; `()` is the silent observer.
pub trait ProgressObserver {
    /// Called once before the first chunk is read.
    fn on_start(&mut self, _total_chunks: usize, _total_bytes: u64) {}

    /// Called after each chunk has been written.
    fn on_chunk(&mut self, _progress: &ChunkProgress) {}

    /// Called for each failed field, before its chunk is written.
    fn on_failure(&mut self, _failure: &FailureReport) {}

    /// Called once after the output has been flushed.
    fn on_finish(&mut self, _summary: &ConversionSummary) {}
}

impl ProgressObserver for () {}

/// Observer that reports through `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_start(&mut self, total_chunks: usize, total_bytes: u64) {
        info!(total_chunks, total_bytes, "Conversion started");
    }

    fn on_chunk(&mut self, p: &ChunkProgress) {
        info!(
            chunk = p.index + 1,
            total = p.total_chunks,
            records = p.records,
            written = p.written,
            failed = p.failed,
            "Chunk written"
        );
    }

    fn on_failure(&mut self, f: &FailureReport) {
        warn!(
            record = f.record_index,
            field = %f.field,
            offset = f.offset,
            error = %f.error,
            "Field decode failed"
        );
    }

    fn on_finish(&mut self, s: &ConversionSummary) {
        info!(
            records = s.records,
            written = s.written,
            chunks = s.chunks,
            failed_records = s.failed_records,
            "Conversion finished"
        );
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared flag that stops a conversion before the next chunk.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Chunked read/parse/write conversion.
#[derive(Debug, Clone)]
pub struct StreamingPipeline<'a> {
    parser: EbcdicParser<'a>,
    config: PipelineConfig,
}

impl<'a> StreamingPipeline<'a> {
    /// # Errors
    ///
    /// [`ConfigError::ZeroChunkSize`] if `chunk_record_count` is zero,
    /// [`ConfigError::ChunkTooLarge`] if a chunk's byte size overflows `usize`.
    pub fn new(
        template: &'a LineTemplate,
        codepage: &'a CodePage,
        config: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        reader::chunk_byte_size(template.line_size(), config.chunk_record_count)?;
        Ok(Self { parser: EbcdicParser::new(template, codepage), config })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Bytes per full chunk.
    #[must_use]
    pub fn chunk_byte_size(&self) -> usize {
        self.parser.template().line_size() * self.config.chunk_record_count
    }

    fn ensure_streamable(&self) -> ParseResult<()> {
        let format = self.config.output.format;
        if format.supports_streaming() {
            Ok(())
        } else {
            Err(ParseError::NotImplemented(format.as_str()))
        }
    }

    /// Converts the file at `input` into a new file at `output`.
    ///
    /// The output file is created only after the format has been accepted, the
    /// input has been opened and its length checked against the line size.
    ///
    /// # Errors
    ///
    /// - [`ParseError::NotImplemented`] for XML output
    /// - [`ParseError::UnalignedInput`] if the input is not a whole number of records
    /// - [`ParseError::Cancelled`] if `cancel` was tripped
    /// - I/O and sink errors
    pub fn convert_file<O: ProgressObserver + ?Sized>(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> ParseResult<ConversionSummary> {
        self.ensure_streamable()?;

        let source = File::open(input.as_ref())?;
        let total_bytes = source.metadata()?.len();
        let line_size = self.parser.template().line_size();
        let length = usize::try_from(total_bytes).unwrap_or(usize::MAX);
        if length % line_size != 0 {
            return Err(reader::trailing_error(length, line_size));
        }
        let target = File::create(output.as_ref())?;
        debug!(
            input = %input.as_ref().display(),
            output = %output.as_ref().display(),
            "Opened conversion files"
        );

        self.convert(source, total_bytes, target, observer, cancel)
    }

    /// Converts `input` into `output`.
    ///
    /// `total_bytes` is the expected input length; it only feeds progress
    /// reporting.
    pub fn convert<R: Read, W: Write, O: ProgressObserver + ?Sized>(
        &self,
        input: R,
        total_bytes: u64,
        output: W,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> ParseResult<ConversionSummary> {
        let options = &self.config.output;
        match options.format {
            OutputFormat::Delimited => {
                self.run(input, total_bytes, output, DelimitedFormat::new(options), observer, cancel)
            }
            OutputFormat::Csv => {
                self.run(input, total_bytes, output, CsvFormat::new(options), observer, cancel)
            }
            OutputFormat::Xml => Err(ParseError::NotImplemented(OutputFormat::Xml.as_str())),
        }
    }

    fn run<R, W, F, O>(
        &self,
        input: R,
        total_bytes: u64,
        output: W,
        format: F,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> ParseResult<ConversionSummary>
    where
        R: Read,
        W: Write,
        F: RecordFormat,
        O: ProgressObserver + ?Sized,
    {
        let template = self.parser.template();
        let mut reader =
            ChunkReader::new(input, template.line_size(), self.config.chunk_record_count)?;
        let chunk_size = u64::try_from(reader.chunk_size()).unwrap_or(u64::MAX);
        let total_chunks = usize::try_from(total_bytes.div_ceil(chunk_size)).unwrap_or(usize::MAX);
        debug!(chunk_size, total_chunks, total_bytes, "Starting streaming conversion");
        observer.on_start(total_chunks, total_bytes);

        let mut writer = RecordWriter::new(output, format);
        writer.write_header(template.field_names())?;

        let mut summary = ConversionSummary::default();
        loop {
            if cancel.is_cancelled() {
                writer.flush()?;
                warn!(chunks = summary.chunks, "Conversion cancelled");
                return Err(ParseError::Cancelled { chunks: summary.chunks });
            }
            let Some(chunk) = reader.next() else {
                break;
            };
            let chunk = chunk?;

            let set = self.parser.parse_chunk(&chunk.data, chunk.first_record)?;
            let failed = set.failures().count();
            for report in FailureReport::collect(&set) {
                observer.on_failure(&report);
                summary.failures.push(report);
            }

            let written = writer.write_set(&set, self.config.output.failed_records)?;
            summary.records += set.len();
            summary.written += written;
            summary.failed_records += failed;
            summary.chunks += 1;

            observer.on_chunk(&ChunkProgress {
                index: chunk.index,
                total_chunks,
                records: set.len(),
                written,
                failed,
                bytes_done: reader.bytes_read() as u64,
                total_bytes,
            });
        }

        writer.finish()?;
        observer.on_finish(&summary);
        Ok(summary)
    }
}

/// Parses a whole buffer and writes it with the pipeline's output options.
///
/// This is the non-chunked path; it accepts every format, XML included.
pub fn convert_all<W: Write>(
    template: &LineTemplate,
    codepage: &CodePage,
    bytes: &[u8],
    output: W,
    options: &OutputOptions,
) -> ParseResult<usize> {
    let set = EbcdicParser::new(template, codepage).parse_all(bytes)?;
    sink::write_set(output, &set, options)
}
