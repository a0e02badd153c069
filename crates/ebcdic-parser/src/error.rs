//! Error types for template configuration, buffer validation and field decoding.
//!
//! Errors fall into two groups:
//!
//! - [`ParseError`] is fatal for the whole call: a malformed template, a buffer
//!   whose length does not fit the template, an unsupported output mode, I/O.
//! - [`FieldDecodeError`] belongs to a single field of a single record. It never
//!   aborts a batch; it travels inside a [`DecodeFailure`](crate::record::DecodeFailure).

use thiserror::Error;

/// Fatal parsing error.
#[derive(Debug, Error)]
pub enum ParseError {
    // === I/O errors ===
    /// I/O error while reading the source or writing the sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XML writer error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Template or codepage file is not valid JSON for the expected shape.
    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    // === Configuration errors ===
    /// Line template or codepage table is malformed.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    // === Input validation errors ===
    /// Input buffer was not provided.
    #[error("Input data was not provided")]
    MissingInput,

    /// Line template was not provided or has no fields.
    #[error("Line template was not provided or has no fields")]
    MissingTemplate,

    /// Input is non-empty but shorter than one record.
    #[error("Input is shorter than one record: {actual} byte(s), line size is {line_size}")]
    ShortInput {
        /// Input length in bytes.
        actual: usize,
        /// Template line size.
        line_size: usize,
    },

    /// Single-record input whose length differs from the line size.
    #[error("Record length mismatch: expected {expected} byte(s), got {actual}")]
    LengthMismatch {
        /// Template line size.
        expected: usize,
        /// Input length in bytes.
        actual: usize,
    },

    /// Input length is not a whole number of records.
    #[error(
        "Input length {length} is not a multiple of line size {line_size} \
         ({} whole record(s) and {} trailing byte(s))",
        .length / .line_size,
        .length % .line_size
    )]
    UnalignedInput {
        /// Input length in bytes.
        length: usize,
        /// Template line size.
        line_size: usize,
    },

    // === Pipeline errors ===
    /// Requested output mode is not available in streaming mode.
    #[error("{0} output is not supported in chunked mode")]
    NotImplemented(&'static str),

    /// Conversion was cancelled between chunks.
    #[error("Conversion cancelled after {chunks} chunk(s)")]
    Cancelled {
        /// Number of chunks fully written before cancellation.
        chunks: usize,
    },

    // === Encoding errors ===
    /// Character has no byte in the codepage (inverse lookup).
    #[error("Character {ch:?} cannot be encoded in {codepage}")]
    Unencodable {
        /// Offending character.
        ch: char,
        /// Codepage name.
        codepage: String,
    },
}

/// Convenient alias for results with [`ParseError`].
pub type ParseResult<T> = Result<T, ParseError>;

impl From<quick_xml::Error> for ParseError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

/// Malformed line template or codepage table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Template declares no fields.
    #[error("template has no fields")]
    EmptyTemplate,

    /// Line size of zero.
    #[error("line size must be greater than zero")]
    ZeroLineSize,

    /// Chunk record count of zero.
    #[error("chunk record count must be greater than zero")]
    ZeroChunkSize,

    /// `line_size * chunk_record_count` does not fit in `usize`.
    #[error("chunk of {chunk_record_count} record(s) of {line_size} byte(s) is too large")]
    ChunkTooLarge { line_size: usize, chunk_record_count: usize },

    /// Field with zero length.
    #[error("field '{0}' has zero length")]
    ZeroLength(String),

    /// Two fields share a name.
    #[error("duplicate field name '{0}'")]
    DuplicateName(String),

    /// Field extends past the end of the line.
    #[error("field '{field}' ends at byte {end}, beyond line size {line_size}")]
    OutOfRange { field: String, end: usize, line_size: usize },

    /// Two fields cover the same bytes.
    #[error("fields '{first}' and '{second}' overlap")]
    Overlap { first: String, second: String },

    /// Type-specific parameter out of bounds (digits, scale, binary length, date pattern).
    #[error("field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// Codepage table is malformed.
    #[error("invalid codepage: {0}")]
    InvalidCodePage(String),

    /// Name or CCSID matches no built-in codepage.
    #[error("unknown codepage '{0}'")]
    UnknownCodePage(String),

    /// Output format name not recognized.
    #[error("unknown output format '{0}'")]
    UnknownFormat(String),
}

/// Which nibble of a decimal field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NibbleRole {
    /// One of the value's digits.
    Digit,
    /// The sign nibble (last nibble of the field).
    Sign,
}

impl std::fmt::Display for NibbleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digit => f.write_str("digit"),
            Self::Sign => f.write_str("sign"),
        }
    }
}

/// Failure to decode one field of one record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldDecodeError {
    /// Digit nibble outside 0-9, or unrecognized sign nibble.
    #[error("invalid {role} nibble 0x{nibble:X} at byte {position}")]
    InvalidDigit {
        /// Byte position within the field.
        position: usize,
        /// Rejected nibble value.
        nibble: u8,
        /// Whether the nibble was a digit or the sign.
        role: NibbleRole,
    },

    /// Decoded text does not match the date pattern.
    #[error("'{text}' does not match date pattern '{pattern}'")]
    InvalidDate { text: String, pattern: String },

    /// Value does not fit an exact decimal.
    #[error("value with {digits} digit(s) and scale {scale} does not fit a decimal")]
    Overflow { digits: usize, scale: u32 },
}
