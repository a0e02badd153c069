//! Parsed records and the record decoder.
//!
//! [`RecordDecoder`] turns one `line_size` slice into a [`RecordOutcome`]: a
//! [`ParsedRecord`] when every field decoded, otherwise a [`DecodeFailure`]
//! that keeps the fields that did decode alongside a [`FieldError`] for each
//! one that did not.

use std::sync::Arc;

use crate::{
    codepage::CodePage,
    decode::{FieldValue, decode_field},
    error::{FieldDecodeError, ParseResult},
    template::LineTemplate,
};

/// Result of decoding one line.
pub type RecordOutcome = Result<ParsedRecord, DecodeFailure>;

/// A fully decoded record: field values in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    names: Arc<[String]>,
    values: Vec<FieldValue>,
}

impl ParsedRecord {
    /// Value of the named field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.names.iter().position(|n| n == name).map(|i| &self.values[i])
    }

    /// `(name, value)` pairs in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.names.iter().map(String::as_str).zip(&self.values)
    }

    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A field that failed to decode, with enough context to find it in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the failed field.
    pub field: String,
    /// Byte offset of the field within the line.
    pub offset: usize,
    /// Why decoding failed.
    pub error: FieldDecodeError,
}

/// A line with at least one field that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    names: Arc<[String]>,
    fields: Vec<Result<FieldValue, FieldError>>,
}

impl DecodeFailure {
    /// Fields that failed, in template order.
    pub fn errors(&self) -> impl Iterator<Item = &FieldError> {
        self.fields.iter().filter_map(|f| f.as_ref().err())
    }

    /// Fields that decoded, in template order.
    pub fn decoded(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.names
            .iter()
            .zip(&self.fields)
            .filter_map(|(name, f)| f.as_ref().ok().map(|v| (name.as_str(), v)))
    }

    /// Per-field outcome of the named field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Result<FieldValue, FieldError>> {
        self.names.iter().position(|n| n == name).map(|i| &self.fields[i])
    }

    /// Every field in template order, `None` where decoding failed.
    pub fn values(&self) -> impl Iterator<Item = Option<&FieldValue>> {
        self.fields.iter().map(|f| f.as_ref().ok())
    }
}

/// Decodes single lines against a template and codepage.
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder<'a> {
    template: &'a LineTemplate,
    codepage: &'a CodePage,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(template: &'a LineTemplate, codepage: &'a CodePage) -> Self {
        Self { template, codepage }
    }

    #[must_use]
    pub fn template(&self) -> &'a LineTemplate {
        self.template
    }

    #[must_use]
    pub fn codepage(&self) -> &'a CodePage {
        self.codepage
    }

    /// Decodes one line after checking its length.
    ///
    /// # Errors
    ///
    /// [`ParseError::ShortInput`](crate::error::ParseError::ShortInput) or
    /// [`ParseError::LengthMismatch`](crate::error::ParseError::LengthMismatch)
    /// if `line` is not exactly one record long. Field failures are reported in
    /// the returned [`RecordOutcome`], not as an error.
    pub fn decode(&self, line: &[u8]) -> ParseResult<RecordOutcome> {
        self.template.validate(line, true)?;
        Ok(self.decode_line(line))
    }

    /// Decodes a line already known to be `line_size` bytes long.
    pub(crate) fn decode_line(&self, line: &[u8]) -> RecordOutcome {
        debug_assert_eq!(line.len(), self.template.line_size());

        let mut failed = false;
        let fields: Vec<Result<FieldValue, FieldError>> = self
            .template
            .fields()
            .iter()
            .map(|field| {
                let bytes = &line[field.offset..field.offset + field.length];
                decode_field(field, bytes, self.codepage).map_err(|error| {
                    failed = true;
                    FieldError { field: field.name.clone(), offset: field.offset, error }
                })
            })
            .collect();

        let names = Arc::clone(self.template.field_names());
        if failed {
            return Err(DecodeFailure { names, fields });
        }

        Ok(ParsedRecord { names, values: fields.into_iter().flatten().collect() })
    }
}
