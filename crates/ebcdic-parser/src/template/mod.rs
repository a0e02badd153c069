//! Line templates: the fixed layout of one record.
//!
//! A [`LineTemplate`] is an ordered, non-empty list of [`FieldDescriptor`]s and
//! the total record length in bytes (the *line size*). Templates are checked
//! once at construction and are immutable afterwards, so a single instance can
//! be shared by every decode call.
//!
//! Templates are usually loaded from JSON:
//!
//! ```
//! use ebcdic_parser::template::LineTemplate;
//!
//! let json = r#"{
//!     "line_size": 8,
//!     "fields": [
//!         { "name": "name", "offset": 0, "length": 5, "type": "text" },
//!         { "name": "id", "length": 3, "type": "zoned" }
//!     ]
//! }"#;
//! let template = LineTemplate::from_reader(json.as_bytes()).unwrap();
//! assert_eq!(template.line_size(), 8);
//! assert_eq!(template.fields()[1].offset, 5);
//! ```

mod field;

use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};

pub use field::{FieldDescriptor, FieldType, MAX_BINARY_LENGTH, MAX_DIGITS, TrimPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ParseError, ParseResult};

/// Validated record layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTemplate {
    fields: Vec<FieldDescriptor>,
    line_size: usize,
    names: Arc<[String]>,
}

impl LineTemplate {
    /// Builds a template with an explicit line size.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the field list is empty, the line size is zero, a
    /// name repeats, a field leaves the line or two fields overlap.
    pub fn new(line_size: usize, fields: Vec<FieldDescriptor>) -> Result<Self, ConfigError> {
        if fields.is_empty() {
            return Err(ConfigError::EmptyTemplate);
        }
        if line_size == 0 {
            return Err(ConfigError::ZeroLineSize);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            field.check()?;
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateName(field.name.clone()));
            }
            match field.end() {
                Some(end) if end <= line_size => {}
                end => {
                    return Err(ConfigError::OutOfRange {
                        field: field.name.clone(),
                        end: end.unwrap_or(usize::MAX),
                        line_size,
                    });
                }
            }
        }

        let mut by_offset: Vec<&FieldDescriptor> = fields.iter().collect();
        by_offset.sort_by_key(|f| f.offset);
        for pair in by_offset.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if second.offset < first.offset + first.length {
                return Err(ConfigError::Overlap {
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
        }

        let names = fields.iter().map(|f| f.name.clone()).collect();
        Ok(Self { fields, line_size, names })
    }

    /// Builds a template whose line size is the end of the last field.
    pub fn with_derived_size(fields: Vec<FieldDescriptor>) -> Result<Self, ConfigError> {
        let line_size = fields.iter().filter_map(FieldDescriptor::end).max().unwrap_or(0);
        Self::new(line_size, fields)
    }

    /// Reads a template from JSON.
    pub fn from_reader<R: Read>(reader: R) -> ParseResult<Self> {
        Ok(TemplateConfig::from_reader(reader)?.build()?)
    }

    /// Reads a template from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ParseResult<Self> {
        Ok(TemplateConfig::from_file(path)?.build()?)
    }

    #[must_use]
    pub fn line_size(&self) -> usize {
        self.line_size
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    /// Field names in declared order, shared with every decoded record.
    #[must_use]
    pub fn field_names(&self) -> &Arc<[String]> {
        &self.names
    }

    /// Checks that `buffer` can be decoded with this template.
    ///
    /// Returns the number of records in the buffer. With `single_line` the
    /// buffer must hold exactly one record.
    ///
    /// # Errors
    ///
    /// - [`ParseError::ShortInput`] if `0 < len < line_size`
    /// - [`ParseError::LengthMismatch`] if `single_line` and `len != line_size`
    /// - [`ParseError::UnalignedInput`] if `len` is not a multiple of `line_size`
    pub fn validate(&self, buffer: &[u8], single_line: bool) -> ParseResult<usize> {
        let len = buffer.len();
        if len > 0 && len < self.line_size {
            return Err(ParseError::ShortInput { actual: len, line_size: self.line_size });
        }
        if single_line && len != self.line_size {
            return Err(ParseError::LengthMismatch { expected: self.line_size, actual: len });
        }
        if len % self.line_size != 0 {
            return Err(ParseError::UnalignedInput { length: len, line_size: self.line_size });
        }
        Ok(len / self.line_size)
    }
}

/// Validation entry point for callers that may lack a buffer or a template.
///
/// # Errors
///
/// [`ParseError::MissingInput`] without a buffer, [`ParseError::MissingTemplate`]
/// without a template (or one with no fields), then everything
/// [`LineTemplate::validate`] reports.
pub fn validate(
    template: Option<&LineTemplate>,
    buffer: Option<&[u8]>,
    single_line: bool,
) -> ParseResult<usize> {
    let buffer = buffer.ok_or(ParseError::MissingInput)?;
    let template = template.filter(|t| t.fields_count() > 0).ok_or(ParseError::MissingTemplate)?;
    template.validate(buffer, single_line)
}

/// On-disk template layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Record length; derived from the fields when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_size: Option<usize>,
    /// Preferred codepage name for this data set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codepage: Option<String>,
    pub fields: Vec<FieldConfig>,
}

/// A field as written in a template file; `offset` may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    pub length: usize,
    #[serde(flatten)]
    pub kind: FieldType,
}

impl TemplateConfig {
    pub fn from_reader<R: Read>(reader: R) -> ParseResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ParseResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Resolves omitted offsets and validates the layout.
    ///
    /// A field without an offset starts where the previous field ends.
    pub fn build(self) -> Result<LineTemplate, ConfigError> {
        let mut next = 0usize;
        let fields: Vec<FieldDescriptor> = self
            .fields
            .into_iter()
            .map(|f| {
                let offset = f.offset.unwrap_or(next);
                next = offset.saturating_add(f.length);
                FieldDescriptor { name: f.name, offset, length: f.length, kind: f.kind }
            })
            .collect();

        match self.line_size {
            Some(size) => LineTemplate::new(size, fields),
            None => LineTemplate::with_derived_size(fields),
        }
    }
}
