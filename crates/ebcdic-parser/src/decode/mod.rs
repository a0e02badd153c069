//! Per-field decoding.
//!
//! [`decode_field`] dispatches on the field's [`FieldType`] and returns a typed
//! [`FieldValue`]. Every field is decoded independently: a failure on one field
//! says nothing about its neighbours.

pub mod numeric;
pub mod text;

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    codepage::CodePage,
    error::FieldDecodeError,
    template::{FieldDescriptor, FieldType},
};

/// Decoded value of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Exact decimal carrying the field's scale.
    Number(Decimal),
    Date(NaiveDate),
    /// Blank date accepted by `allow_blank`.
    Empty,
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Output form used by every sink: text as-is, numbers with their scale,
/// dates as ISO `YYYY-MM-DD`, empty values as an empty string.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Empty => Ok(()),
        }
    }
}

/// Decodes one field from its own byte slice.
///
/// `bytes` must be exactly the field's `[offset, offset + length)` range.
pub fn decode_field(
    field: &FieldDescriptor,
    bytes: &[u8],
    codepage: &CodePage,
) -> Result<FieldValue, FieldDecodeError> {
    debug_assert_eq!(bytes.len(), field.length);

    match &field.kind {
        FieldType::Text { trim } => Ok(FieldValue::Text(text::decode_text(bytes, codepage, *trim))),
        FieldType::Zoned { scale } => numeric::decode_zoned(bytes, *scale).map(FieldValue::Number),
        FieldType::Packed { scale } => numeric::decode_packed(bytes, *scale).map(FieldValue::Number),
        FieldType::Binary { signed, scale } => {
            numeric::decode_binary(bytes, *signed, *scale).map(FieldValue::Number)
        }
        FieldType::Date { pattern, allow_blank } => {
            text::decode_date(bytes, codepage, pattern, *allow_blank)
        }
    }
}
