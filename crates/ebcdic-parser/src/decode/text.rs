//! Text and date decoding through a codepage.

use chrono::NaiveDate;

use super::FieldValue;
use crate::{codepage::CodePage, error::FieldDecodeError, template::TrimPolicy};

/// Maps every byte through the codepage, then applies the trim policy.
pub fn decode_text(bytes: &[u8], codepage: &CodePage, trim: TrimPolicy) -> String {
    let text = codepage.decode(bytes);
    match trim {
        TrimPolicy::None => text,
        policy => policy.apply(&text).to_string(),
    }
}

/// Decodes text and parses it with a `strftime`-style pattern.
///
/// Surrounding spaces are ignored. With `allow_blank`, a field of spaces or
/// zeros yields [`FieldValue::Empty`].
pub fn decode_date(
    bytes: &[u8],
    codepage: &CodePage,
    pattern: &str,
    allow_blank: bool,
) -> Result<FieldValue, FieldDecodeError> {
    let text = codepage.decode(bytes);
    let trimmed = text.trim_matches(' ');

    if allow_blank && trimmed.chars().all(|c| c == '0') {
        return Ok(FieldValue::Empty);
    }

    NaiveDate::parse_from_str(trimmed, pattern)
        .map(FieldValue::Date)
        .map_err(|_| FieldDecodeError::InvalidDate { text, pattern: pattern.to_string() })
}
