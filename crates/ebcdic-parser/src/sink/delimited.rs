//! Delimited text output.
//!
//! # Format
//!
//! ```text
//! name|id¬
//! "ALICE"|"001"¬
//! "BOB  "|"002"¬
//! ```
//!
//! The header line is never quoted. Values are written as-is: a delimiter or
//! quote character inside a value is not escaped.

use std::io::Write;

use super::{OutputOptions, RecordFormat};
use crate::{decode::FieldValue, error::ParseResult};

/// Delimited text rows with an optional header line.
#[derive(Debug, Clone)]
pub struct DelimitedFormat {
    include_header: bool,
    quote: Option<char>,
    delimiter: String,
    row_terminator: String,
}

impl DelimitedFormat {
    pub fn new(options: &OutputOptions) -> Self {
        Self {
            include_header: options.include_header,
            quote: options.quote.then_some(options.quote_char),
            delimiter: options.delimiter.clone(),
            row_terminator: options.row_terminator.clone(),
        }
    }
}

impl RecordFormat for DelimitedFormat {
    fn begin<W: Write>(&mut self, writer: &mut W, names: &[String]) -> ParseResult<()> {
        if self.include_header {
            writer.write_all(names.join(&self.delimiter).as_bytes())?;
            writer.write_all(self.row_terminator.as_bytes())?;
        }
        Ok(())
    }

    fn write_row<W: Write>(
        &mut self,
        writer: &mut W,
        _index: usize,
        values: &[Option<&FieldValue>],
    ) -> ParseResult<()> {
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                writer.write_all(self.delimiter.as_bytes())?;
            }
            if let Some(q) = self.quote {
                write!(writer, "{q}")?;
            }
            if let Some(value) = value {
                write!(writer, "{value}")?;
            }
            if let Some(q) = self.quote {
                write!(writer, "{q}")?;
            }
        }
        writer.write_all(self.row_terminator.as_bytes())?;
        Ok(())
    }
}
