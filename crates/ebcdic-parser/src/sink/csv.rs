//! CSV output.
//!
//! # Format
//!
//! ```csv
//! "name","id"
//! "ALICE","001"
//! ```
//!
//! With quoting on every field is quoted (header included); with quoting off
//! only fields that need it are. Rows end with `\n`.

use std::io::Write;

use ::csv::{QuoteStyle, Terminator, WriterBuilder};

use super::{OutputOptions, RecordFormat};
use crate::{decode::FieldValue, error::ParseResult};

/// CSV rows with an optional header row.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    include_header: bool,
    quote: bool,
}

impl CsvFormat {
    pub fn new(options: &OutputOptions) -> Self {
        Self { include_header: options.include_header, quote: options.quote }
    }

    fn builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        builder
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .quote_style(if self.quote { QuoteStyle::Always } else { QuoteStyle::Necessary });
        builder
    }

    fn write_record<W, I, T>(&self, writer: &mut W, record: I) -> ParseResult<()>
    where
        W: Write,
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut csv_writer = self.builder().from_writer(writer);
        csv_writer.write_record(record)?;
        csv_writer.flush()?;
        Ok(())
    }
}

impl RecordFormat for CsvFormat {
    fn begin<W: Write>(&mut self, writer: &mut W, names: &[String]) -> ParseResult<()> {
        if self.include_header {
            self.write_record(writer, names)?;
        }
        Ok(())
    }

    fn write_row<W: Write>(
        &mut self,
        writer: &mut W,
        _index: usize,
        values: &[Option<&FieldValue>],
    ) -> ParseResult<()> {
        let cells = values.iter().map(|v| v.map(ToString::to_string).unwrap_or_default());
        self.write_record(writer, cells)
    }
}
