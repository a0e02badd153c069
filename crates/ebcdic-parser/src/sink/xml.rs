//! XML document output.
//!
//! # Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Records>
//!   <Record index="0">
//!     <name>ALICE</name>
//!     <id>001</id>
//!   </Record>
//! </Records>
//! ```
//!
//! Field names become element names after [`element_name`]. A field that failed
//! to decode is written as an empty element.

use std::io::Write;

use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use super::RecordFormat;
use crate::{decode::FieldValue, error::ParseResult};

const ROOT: &str = "Records";
const RECORD: &str = "Record";

/// Turns a field name into a valid XML element name.
///
/// Characters other than letters, digits, `_`, `-` and `.` become `_`; a name
/// that does not start with a letter or `_` gets a `_` prefix.
#[must_use]
pub fn element_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    if !out.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        out.insert(0, '_');
    }
    out
}

/// Whole-document XML writer.
///
/// Events go through an indenting [`Writer`] over an internal buffer, which is
/// drained into the output after every call.
pub struct XmlFormat {
    xml: Writer<Vec<u8>>,
    elements: Vec<String>,
}

impl XmlFormat {
    #[must_use]
    pub fn new() -> Self {
        Self { xml: Writer::new_with_indent(Vec::new(), b' ', 2), elements: Vec::new() }
    }

    fn drain<W: Write>(&mut self, writer: &mut W) -> ParseResult<()> {
        let buffer = self.xml.get_mut();
        writer.write_all(buffer)?;
        buffer.clear();
        Ok(())
    }
}

impl Default for XmlFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordFormat for XmlFormat {
    fn begin<W: Write>(&mut self, writer: &mut W, names: &[String]) -> ParseResult<()> {
        self.elements = names.iter().map(|n| element_name(n)).collect();
        self.xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.xml.write_event(Event::Start(BytesStart::new(ROOT)))?;
        self.drain(writer)
    }

    fn write_row<W: Write>(
        &mut self,
        writer: &mut W,
        index: usize,
        values: &[Option<&FieldValue>],
    ) -> ParseResult<()> {
        let mut record = BytesStart::new(RECORD);
        record.push_attribute(("index", index.to_string().as_str()));
        self.xml.write_event(Event::Start(record))?;

        for (element, value) in self.elements.iter().zip(values) {
            match value {
                Some(value) => {
                    let text = value.to_string();
                    self.xml.write_event(Event::Start(BytesStart::new(element.as_str())))?;
                    self.xml.write_event(Event::Text(BytesText::new(&text)))?;
                    self.xml.write_event(Event::End(BytesEnd::new(element.as_str())))?;
                }
                None => {
                    self.xml.write_event(Event::Empty(BytesStart::new(element.as_str())))?;
                }
            }
        }

        self.xml.write_event(Event::End(BytesEnd::new(RECORD)))?;
        self.drain(writer)
    }

    fn finish<W: Write>(&mut self, writer: &mut W) -> ParseResult<()> {
        self.xml.write_event(Event::End(BytesEnd::new(ROOT)))?;
        self.xml.get_mut().push(b'\n');
        self.drain(writer)
    }
}
