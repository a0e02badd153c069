//! Batch parsing of whole buffers.
//!
//! [`EbcdicParser`] validates a buffer against its template, splits it into
//! `line_size` slices and decodes each one. The result is a
//! [`ParsedRecordSet`] whose entry `i` corresponds to bytes
//! `[i * line_size, (i + 1) * line_size)` of the buffer. Failed records stay
//! at their index.

use std::{path::Path, sync::Arc};

use tracing::debug;

use crate::{
    codepage::CodePage,
    error::ParseResult,
    record::{DecodeFailure, ParsedRecord, RecordDecoder, RecordOutcome},
    template::LineTemplate,
};

/// Decoded records of one buffer, index-aligned with the input lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecordSet {
    names: Arc<[String]>,
    /// Index of the first record in the whole input.
    start_index: usize,
    outcomes: Vec<RecordOutcome>,
}

impl ParsedRecordSet {
    /// Field names of the template the set was parsed with.
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    /// `(record index, outcome)` pairs, indices counted from [`Self::start_index`].
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RecordOutcome)> {
        self.outcomes.iter().enumerate().map(move |(i, o)| (self.start_index + i, o))
    }

    /// Successfully decoded records, in order.
    pub fn records(&self) -> impl Iterator<Item = &ParsedRecord> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    /// Failed records with their index.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &DecodeFailure)> {
        self.iter().filter_map(|(i, o)| o.as_ref().err().map(|f| (i, f)))
    }

    pub fn into_outcomes(self) -> Vec<RecordOutcome> {
        self.outcomes
    }
}

/// Parses buffers of back-to-back fixed-size records.
///
/// ```
/// use ebcdic_parser::{
///     batch::EbcdicParser,
///     codepage::CP037,
///     template::{FieldDescriptor, LineTemplate},
/// };
///
/// let template = LineTemplate::new(
///     8,
///     vec![FieldDescriptor::text("name", 0, 5), FieldDescriptor::text("id", 5, 3)],
/// )
/// .unwrap();
/// let bytes = CP037.encode("ALICE001BOB  002").unwrap();
///
/// let set = EbcdicParser::new(&template, &CP037).parse_all(&bytes).unwrap();
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EbcdicParser<'a> {
    decoder: RecordDecoder<'a>,
}

impl<'a> EbcdicParser<'a> {
    pub fn new(template: &'a LineTemplate, codepage: &'a CodePage) -> Self {
        Self { decoder: RecordDecoder::new(template, codepage) }
    }

    #[must_use]
    pub fn template(&self) -> &'a LineTemplate {
        self.decoder.template()
    }

    #[must_use]
    pub fn codepage(&self) -> &'a CodePage {
        self.decoder.codepage()
    }

    /// Parses a whole buffer. An empty buffer yields an empty set.
    ///
    /// # Errors
    ///
    /// [`ParseError::ShortInput`](crate::error::ParseError::ShortInput) or
    /// [`ParseError::UnalignedInput`](crate::error::ParseError::UnalignedInput)
    /// when the buffer does not hold a whole number of records. Nothing is
    /// decoded in that case.
    pub fn parse_all(&self, bytes: &[u8]) -> ParseResult<ParsedRecordSet> {
        self.parse_chunk(bytes, 0)
    }

    /// Parses a buffer whose first record has index `start_index` in a larger input.
    pub fn parse_chunk(&self, bytes: &[u8], start_index: usize) -> ParseResult<ParsedRecordSet> {
        let template = self.template();
        let count = template.validate(bytes, false)?;
        debug!(records = count, line_size = template.line_size(), start_index, "Parsing batch");

        let outcomes: Vec<RecordOutcome> = bytes
            .chunks_exact(template.line_size())
            .map(|line| self.decoder.decode_line(line))
            .collect();

        Ok(ParsedRecordSet { names: Arc::clone(template.field_names()), start_index, outcomes })
    }

    /// Parses a buffer holding exactly one record.
    ///
    /// # Errors
    ///
    /// [`ParseError::LengthMismatch`](crate::error::ParseError::LengthMismatch)
    /// (or `ShortInput`) if `bytes` is not exactly `line_size` long.
    pub fn parse_single(&self, bytes: &[u8]) -> ParseResult<RecordOutcome> {
        self.decoder.decode(bytes)
    }

    /// Reads a file into memory and parses it.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> ParseResult<ParsedRecordSet> {
        let bytes = std::fs::read(path)?;
        self.parse_all(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{
        codepage::{CP037, CP500},
        decode::FieldValue,
        error::ParseError,
        template::FieldDescriptor,
    };

    fn name_id_template() -> LineTemplate {
        LineTemplate::new(
            8,
            vec![FieldDescriptor::text("name", 0, 5), FieldDescriptor::text("id", 5, 3)],
        )
        .unwrap()
    }

    fn text(set: &ParsedRecordSet, index: usize, field: &str) -> String {
        set.outcomes()[index].as_ref().unwrap().get(field).unwrap().to_string()
    }

    #[test]
    fn two_records_decode_in_order() {
        let template = name_id_template();
        let parser = EbcdicParser::new(&template, &CP037);
        let bytes = CP037.encode("ALICE001BOB  002").unwrap();

        let set = parser.parse_all(&bytes).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(text(&set, 0, "name"), "ALICE");
        assert_eq!(text(&set, 0, "id"), "001");
        assert_eq!(text(&set, 1, "name"), "BOB  ");
        assert_eq!(text(&set, 1, "id"), "002");
        assert_eq!(set.failures().count(), 0);
    }

    #[test]
    fn record_count_matches_buffer_length() {
        let template = name_id_template();
        let parser = EbcdicParser::new(&template, &CP037);

        for records in [0usize, 1, 7, 64] {
            let set = parser.parse_all(&vec![0x40; records * 8]).unwrap();
            assert_eq!(set.len(), records);
        }
    }

    #[test]
    fn empty_buffer_is_not_an_error() {
        let template = name_id_template();
        let set = EbcdicParser::new(&template, &CP037).parse_all(&[]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.field_names(), ["name", "id"]);
    }

    #[test]
    fn unaligned_buffer_is_rejected() {
        let template = name_id_template();
        let parser = EbcdicParser::new(&template, &CP037);

        for len in [9usize, 15, 17, 23] {
            let err = parser.parse_all(&vec![0x40; len]).unwrap_err();
            assert!(matches!(err, ParseError::UnalignedInput { .. }), "len {len}: {err}");
        }
        assert!(matches!(parser.parse_all(&[0x40; 5]), Err(ParseError::ShortInput { .. })));
    }

    #[test]
    fn single_record_entry_point() {
        let template = name_id_template();
        let parser = EbcdicParser::new(&template, &CP037);

        let record = parser.parse_single(&CP037.encode("CAROL003").unwrap()).unwrap().unwrap();
        assert_eq!(record.get("id"), Some(&FieldValue::Text("003".to_string())));

        let err = parser.parse_single(&[0x40; 16]).unwrap_err();
        assert!(matches!(err, ParseError::LengthMismatch { expected: 8, actual: 16 }));
    }

    #[test]
    fn failures_stay_at_their_index() {
        let template = LineTemplate::new(
            4,
            vec![FieldDescriptor::text("tag", 0, 1), FieldDescriptor::packed("n", 1, 3, 0)],
        )
        .unwrap();
        let parser = EbcdicParser::new(&template, &CP037);
        let bytes = [
            0xC1, 0x00, 0x00, 0x1C, // A, 1
            0xC2, 0x00, 0x0F, 0x00, // B, bad sign nibble
            0xC3, 0x00, 0x00, 0x3D, // C, -3
        ];

        let set = parser.parse_chunk(&bytes, 10).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.records().count(), 2);
        let failures: Vec<usize> = set.failures().map(|(i, _)| i).collect();
        assert_eq!(failures, [11]);
        assert_eq!(text(&set, 2, "n"), "-3");
    }

    #[test]
    fn codepage_is_swappable() {
        let template = LineTemplate::new(1, vec![FieldDescriptor::text("c", 0, 1)]).unwrap();
        // 0x4A is '¢' in CP037 and '[' in CP500
        let cp037 = EbcdicParser::new(&template, &CP037).parse_all(&[0x4A]).unwrap();
        let cp500 = EbcdicParser::new(&template, &CP500).parse_all(&[0x4A]).unwrap();
        assert_eq!(text(&cp037, 0, "c"), "¢");
        assert_eq!(text(&cp500, 0, "c"), "[");
    }

    #[test]
    fn text_fields_round_trip_through_the_codepage() {
        let template = LineTemplate::new(256, vec![FieldDescriptor::text("all", 0, 256)]).unwrap();
        let bytes: Vec<u8> = (0..=255).collect();

        let set = EbcdicParser::new(&template, &CP037).parse_all(&bytes).unwrap();
        let decoded = text(&set, 0, "all");

        assert_eq!(CP037.encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let template = name_id_template();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&CP037.encode("DAVE 004").unwrap()).unwrap();
        file.flush().unwrap();

        let set = EbcdicParser::new(&template, &CP037).parse_file(file.path()).unwrap();
        assert_eq!(text(&set, 0, "name"), "DAVE ");
    }
}
