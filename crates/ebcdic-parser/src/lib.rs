//! Conversion of fixed-width EBCDIC mainframe records into text, CSV and XML.
//!
//! A record layout is described by a [`LineTemplate`](template::LineTemplate):
//! named fields at fixed byte offsets, each decoded as text through a
//! [`CodePage`](codepage::CodePage) or as a zoned, packed, binary or date value.
//!
//! - [`batch::EbcdicParser`] decodes a whole in-memory buffer
//! - [`pipeline::StreamingPipeline`] converts large files chunk by chunk
//! - [`sink`] holds the output formats
//!
//! # Quick start
//!
//! ```
//! use ebcdic_parser::prelude::*;
//!
//! let template = LineTemplate::new(
//!     8,
//!     vec![FieldDescriptor::text("name", 0, 5), FieldDescriptor::text("id", 5, 3)],
//! )
//! .unwrap();
//! let bytes = CP037.encode("ALICE001").unwrap();
//!
//! let set = EbcdicParser::new(&template, &CP037).parse_all(&bytes).unwrap();
//! let record = set.records().next().unwrap();
//! assert_eq!(record.get("name").unwrap().to_string(), "ALICE");
//! ```

pub mod batch;
pub mod codepage;
pub mod decode;
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod sink;
pub mod template;
pub mod writer;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        batch::{EbcdicParser, ParsedRecordSet},
        codepage::{CP037, CP500, CP1047, CodePage},
        decode::FieldValue,
        error::{ConfigError, FieldDecodeError, ParseError, ParseResult},
        pipeline::{
            CancellationToken, ConversionSummary, FailureReport, PipelineConfig, ProgressObserver,
            StreamingPipeline, TracingObserver,
        },
        record::{DecodeFailure, ParsedRecord, RecordOutcome},
        sink::{FailedRecords, OutputFormat, OutputOptions},
        template::{FieldDescriptor, FieldType, LineTemplate, TemplateConfig, TrimPolicy},
    };
}
