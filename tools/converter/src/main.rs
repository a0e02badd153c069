//! CLI tool for converting fixed-width EBCDIC record files to delimited text, CSV or XML.
//!
//! # Usage
//!
//! ```bash
//! # Tab-delimited output with the default ¬\r\n row terminator
//! ebcdic2unicode --template layout.json -i accounts.dat -o accounts.txt
//!
//! # CSV in CP500, 10 000 records per chunk
//! ebcdic2unicode -t layout.json -i accounts.dat -o accounts.csv --format csv --codepage cp500 --chunk-records 10000
//!
//! # Pipe-delimited to stdout, plain newlines, no quotes
//! ebcdic2unicode -t layout.json -i accounts.dat --delimiter '|' --row-terminator '\n' --no-quotes
//!
//! # XML (whole file in memory)
//! ebcdic2unicode -t layout.json -i accounts.dat -o accounts.xml --format xml
//! ```
//!
//! Progress and the final summary go to stderr. Set `RUST_LOG` to change the
//! log level (default `info`).

use std::{
    borrow::Cow,
    fs::File,
    io::{Write, stderr, stdout},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use ebcdic_parser::{
    pipeline::{DEFAULT_CHUNK_RECORD_COUNT, FailureReport},
    prelude::*,
    sink,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Failures listed one by one in the summary; the rest are only counted.
const MAX_LISTED_FAILURES: usize = 20;

/// Convert fixed-width EBCDIC records to delimited text, CSV or XML.
///
/// Reads records laid out by a JSON template and writes one output row per
/// record. Delimited text and CSV are converted chunk by chunk; XML is built
/// in memory.
#[derive(Parser, Debug)]
#[command(name = "ebcdic2unicode")]
#[command(version, about)]
struct Args {
    /// Record layout (JSON template).
    #[arg(short, long)]
    template: PathBuf,

    /// Input file of back-to-back fixed-width records.
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path. If not specified, writes to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = FormatArg::Delimited)]
    format: FormatArg,

    /// Codepage name (cp037, cp500, cp1047) or path to a JSON table.
    ///
    /// Defaults to the template's `codepage`, then cp037.
    #[arg(short, long)]
    codepage: Option<String>,

    /// Records per chunk.
    #[arg(long, default_value_t = DEFAULT_CHUNK_RECORD_COUNT)]
    chunk_records: usize,

    /// Field delimiter for delimited output (`\t`, `\n`, `\r` and `\\` escapes allowed).
    #[arg(long, default_value = "\\t")]
    delimiter: String,

    /// Quote character for delimited output.
    #[arg(long, default_value_t = '"')]
    quote_char: char,

    /// Row terminator for delimited output (escapes as for --delimiter).
    #[arg(long, default_value = "¬\\r\\n")]
    row_terminator: String,

    /// Do not write a header row.
    #[arg(long)]
    no_header: bool,

    /// Do not wrap values in quotes.
    #[arg(long)]
    no_quotes: bool,

    /// Write records with failed fields, leaving those fields blank.
    #[arg(long)]
    emit_partial: bool,
}

/// Supported output formats for CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Delimited text (tab by default).
    Delimited,
    /// Comma-separated values.
    Csv,
    /// Single XML document.
    Xml,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Delimited => OutputFormat::Delimited,
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Xml => OutputFormat::Xml,
        }
    }
}

impl Args {
    fn output_options(&self) -> Result<OutputOptions> {
        let delimiter = unescape(&self.delimiter).context("Invalid --delimiter")?;
        if delimiter.is_empty() {
            bail!("--delimiter must not be empty");
        }
        let row_terminator = unescape(&self.row_terminator).context("Invalid --row-terminator")?;

        Ok(OutputOptions::default()
            .with_format(self.format.into())
            .with_header(!self.no_header)
            .with_quote(!self.no_quotes)
            .with_delimiter(delimiter)
            .with_quote_char(self.quote_char)
            .with_row_terminator(row_terminator)
            .with_failed_records(if self.emit_partial {
                FailedRecords::EmitPartial
            } else {
                FailedRecords::Skip
            }))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Ctrl+C received, stopping after the current chunk");
        handler_token.cancel();
    })
    .context("set Ctrl+C handler")?;

    let summary = convert(&args, &cancel)?;

    // Summary goes to stderr so it never mixes with output on stdout
    report(&summary, &mut stderr().lock()).context("Failed to write summary")?;

    Ok(())
}

/// Resolves `--codepage`: an existing file is loaded as a JSON table, anything
/// else is looked up among the built-in pages.
fn resolve_codepage(spec: Option<&str>) -> Result<Cow<'static, CodePage>> {
    let spec = spec.unwrap_or("cp037");
    let path = Path::new(spec);
    if path.is_file() {
        let codepage = CodePage::from_file(path)
            .with_context(|| format!("Failed to load codepage table: {}", path.display()))?;
        return Ok(Cow::Owned(codepage));
    }
    Ok(Cow::Borrowed(CodePage::by_name(spec)?))
}

/// Replaces `\t`, `\n`, `\r` and `\\` with the characters they name.
fn unescape(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => bail!("unknown escape sequence '\\{other}'"),
            None => bail!("trailing backslash"),
        }
    }
    Ok(out)
}

fn convert(args: &Args, cancel: &CancellationToken) -> Result<ConversionSummary> {
    let config = TemplateConfig::from_file(&args.template)
        .with_context(|| format!("Failed to read template: {}", args.template.display()))?;
    let codepage = resolve_codepage(args.codepage.as_deref().or(config.codepage.as_deref()))?;
    let template = config
        .build()
        .with_context(|| format!("Invalid template: {}", args.template.display()))?;
    let options = args.output_options()?;

    info!(
        line_size = template.line_size(),
        fields = template.fields_count(),
        codepage = codepage.name(),
        format = options.format.as_str(),
        "Template loaded"
    );

    if !options.format.supports_streaming() {
        return convert_whole(args, &template, &codepage, &options);
    }

    let config = PipelineConfig::default()
        .with_chunk_record_count(args.chunk_records)
        .with_output(options);
    let pipeline = StreamingPipeline::new(&template, &codepage, config)?;
    let mut observer = TracingObserver;

    let summary = match &args.output {
        Some(path) => pipeline.convert_file(&args.input, path, &mut observer, cancel),
        None => {
            let input = File::open(&args.input)
                .with_context(|| format!("Failed to open input file: {}", args.input.display()))?;
            let total_bytes = input.metadata()?.len();
            pipeline.convert(input, total_bytes, stdout().lock(), &mut observer, cancel)
        }
    };

    summary.with_context(|| format!("Failed to convert {}", args.input.display()))
}

/// Non-chunked conversion: the whole input is parsed before anything is written.
fn convert_whole(
    args: &Args,
    template: &LineTemplate,
    codepage: &CodePage,
    options: &OutputOptions,
) -> Result<ConversionSummary> {
    let set = EbcdicParser::new(template, codepage)
        .parse_file(&args.input)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    let written = match &args.output {
        Some(path) => sink::save(&set, path, options)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
        None => sink::write_set(stdout().lock(), &set, options).context("Failed to write output")?,
    };

    Ok(ConversionSummary {
        records: set.len(),
        written,
        chunks: 1,
        failed_records: set.failures().count(),
        failures: FailureReport::collect(&set),
    })
}

fn report<W: Write>(summary: &ConversionSummary, out: &mut W) -> std::io::Result<()> {
    writeln!(
        out,
        "Converted {} of {} record(s) in {} chunk(s)",
        summary.written, summary.records, summary.chunks
    )?;

    if summary.failures.is_empty() {
        return Ok(());
    }

    writeln!(out, "{} record(s) had fields that failed to decode:", summary.failed_records)?;
    for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
        writeln!(
            out,
            "  record {}, field '{}' at offset {}: {}",
            failure.record_index, failure.field, failure.offset, failure.error
        )?;
    }
    if summary.failures.len() > MAX_LISTED_FAILURES {
        writeln!(out, "  ... and {} more", summary.failures.len() - MAX_LISTED_FAILURES)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["ebcdic2unicode", "-t", "layout.json", "-i", "in.dat"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_options() {
        let options = args(&[]).output_options().unwrap();
        assert_eq!(options, OutputOptions::default());
    }

    #[test]
    fn test_flags_map_to_options() {
        let options = args(&[
            "--format",
            "csv",
            "--no-header",
            "--no-quotes",
            "--emit-partial",
            "--delimiter",
            "|",
            "--row-terminator",
            "\\r\\n",
            "--quote-char",
            "'",
        ])
        .output_options()
        .unwrap();

        assert_eq!(options.format, OutputFormat::Csv);
        assert!(!options.include_header);
        assert!(!options.quote);
        assert_eq!(options.failed_records, FailedRecords::EmitPartial);
        assert_eq!(options.delimiter, "|");
        assert_eq!(options.row_terminator, "\r\n");
        assert_eq!(options.quote_char, '\'');
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("\\t").unwrap(), "\t");
        assert_eq!(unescape("¬\\r\\n").unwrap(), "¬\r\n");
        assert_eq!(unescape("a\\\\b").unwrap(), "a\\b");
        assert!(unescape("\\x").is_err());
        assert!(unescape("end\\").is_err());
    }

    #[test]
    fn test_empty_delimiter_is_rejected() {
        assert!(args(&["--delimiter", ""]).output_options().is_err());
    }

    #[test]
    fn test_resolve_builtin_codepage() {
        assert_eq!(resolve_codepage(None).unwrap().name(), "CP037");
        assert_eq!(resolve_codepage(Some("ibm-500")).unwrap().name(), "CP500");
        assert!(resolve_codepage(Some("cp9999")).is_err());
    }

    #[test]
    fn test_resolve_codepage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        let table: Vec<String> = (0u32..256)
            .map(|b| char::from_u32(0x100 + b).unwrap().to_string())
            .collect();
        let json = format!(r#"{{ "name": "custom", "table": {table:?} }}"#);
        std::fs::write(&path, json).unwrap();

        let codepage = resolve_codepage(path.to_str()).unwrap();
        assert_eq!(codepage.name(), "custom");
        assert_eq!(codepage.decode(&[0x00]), "\u{100}");
    }

    #[test]
    fn test_convert_xml_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("layout.json");
        let input = dir.path().join("in.dat");
        let output = dir.path().join("out.xml");
        std::fs::write(
            &template,
            r#"{ "fields": [ { "name": "name", "length": 5, "type": "text" },
                             { "name": "id", "length": 3, "type": "text" } ] }"#,
        )
        .unwrap();
        std::fs::write(&input, CP037.encode("ALICE001BOB  002").unwrap()).unwrap();

        let args = Args::try_parse_from([
            "ebcdic2unicode",
            "-t",
            template.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--format",
            "xml",
        ])
        .unwrap();
        let summary = convert(&args, &CancellationToken::new()).unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(summary.written, 2);
        let xml = std::fs::read_to_string(&output).unwrap();
        assert!(xml.contains("<Record index=\"1\">"));
        assert!(xml.contains("<name>BOB  </name>"));
    }

    #[test]
    fn test_report_lists_failures() {
        let failure = FailureReport {
            record_index: 7,
            field: "amount".to_string(),
            offset: 5,
            error: FieldDecodeError::InvalidDate {
                text: "2024".to_string(),
                pattern: "%Y%m%d".to_string(),
            },
        };
        let summary = ConversionSummary {
            records: 30,
            written: 5,
            chunks: 2,
            failed_records: 25,
            failures: vec![failure; 25],
        };

        let mut out = Vec::new();
        report(&summary, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("Converted 5 of 30 record(s) in 2 chunk(s)\n"));
        assert!(out.contains("record 7, field 'amount' at offset 5:"));
        assert_eq!(out.matches("record 7,").count(), MAX_LISTED_FAILURES);
        assert!(out.contains("... and 5 more"));
    }
}
