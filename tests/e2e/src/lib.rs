//! # e2e-tests - End-to-end tests for the `ebcdic2unicode` CLI
//!
//! Fixtures are generated per test in a temporary directory: a JSON template
//! and an EBCDIC data file encoded with the library's codepages.
//!
//! The sample layout ([`SAMPLE_TEMPLATE`]) is 19 bytes per record:
//!
//! | Field | Offset | Length | Type |
//! |---|---|---|---|
//! | `name` | 0 | 5 | text, trimmed at the end |
//! | `amount` | 5 | 3 | packed, scale 2 |
//! | `qty` | 8 | 3 | zoned |
//! | `born` | 11 | 8 | date `%Y%m%d` |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use ebcdic_parser::codepage::CodePage;
use tempfile::TempDir;

/// Template for [`SampleRecord`] data.
pub const SAMPLE_TEMPLATE: &str = r#"{
    "line_size": 19,
    "fields": [
        { "name": "name", "length": 5, "type": "text", "trim": "end" },
        { "name": "amount", "length": 3, "type": "packed", "scale": 2 },
        { "name": "qty", "length": 3, "type": "zoned" },
        { "name": "born", "length": 8, "type": "date", "pattern": "%Y%m%d" }
    ]
}"#;

/// Bytes per sample record.
pub const SAMPLE_LINE_SIZE: usize = 19;

/// One record of the sample layout.
#[derive(Debug, Clone, Copy)]
pub struct SampleRecord<'a> {
    /// Up to 5 characters, padded with spaces.
    pub name: &'a str,
    /// Amount in hundredths.
    pub amount: i64,
    pub qty: i64,
    /// `YYYYMMDD`.
    pub born: &'a str,
}

impl SampleRecord<'_> {
    /// Encodes the record in the sample layout.
    pub fn encode(&self, codepage: &CodePage) -> Result<Vec<u8>> {
        let mut bytes = codepage.encode(&format!("{:<5}", self.name))?;
        bytes.extend(packed(self.amount, 3)?);
        bytes.extend(zoned(self.qty, 3)?);
        bytes.extend(codepage.encode(self.born)?);
        ensure!(bytes.len() == SAMPLE_LINE_SIZE, "record {self:?} is {} bytes", bytes.len());
        Ok(bytes)
    }
}

/// Encodes `value` as a packed decimal of `len` bytes.
pub fn packed(value: i64, len: usize) -> Result<Vec<u8>> {
    let digits = format!("{:0width$}", value.unsigned_abs(), width = len * 2 - 1);
    ensure!(digits.len() == len * 2 - 1, "{value} does not fit {len} packed bytes");

    let sign = if value < 0 { 0xD } else { 0xC };
    let nibbles: Vec<u8> =
        digits.bytes().map(|d| d - b'0').chain(std::iter::once(sign)).collect();
    Ok(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

/// Encodes `value` as a zoned decimal of `len` bytes.
pub fn zoned(value: i64, len: usize) -> Result<Vec<u8>> {
    let digits = format!("{:0width$}", value.unsigned_abs(), width = len);
    ensure!(digits.len() == len, "{value} does not fit {len} zoned bytes");

    let mut bytes: Vec<u8> = digits.bytes().map(|d| 0xF0 | (d - b'0')).collect();
    if let Some(last) = bytes.last_mut() {
        *last = (*last & 0x0F) | if value < 0 { 0xD0 } else { 0xC0 };
    }
    Ok(bytes)
}

/// Temporary directory holding the files of one test.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        Ok(Self { dir: tempfile::tempdir().context("create temp dir")? })
    }

    /// Path of a file inside the workspace (not created).
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path(name);
        std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Writes [`SAMPLE_TEMPLATE`] as `layout.json`.
    pub fn sample_template(&self) -> Result<PathBuf> {
        self.write("layout.json", SAMPLE_TEMPLATE)
    }

    /// Encodes `records` back to back into `name`.
    pub fn records(
        &self,
        name: &str,
        codepage: &CodePage,
        records: &[SampleRecord<'_>],
    ) -> Result<PathBuf> {
        let mut bytes = Vec::with_capacity(records.len() * SAMPLE_LINE_SIZE);
        for record in records {
            bytes.extend(record.encode(codepage)?);
        }
        self.write(name, bytes)
    }
}

/// Path as a command-line argument.
///
/// # Panics
///
/// If the path is not UTF-8, which temp dirs never are.
pub fn arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

#[cfg(test)]
mod tests {
    use ebcdic_parser::codepage::CP037;

    use super::*;

    #[test]
    fn packed_and_zoned_encoders() {
        assert_eq!(packed(12345, 3).unwrap(), [0x12, 0x34, 0x5C]);
        assert_eq!(packed(-7, 2).unwrap(), [0x00, 0x7D]);
        assert!(packed(123_456, 3).is_err());
        assert_eq!(zoned(42, 3).unwrap(), [0xF0, 0xF4, 0xC2]);
        assert_eq!(zoned(-5, 2).unwrap(), [0xF0, 0xD5]);
    }

    #[test]
    fn sample_record_is_one_line() {
        let record = SampleRecord { name: "BOB", amount: 100, qty: 1, born: "20000101" };
        assert_eq!(record.encode(&CP037).unwrap().len(), SAMPLE_LINE_SIZE);
    }
}
