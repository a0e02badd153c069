//! Byte to Unicode codepage tables.
//!
//! A [`CodePage`] maps each of the 256 source byte values to one Unicode
//! character, or to a multi-character substitution for bytes that have no
//! single-character equivalent. Tables are immutable once built and can be
//! shared freely across threads.
//!
//! Built-in EBCDIC pages are available as [`CP037`], [`CP500`] and [`CP1047`],
//! or at runtime through [`CodePage::by_name`] / [`CodePage::from_ccsid`].
//! Custom tables load from JSON:
//!
//! ```json
//! { "name": "CUSTOM", "table": ["\u0000", "\u0001", "...", "<DEL>"] }
//! ```

mod tables;

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::LazyLock,
};

use serde::Deserialize;

use crate::error::{ConfigError, ParseError, ParseResult};

/// Number of entries in every codepage table.
pub const TABLE_SIZE: usize = 256;

/// CCSID 037 (US/Canada), the default EBCDIC page.
pub static CP037: LazyLock<CodePage> = LazyLock::new(|| CodePage::builtin("CP037", 37, tables::CP037));

/// CCSID 500 (International).
pub static CP500: LazyLock<CodePage> = LazyLock::new(|| CodePage::builtin("CP500", 500, tables::CP500));

/// CCSID 1047 (Open Systems).
pub static CP1047: LazyLock<CodePage> =
    LazyLock::new(|| CodePage::builtin("CP1047", 1047, tables::CP1047));

/// Immutable byte to Unicode mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "CodePageConfig")]
pub struct CodePage {
    name: String,
    ccsid: Option<u16>,
    chars: [char; TABLE_SIZE],
    /// Bytes that decode to more than one character.
    substitutions: HashMap<u8, String>,
    /// Inverse of `chars`, minus substituted bytes.
    reverse: HashMap<char, u8>,
}

impl CodePage {
    /// Builds a table from 256 characters.
    ///
    /// Fails if two bytes map to the same character.
    pub fn new(name: impl Into<String>, chars: [char; TABLE_SIZE]) -> Result<Self, ConfigError> {
        let mut reverse = HashMap::with_capacity(TABLE_SIZE);
        for (byte, &ch) in chars.iter().enumerate() {
            if let Some(previous) = reverse.insert(ch, byte as u8) {
                return Err(ConfigError::InvalidCodePage(format!(
                    "bytes 0x{previous:02X} and 0x{byte:02X} both map to {ch:?}"
                )));
            }
        }
        Ok(Self { name: name.into(), ccsid: None, chars, substitutions: HashMap::new(), reverse })
    }

    fn builtin(name: &str, ccsid: u16, chars: [char; TABLE_SIZE]) -> Self {
        let reverse = chars.iter().enumerate().map(|(byte, &ch)| (ch, byte as u8)).collect();
        Self {
            name: name.to_string(),
            ccsid: Some(ccsid),
            chars,
            substitutions: HashMap::new(),
            reverse,
        }
    }

    /// Replaces the mapping of `byte` with a multi-character substitution.
    ///
    /// The byte no longer takes part in [`encode`](Self::encode).
    pub fn with_substitution(
        mut self,
        byte: u8,
        text: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let text = text.into();
        if text.is_empty() {
            return Err(ConfigError::InvalidCodePage(format!(
                "empty substitution for byte 0x{byte:02X}"
            )));
        }
        let ch = self.chars[byte as usize];
        if self.reverse.get(&ch) == Some(&byte) {
            self.reverse.remove(&ch);
        }
        self.substitutions.insert(byte, text);
        Ok(self)
    }

    /// Looks up a built-in page by name.
    ///
    /// Accepts `CP037`, `037`, `IBM-037`, `IBM037` and `EBCDIC-037` spellings,
    /// case-insensitively.
    pub fn by_name(name: &str) -> Result<&'static CodePage, ConfigError> {
        let upper = name.trim().to_ascii_uppercase();
        let digits = ["CP", "IBM-", "IBM", "EBCDIC-"]
            .iter()
            .find_map(|prefix| upper.strip_prefix(prefix))
            .unwrap_or(&upper);
        digits
            .parse::<u16>()
            .ok()
            .and_then(|ccsid| Self::from_ccsid(ccsid).ok())
            .ok_or_else(|| ConfigError::UnknownCodePage(name.to_string()))
    }

    /// Looks up a built-in page by CCSID.
    pub fn from_ccsid(ccsid: u16) -> Result<&'static CodePage, ConfigError> {
        match ccsid {
            37 => Ok(&CP037),
            500 => Ok(&CP500),
            1047 => Ok(&CP1047),
            other => Err(ConfigError::UnknownCodePage(other.to_string())),
        }
    }

    /// Reads a custom table from JSON.
    pub fn from_reader<R: Read>(reader: R) -> ParseResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads a custom table from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ParseResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn ccsid(&self) -> Option<u16> {
        self.ccsid
    }

    /// Appends the decoded form of `bytes` to `out`.
    pub fn decode_into(&self, bytes: &[u8], out: &mut String) {
        out.reserve(bytes.len());
        for &byte in bytes {
            match self.substitutions.get(&byte) {
                Some(text) => out.push_str(text),
                None => out.push(self.chars[byte as usize]),
            }
        }
    }

    /// Decodes `bytes` into a new string.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        self.decode_into(bytes, &mut out);
        out
    }

    /// Encodes text back into source bytes.
    ///
    /// # Errors
    ///
    /// [`ParseError::Unencodable`] if a character has no single-byte mapping.
    pub fn encode(&self, text: &str) -> ParseResult<Vec<u8>> {
        text.chars()
            .map(|ch| {
                self.reverse.get(&ch).copied().ok_or_else(|| ParseError::Unencodable {
                    ch,
                    codepage: self.name.clone(),
                })
            })
            .collect()
    }
}

/// On-disk shape of a custom table.
#[derive(Debug, Deserialize)]
struct CodePageConfig {
    name: String,
    table: Vec<String>,
}

impl TryFrom<CodePageConfig> for CodePage {
    type Error = ConfigError;

    fn try_from(config: CodePageConfig) -> Result<Self, Self::Error> {
        if config.table.len() != TABLE_SIZE {
            return Err(ConfigError::InvalidCodePage(format!(
                "table has {} entries, expected {TABLE_SIZE}",
                config.table.len()
            )));
        }

        let mut chars = ['\u{FFFD}'; TABLE_SIZE];
        let mut substitutions = Vec::new();
        let mut reverse = HashMap::with_capacity(TABLE_SIZE);

        for (byte, entry) in config.table.into_iter().enumerate() {
            let mut it = entry.chars();
            match (it.next(), it.next()) {
                (None, _) => {
                    return Err(ConfigError::InvalidCodePage(format!(
                        "empty entry for byte 0x{byte:02X}"
                    )));
                }
                (Some(ch), None) => {
                    if let Some(previous) = reverse.insert(ch, byte as u8) {
                        return Err(ConfigError::InvalidCodePage(format!(
                            "bytes 0x{previous:02X} and 0x{byte:02X} both map to {ch:?}"
                        )));
                    }
                    chars[byte] = ch;
                }
                (Some(_), Some(_)) => substitutions.push((byte as u8, entry)),
            }
        }

        Ok(Self {
            name: config.name,
            ccsid: None,
            chars,
            substitutions: substitutions.into_iter().collect(),
            reverse,
        })
    }
}
