//! Field descriptors: one column of a fixed-width record.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest number of decimal digits a numeric field may carry.
pub const MAX_DIGITS: usize = 28;

/// Largest binary integer field, in bytes.
pub const MAX_BINARY_LENGTH: usize = 8;

/// Which pad characters are stripped from decoded text.
///
/// Only decoded spaces are removed, and only when a policy other than
/// [`TrimPolicy::None`] is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimPolicy {
    #[default]
    None,
    Start,
    End,
    Both,
}

impl TrimPolicy {
    #[must_use]
    pub fn apply<'a>(&self, text: &'a str) -> &'a str {
        match self {
            Self::None => text,
            Self::Start => text.trim_start_matches(' '),
            Self::End => text.trim_end_matches(' '),
            Self::Both => text.trim_matches(' '),
        }
    }
}

/// Semantic type of a field together with its decode parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Codepage-mapped text.
    Text {
        #[serde(default)]
        trim: TrimPolicy,
    },
    /// Zoned decimal (DISPLAY): one digit per byte, sign in the last zone nibble.
    Zoned {
        #[serde(default)]
        scale: u32,
    },
    /// Packed decimal (COMP-3): two digits per byte, sign in the last nibble.
    Packed {
        #[serde(default)]
        scale: u32,
    },
    /// Big-endian binary integer (COMP/COMP-4).
    Binary {
        #[serde(default = "default_signed")]
        signed: bool,
        #[serde(default)]
        scale: u32,
    },
    /// Text parsed against a `strftime`-style pattern.
    Date {
        pattern: String,
        #[serde(default)]
        allow_blank: bool,
    },
}

fn default_signed() -> bool {
    true
}

impl FieldType {
    /// Short lowercase name, as used in template files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Zoned { .. } => "zoned",
            Self::Packed { .. } => "packed",
            Self::Binary { .. } => "binary",
            Self::Date { .. } => "date",
        }
    }
}

/// One column of a record: byte range plus decode rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub offset: usize,
    pub length: usize,
    #[serde(flatten)]
    pub kind: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, offset: usize, length: usize, kind: FieldType) -> Self {
        Self { name: name.into(), offset, length, kind }
    }

    /// Untrimmed text field.
    pub fn text(name: impl Into<String>, offset: usize, length: usize) -> Self {
        Self::new(name, offset, length, FieldType::Text { trim: TrimPolicy::None })
    }

    pub fn zoned(name: impl Into<String>, offset: usize, length: usize, scale: u32) -> Self {
        Self::new(name, offset, length, FieldType::Zoned { scale })
    }

    pub fn packed(name: impl Into<String>, offset: usize, length: usize, scale: u32) -> Self {
        Self::new(name, offset, length, FieldType::Packed { scale })
    }

    pub fn binary(name: impl Into<String>, offset: usize, length: usize, signed: bool) -> Self {
        Self::new(name, offset, length, FieldType::Binary { signed, scale: 0 })
    }

    pub fn date(
        name: impl Into<String>,
        offset: usize,
        length: usize,
        pattern: impl Into<String>,
    ) -> Self {
        Self::new(name, offset, length, FieldType::Date { pattern: pattern.into(), allow_blank: false })
    }

    /// Sets the trim policy of a text field; other types are left as they are.
    #[must_use]
    pub fn with_trim(mut self, policy: TrimPolicy) -> Self {
        if let FieldType::Text { trim } = &mut self.kind {
            *trim = policy;
        }
        self
    }

    /// First byte past the field, or `None` on overflow.
    #[must_use]
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.length)
    }

    /// Checks the type-specific constraints that do not depend on the line size.
    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        if self.length == 0 {
            return Err(ConfigError::ZeroLength(self.name.clone()));
        }

        let invalid = |reason: String| ConfigError::InvalidField { field: self.name.clone(), reason };

        match &self.kind {
            FieldType::Text { .. } => Ok(()),
            FieldType::Zoned { scale } => check_digits(self.length, *scale).map_err(invalid),
            FieldType::Packed { scale } => match self.length.checked_mul(2) {
                Some(nibbles) => check_digits(nibbles - 1, *scale).map_err(invalid),
                None => Err(invalid(format!("packed length {} is too large", self.length))),
            },
            FieldType::Binary { scale, .. } => {
                if self.length > MAX_BINARY_LENGTH {
                    return Err(invalid(format!(
                        "binary length {} exceeds {MAX_BINARY_LENGTH} bytes",
                        self.length
                    )));
                }
                if *scale as usize > MAX_DIGITS {
                    return Err(invalid(format!("scale {scale} exceeds {MAX_DIGITS}")));
                }
                Ok(())
            }
            FieldType::Date { pattern, .. } => {
                if pattern.trim().is_empty() {
                    return Err(invalid("date pattern is empty".to_string()));
                }
                Ok(())
            }
        }
    }
}

fn check_digits(digits: usize, scale: u32) -> Result<(), String> {
    if digits > MAX_DIGITS {
        return Err(format!("{digits} digits exceed the maximum of {MAX_DIGITS}"));
    }
    if scale as usize > digits {
        return Err(format!("scale {scale} exceeds {digits} digit(s)"));
    }
    Ok(())
}
