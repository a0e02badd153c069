//! Zoned, packed and binary numeric decoding.
//!
//! # Sign nibbles
//!
//! Zoned fields carry the sign in the high nibble of the last byte, packed
//! fields in the low nibble of the last byte:
//!
//! | Nibble | Meaning |
//! |---|---|
//! | `0xC`, `0xA`, `0xE` | positive |
//! | `0xF` | unsigned (positive) |
//! | `0xD`, `0xB` | negative |
//! | `0x0`-`0x9` | rejected |
//!
//! Example: +12345 in PIC S9(5) COMP-3 is `0x12 0x34 0x5C`; in PIC S9(5)
//! DISPLAY it is `0xF1 0xF2 0xF3 0xF4 0xC5`.

use rust_decimal::Decimal;

use crate::error::{FieldDecodeError, NibbleRole};

/// Returns `true` for a negative sign nibble.
fn sign_is_negative(nibble: u8, position: usize) -> Result<bool, FieldDecodeError> {
    match nibble {
        0xB | 0xD => Ok(true),
        0xA | 0xC | 0xE | 0xF => Ok(false),
        _ => Err(FieldDecodeError::InvalidDigit { position, nibble, role: NibbleRole::Sign }),
    }
}

fn digit(nibble: u8, position: usize) -> Result<i128, FieldDecodeError> {
    if nibble > 9 {
        return Err(FieldDecodeError::InvalidDigit { position, nibble, role: NibbleRole::Digit });
    }
    Ok(i128::from(nibble))
}

fn to_decimal(
    magnitude: i128,
    negative: bool,
    scale: u32,
    digits: usize,
) -> Result<Decimal, FieldDecodeError> {
    let value = if negative { -magnitude } else { magnitude };
    Decimal::try_from_i128_with_scale(value, scale)
        .map_err(|_| FieldDecodeError::Overflow { digits, scale })
}

/// Decodes a zoned decimal: low nibbles are digits, the last high nibble is the sign.
///
/// Zone nibbles of the other bytes are not checked.
pub fn decode_zoned(bytes: &[u8], scale: u32) -> Result<Decimal, FieldDecodeError> {
    let Some((&last, _)) = bytes.split_last() else {
        return Ok(Decimal::ZERO);
    };

    let mut magnitude = 0i128;
    for (position, &byte) in bytes.iter().enumerate() {
        magnitude = magnitude * 10 + digit(byte & 0x0F, position)?;
    }
    let negative = sign_is_negative(last >> 4, bytes.len() - 1)?;

    to_decimal(magnitude, negative, scale, bytes.len())
}

/// Decodes a packed decimal: every nibble is a digit except the last, which is the sign.
pub fn decode_packed(bytes: &[u8], scale: u32) -> Result<Decimal, FieldDecodeError> {
    let Some((&last, head)) = bytes.split_last() else {
        return Ok(Decimal::ZERO);
    };

    let mut magnitude = 0i128;
    for (position, &byte) in head.iter().enumerate() {
        magnitude = magnitude * 10 + digit(byte >> 4, position)?;
        magnitude = magnitude * 10 + digit(byte & 0x0F, position)?;
    }
    let position = head.len();
    magnitude = magnitude * 10 + digit(last >> 4, position)?;
    let negative = sign_is_negative(last & 0x0F, position)?;

    to_decimal(magnitude, negative, scale, bytes.len() * 2 - 1)
}

/// Decodes a big-endian integer of up to 8 bytes.
///
/// Signed fields use two's complement.
pub fn decode_binary(bytes: &[u8], signed: bool, scale: u32) -> Result<Decimal, FieldDecodeError> {
    let raw = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    let negative = signed && bytes.first().is_some_and(|&b| b & 0x80 != 0);
    let value = if negative {
        i128::from(raw) - (1i128 << (8 * bytes.len()))
    } else {
        i128::from(raw)
    };

    let digits = value.unsigned_abs().to_string().len();
    to_decimal(value.abs(), value < 0, scale, digits)
}
