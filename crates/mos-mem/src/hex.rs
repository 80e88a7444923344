//! Conversions between bytes and their external two-hex-digit text form.
//!
//! Program images and memory dumps use uppercase two-character tokens (`"A9"`, `"00"`). The
//! machine itself only ever stores `u8`.

use std::fmt::Write;

use crate::HexError;

/// Parses one token of exactly two hexadecimal digits (case-insensitive).
pub fn parse_byte(token: &str) -> Result<u8, HexError> {
    let valid = token.len() == 2 && token.bytes().all(|b| b.is_ascii_hexdigit());
    if !valid {
        return Err(HexError::InvalidByte(token.to_string()));
    }
    u8::from_str_radix(token, 16).map_err(|_| HexError::InvalidByte(token.to_string()))
}

/// Formats `value` as two uppercase hex digits.
pub fn format_byte(value: u8) -> String {
    format!("{value:02X}")
}

/// Parses whitespace-separated tokens into bytes, stopping at the first invalid token.
pub fn parse_bytes<'a, I>(tokens: I) -> Result<Vec<u8>, HexError>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse_byte)
        .collect()
}

/// Formats `bytes` as space-separated uppercase tokens.
pub fn format_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02X}");
    }
    out
}
