//! Ticker symbol type
//!
//! NASDAQ feeds carry symbols as fixed-width, right-padded ASCII fields.
//! `Symbol` owns the trimmed form and guarantees it is non-empty printable
//! ASCII, so downstream maps can key on it without re-validating.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of a symbol field on the wire.
pub const SYMBOL_WIDTH: usize = 8;

/// Validation failures for wire-format symbol fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol field is all padding")]
    Empty,

    #[error("symbol contains non-printable byte {byte:#04x}")]
    Unprintable { byte: u8 },
}

/// A validated ticker symbol.
///
/// Always non-empty, at most [`SYMBOL_WIDTH`] printable ASCII characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol from a string
    ///
    /// # Panics
    /// Panics if the string is empty, longer than [`SYMBOL_WIDTH`], or
    /// contains non-printable characters.
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(
            !s.is_empty() && s.len() <= SYMBOL_WIDTH && s.bytes().all(|b| b.is_ascii_graphic()),
            "Symbol must be 1..=8 printable ASCII characters"
        );
        Self(s)
    }

    /// Decode a space-padded wire field, stripping trailing padding.
    pub fn from_padded(field: &[u8]) -> Result<Self, SymbolError> {
        let trimmed = match field.iter().rposition(|&b| b != b' ') {
            Some(last) => &field[..=last],
            None => return Err(SymbolError::Empty),
        };
        if let Some(&byte) = trimmed.iter().find(|b| !b.is_ascii_graphic()) {
            return Err(SymbolError::Unprintable { byte });
        }
        Ok(Self(trimmed.iter().map(|&b| b as char).collect()))
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Re-encode as a space-padded wire field.
    pub fn padded(&self) -> [u8; SYMBOL_WIDTH] {
        let mut field = [b' '; SYMBOL_WIDTH];
        field[..self.0.len()].copy_from_slice(self.0.as_bytes());
        field
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}
