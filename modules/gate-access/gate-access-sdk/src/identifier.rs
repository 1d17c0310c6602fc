//! Vehicle identifier (license plate) normalization and validation.
//!
//! The identifier is the join key across every access tier, so the same
//! normalization is applied at every read and write boundary.

use std::fmt;

use thiserror::Error;

/// Minimum identifier length, in characters, after normalization.
pub const MIN_IDENTIFIER_LEN: usize = 5;

/// Maximum identifier length, in characters, after normalization.
pub const MAX_IDENTIFIER_LEN: usize = 20;

/// Reasons an identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error(
        "identifier has {len} characters, expected {MIN_IDENTIFIER_LEN}..={MAX_IDENTIFIER_LEN}"
    )]
    Length { len: usize },

    #[error("identifier contains unsupported character {ch:?}")]
    InvalidCharacter { ch: char },
}

/// Strips all whitespace and uppercases the remaining characters.
///
/// Idempotent: `normalize_identifier(normalize_identifier(x)) == normalize_identifier(x)`.
#[must_use]
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// A normalized, validated vehicle identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleIdentifier(String);

impl VehicleIdentifier {
    /// Normalizes `raw` and validates the result.
    ///
    /// Malformed input is rejected rather than coerced into something storable.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the normalized value is empty, outside
    /// the length bounds, or contains anything but letters and digits.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let normalized = normalize_identifier(raw);
        if normalized.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let len = normalized.chars().count();
        if !(MIN_IDENTIFIER_LEN..=MAX_IDENTIFIER_LEN).contains(&len) {
            return Err(IdentifierError::Length { len });
        }

        if let Some(ch) = normalized.chars().find(|c| !c.is_alphanumeric()) {
            return Err(IdentifierError::InvalidCharacter { ch });
        }

        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VehicleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VehicleIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
