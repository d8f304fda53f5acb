//! Identifier types for keyshop.
//!
//! This module provides strongly-typed identifiers for users, products, durations,
//! and transactions.
//!
//! # Macro-based Name Types
//!
//! The `name_id_type!` macro reduces boilerplate for string-backed identifier types,
//! ensuring consistent validation, serialization, parsing, and display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Maximum length of a name-based identifier, in bytes.
pub const MAX_NAME_BYTES: usize = 128;

/// Macro to define a string-backed identifier type with standard trait implementations.
///
/// Values are trimmed on construction and must be non-empty, at most
/// [`MAX_NAME_BYTES`] long, and free of control characters.
///
/// This macro generates a newtype wrapper around `String` with implementations for:
/// - `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - `Serialize`, `Deserialize` (as string, validated)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `TryFrom<&str>`, `Into<String>`
/// - `AsRef<str>`
///
/// # Example
///
/// ```ignore
/// name_id_type!(MyName, "A custom name type.");
/// let name: MyName = "alpha".parse().unwrap();
/// assert_eq!(name.as_str(), "alpha");
/// ```
macro_rules! name_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier, validating the input.
            ///
            /// # Errors
            ///
            /// Returns an error if the value is empty, too long, or contains
            /// control characters.
            pub fn new(value: impl AsRef<str>) -> Result<Self, IdError> {
                validate_name(value.as_ref()).map(Self)
            }

            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the UTF-8 bytes of the identifier.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

name_id_type!(UserId, "An opaque user identifier.\n\nUser IDs come from the calling chat platform and are never interpreted.");
name_id_type!(ProductName, "The name of a sellable product (e.g. `\"Vanguard\"`).");
name_id_type!(Duration, "A license duration label for a product (e.g. `\"1Day\"`, `\"1Month\"`).");

fn validate_name(raw: &str) -> Result<String, IdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty);
    }
    if trimmed.len() > MAX_NAME_BYTES {
        return Err(IdError::TooLong {
            len: trimmed.len(),
            max: MAX_NAME_BYTES,
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(IdError::ControlCharacter);
    }
    Ok(trimmed.to_string())
}

/// A transaction identifier using ULID for time-ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(Ulid);

impl TransactionId {
    /// Create a new `TransactionId` from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Generate a new `TransactionId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Return the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> &Ulid {
        &self.0
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create a `TransactionId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for TransactionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is empty or whitespace only.
    #[error("identifier must not be empty")]
    Empty,

    /// The input exceeds the maximum length.
    #[error("identifier too long: {len} bytes (max {max})")]
    TooLong {
        /// Length of the trimmed input.
        len: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// The input contains a control character.
    #[error("identifier contains a control character")]
    ControlCharacter,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        let product = ProductName::new("  Vanguard ").unwrap();
        assert_eq!(product.as_str(), "Vanguard");
        assert_eq!(product.to_string(), "Vanguard");
    }

    #[test]
    fn empty_names_rejected() {
        assert_eq!(UserId::new("   "), Err(IdError::Empty));
        assert_eq!(Duration::from_str(""), Err(IdError::Empty));
    }

    #[test]
    fn long_names_rejected() {
        let long = "x".repeat(MAX_NAME_BYTES + 1);
        assert!(matches!(
            ProductName::new(&long),
            Err(IdError::TooLong { max: MAX_NAME_BYTES, .. })
        ));
        assert!(ProductName::new("x".repeat(MAX_NAME_BYTES)).is_ok());
    }

    #[test]
    fn control_characters_rejected() {
        assert_eq!(UserId::new("a\nb"), Err(IdError::ControlCharacter));
    }

    #[test]
    fn user_id_serde_json() {
        let id = UserId::new("284192771022").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"284192771022\"");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn invalid_name_fails_deserialization() {
        let result: Result<Duration, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }

    #[test]
    fn transaction_id_roundtrip() {
        let id = TransactionId::generate();
        let parsed = TransactionId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(TransactionId::from_bytes(id.to_bytes()), id);
    }

    #[test]
    fn transaction_id_rejects_garbage() {
        assert_eq!(
            TransactionId::from_str("not-a-ulid"),
            Err(IdError::InvalidUlid)
        );
    }
}
