//! Validated identifiers
//!
//! Identifiers name modules, structs, fields and functions. A valid
//! identifier starts with an ASCII letter or `_`, continues with ASCII
//! alphanumerics or `_`, and is not the single character `_`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned for text that is not a valid identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid identifier {0:?}")]
pub struct InvalidIdentifier(pub String);

/// Check text against the identifier grammar
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        Some('_') if s.len() > 1 => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// An identifier that satisfies the identifier grammar
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap `s`
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidIdentifier> {
        let s = s.into();
        if is_valid_identifier(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidIdentifier(s))
        }
    }

    /// The identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = InvalidIdentifier;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Identifier> for String {
    fn from(ident: Identifier) -> Self {
        ident.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["Stats", "pokemon_v1", "_private", "a", "A1_b2", "__"] {
            assert!(is_valid_identifier(name), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for name in ["", "_", "123123PokeStats", "\\aaa", "+say_hello", "has space", "é"] {
            assert!(!is_valid_identifier(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn test_new_rejects_invalid() {
        assert_eq!(
            Identifier::new("9lives"),
            Err(InvalidIdentifier("9lives".to_string()))
        );
        assert_eq!(Identifier::new("capymon").unwrap().as_str(), "capymon");
    }

    #[test]
    fn test_serde_revalidates() {
        let ident: Identifier = serde_json::from_str("\"PokeStats\"").unwrap();
        assert_eq!(ident.as_str(), "PokeStats");
        assert_eq!(serde_json::to_string(&ident).unwrap(), "\"PokeStats\"");

        assert!(serde_json::from_str::<Identifier>("\"+bad\"").is_err());
    }
}
