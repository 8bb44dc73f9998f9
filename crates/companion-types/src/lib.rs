//! Validated primitives shared across the companion workspace.
//!
//! Upstream systems identify most things with positive integers, and the same integer can mean a
//! consent definition, a category, or a care request depending on the field it came from. Each of
//! those gets its own newtype here so the compiler keeps them apart.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when constructing validated primitives.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,

    /// The input was not a valid numeric identifier
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The input was not a two-letter US state code
    #[error("invalid state code: {0}")]
    InvalidStateCode(String),
}

/// Result type for primitive construction.
pub type TypesResult<T> = Result<T, TypesError>;

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, rejecting empty or whitespace-only input.
    pub fn new(input: impl AsRef<str>) -> TypesResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Two-letter, upper-case US state code (for example `CO`).
///
/// Lower-case input is accepted and normalised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateCode(String);

impl StateCode {
    pub fn parse(input: &str) -> TypesResult<Self> {
        let trimmed = input.trim();
        if trimmed.len() != 2 || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(TypesError::InvalidStateCode(input.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StateCode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for StateCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StateCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StateCode::parse(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name)
                    .map_err(|_| TypesError::InvalidId(s.to_owned()))
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                $name(value)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a consent definition (one signable document version).
    DefinitionId
);
numeric_id!(
    /// Identifier of a consent category such as "Consent to Treat".
    CategoryId
);
numeric_id!(ServiceLineId);
numeric_id!(LanguageId);
numeric_id!(
    /// Identifier of a signer kind (patient, guardian, ...), as configured upstream.
    SignerId
);
numeric_id!(
    /// Dashboard care request id. Also used as the episode and visit id for captures.
    CareRequestId
);
numeric_id!(PatientId);
numeric_id!(TaskId);
numeric_id!(CaptureId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  Consent  ").unwrap().as_str(), "Consent");
        assert_eq!(NonEmptyText::new("   "), Err(TypesError::Empty));
    }

    #[test]
    fn state_code_normalises_case() {
        assert_eq!(StateCode::parse("co").unwrap().as_str(), "CO");
        assert!(StateCode::parse("COL").is_err());
        assert!(StateCode::parse("C1").is_err());
    }

    #[test]
    fn numeric_ids_parse_from_strings() {
        assert_eq!("42".parse::<DefinitionId>().unwrap(), DefinitionId(42));
        assert_eq!(
            "abc".parse::<SignerId>(),
            Err(TypesError::InvalidId("abc".into()))
        );
    }

    #[test]
    fn numeric_ids_serialise_as_plain_numbers() {
        let json = serde_json::to_string(&vec![DefinitionId(10), DefinitionId(11)]).unwrap();
        assert_eq!(json, "[10,11]");
    }

    #[test]
    fn state_code_deserialise_rejects_invalid() {
        let err = serde_json::from_str::<StateCode>("\"Colorado\"");
        assert!(err.is_err());
    }
}
