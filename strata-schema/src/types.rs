//! Small closed enums used by the Specification

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bitset over the four index quadrants.
///
/// Sixteen legal combinations; the symbolic aliases (`field`, `terms`,
/// `values`, `global`, `all`, `none`) are unions of the atomic bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeIndex(u8);

impl TypeIndex {
    pub const NONE: TypeIndex = TypeIndex(0);
    pub const FIELD_TERMS: TypeIndex = TypeIndex(0b0001);
    pub const FIELD_VALUES: TypeIndex = TypeIndex(0b0010);
    pub const FIELD_ALL: TypeIndex = TypeIndex(0b0011);
    pub const GLOBAL_TERMS: TypeIndex = TypeIndex(0b0100);
    pub const TERMS: TypeIndex = TypeIndex(0b0101);
    pub const GLOBAL_VALUES: TypeIndex = TypeIndex(0b1000);
    pub const VALUES: TypeIndex = TypeIndex(0b1010);
    pub const GLOBAL_ALL: TypeIndex = TypeIndex(0b1100);
    pub const ALL: TypeIndex = TypeIndex(0b1111);

    pub fn contains(self, other: TypeIndex) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: TypeIndex) -> TypeIndex {
        TypeIndex(self.0 | other.0)
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    fn parse_token(token: &str) -> Result<TypeIndex> {
        Ok(match token.trim() {
            "none" => TypeIndex::NONE,
            "field_terms" => TypeIndex::FIELD_TERMS,
            "field_values" => TypeIndex::FIELD_VALUES,
            "field" | "field_all" => TypeIndex::FIELD_ALL,
            "global_terms" => TypeIndex::GLOBAL_TERMS,
            "terms" => TypeIndex::TERMS,
            "global_values" => TypeIndex::GLOBAL_VALUES,
            "values" => TypeIndex::VALUES,
            "global" | "global_all" => TypeIndex::GLOBAL_ALL,
            "all" => TypeIndex::ALL,
            other => {
                return Err(Error::client(format!("Invalid index value {other:?}")))
            }
        })
    }

    /// Parse a surface string: one token or a comma-separated union.
    pub fn parse(s: &str) -> Result<TypeIndex> {
        s.split(',')
            .map(TypeIndex::parse_token)
            .try_fold(TypeIndex::NONE, |acc, bit| Ok(acc.union(bit?)))
    }

    /// Canonical surface string for this combination.
    pub fn as_str(self) -> &'static str {
        match self.0 {
            0b0000 => "none",
            0b0001 => "field_terms",
            0b0010 => "field_values",
            0b0011 => "field",
            0b0100 => "global_terms",
            0b0101 => "terms",
            0b0110 => "global_terms,field_values",
            0b0111 => "global_terms,field",
            0b1000 => "global_values",
            0b1001 => "global_values,field_terms",
            0b1010 => "values",
            0b1011 => "global_values,field",
            0b1100 => "global",
            0b1101 => "global,field_terms",
            0b1110 => "global,field_values",
            _ => "all",
        }
    }
}

impl fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field under a UUID-named path derives its term prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UuidFieldIndex {
    /// Only the uuid-derived prefix.
    Uuid,
    /// Only the field-name prefix.
    UuidField,
    /// Both streams in parallel.
    #[default]
    Both,
}

impl UuidFieldIndex {
    pub fn parse(s: &str) -> Result<UuidFieldIndex> {
        Ok(match s {
            "uuid" => UuidFieldIndex::Uuid,
            "uuid_field" => UuidFieldIndex::UuidField,
            "both" => UuidFieldIndex::Both,
            other => {
                return Err(Error::client(format!(
                    "Invalid index_uuid_field value {other:?}"
                )))
            }
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UuidFieldIndex::Uuid => "uuid",
            UuidFieldIndex::UuidField => "uuid_field",
            UuidFieldIndex::Both => "both",
        }
    }
}

impl fmt::Display for UuidFieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stop-word handling for text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopStrategy {
    None,
    #[default]
    All,
    Stemmed,
}

impl StopStrategy {
    pub fn parse(s: &str) -> Result<StopStrategy> {
        Ok(match s {
            "none" | "stop_none" => StopStrategy::None,
            "all" | "stop_all" => StopStrategy::All,
            "stemmed" | "stop_stemmed" => StopStrategy::Stemmed,
            other => {
                return Err(Error::client(format!(
                    "Invalid stop_strategy value {other:?}"
                )))
            }
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StopStrategy::None => "none",
            StopStrategy::All => "all",
            StopStrategy::Stemmed => "stemmed",
        }
    }
}

impl fmt::Display for StopStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stemming policy for text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StemStrategy {
    None,
    #[default]
    Some,
    All,
    AllZ,
}

impl StemStrategy {
    pub fn parse(s: &str) -> Result<StemStrategy> {
        Ok(match s {
            "none" | "stem_none" => StemStrategy::None,
            "some" | "stem_some" => StemStrategy::Some,
            "all" | "stem_all" => StemStrategy::All,
            "all_z" | "stem_all_z" => StemStrategy::AllZ,
            other => {
                return Err(Error::client(format!(
                    "Invalid stem_strategy value {other:?}"
                )))
            }
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StemStrategy::None => "none",
            StemStrategy::Some => "some",
            StemStrategy::All => "all",
            StemStrategy::AllZ => "all_z",
        }
    }
}

impl fmt::Display for StemStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_aliases() {
        assert_eq!(TypeIndex::parse("field").unwrap(), TypeIndex::FIELD_ALL);
        assert_eq!(TypeIndex::parse("field_all").unwrap(), TypeIndex::FIELD_ALL);
        assert_eq!(TypeIndex::parse("all").unwrap(), TypeIndex::ALL);
        assert_eq!(
            TypeIndex::parse("global_terms,field_values").unwrap(),
            TypeIndex::GLOBAL_TERMS.union(TypeIndex::FIELD_VALUES)
        );
        assert_eq!(
            TypeIndex::parse("field_values,global_terms").unwrap(),
            TypeIndex::parse("global_terms,field_values").unwrap()
        );
    }

    #[test]
    fn sixteen_canonical_strings() {
        for bits in 0..16u8 {
            let index = TypeIndex(bits);
            assert_eq!(TypeIndex::parse(index.as_str()).unwrap(), index);
        }
    }

    #[test]
    fn invalid_index_rejected() {
        assert!(TypeIndex::parse("everything").is_err());
    }

    #[test]
    fn uuid_field_index() {
        assert_eq!(
            UuidFieldIndex::parse("both").unwrap(),
            UuidFieldIndex::Both
        );
        assert!(UuidFieldIndex::parse("neither").is_err());
    }
}
