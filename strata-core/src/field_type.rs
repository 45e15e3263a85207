//! Field type descriptors
//!
//! A field's shape is fully described by the 4-tuple
//! `(foreign?, object?, array?, concrete)`, persisted as a slash-separated
//! descriptor such as `"array/keyword"` or `"foreign/object"`. Token order
//! is irrelevant on input; the canonical rendering places `foreign` first
//! and omits `empty` positions.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete and structural field type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldType {
    #[default]
    Empty,
    Boolean,
    Integer,
    Positive,
    Floating,
    Date,
    Datetime,
    Time,
    Timedelta,
    Keyword,
    Text,
    String,
    Uuid,
    Geo,
    Script,
    Foreign,
    Object,
    Array,
}

impl FieldType {
    /// Canonical token for this tag.
    ///
    /// Legacy synonyms (`term`, `float`) are accepted on input but never
    /// emitted.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Empty => "empty",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Positive => "positive",
            FieldType::Floating => "floating",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Time => "time",
            FieldType::Timedelta => "timedelta",
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::String => "string",
            FieldType::Uuid => "uuid",
            FieldType::Geo => "geospatial",
            FieldType::Script => "script",
            FieldType::Foreign => "foreign",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    /// Parse a single descriptor token.
    pub fn parse_token(token: &str) -> Option<FieldType> {
        Some(match token {
            "empty" => FieldType::Empty,
            "boolean" => FieldType::Boolean,
            "integer" => FieldType::Integer,
            "positive" => FieldType::Positive,
            "floating" | "float" => FieldType::Floating,
            "date" => FieldType::Date,
            "datetime" => FieldType::Datetime,
            "time" => FieldType::Time,
            "timedelta" => FieldType::Timedelta,
            "keyword" | "term" => FieldType::Keyword,
            "text" => FieldType::Text,
            "string" => FieldType::String,
            "uuid" => FieldType::Uuid,
            "geospatial" | "geo" => FieldType::Geo,
            "script" => FieldType::Script,
            "foreign" => FieldType::Foreign,
            "object" => FieldType::Object,
            "array" => FieldType::Array,
            _ => return None,
        })
    }

    /// Single-byte marker appended to prefixes to disambiguate typed
    /// subspaces of the flat term space.
    pub fn ctype(self) -> u8 {
        match self {
            FieldType::Empty => 0,
            FieldType::Boolean => b'b',
            FieldType::Integer => b'i',
            FieldType::Positive => b'p',
            FieldType::Floating => b'f',
            FieldType::Date => b'd',
            FieldType::Datetime => b'e',
            FieldType::Time => b'h',
            FieldType::Timedelta => b'z',
            FieldType::Keyword => b'k',
            FieldType::Text => b't',
            FieldType::String => b's',
            FieldType::Uuid => b'u',
            FieldType::Geo => b'g',
            FieldType::Script => b'x',
            FieldType::Foreign => b'n',
            FieldType::Object => b'o',
            FieldType::Array => b'a',
        }
    }

    /// True for the numeric family.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Positive | FieldType::Floating
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of the `foreign` position in a [`SepTypes`] tuple.
pub const SEP_FOREIGN: usize = 0;
/// Index of the `object` position.
pub const SEP_OBJECT: usize = 1;
/// Index of the `array` position.
pub const SEP_ARRAY: usize = 2;
/// Index of the concrete position.
pub const SEP_CONCRETE: usize = 3;

/// The `(foreign?, object?, array?, concrete)` shape tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SepTypes(pub [FieldType; 4]);

impl SepTypes {
    /// Shape with only a concrete tag set.
    pub fn concrete(t: FieldType) -> Self {
        SepTypes([FieldType::Empty, FieldType::Empty, FieldType::Empty, t])
    }

    pub fn foreign(&self) -> bool {
        self.0[SEP_FOREIGN] == FieldType::Foreign
    }

    pub fn object(&self) -> bool {
        self.0[SEP_OBJECT] == FieldType::Object
    }

    pub fn array(&self) -> bool {
        self.0[SEP_ARRAY] == FieldType::Array
    }

    /// The concrete tag (possibly `Empty`).
    pub fn concrete_type(&self) -> FieldType {
        self.0[SEP_CONCRETE]
    }

    pub fn set_array(&mut self) {
        self.0[SEP_ARRAY] = FieldType::Array;
    }

    pub fn set_object(&mut self) {
        self.0[SEP_OBJECT] = FieldType::Object;
    }

    pub fn set_concrete(&mut self, t: FieldType) {
        self.0[SEP_CONCRETE] = t;
    }

    /// True when every position is empty.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|t| *t == FieldType::Empty)
    }
}

impl fmt::Display for SepTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_type(self))
    }
}

/// Parse a compound type descriptor.
///
/// Accepts any permutation of `foreign`, `object`, `array` plus at most one
/// concrete tag, separated by `/`. Unknown tokens and repeated concrete
/// tags are client errors, as is `foreign` without `object` or `script`.
pub fn parse_type(s: &str) -> Result<SepTypes> {
    let mut sep = SepTypes::default();
    for token in s.split('/') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match FieldType::parse_token(token) {
            Some(FieldType::Foreign) => sep.0[SEP_FOREIGN] = FieldType::Foreign,
            Some(FieldType::Object) => sep.0[SEP_OBJECT] = FieldType::Object,
            Some(FieldType::Array) => sep.0[SEP_ARRAY] = FieldType::Array,
            Some(FieldType::Empty) => {}
            Some(concrete) => {
                if sep.0[SEP_CONCRETE] != FieldType::Empty && sep.0[SEP_CONCRETE] != concrete {
                    return Err(Error::client(format!(
                        "Invalid type {s:?}: more than one concrete type"
                    )));
                }
                sep.0[SEP_CONCRETE] = concrete;
            }
            None => {
                return Err(Error::client(format!(
                    "Invalid type {s:?}: unknown token {token:?}"
                )));
            }
        }
    }
    if sep.foreign()
        && !sep.object()
        && !matches!(sep.concrete_type(), FieldType::Script | FieldType::Empty)
    {
        return Err(Error::client(format!(
            "Invalid type {s:?}: foreign must be object or script"
        )));
    }
    Ok(sep)
}

/// Serialise a shape tuple back to its canonical descriptor.
///
/// Token order is `foreign/object/array/<concrete>`, omitting empty
/// positions. An all-empty tuple renders as `"empty"`.
pub fn format_type(sep: &SepTypes) -> String {
    let mut out = String::new();
    if sep.foreign() {
        out.push_str("foreign");
    }
    if sep.object() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str("object");
    }
    if sep.array() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str("array");
    }
    let concrete = sep.concrete_type();
    if concrete != FieldType::Empty {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(concrete.as_str());
    }
    if out.is_empty() {
        out.push_str("empty");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical() {
        let sep = parse_type("foreign/object").unwrap();
        assert!(sep.foreign());
        assert!(sep.object());
        assert_eq!(sep.concrete_type(), FieldType::Empty);
    }

    #[test]
    fn parse_any_permutation() {
        let a = parse_type("array/keyword").unwrap();
        let b = parse_type("keyword/array").unwrap();
        assert_eq!(a, b);
        assert_eq!(format_type(&a), "array/keyword");
    }

    #[test]
    fn legacy_synonyms_normalize() {
        assert_eq!(
            parse_type("term").unwrap().concrete_type(),
            FieldType::Keyword
        );
        assert_eq!(
            parse_type("float").unwrap().concrete_type(),
            FieldType::Floating
        );
        assert_eq!(format_type(&parse_type("array/term").unwrap()), "array/keyword");
    }

    #[test]
    fn unknown_token_is_client_error() {
        assert!(matches!(parse_type("whatever"), Err(Error::Client(_))));
    }

    #[test]
    fn foreign_requires_object_or_script() {
        assert!(parse_type("foreign/keyword").is_err());
        assert!(parse_type("foreign/script").is_ok());
        assert!(parse_type("foreign/object").is_ok());
    }

    #[test]
    fn empty_renders_as_empty() {
        assert_eq!(format_type(&SepTypes::default()), "empty");
    }
}
