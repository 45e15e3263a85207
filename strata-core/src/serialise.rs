//! Canonical byte encodings for leaf values
//!
//! Every concrete field type has exactly one on-disk representation. The
//! numeric encodings are fixed-width big-endian with an order-preserving
//! bias so byte order equals value order, which is what range queries over
//! value slots rely on.

use crate::error::{Error, Result};
use crate::field_type::FieldType;
use crate::temporal;
use crate::uuids;
use serde_json::Value;

/// Serialise an unsigned integer.
pub fn positive(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Serialise a signed integer. The sign bit is flipped so negative values
/// sort before positive ones bytewise.
pub fn integer(value: i64) -> Vec<u8> {
    ((value as u64) ^ (1 << 63)).to_be_bytes().to_vec()
}

/// Serialise a float. Negative values have all bits flipped, positive
/// values only the sign bit, preserving IEEE-754 total order.
pub fn floating(value: f64) -> Vec<u8> {
    let bits = value.to_bits();
    let biased = if bits & (1 << 63) != 0 {
        !bits
    } else {
        bits ^ (1 << 63)
    };
    biased.to_be_bytes().to_vec()
}

/// Serialise an epoch timestamp (same encoding as floats).
pub fn timestamp(epoch: f64) -> Vec<u8> {
    floating(epoch)
}

/// Serialise a boolean as a single byte.
pub fn boolean(value: bool) -> Vec<u8> {
    vec![if value { b't' } else { b'f' }]
}

/// Serialise a keyword. Lowercased unless the field is a boolean term,
/// which must match exactly.
pub fn keyword(value: &str, bool_term: bool) -> Vec<u8> {
    if bool_term {
        value.as_bytes().to_vec()
    } else {
        value.to_lowercase().into_bytes()
    }
}

/// Serialise free text (UTF-8 bytes, case preserved; the term generator
/// handles folding).
pub fn text(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// Reverse of [`positive`].
pub fn unserialise_positive(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::serialisation("Invalid positive serialisation"))?;
    Ok(u64::from_be_bytes(arr))
}

/// Reverse of [`integer`].
pub fn unserialise_integer(bytes: &[u8]) -> Result<i64> {
    Ok((unserialise_positive(bytes)? ^ (1 << 63)) as i64)
}

/// Reverse of [`floating`].
pub fn unserialise_floating(bytes: &[u8]) -> Result<f64> {
    let biased = unserialise_positive(bytes)?;
    let bits = if biased & (1 << 63) != 0 {
        biased ^ (1 << 63)
    } else {
        !biased
    };
    Ok(f64::from_bits(bits))
}

/// Serialise a leaf for its concrete type.
///
/// Shape conversions are strict: a declared integer rejects `"12"`, but
/// numeric widening inside the family (u64 → i64 when it fits, integer →
/// floating) is allowed.
pub fn serialise_for(t: FieldType, value: &Value) -> Result<Vec<u8>> {
    match t {
        FieldType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .map(integer)
                .ok_or_else(|| Error::serialisation(format!("{n} is not an integer"))),
            other => Err(type_mismatch(t, other)),
        },
        FieldType::Positive => match value {
            Value::Number(n) => n
                .as_u64()
                .map(positive)
                .ok_or_else(|| Error::serialisation(format!("{n} is not a positive integer"))),
            other => Err(type_mismatch(t, other)),
        },
        FieldType::Floating => match value {
            Value::Number(n) => n
                .as_f64()
                .map(floating)
                .ok_or_else(|| Error::serialisation(format!("{n} is not a float"))),
            other => Err(type_mismatch(t, other)),
        },
        FieldType::Boolean => match value {
            Value::Bool(b) => Ok(boolean(*b)),
            Value::String(s) => match s.as_str() {
                "true" | "t" | "1" => Ok(boolean(true)),
                "false" | "f" | "0" | "" => Ok(boolean(false)),
                _ => Err(Error::serialisation(format!("{s:?} is not a boolean"))),
            },
            other => Err(type_mismatch(t, other)),
        },
        FieldType::Date => temporal::parse_date(value).and_then(|tm| Ok(timestamp(tm.timestamp()?))),
        FieldType::Datetime => {
            temporal::parse_datetime(value).and_then(|tm| Ok(timestamp(tm.timestamp()?)))
        }
        FieldType::Time => temporal::parse_time(value).map(floating),
        FieldType::Timedelta => temporal::parse_timedelta(value).map(floating),
        FieldType::Uuid => match value {
            Value::String(s) => uuids::parse(s).map(|u| u.as_bytes().to_vec()),
            other => Err(type_mismatch(t, other)),
        },
        FieldType::Keyword | FieldType::String => match value {
            Value::String(s) => Ok(keyword(s, false)),
            other => Err(type_mismatch(t, other)),
        },
        FieldType::Text => match value {
            Value::String(s) => Ok(text(s)),
            other => Err(type_mismatch(t, other)),
        },
        _ => Err(Error::serialisation(format!(
            "Type {t} has no leaf serialisation"
        ))),
    }
}

fn type_mismatch(t: FieldType, value: &Value) -> Error {
    Error::serialisation(format!("Cannot serialise {value} as {t}"))
}

/// Auto-detection when a field has no declared type: map the value's shape
/// (and for strings, its lexical form) to a concrete type plus its
/// serialisation. Consumers with detection toggles filter the string
/// branches before calling this.
pub fn guess(value: &Value) -> Result<(FieldType, Vec<u8>)> {
    let t = guess_type(value)?;
    Ok((t, serialise_for(t, value)?))
}

/// The type [`guess`] would pick, without serialising.
pub fn guess_type(value: &Value) -> Result<FieldType> {
    Ok(match value {
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(n) => {
            if n.is_u64() {
                FieldType::Positive
            } else if n.is_i64() {
                FieldType::Integer
            } else {
                FieldType::Floating
            }
        }
        Value::String(s) => {
            if uuids::is_uuid_like(s) {
                FieldType::Uuid
            } else if temporal::looks_like_datetime(s) {
                FieldType::Datetime
            } else if temporal::looks_like_date(s) {
                FieldType::Date
            } else if temporal::looks_like_time(s) {
                FieldType::Time
            } else if temporal::looks_like_timedelta(s) {
                FieldType::Timedelta
            } else if s == "true" || s == "false" {
                FieldType::Boolean
            } else {
                FieldType::Text
            }
        }
        other => {
            return Err(Error::serialisation(format!(
                "Cannot guess the type of {other}"
            )))
        }
    })
}

// ---------------------------------------------------------------------------
// String lists
// ---------------------------------------------------------------------------

/// Join serialised values into a single slot payload.
///
/// A single element is stored raw; multiple elements are length-prefixed
/// (LEB128) so heterogeneous lengths unserialise unambiguously. The
/// leading 0xFF marker byte cannot start a raw element of any leaf
/// encoding in this module.
pub fn serialise_string_list<I, B>(elements: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let elements: Vec<B> = elements.into_iter().collect();
    if elements.len() == 1 {
        return elements[0].as_ref().to_vec();
    }
    let mut out = vec![0xFF];
    for el in &elements {
        let el = el.as_ref();
        let mut len = el.len() as u64;
        loop {
            let byte = (len & 0x7F) as u8;
            len >>= 7;
            if len == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
        out.extend_from_slice(el);
    }
    out
}

/// Reverse of [`serialise_string_list`].
pub fn unserialise_string_list(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    if bytes.first() != Some(&0xFF) {
        return Ok(vec![bytes.to_vec()]);
    }
    let mut out = Vec::new();
    let mut pos = 1;
    while pos < bytes.len() {
        let mut len: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *bytes
                .get(pos)
                .ok_or_else(|| Error::serialisation("Truncated string list"))?;
            pos += 1;
            len |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let end = pos + len as usize;
        if end > bytes.len() {
            return Err(Error::serialisation("Truncated string list"));
        }
        out.push(bytes[pos..end].to_vec());
        pos = end;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// 32-bit FNV-1a, used for prefix and slot derivation.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// 64-bit FNV-1a, used for shard routing of id terms.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_order_preserving() {
        let values = [i64::MIN, -1000, -1, 0, 1, 1000, i64::MAX];
        let encoded: Vec<_> = values.iter().map(|v| integer(*v)).collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);
        for v in values {
            assert_eq!(unserialise_integer(&integer(v)).unwrap(), v);
        }
    }

    #[test]
    fn floating_order_preserving() {
        let values = [f64::NEG_INFINITY, -1.5, -0.0, 0.0, 0.25, 3.5, f64::INFINITY];
        let encoded: Vec<_> = values.iter().map(|v| floating(*v)).collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);
        assert_eq!(unserialise_floating(&floating(-1.5)).unwrap(), -1.5);
    }

    #[test]
    fn keyword_folding() {
        assert_eq!(keyword("Hello", false), b"hello".to_vec());
        assert_eq!(keyword("Hello", true), b"Hello".to_vec());
    }

    #[test]
    fn string_list_roundtrip() {
        let items: Vec<Vec<u8>> = vec![b"one".to_vec(), b"two".to_vec(), vec![0u8; 200]];
        let joined = serialise_string_list(&items);
        assert_eq!(unserialise_string_list(&joined).unwrap(), items);

        let single = serialise_string_list([b"only".to_vec()]);
        assert_eq!(single, b"only".to_vec());
        assert_eq!(
            unserialise_string_list(&single).unwrap(),
            vec![b"only".to_vec()]
        );
    }

    #[test]
    fn guess_shapes() {
        assert_eq!(
            guess_type(&serde_json::json!(12)).unwrap(),
            FieldType::Positive
        );
        assert_eq!(
            guess_type(&serde_json::json!(-12)).unwrap(),
            FieldType::Integer
        );
        assert_eq!(
            guess_type(&serde_json::json!(1.5)).unwrap(),
            FieldType::Floating
        );
        assert_eq!(
            guess_type(&serde_json::json!(true)).unwrap(),
            FieldType::Boolean
        );
        assert_eq!(
            guess_type(&serde_json::json!("2015-01-01")).unwrap(),
            FieldType::Date
        );
        assert_eq!(
            guess_type(&serde_json::json!("true")).unwrap(),
            FieldType::Boolean
        );
        assert_eq!(
            guess_type(&serde_json::json!("plain words")).unwrap(),
            FieldType::Text
        );
    }
}
