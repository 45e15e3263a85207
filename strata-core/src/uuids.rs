//! UUID parsing and representations
//!
//! Field names and values may carry UUIDs in canonical hex form,
//! `urn:uuid:` form, braced form, or the compact form: a `~`-prefixed
//! url-safe base64 encoding of the raw 16 bytes. All of them normalize to
//! the same identifier; the canonical lowercase hex form is what gets
//! stored back into documents.

use crate::error::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

/// Prefix marking the compact representation.
pub const COMPACT_PREFIX: char = '~';

/// Parse any accepted UUID representation.
pub fn parse(s: &str) -> Result<Uuid> {
    try_parse(s).ok_or_else(|| Error::serialisation(format!("Invalid UUID {s:?}")))
}

fn try_parse(s: &str) -> Option<Uuid> {
    if let Some(compact) = s.strip_prefix(COMPACT_PREFIX) {
        let bytes = URL_SAFE_NO_PAD.decode(compact).ok()?;
        let raw: [u8; 16] = bytes.try_into().ok()?;
        return Some(Uuid::from_bytes(raw));
    }
    let inner = s
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| s.strip_prefix("urn:uuid:"))
        .unwrap_or(s);
    // Only the hyphenated canonical layout is accepted, so ordinary
    // 32-character hex words in documents are not mistaken for UUIDs.
    if inner.len() != 36 {
        return None;
    }
    Uuid::try_parse(inner).ok()
}

/// True when the string parses as any UUID representation.
pub fn is_uuid_like(s: &str) -> bool {
    try_parse(s).is_some()
}

/// Canonical lowercase hex form.
pub fn canonical(u: &Uuid) -> String {
    u.hyphenated().to_string()
}

/// Compact `~`-prefixed form.
pub fn compact(u: &Uuid) -> String {
    format!("{COMPACT_PREFIX}{}", URL_SAFE_NO_PAD.encode(u.as_bytes()))
}

/// Normalize any accepted representation to canonical form.
pub fn normalize(s: &str) -> Result<String> {
    parse(s).map(|u| canonical(&u))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "00000000-0000-1000-8000-c97562616c75";

    #[test]
    fn all_forms_normalize() {
        let u = parse(HEX).unwrap();
        for form in [
            HEX.to_string(),
            format!("urn:uuid:{HEX}"),
            format!("{{{HEX}}}"),
            compact(&u),
        ] {
            assert_eq!(normalize(&form).unwrap(), HEX);
        }
    }

    #[test]
    fn compact_roundtrip() {
        let u = Uuid::new_v4();
        assert_eq!(parse(&compact(&u)).unwrap(), u);
    }

    #[test]
    fn non_uuids_rejected() {
        assert!(!is_uuid_like("hello"));
        assert!(!is_uuid_like("00000000000010008000c97562616c75"));
        assert!(!is_uuid_like("~not-base64!"));
    }

    #[test]
    fn uppercase_accepted() {
        assert_eq!(normalize(&HEX.to_uppercase()).unwrap(), HEX);
    }
}
