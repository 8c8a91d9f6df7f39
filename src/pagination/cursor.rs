//! Opaque pagination cursors.
//!
//! A cursor is a base64-encoded JSON object `{"offset", "pageSize", "check"}`
//! where `check` is a truncated SHA-256 digest of the other two fields. Clients
//! only ever pass back what a previous response handed out; any cursor that
//! does not decode cleanly is rejected rather than clamped.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::errors::{Result, TypeLensError};

/// Number of hex characters of the digest kept in the `check` field.
const CHECK_LEN: usize = 16;

/// Decoded pagination position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub offset: usize,
    pub page_size: usize,
}

impl Cursor {
    pub fn new(offset: usize, page_size: usize) -> Self {
        Self { offset, page_size }
    }

    /// The position used when a request carries no cursor.
    pub fn first_page(page_size: usize) -> Self {
        Self::new(0, page_size)
    }

    /// The cursor for the page that follows this one.
    pub fn next(&self) -> Self {
        Self::new(self.offset.saturating_add(self.page_size), self.page_size)
    }

    /// Serializes this position into an opaque token.
    pub fn encode(&self) -> String {
        let payload = json!({
            "offset": self.offset,
            "pageSize": self.page_size,
            "check": checksum(self.offset as u64, self.page_size as u64),
        });
        BASE64_STANDARD.encode(payload.to_string())
    }

    /// Decodes a token produced by [`Cursor::encode`].
    ///
    /// `None` and the empty string yield the first page with
    /// `default_page_size`. Every other malformed token is an
    /// [`TypeLensError::InvalidCursor`].
    pub fn decode(token: Option<&str>, default_page_size: usize) -> Result<Self> {
        let token = match token {
            None | Some("") => return Ok(Self::first_page(default_page_size)),
            Some(t) => t,
        };

        let bytes = BASE64_STANDARD
            .decode(token)
            .map_err(|e| invalid(format!("not valid base64 ({e})")))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|_| invalid("payload is not a JSON document"))?;
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("payload is not a JSON object"))?;

        let offset = integer_field(obj, "offset")?;
        let page_size = integer_field(obj, "pageSize")?;
        if offset < 0 {
            return Err(invalid(format!("offset must be non-negative, got {offset}")));
        }
        if page_size <= 0 {
            return Err(invalid(format!("pageSize must be positive, got {page_size}")));
        }
        let offset = to_usize(offset, "offset")?;
        let page_size = to_usize(page_size, "pageSize")?;

        let check = obj
            .get("check")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing field 'check'"))?;
        if check != checksum(offset as u64, page_size as u64) {
            return Err(invalid("checksum mismatch; pass cursors back unmodified"));
        }

        Ok(Self::new(offset, page_size))
    }
}

/// Reads an integer field. Widened to `i128` so the full `u64` range and
/// negative values both survive until validation.
fn integer_field(obj: &Map<String, Value>, name: &str) -> Result<i128> {
    let value = obj
        .get(name)
        .ok_or_else(|| invalid(format!("missing field '{name}'")))?;
    value
        .as_u64()
        .map(i128::from)
        .or_else(|| value.as_i64().map(i128::from))
        .ok_or_else(|| invalid(format!("field '{name}' must be an integer")))
}

fn to_usize(value: i128, name: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| invalid(format!("{name} {value} is out of range")))
}

fn checksum(offset: u64, page_size: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("typelens-cursor:{offset}:{page_size}").as_bytes());
    let hex_str = hex::encode(hasher.finalize());
    hex_str[..CHECK_LEN].to_string()
}

fn invalid(reason: impl Into<String>) -> TypeLensError {
    TypeLensError::InvalidCursor {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forge(payload: Value) -> String {
        BASE64_STANDARD.encode(payload.to_string())
    }

    fn reason(result: Result<Cursor>) -> String {
        match result {
            Err(TypeLensError::InvalidCursor { reason }) => reason,
            other => panic!("expected InvalidCursor, got {other:?}"),
        }
    }

    #[test]
    fn test_roundtrip() {
        for (offset, page_size) in [
            (0, 1),
            (0, 50),
            (49, 50),
            (1_000_000, 3),
            (7, usize::from(u16::MAX)),
            (usize::MAX, usize::MAX),
        ] {
            let cursor = Cursor::new(offset, page_size);
            assert_eq!(Cursor::decode(Some(&cursor.encode()), 10).unwrap(), cursor);
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_roundtrip_above_i64_max() {
        let past_i64 = (i64::MAX as usize) + 1;
        for (offset, page_size) in [(past_i64, 10), (3, past_i64)] {
            let cursor = Cursor::new(offset, page_size);
            assert_eq!(Cursor::decode(Some(&cursor.encode()), 10).unwrap(), cursor);
        }
    }

    #[test]
    fn test_absent_and_empty_use_default() {
        assert_eq!(Cursor::decode(None, 25).unwrap(), Cursor::new(0, 25));
        assert_eq!(Cursor::decode(Some(""), 25).unwrap(), Cursor::new(0, 25));
    }

    #[test]
    fn test_rejects_non_base64() {
        let r = reason(Cursor::decode(Some("%%% not base64 %%%"), 10));
        assert!(r.contains("base64"), "{r}");
    }

    #[test]
    fn test_rejects_non_json_payload() {
        let token = BASE64_STANDARD.encode("hello there");
        let r = reason(Cursor::decode(Some(&token), 10));
        assert!(r.contains("JSON"), "{r}");
    }

    #[test]
    fn test_rejects_wrong_shape() {
        reason(Cursor::decode(Some(&forge(json!([1, 2]))), 10));
        let r = reason(Cursor::decode(Some(&forge(json!({"offset": 1}))), 10));
        assert!(r.contains("pageSize"), "{r}");
        let r = reason(Cursor::decode(
            Some(&forge(json!({"offset": "1", "pageSize": 2}))),
            10,
        ));
        assert!(r.contains("offset"), "{r}");
    }

    #[test]
    fn test_rejects_negative_offset() {
        let r = reason(Cursor::decode(
            Some(&forge(json!({"offset": -1, "pageSize": 10}))),
            10,
        ));
        assert!(r.contains("non-negative"), "{r}");
    }

    #[test]
    fn test_rejects_non_positive_page_size() {
        for size in [0, -5] {
            let r = reason(Cursor::decode(
                Some(&forge(json!({"offset": 0, "pageSize": size}))),
                10,
            ));
            assert!(r.contains("positive"), "{r}");
        }
    }

    #[test]
    fn test_rejects_tampered_cursor() {
        let genuine = Cursor::new(10, 10).encode();
        let bytes = BASE64_STANDARD.decode(&genuine).unwrap();
        let mut payload: Value = serde_json::from_slice(&bytes).unwrap();
        payload["offset"] = json!(20);
        let r = reason(Cursor::decode(Some(&forge(payload)), 10));
        assert!(r.contains("checksum"), "{r}");

        let r = reason(Cursor::decode(
            Some(&forge(json!({"offset": 0, "pageSize": 10}))),
            10,
        ));
        assert!(r.contains("check"), "{r}");
    }

    #[test]
    fn test_next_advances_by_page_size() {
        assert_eq!(Cursor::new(20, 10).next(), Cursor::new(30, 10));
    }
}
