// src/utils/serialization.rs
//! Serialization utilities for compact token segments.
//!
//! Provides:
//! - Unpadded base64url encoding of raw bytes
//! - JSON values encoded as base64url segments and back

use serde::{de::DeserializeOwned, Serialize};

/// Encodes raw bytes as unpadded base64url.
pub fn encode_segment(bytes: &[u8]) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Decodes an unpadded base64url segment.
///
/// # Returns
/// - `Ok(Vec<u8>)` with the raw bytes on success
/// - `Err(String)` describing the decoding failure
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, String> {
    base64::decode_config(segment, base64::URL_SAFE_NO_PAD)
        .map_err(|e| format!("Base64 decoding failed: {}", e))
}

/// Serializes a value to JSON, then to a base64url segment.
pub fn serialize_segment<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_vec(data).map(|json| encode_segment(&json))
}

/// Decodes a base64url segment and deserializes the JSON inside it.
///
/// # Errors
/// Fails if the segment is not valid base64url or the decoded bytes are not
/// JSON of the expected shape.
pub fn deserialize_segment<T: DeserializeOwned>(segment: &str) -> Result<T, String> {
    let bytes = decode_segment(segment)?;
    serde_json::from_slice(&bytes).map_err(|e| format!("Deserialization failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_segments_are_url_safe_and_unpadded() {
        let encoded = encode_segment(&[0xfb, 0xff, 0xfe]);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));
    }

    #[test]
    fn test_non_json_segment_is_rejected() {
        let segment = encode_segment(b"not json");
        assert!(deserialize_segment::<Value>(&segment).is_err());
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        assert!(deserialize_segment::<Value>("***").is_err());
    }

    #[test]
    fn test_json_segment_decodes() {
        let segment = serialize_segment(&json!({"alg": "ES256K"})).unwrap();
        let value: Value = deserialize_segment(&segment).unwrap();
        assert_eq!(value["alg"], "ES256K");
    }
}
