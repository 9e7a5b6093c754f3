//! Base64 payload codec for the final export artifact.
//!
//! The serialized workbook travels as a base64 string (optionally wrapped in
//! a data URI). Decoding is tolerant: anything outside the base64 alphabet
//! is stripped before decoding, and a leading `"...base64,"` data-URI prefix
//! is removed if present.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Result, SheetpackError};

/// Encode raw bytes as a standard padded base64 string.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 string back into bytes.
///
/// Strips a data-URI prefix (everything up to and including `"base64,"`)
/// and any byte outside the 65-character alphabet before decoding.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let input = match input.find("base64,") {
        Some(pos) => &input[pos + "base64,".len()..],
        None => input,
    };

    let scrubbed: Vec<u8> = input
        .bytes()
        .filter(|b| {
            b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/' || *b == b'='
        })
        .collect();

    STANDARD
        .decode(&scrubbed)
        .map_err(|e| SheetpackError::InvalidContent(format!("base64 decode failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_small_remainders() {
        for len in [0usize, 1, 2, 3] {
            let bytes: Vec<u8> = (0..len as u8).collect();
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes, "len {}", len);
        }
    }

    #[test]
    fn test_roundtrip_large() {
        let bytes: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_padding() {
        assert_eq!(encode(b"f"), "Zg==");
        assert_eq!(encode(b"fo"), "Zm8=");
        assert_eq!(encode(b"foo"), "Zm9v");
    }

    #[test]
    fn test_decode_scrubs_noise() {
        assert_eq!(decode("Zm9v\r\nYmFy").unwrap(), b"foobar");
        assert_eq!(decode(" Z g = = ").unwrap(), b"f");
    }

    #[test]
    fn test_decode_data_uri_prefix() {
        let uri = format!(
            "data:application/vnd.openxmlformats-officedocument.spreadsheetml.sheet;base64,{}",
            encode(b"hello")
        );
        assert_eq!(decode(&uri).unwrap(), b"hello");
    }
}
