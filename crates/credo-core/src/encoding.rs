//! Byte codecs used on the wire.
//!
//! Every base64url string Credo produces is unpadded. Decoding accepts input
//! with or without `=` padding, so tokens produced by padding-aware peers
//! still parse.

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded base64url.
pub fn b64url_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_LENIENT.encode(data)
}

/// Decode base64url, tolerating missing or present padding.
pub fn b64url_decode(data: &str) -> Result<Vec<u8>, CoreError> {
    URL_SAFE_LENIENT
        .decode(data.trim_end_matches('='))
        .map_err(|e| CoreError::Encoding(format!("invalid base64url: {}", e)))
}

/// Lowercase hex encoding.
pub fn hex_encode(data: impl AsRef<[u8]>) -> String {
    hex::encode(data)
}

pub fn hex_decode(data: &str) -> Result<Vec<u8>, CoreError> {
    hex::decode(data).map_err(|e| CoreError::Encoding(format!("invalid hex: {}", e)))
}

/// Text encoding of key material inside DID documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeType {
    Hex,
    Base64,
    Base64Url,
}

impl EncodeType {
    pub fn encode(&self, data: impl AsRef<[u8]>) -> String {
        match self {
            EncodeType::Hex => hex_encode(data),
            EncodeType::Base64 => STANDARD.encode(data),
            EncodeType::Base64Url => b64url_encode(data),
        }
    }

    pub fn decode(&self, data: &str) -> Result<Vec<u8>, CoreError> {
        match self {
            EncodeType::Hex => hex_decode(data),
            EncodeType::Base64 => STANDARD
                .decode(data)
                .map_err(|e| CoreError::Encoding(format!("invalid base64: {}", e))),
            EncodeType::Base64Url => b64url_decode(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_b64url_has_no_padding() {
        let encoded = b64url_encode(b"ab");
        assert_eq!(encoded, "YWI");
        assert!(!encoded.contains('='));
    }

    #[test]
    fn test_b64url_decode_accepts_padding() {
        assert_eq!(b64url_decode("YWI").unwrap(), b"ab");
        assert_eq!(b64url_decode("YWI=").unwrap(), b"ab");
    }

    #[test]
    fn test_b64url_uses_url_alphabet() {
        let encoded = b64url_encode([0xfb, 0xff]);
        assert_eq!(encoded, "-_8");
        assert_eq!(b64url_decode(&encoded).unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_b64url_rejects_garbage() {
        let result = b64url_decode("not base64!");
        assert!(matches!(result, Err(CoreError::Encoding(_))));
    }

    #[test]
    fn test_hex_codec() {
        assert_eq!(hex_encode([0xde, 0xad]), "dead");
        assert_eq!(hex_decode("dead").unwrap(), vec![0xde, 0xad]);
        assert!(hex_decode("xyz").is_err());
    }

    #[test]
    fn test_encode_type_variants() {
        let data = b"credo";
        for encode_type in [EncodeType::Hex, EncodeType::Base64, EncodeType::Base64Url] {
            let text = encode_type.encode(data);
            assert_eq!(encode_type.decode(&text).unwrap(), data);
        }
        assert_eq!(EncodeType::Base64.encode(b"ab"), "YWI=");
    }
}
