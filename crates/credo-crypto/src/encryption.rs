//! Compact JWE with ECDH-ES direct key agreement and ChaCha20-Poly1305.
//!
//! `BASE64URL(header) . "" . BASE64URL(iv) . BASE64URL(ciphertext) . BASE64URL(tag)`
//!
//! The encrypted-key segment is empty because the content key is derived
//! directly from the ECDH shared secret. The sender's ephemeral public key
//! travels in the protected header as `epk`.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use credo_core::encoding::{b64url_decode, b64url_encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::ephemeral::EphemeralKey;
use crate::error::CryptoError;
use crate::kdf::concat_kdf;

pub const KEY_AGREEMENT_ALG: &str = "ECDH-ES";
pub const CONTENT_ENCRYPTION: &str = "C20P";

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_BITS: u32 = 256;

/// JWE protected header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JweHeader {
    pub alg: String,
    pub enc: String,
    /// Key id of the recipient key the message was encrypted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Sender's ephemeral public key.
    pub epk: EphemeralKey,
}

/// A parsed or freshly produced compact JWE.
#[derive(Debug, Clone)]
pub struct Jwe {
    header: JweHeader,
    encoded_header: String,
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
}

impl Jwe {
    /// Encrypt `plaintext` from `sender` (private) to `recipient` (public).
    pub fn encrypt(
        plaintext: &[u8],
        sender: &EphemeralKey,
        recipient: &EphemeralKey,
    ) -> Result<Self, CryptoError> {
        let shared = sender.shared_secret(recipient)?;
        let key = concat_kdf(&shared, CONTENT_ENCRYPTION, &[], &[], KEY_BITS);

        let header = JweHeader {
            alg: KEY_AGREEMENT_ALG.into(),
            enc: CONTENT_ENCRYPTION.into(),
            kid: recipient.kid.clone(),
            epk: sender.public_only(),
        };
        let header_json = serde_json::to_vec(&header)
            .map_err(|e| CryptoError::EncryptionError(format!("header: {}", e)))?;
        let encoded_header = b64url_encode(header_json);

        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| CryptoError::EncryptionError(format!("cipher init failed: {}", e)))?;
        let mut sealed = cipher
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: plaintext,
                    aad: encoded_header.as_bytes(),
                },
            )
            .map_err(|e| CryptoError::EncryptionError(format!("encryption failed: {}", e)))?;

        // The AEAD output is ciphertext || tag.
        let tag_bytes = sealed.split_off(sealed.len() - TAG_LEN);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&tag_bytes);

        tracing::debug!(kid = ?header.kid, crv = %header.epk.crv, "payload encrypted");

        Ok(Self {
            header,
            encoded_header,
            iv,
            ciphertext: sealed,
            tag,
        })
    }

    /// Decrypt with the recipient's private ephemeral key.
    pub fn decrypt(&self, recipient: &EphemeralKey) -> Result<Vec<u8>, CryptoError> {
        if self.header.alg != KEY_AGREEMENT_ALG || self.header.enc != CONTENT_ENCRYPTION {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "{}/{}",
                self.header.alg, self.header.enc
            )));
        }
        let shared = recipient.shared_secret(&self.header.epk)?;
        let key = concat_kdf(&shared, CONTENT_ENCRYPTION, &[], &[], KEY_BITS);

        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| CryptoError::DecryptionFailed(format!("cipher init failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(self.ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(&self.ciphertext);
        sealed.extend_from_slice(&self.tag);

        cipher
            .decrypt(
                Nonce::from_slice(&self.iv),
                Payload {
                    msg: &sealed,
                    aad: self.encoded_header.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::DecryptionFailed("authentication tag mismatch".into()))
    }

    pub fn header(&self) -> &JweHeader {
        &self.header
    }

    pub fn compact(&self) -> String {
        format!(
            "{}..{}.{}.{}",
            self.encoded_header,
            b64url_encode(self.iv),
            b64url_encode(&self.ciphertext),
            b64url_encode(self.tag)
        )
    }

    /// Parse a five-segment compact JWE.
    pub fn parse(compact: &str) -> Result<Self, CryptoError> {
        let segments: Vec<&str> = compact.split('.').collect();
        if segments.len() != 5 {
            return Err(CryptoError::MalformedEnvelope(format!(
                "expected 5 segments, got {}",
                segments.len()
            )));
        }
        if !segments[1].is_empty() {
            return Err(CryptoError::MalformedEnvelope(
                "encrypted key must be empty for direct key agreement".into(),
            ));
        }

        let header_bytes = b64url_decode(segments[0])?;
        let header: JweHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| CryptoError::MalformedEnvelope(format!("header: {}", e)))?;
        if header.epk.has_private_key() {
            return Err(CryptoError::MalformedEnvelope(
                "epk must not carry a private scalar".into(),
            ));
        }

        let iv_bytes = b64url_decode(segments[2])?;
        let iv: [u8; IV_LEN] = iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::MalformedEnvelope(format!("iv must be {} bytes", IV_LEN)))?;
        let ciphertext = b64url_decode(segments[3])?;
        let tag_bytes = b64url_decode(segments[4])?;
        let tag: [u8; TAG_LEN] = tag_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::MalformedEnvelope(format!("tag must be {} bytes", TAG_LEN)))?;

        Ok(Self {
            header,
            encoded_header: segments[0].to_string(),
            iv,
            ciphertext,
            tag,
        })
    }

    /// Whether `s` has the five-segment shape of a compact JWE.
    pub fn is_compact(s: &str) -> bool {
        s.split('.').count() == 5
    }
}
