//! Compact signed tokens: `b64url(header).b64url(payload).b64url(signature)`.
//!
//! An unsigned token keeps a trailing `.` with an empty signature segment.
//! Decoded tokens retain their raw segments so verification runs over the
//! exact bytes that were signed.

use credo_core::encoding::{b64url_decode, b64url_encode};
use credo_core::time::now_micros;
use credo_core::{VerifyFailure, VerifyResult};
use credo_crypto::{AlgorithmProvider, EphemeralKey, EphemeralPublicKey, PrivateKey, PublicKey};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::IdentityError;

/// Token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    /// `did#keyId`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<EphemeralKey>,
}

impl Header {
    pub fn new(alg: impl Into<String>, kid: Option<String>) -> Self {
        Self {
            alg: alg.into(),
            kid,
            enc: None,
            epk: None,
        }
    }

    /// DID part of `kid`.
    pub fn did(&self) -> Option<&str> {
        self.kid.as_deref().and_then(|kid| kid.split_once('#')).map(|(did, _)| did)
    }

    /// Key id part of `kid`.
    pub fn key_id(&self) -> Option<&str> {
        self.kid.as_deref().and_then(|kid| kid.split_once('#')).map(|(_, key_id)| key_id)
    }
}

/// Token payload: reserved claims plus an open extension map.
///
/// `iat` and `exp` are microsecond timestamps. On decode they are coerced
/// from integers, integral floats or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_micros"
    )]
    pub iat: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_micros"
    )]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpr: Option<Value>,
    #[serde(rename = "requestClaim", default, skip_serializing_if = "Option::is_none")]
    pub request_claim: Option<Map<String, Value>>,
    #[serde(rename = "publicKey", default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<EphemeralPublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
    #[serde(rename = "vcId", default, skip_serializing_if = "Option::is_none")]
    pub vc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    #[serde(rename = "errorCode", default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(rename = "errorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Payload {
    /// Set any claim by name. Reserved names land in their typed field, with
    /// the same coercion as decoding.
    pub fn put(&mut self, key: impl Into<String>, value: Value) -> Result<(), IdentityError> {
        let mut map = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(IdentityError::Serialization(e.to_string())),
        };
        map.insert(key.into(), value);
        *self = serde_json::from_value(Value::Object(map))
            .map_err(|e| IdentityError::InvalidClaim(e.to_string()))?;
        Ok(())
    }

    /// Read any claim by name, reserved or extension.
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }

    /// First element of `type`, used as the message type tag.
    pub fn primary_type(&self) -> Option<&str> {
        self.types.as_ref().and_then(|t| t.first()).map(String::as_str)
    }
}

/// Accepts integers, integral floats and numeric strings.
pub fn coerce_micros(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn deserialize_micros<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_micros(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", value))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segments {
    header: String,
    payload: String,
    signature: Option<String>,
}

impl Segments {
    fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

/// A header/payload pair with its encoded form once signed or decoded.
#[derive(Debug, Clone)]
pub struct Token {
    header: Header,
    payload: Payload,
    segments: Option<Segments>,
}

impl Token {
    pub fn new(header: Header, payload: Payload) -> Self {
        Self {
            header,
            payload,
            segments: None,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Mutable payload access. Drops any encoded form and signature.
    pub fn payload_mut(&mut self) -> &mut Payload {
        self.segments = None;
        &mut self.payload
    }

    /// Base64url signature segment, if the token carries a non-empty one.
    pub fn signature(&self) -> Option<&str> {
        self.segments
            .as_ref()
            .and_then(|s| s.signature.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn is_signed(&self) -> bool {
        self.signature().is_some()
    }

    fn encode_segments(&self) -> Result<Segments, IdentityError> {
        let header = serde_json::to_vec(&self.header)
            .map_err(|e| IdentityError::Serialization(e.to_string()))?;
        let payload = serde_json::to_vec(&self.payload)
            .map_err(|e| IdentityError::Serialization(e.to_string()))?;
        Ok(Segments {
            header: b64url_encode(header),
            payload: b64url_encode(payload),
            signature: None,
        })
    }

    /// Compact form. Unsigned tokens end with a trailing `.`.
    pub fn compact(&self) -> Result<String, IdentityError> {
        let segments = match &self.segments {
            Some(segments) => segments.clone(),
            None => self.encode_segments()?,
        };
        Ok(format!(
            "{}.{}",
            segments.signing_input(),
            segments.signature.as_deref().unwrap_or("")
        ))
    }

    /// Sign with the algorithm named in `header.alg` and return the compact form.
    pub fn sign(
        &mut self,
        provider: &AlgorithmProvider,
        key: &PrivateKey,
    ) -> Result<String, IdentityError> {
        let algorithm = provider.create(&self.header.alg)?;
        let mut segments = self.encode_segments()?;
        let signature = algorithm.sign(key, segments.signing_input().as_bytes())?;
        segments.signature = Some(b64url_encode(signature));
        self.segments = Some(segments);

        tracing::debug!(alg = %self.header.alg, kid = ?self.header.kid, "token signed");
        self.compact()
    }

    /// Parse a compact token of 2 or 3 segments.
    pub fn decode(compact: &str) -> Result<Self, IdentityError> {
        let parts: Vec<&str> = compact.split('.').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(IdentityError::MalformedToken(format!(
                "expected 2 or 3 segments, got {}",
                parts.len()
            )));
        }

        let header_bytes = b64url_decode(parts[0])
            .map_err(|e| IdentityError::MalformedToken(format!("header: {}", e)))?;
        let header: Header = serde_json::from_slice(&header_bytes)
            .map_err(|e| IdentityError::MalformedToken(format!("header: {}", e)))?;

        let payload_bytes = b64url_decode(parts[1])
            .map_err(|e| IdentityError::MalformedToken(format!("payload: {}", e)))?;
        let payload: Payload = serde_json::from_slice(&payload_bytes)
            .map_err(|e| IdentityError::MalformedToken(format!("payload: {}", e)))?;

        let signature = parts.get(2).filter(|s| !s.is_empty()).map(|s| s.to_string());

        Ok(Self {
            header,
            payload,
            segments: Some(Segments {
                header: parts[0].to_string(),
                payload: parts[1].to_string(),
                signature,
            }),
        })
    }

    /// Verify the signature over the encoded header and payload, then expiry.
    ///
    /// A signature that does not match is reported in the result, not as an
    /// error. Errors are reserved for unsigned tokens and unknown algorithms.
    pub fn verify(
        &self,
        provider: &AlgorithmProvider,
        public_key: &PublicKey,
    ) -> Result<VerifyResult, IdentityError> {
        let segments = self.segments.as_ref().ok_or(IdentityError::MissingSignature)?;
        let signature = segments
            .signature
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(IdentityError::MissingSignature)?;

        let algorithm = provider.create(&self.header.alg)?;
        let signature_bytes = match b64url_decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(VerifyResult::fail(VerifyFailure::SignatureMismatch)),
        };

        if !algorithm.verify(public_key, segments.signing_input().as_bytes(), &signature_bytes) {
            tracing::warn!(
                alg = %self.header.alg,
                kid = ?self.header.kid,
                "token signature mismatch"
            );
            return Ok(VerifyResult::fail(VerifyFailure::SignatureMismatch));
        }

        Ok(self.verify_expired())
    }

    pub fn verify_expired(&self) -> VerifyResult {
        self.verify_expired_at(now_micros())
    }

    /// Fails once `exp - now <= 0`. A token without `exp` never expires.
    pub fn verify_expired_at(&self, now: i64) -> VerifyResult {
        match self.payload.exp {
            Some(exp) if exp.saturating_sub(now) <= 0 => VerifyResult::fail(VerifyFailure::Expired),
            _ => VerifyResult::ok(),
        }
    }

    /// Fails when `iat` is missing or older than `valid_window` microseconds.
    pub fn verify_issued_at(&self, valid_window: i64) -> VerifyResult {
        self.verify_issued_at_with(now_micros(), valid_window)
    }

    pub fn verify_issued_at_with(&self, now: i64, valid_window: i64) -> VerifyResult {
        match self.payload.iat {
            Some(iat) if now.saturating_sub(iat) <= valid_window => VerifyResult::ok(),
            _ => VerifyResult::fail(VerifyFailure::IssuedAtOutOfRange),
        }
    }
}
