//! Ephemeral EC keys in JWK form and ECDH shared-secret derivation.

use std::fmt;

use credo_core::encoding::{b64url_decode, b64url_encode};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

const COORDINATE_LEN: usize = 32;

/// Named curves supported for key agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveType {
    /// NIST P-256 (secp256r1).
    #[serde(rename = "P-256")]
    P256,
    /// secp256k1.
    #[serde(rename = "P-256K")]
    P256K,
}

impl CurveType {
    pub fn name(&self) -> &'static str {
        match self {
            CurveType::P256 => "P-256",
            CurveType::P256K => "P-256K",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CryptoError> {
        match name {
            "P-256" | "secp256r1" => Ok(CurveType::P256),
            "P-256K" | "secp256k1" => Ok(CurveType::P256K),
            _ => Err(CryptoError::InvalidKey(format!("unsupported curve: {}", name))),
        }
    }
}

impl fmt::Display for CurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Short-lived EC key in JWK form. `d` is present only on the owner's side.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralKey {
    pub kty: String,
    pub crv: CurveType,
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl EphemeralKey {
    /// Generate a fresh key pair on `curve`.
    pub fn generate(curve: CurveType) -> Self {
        let (point, scalar) = match curve {
            CurveType::P256 => {
                let secret = p256::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_encoded_point(false);
                (point.as_bytes().to_vec(), Zeroizing::new(secret.to_bytes().to_vec()))
            }
            CurveType::P256K => {
                let secret = k256::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_encoded_point(false);
                (point.as_bytes().to_vec(), Zeroizing::new(secret.to_bytes().to_vec()))
            }
        };
        // Uncompressed SEC1: 0x04 || x || y
        Self {
            kty: "EC".into(),
            crv: curve,
            x: b64url_encode(&point[1..1 + COORDINATE_LEN]),
            y: b64url_encode(&point[1 + COORDINATE_LEN..]),
            d: Some(b64url_encode(scalar.as_slice())),
            kid: None,
        }
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn has_private_key(&self) -> bool {
        self.d.is_some()
    }

    /// Copy without the private scalar, safe to publish.
    pub fn public_only(&self) -> EphemeralKey {
        EphemeralKey {
            kty: self.kty.clone(),
            crv: self.crv,
            x: self.x.clone(),
            y: self.y.clone(),
            d: None,
            kid: self.kid.clone(),
        }
    }

    /// ECDH between this key's private scalar and `remote`'s public point.
    pub fn shared_secret(&self, remote: &EphemeralKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if self.crv != remote.crv {
            return Err(CryptoError::CurveMismatch {
                local: self.crv.to_string(),
                remote: remote.crv.to_string(),
            });
        }
        let d = self.d.as_deref().ok_or_else(|| {
            CryptoError::KeyAgreementFailure("local key has no private scalar".into())
        })?;
        let scalar = Zeroizing::new(
            b64url_decode(d).map_err(|e| CryptoError::KeyAgreementFailure(e.to_string()))?,
        );
        let point = remote.sec1_point()?;

        let shared = match self.crv {
            CurveType::P256 => {
                let secret = p256::SecretKey::from_slice(&scalar).map_err(|e| {
                    CryptoError::KeyAgreementFailure(format!("private scalar: {}", e))
                })?;
                let public = p256::PublicKey::from_sec1_bytes(&point).map_err(|e| {
                    CryptoError::KeyAgreementFailure(format!("remote point: {}", e))
                })?;
                let shared =
                    p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
            CurveType::P256K => {
                let secret = k256::SecretKey::from_slice(&scalar).map_err(|e| {
                    CryptoError::KeyAgreementFailure(format!("private scalar: {}", e))
                })?;
                let public = k256::PublicKey::from_sec1_bytes(&point).map_err(|e| {
                    CryptoError::KeyAgreementFailure(format!("remote point: {}", e))
                })?;
                let shared =
                    k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
        };
        Ok(Zeroizing::new(shared))
    }

    fn sec1_point(&self) -> Result<Vec<u8>, CryptoError> {
        let x = b64url_decode(&self.x)
            .map_err(|e| CryptoError::KeyAgreementFailure(e.to_string()))?;
        let y = b64url_decode(&self.y)
            .map_err(|e| CryptoError::KeyAgreementFailure(e.to_string()))?;
        if x.len() != COORDINATE_LEN || y.len() != COORDINATE_LEN {
            return Err(CryptoError::KeyAgreementFailure(format!(
                "coordinates must be {} bytes",
                COORDINATE_LEN
            )));
        }
        let mut point = Vec::with_capacity(1 + 2 * COORDINATE_LEN);
        point.push(0x04);
        point.extend_from_slice(&x);
        point.extend_from_slice(&y);
        Ok(point)
    }
}

impl Drop for EphemeralKey {
    fn drop(&mut self) {
        if let Some(d) = self.d.as_mut() {
            d.zeroize();
        }
    }
}

impl fmt::Debug for EphemeralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKey")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &self.d.as_ref().map(|_| ".."))
            .field("kid", &self.kid)
            .finish()
    }
}

/// Public ephemeral key as embedded in request payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralPublicKey {
    pub kid: String,
    pub epk: EphemeralKey,
}

impl EphemeralPublicKey {
    /// Wrap the public half of `key`; any private scalar is stripped.
    pub fn new(kid: impl Into<String>, key: &EphemeralKey) -> Self {
        let kid = kid.into();
        Self {
            epk: key.public_only().with_kid(kid.clone()),
            kid,
        }
    }
}
