//! Salted-hash commitments for selective disclosure.
//!
//! The issuer commits to every claim as `H(canonical(value) || nonce)` and
//! signs only the digests. The holder later reveals any subset of
//! `{value, nonce}` pairs; a verifier recomputes the digests for exactly the
//! revealed claims.

use std::collections::BTreeMap;

use credo_core::encoding::{b64url_encode, hex_decode, hex_encode};
use credo_core::{VerifyFailure, VerifyResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CryptoError;
use crate::hashing::HashAlgorithm;

/// Attribute type tag for hash commitments.
pub const ATTRIBUTE_TYPE_HASH: &str = "hash";

/// Minimum nonce length in bytes.
pub const MIN_NONCE_BYTES: usize = 16;

/// Digests of committed claims, the part the issuer signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedAttribute {
    pub alg: HashAlgorithm,
    /// Claim name → base64url digest.
    pub value: BTreeMap<String, String>,
}

/// Claim values and their nonces, the part the holder reveals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisclosureParam {
    pub value: Map<String, Value>,
    pub nonce: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeClaim {
    attribute_type: String,
    attribute: HashedAttribute,
}

/// Commit to every claim with fresh random nonces.
pub fn build(
    claims: &Map<String, Value>,
    alg: HashAlgorithm,
) -> (HashedAttribute, DisclosureParam) {
    build_with_nonce_len(claims, alg, MIN_NONCE_BYTES)
}

/// Like [`build`], with a configurable nonce length (never below 16 bytes).
pub fn build_with_nonce_len(
    claims: &Map<String, Value>,
    alg: HashAlgorithm,
    nonce_bytes: usize,
) -> (HashedAttribute, DisclosureParam) {
    let nonce_len = nonce_bytes.max(MIN_NONCE_BYTES);
    let mut digests = BTreeMap::new();
    let mut param = DisclosureParam::default();

    for (name, value) in claims {
        let nonce = random_nonce(nonce_len);
        let digest = digest_claim(alg, value, &nonce);
        digests.insert(name.clone(), digest);
        param.value.insert(name.clone(), value.clone());
        param.nonce.insert(name.clone(), hex_encode(&nonce));
    }

    tracing::debug!(alg = alg.name(), claims = digests.len(), "claims committed");
    (HashedAttribute { alg, value: digests }, param)
}

/// Fresh random salt of `len` bytes from the OS CSPRNG.
pub fn random_nonce(len: usize) -> Vec<u8> {
    let mut nonce = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// base64url(H(canonical(value) || nonce)).
pub fn digest_claim(alg: HashAlgorithm, value: &Value, nonce: &[u8]) -> String {
    let canonical = canonical_bytes(value);
    b64url_encode(alg.digest(&[canonical.as_slice(), nonce]))
}

/// Representation-stable bytes of a claim value: compact JSON with object
/// keys sorted. Strings keep their quotes, so `"18"` and `18` differ.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    sort_keys(value).to_string().into_bytes()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

impl HashedAttribute {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.value.keys().map(String::as_str)
    }

    /// Check every revealed claim against its stored digest.
    ///
    /// All supplied entries must match. Claims left out of `revealed` are not
    /// checked. An empty disclosure fails.
    pub fn verify(&self, revealed: &DisclosureParam) -> VerifyResult {
        if revealed.value.is_empty() && revealed.nonce.is_empty() {
            return VerifyResult::fail(VerifyFailure::CommitmentMismatch(
                "no claims revealed".into(),
            ));
        }

        for name in revealed.nonce.keys() {
            if !revealed.value.contains_key(name) {
                return mismatch(name);
            }
        }

        for (name, value) in &revealed.value {
            let Some(expected) = self.value.get(name) else {
                return mismatch(name);
            };
            let Some(nonce) = revealed.nonce.get(name).and_then(|n| hex_decode(n).ok()) else {
                return mismatch(name);
            };
            if digest_claim(self.alg, value, &nonce) != *expected {
                return mismatch(name);
            }
        }

        VerifyResult::ok()
    }

    /// Wire form stored in a credential's `claim` field.
    pub fn to_claim_value(&self) -> Value {
        serde_json::json!({
            "attributeType": ATTRIBUTE_TYPE_HASH,
            "attribute": {
                "alg": self.alg,
                "value": self.value,
            }
        })
    }

    pub fn from_claim_value(value: &Value) -> Result<Self, CryptoError> {
        let claim: AttributeClaim = serde_json::from_value(value.clone())
            .map_err(|e| CryptoError::MalformedEnvelope(format!("hashed attribute: {}", e)))?;
        if claim.attribute_type != ATTRIBUTE_TYPE_HASH {
            return Err(CryptoError::MalformedEnvelope(format!(
                "unknown attribute type: {}",
                claim.attribute_type
            )));
        }
        Ok(claim.attribute)
    }
}

fn mismatch(name: &str) -> VerifyResult {
    tracing::warn!(claim = name, "commitment mismatch");
    VerifyResult::fail(VerifyFailure::CommitmentMismatch(name.to_string()))
}

impl DisclosureParam {
    /// Keep only the named claims, for partial disclosure.
    pub fn select(&self, names: &[&str]) -> DisclosureParam {
        let mut subset = DisclosureParam::default();
        for name in names {
            if let (Some(value), Some(nonce)) = (self.value.get(*name), self.nonce.get(*name)) {
                subset.value.insert(name.to_string(), value.clone());
                subset.nonce.insert(name.to_string(), nonce.clone());
            }
        }
        subset
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
