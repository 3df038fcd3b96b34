//! JSON-LD structures used by 2.0 credentials and presentations.

use std::collections::BTreeMap;

use credo_core::encoding::{b64url_decode, b64url_encode, hex_decode, hex_encode};
use credo_core::{VerifyFailure, VerifyResult};
use credo_crypto::commitment::{digest_claim, random_nonce, MIN_NONCE_BYTES};
use credo_crypto::HashAlgorithm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IdentityError;

pub const CONTEXT_CREDENTIALS_V1: &str = "https://www.w3.org/2018/credentials/v1";
pub const CREDENTIAL_PARAM_TYPE: &str = "CredentialParam";
pub const VC_TYPE: &str = "VerifiableCredential";
pub const VP_TYPE: &str = "VerifiablePresentation";
pub const PROOF_TYPE_HASH: &str = "hash";

/// One claim with its salt, as held by the issuer and holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimParam {
    pub claim_value: Value,
    /// Hex-encoded random salt.
    pub salt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

/// Disclosure parameter of a 2.0 credential: every claim value and its salt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLdParam {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub proof_type: String,
    pub hash_algorithm: HashAlgorithm,
    pub claim: BTreeMap<String, ClaimParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_layout: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl JsonLdParam {
    /// Salt every claim with fresh randomness.
    pub fn new(claims: &Map<String, Value>, hash_algorithm: HashAlgorithm) -> Self {
        let claim = claims
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    ClaimParam {
                        claim_value: value.clone(),
                        salt: hex_encode(random_nonce(MIN_NONCE_BYTES)),
                        display_value: None,
                    },
                )
            })
            .collect();
        Self {
            context: vec![CONTEXT_CREDENTIALS_V1.into()],
            types: vec![CREDENTIAL_PARAM_TYPE.into()],
            proof_type: PROOF_TYPE_HASH.into(),
            hash_algorithm,
            claim,
            display_layout: None,
            info: None,
        }
    }

    pub fn with_display_layout(mut self, layout: Vec<String>) -> Self {
        self.display_layout = Some(layout);
        self
    }

    pub fn with_info(mut self, info: Value) -> Self {
        self.info = Some(info);
        self
    }

    /// Digest of one claim, or `None` if the claim or its salt is invalid.
    pub fn digest(&self, name: &str) -> Option<String> {
        let param = self.claim.get(name)?;
        let salt = hex_decode(&param.salt).ok()?;
        Some(digest_claim(self.hash_algorithm, &param.claim_value, &salt))
    }

    /// Claim name → digest for every claim that has a valid salt.
    pub fn digests(&self) -> BTreeMap<String, String> {
        self.claim
            .keys()
            .filter_map(|name| self.digest(name).map(|d| (name.clone(), d)))
            .collect()
    }

    /// All claims in this param must match the signed digests.
    pub fn verify_digests(&self, digests: &BTreeMap<String, String>) -> VerifyResult {
        if self.claim.is_empty() {
            return VerifyResult::fail(VerifyFailure::CommitmentMismatch(
                "no claims revealed".into(),
            ));
        }
        for name in self.claim.keys() {
            match (self.digest(name), digests.get(name)) {
                (Some(computed), Some(expected)) if computed == *expected => {}
                _ => {
                    tracing::warn!(claim = %name, "json-ld claim digest mismatch");
                    return VerifyResult::fail(VerifyFailure::CommitmentMismatch(name.clone()));
                }
            }
        }
        VerifyResult::ok()
    }

    /// Keep only the named claims.
    pub fn select(&self, names: &[&str]) -> JsonLdParam {
        let mut subset = self.clone();
        subset.claim.retain(|name, _| names.contains(&name.as_str()));
        subset
    }

    /// Build the signed VC body: digests only, no claim values.
    pub fn to_vc(&self, id: impl Into<String>, subject: Option<String>) -> JsonLdVc {
        let digests = self.digests();
        let mut types = vec![VC_TYPE.to_string()];
        types.extend(digests.keys().cloned());
        JsonLdVc {
            context: self.context.clone(),
            id: id.into(),
            types,
            credential_subject: CredentialSubject {
                id: subject,
                claim: digests,
            },
        }
    }

    /// base64url(JSON), as carried in the protocol envelope `param`.
    pub fn encode(&self) -> Result<String, IdentityError> {
        let json =
            serde_json::to_vec(self).map_err(|e| IdentityError::Serialization(e.to_string()))?;
        Ok(b64url_encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self, IdentityError> {
        let bytes = b64url_decode(encoded)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IdentityError::Serialization(format!("json-ld param: {}", e)))
    }
}

/// Signed body of a 2.0 credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLdVc {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub credential_subject: CredentialSubject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSubject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Claim name → digest.
    pub claim: BTreeMap<String, String>,
}

impl JsonLdVc {
    /// Claim types without the generic VC type.
    pub fn claim_types(&self) -> impl Iterator<Item = &str> {
        self.types
            .iter()
            .map(String::as_str)
            .filter(|t| *t != VC_TYPE)
    }
}

/// A credential offered against one presentation-request condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpCriteria {
    pub condition_id: String,
    /// Compact signed credential token.
    pub vc: String,
    /// Encoded [`JsonLdParam`] with the disclosed claims.
    pub param: String,
}

impl VpCriteria {
    pub fn new(
        condition_id: impl Into<String>,
        vc: impl Into<String>,
        param: &JsonLdParam,
    ) -> Result<Self, IdentityError> {
        Ok(Self {
            condition_id: condition_id.into(),
            vc: vc.into(),
            param: param.encode()?,
        })
    }

    pub fn param(&self) -> Result<JsonLdParam, IdentityError> {
        JsonLdParam::decode(&self.param)
    }
}

/// Presentation body of a 2.0 presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLdVp {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub presenter: String,
    pub fulfilled_criteria: Vec<VpCriteria>,
}

impl JsonLdVp {
    pub fn new(
        id: impl Into<String>,
        presenter: impl Into<String>,
        criteria: Vec<VpCriteria>,
    ) -> Result<Self, IdentityError> {
        if criteria.is_empty() {
            return Err(IdentityError::InvalidClaim(
                "fulfilled criteria cannot be empty".into(),
            ));
        }
        Ok(Self {
            context: vec![CONTEXT_CREDENTIALS_V1.into()],
            id: id.into(),
            types: vec![VP_TYPE.into()],
            presenter: presenter.into(),
            fulfilled_criteria: criteria,
        })
    }
}
