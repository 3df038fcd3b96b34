//! JSON-LD request objects carried by 2.0 claim requests: `vcr` asks an
//! issuer for a credential, `vpr` asks a holder for a presentation.

use credo_identity::json_ld::{JsonLdVp, VpCriteria, CONTEXT_CREDENTIALS_V1};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

pub const VCR_TYPE: &str = "CredentialRequest";
pub const VPR_TYPE: &str = "PresentationRequest";

/// Verifiable credential request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLdVcr {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "@type")]
    pub types: Vec<String>,
    pub request_claim: Map<String, Value>,
}

impl JsonLdVcr {
    pub fn new(id: impl Into<String>, request_claim: Map<String, Value>) -> Self {
        Self {
            context: vec![CONTEXT_CREDENTIALS_V1.to_string()],
            id: id.into(),
            types: vec![VCR_TYPE.to_string()],
            request_claim,
        }
    }
}

/// One credential the verifier wants shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VprCondition {
    pub condition_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub credential_type: String,
    /// Claim names that must be disclosed.
    #[serde(default)]
    pub property: Vec<String>,
    /// Accepted issuer DIDs; empty accepts any issuer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuer: Vec<String>,
}

impl VprCondition {
    pub fn new(
        condition_id: impl Into<String>,
        credential_type: impl Into<String>,
        property: Vec<String>,
    ) -> Self {
        Self {
            condition_id: condition_id.into(),
            context: None,
            credential_type: credential_type.into(),
            property,
            issuer: Vec::new(),
        }
    }

    pub fn with_issuer(mut self, issuer: Vec<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Whether `criteria` answers this condition and discloses every
    /// requested property. Digests are checked by the verifier.
    pub fn is_fulfilled_by(&self, criteria: &VpCriteria) -> Result<bool, ProtocolError> {
        if criteria.condition_id != self.condition_id {
            return Ok(false);
        }
        let param = criteria.param()?;
        Ok(self.property.iter().all(|name| param.claim.contains_key(name)))
    }
}

/// Body of a presentation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRequest {
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_label: Option<String>,
    pub verifier: String,
    pub condition: VprCondition,
}

/// Verifiable presentation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonLdVpr {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "@type")]
    pub types: Vec<String>,
    #[serde(rename = "presentationURL")]
    pub presentation_url: String,
    #[serde(rename = "presentationRequest")]
    pub presentation_request: PresentationRequest,
}

impl JsonLdVpr {
    /// Every argument is required.
    pub fn new(
        context: Vec<String>,
        id: impl Into<String>,
        url: impl Into<String>,
        purpose: impl Into<String>,
        verifier: impl Into<String>,
        condition: VprCondition,
    ) -> Result<Self, ProtocolError> {
        let id = id.into();
        let url = url.into();
        let purpose = purpose.into();
        let verifier = verifier.into();
        for (name, empty) in [
            ("context", context.is_empty()),
            ("id", id.is_empty()),
            ("url", url.is_empty()),
            ("purpose", purpose.is_empty()),
            ("verifier", verifier.is_empty()),
            ("condition", condition.condition_id.is_empty()),
        ] {
            if empty {
                return Err(ProtocolError::InvalidRequest(format!("vpr {} is required", name)));
            }
        }
        Ok(Self {
            context,
            id,
            types: vec![VPR_TYPE.to_string()],
            presentation_url: url,
            presentation_request: PresentationRequest {
                purpose,
                purpose_label: None,
                verifier,
                condition,
            },
        })
    }

    pub fn with_purpose_label(mut self, label: impl Into<String>) -> Self {
        self.presentation_request.purpose_label = Some(label.into());
        self
    }

    pub fn condition(&self) -> &VprCondition {
        &self.presentation_request.condition
    }

    /// Whether some criteria of `vp` fulfils the requested condition.
    pub fn is_fulfilled_by(&self, vp: &JsonLdVp) -> Result<bool, ProtocolError> {
        for criteria in &vp.fulfilled_criteria {
            if self.condition().is_fulfilled_by(criteria)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
