use credo_core::time::micros_from_secs;
use credo_core::VerifyResult;
use credo_crypto::DisclosureParam;
use serde::{Deserialize, Serialize};

use crate::credential::{ConvertToken, Credential, CredentialVersion, CREDENTIAL_TYPE};
use crate::error::IdentityError;
use crate::issuer::IssuerDid;
use crate::json_ld::JsonLdVp;
use crate::key_holder::DidKeyHolder;
use crate::token::{Header, Payload, Token};

/// First entry of every presentation's type list.
pub const PRESENTATION_TYPE: &str = "PRESENTATION";

/// Default presentation lifetime: 5 minutes.
pub const PRESENTATION_DURATION_SECS: u64 = 5 * 60;

/// A 1.1 credential shown together with the claims the holder reveals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedCredential {
    pub vc_type: Vec<String>,
    /// Compact signed credential token.
    pub vc: String,
    pub param: DisclosureParam,
}

impl PresentedCredential {
    /// Wrap an encoded 1.1 credential with the disclosed subset.
    pub fn new(vc: impl Into<String>, param: DisclosureParam) -> Result<Self, IdentityError> {
        let vc = vc.into();
        let credential = Credential::from_encoded(&vc)?;
        Ok(Self {
            vc_type: credential.types(),
            vc,
            param,
        })
    }

    /// Check the revealed claims against the credential's commitment. The
    /// credential signature is checked separately.
    pub fn is_valid(&self) -> Result<VerifyResult, IdentityError> {
        Credential::from_encoded(&self.vc)?.verify_disclosure(&self.param)
    }
}

/// A holder-signed bundle of issued credentials.
#[derive(Debug, Clone)]
pub struct Presentation {
    issuer: IssuerDid,
    nonce: Option<String>,
    jti: String,
    version: CredentialVersion,
    duration: i64,
    credentials: Vec<String>,
    presented: Vec<PresentedCredential>,
    vp: Option<JsonLdVp>,
    types: Vec<String>,
}

impl Presentation {
    pub fn new(issuer: IssuerDid, version: CredentialVersion) -> Self {
        Self {
            issuer,
            nonce: None,
            jti: uuid::Uuid::now_v7().to_string(),
            version,
            duration: micros_from_secs(PRESENTATION_DURATION_SECS),
            credentials: Vec::new(),
            presented: Vec::new(),
            vp: None,
            types: Vec::new(),
        }
    }

    pub fn from_key_holder(holder: &DidKeyHolder, version: CredentialVersion) -> Self {
        Self::new(IssuerDid::from_key_holder(holder), version)
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_jti(mut self, jti: impl Into<String>) -> Self {
        self.jti = jti.into();
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    /// Append an encoded 1.0 credential. The credential is decoded for its
    /// types but not verified.
    pub fn add_credential(&mut self, encoded: &str) -> Result<(), IdentityError> {
        self.require_version(CredentialVersion::V1_0)?;
        let token = Token::decode(encoded)?;
        self.merge_types(token.payload().types.as_deref().unwrap_or_default());
        self.credentials.push(encoded.to_string());
        Ok(())
    }

    /// Append a 1.1 credential with its revealed claims.
    pub fn add_presented(&mut self, presented: PresentedCredential) -> Result<(), IdentityError> {
        self.require_version(CredentialVersion::V1_1)?;
        self.merge_types(&presented.vc_type);
        self.presented.push(presented);
        Ok(())
    }

    /// Set the JSON-LD body of a 2.0 presentation.
    pub fn set_json_ld_vp(&mut self, vp: JsonLdVp) -> Result<(), IdentityError> {
        self.require_version(CredentialVersion::V2_0)?;
        for criteria in &vp.fulfilled_criteria {
            let token = Token::decode(&criteria.vc)?;
            self.merge_types(token.payload().types.as_deref().unwrap_or_default());
        }
        self.vp = Some(vp);
        Ok(())
    }

    fn require_version(&self, expected: CredentialVersion) -> Result<(), IdentityError> {
        if self.version != expected {
            return Err(IdentityError::InvalidVersion(format!(
                "operation needs version {}, presentation is {}",
                expected, self.version
            )));
        }
        Ok(())
    }

    /// Ordered union of non-default credential types.
    fn merge_types(&mut self, types: &[String]) {
        for t in types {
            if t != CREDENTIAL_TYPE && !self.types.contains(t) {
                self.types.push(t.clone());
            }
        }
    }

    pub fn did(&self) -> &str {
        &self.issuer.did
    }

    pub fn issuer(&self) -> &IssuerDid {
        &self.issuer
    }

    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    pub fn jti(&self) -> &str {
        &self.jti
    }

    pub fn version(&self) -> CredentialVersion {
        self.version
    }

    pub fn credentials(&self) -> &[String] {
        &self.credentials
    }

    pub fn presented(&self) -> &[PresentedCredential] {
        &self.presented
    }

    pub fn json_ld_vp(&self) -> Option<&JsonLdVp> {
        self.vp.as_ref()
    }

    /// `[PRESENTATION, credential types...]`
    pub fn types(&self) -> Vec<String> {
        let mut types = Vec::with_capacity(self.types.len() + 1);
        types.push(PRESENTATION_TYPE.to_string());
        types.extend(self.types.iter().cloned());
        types
    }

    pub fn from_token(token: &Token) -> Result<Self, IdentityError> {
        let payload = token.payload();
        let version = CredentialVersion::from_payload(payload.version.as_deref())?;
        let mut presentation = Self::new(IssuerDid::from_token(token)?, version);
        presentation.nonce = payload.nonce.clone();
        if let Some(jti) = &payload.jti {
            presentation.jti = jti.clone();
        }
        if let (Some(iat), Some(exp)) = (payload.iat, payload.exp) {
            presentation.duration = exp.saturating_sub(iat);
        }
        if let Some(types) = &payload.types {
            presentation.types = types
                .iter()
                .filter(|t| *t != PRESENTATION_TYPE)
                .cloned()
                .collect();
        }

        match version {
            CredentialVersion::V1_0 => {
                presentation.credentials = payload.credential.clone().unwrap_or_default();
            }
            CredentialVersion::V1_1 => {
                let vp = payload
                    .vp
                    .clone()
                    .ok_or_else(|| IdentityError::MalformedToken("missing vp".into()))?;
                presentation.presented = serde_json::from_value(vp)
                    .map_err(|e| IdentityError::MalformedToken(format!("vp: {}", e)))?;
            }
            CredentialVersion::V2_0 => {
                let vp = payload
                    .vp
                    .clone()
                    .ok_or_else(|| IdentityError::MalformedToken("missing vp".into()))?;
                presentation.vp = Some(
                    serde_json::from_value(vp)
                        .map_err(|e| IdentityError::MalformedToken(format!("vp: {}", e)))?,
                );
            }
        }
        Ok(presentation)
    }

    pub fn from_encoded(compact: &str) -> Result<Self, IdentityError> {
        Self::from_token(&Token::decode(compact)?)
    }
}

impl ConvertToken for Presentation {
    fn duration(&self) -> i64 {
        self.duration
    }

    fn as_token(&self, issued: i64, expiration: i64) -> Result<Token, IdentityError> {
        let header = Header::new(self.issuer.algorithm.name(), Some(self.issuer.kid()));
        let mut payload = Payload {
            iss: Some(self.issuer.did.clone()),
            iat: Some(issued),
            exp: Some(expiration),
            nonce: self.nonce.clone(),
            jti: Some(self.jti.clone()),
            types: Some(self.types()),
            version: Some(self.version.to_string()),
            ..Default::default()
        };

        match self.version {
            CredentialVersion::V1_0 => payload.credential = Some(self.credentials.clone()),
            CredentialVersion::V1_1 => {
                payload.vp = Some(
                    serde_json::to_value(&self.presented)
                        .map_err(|e| IdentityError::Serialization(e.to_string()))?,
                );
            }
            CredentialVersion::V2_0 => {
                let vp = self.vp.as_ref().ok_or_else(|| {
                    IdentityError::InvalidClaim("2.0 presentation has no json-ld vp".into())
                })?;
                payload.vp = Some(
                    serde_json::to_value(vp)
                        .map_err(|e| IdentityError::Serialization(e.to_string()))?,
                );
            }
        }

        tracing::debug!(
            holder = %self.issuer.did,
            version = %self.version,
            credentials = self.credentials.len() + self.presented.len(),
            "presentation token built"
        );
        Ok(Token::new(header, payload))
    }
}
