use std::fmt;
use std::str::FromStr;

use credo_core::time::{micros_from_secs, now_micros};
use credo_core::VerifyResult;
use credo_crypto::commitment;
use credo_crypto::{DisclosureParam, HashAlgorithm, HashedAttribute};
use serde_json::{Map, Value};

use crate::error::IdentityError;
use crate::issuer::IssuerDid;
use crate::json_ld::{JsonLdParam, JsonLdVc};
use crate::key_holder::DidKeyHolder;
use crate::token::{Header, Payload, Token};

/// First entry of every credential's type list.
pub const CREDENTIAL_TYPE: &str = "CREDENTIAL";

/// Default credential lifetime: 24 hours.
pub const CREDENTIAL_DURATION_SECS: u64 = 24 * 60 * 60;

/// Credential format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialVersion {
    /// Plain claim map.
    V1_0,
    /// Hash-committed claims; values travel separately.
    V1_1,
    /// JSON-LD credential with per-claim salted digests.
    V2_0,
}

impl CredentialVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialVersion::V1_0 => "1.0",
            CredentialVersion::V1_1 => "1.1",
            CredentialVersion::V2_0 => "2.0",
        }
    }

    /// Parse an optional payload `version` field.
    pub fn from_payload(version: Option<&str>) -> Result<Self, IdentityError> {
        version
            .ok_or_else(|| IdentityError::InvalidVersion("version is missing".into()))?
            .parse()
    }
}

impl FromStr for CredentialVersion {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0" => Ok(CredentialVersion::V1_0),
            "1.1" => Ok(CredentialVersion::V1_1),
            "2.0" => Ok(CredentialVersion::V2_0),
            other => Err(IdentityError::InvalidVersion(other.to_string())),
        }
    }
}

impl fmt::Display for CredentialVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Objects that render into a signable token.
pub trait ConvertToken {
    /// Lifetime in microseconds.
    fn duration(&self) -> i64;

    fn as_token(&self, issued: i64, expiration: i64) -> Result<Token, IdentityError>;

    /// Token issued now and expiring after [`ConvertToken::duration`].
    fn as_token_now(&self) -> Result<Token, IdentityError> {
        let now = now_micros();
        self.as_token(now, now.saturating_add(self.duration()))
    }
}

/// A claim set issued by `issuer` about `target_did`.
#[derive(Debug, Clone)]
pub struct Credential {
    issuer: IssuerDid,
    target_did: Option<String>,
    claim: Map<String, Value>,
    nonce: Option<String>,
    jti: String,
    version: CredentialVersion,
    duration: i64,
    types: Option<Vec<String>>,
    hashed_attribute: Option<HashedAttribute>,
    disclosure: Option<DisclosureParam>,
    json_ld_param: Option<JsonLdParam>,
    vc: Option<JsonLdVc>,
}

impl Credential {
    pub fn new(issuer: IssuerDid, version: CredentialVersion) -> Self {
        Self {
            issuer,
            target_did: None,
            claim: Map::new(),
            nonce: None,
            jti: uuid::Uuid::now_v7().to_string(),
            version,
            duration: micros_from_secs(CREDENTIAL_DURATION_SECS),
            types: None,
            hashed_attribute: None,
            disclosure: None,
            json_ld_param: None,
            vc: None,
        }
    }

    pub fn from_key_holder(holder: &DidKeyHolder, version: CredentialVersion) -> Self {
        Self::new(IssuerDid::from_key_holder(holder), version)
    }

    pub fn with_target_did(mut self, target_did: impl Into<String>) -> Self {
        self.target_did = Some(target_did.into());
        self
    }

    pub fn with_claim(mut self, claim: Map<String, Value>) -> Self {
        self.claim = claim;
        self
    }

    pub fn add_claim(&mut self, name: impl Into<String>, value: Value) {
        self.claim.insert(name.into(), value);
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_jti(mut self, jti: impl Into<String>) -> Self {
        self.jti = jti.into();
        self
    }

    /// Override the lifetime, in microseconds.
    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn issuer(&self) -> &IssuerDid {
        &self.issuer
    }

    pub fn did(&self) -> &str {
        &self.issuer.did
    }

    pub fn target_did(&self) -> Option<&str> {
        self.target_did.as_deref()
    }

    pub fn claim(&self) -> &Map<String, Value> {
        &self.claim
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

    pub fn hashed_attribute(&self) -> Option<&HashedAttribute> {
        self.hashed_attribute.as_ref()
    }

    /// Issuer-side disclosure param of a 1.1 credential.
    pub fn disclosure(&self) -> Option<&DisclosureParam> {
        self.disclosure.as_ref()
    }

    /// Issuer-side JSON-LD param of a 2.0 credential.
    pub fn json_ld_param(&self) -> Option<&JsonLdParam> {
        self.json_ld_param.as_ref()
    }

    pub fn vc(&self) -> Option<&JsonLdVc> {
        self.vc.as_ref()
    }

    /// `[CREDENTIAL, claim types...]`
    pub fn types(&self) -> Vec<String> {
        if let Some(types) = &self.types {
            return types.clone();
        }
        let mut types = vec![CREDENTIAL_TYPE.to_string()];
        match self.version {
            CredentialVersion::V2_0 if self.vc.is_some() => {
                if let Some(vc) = &self.vc {
                    types.extend(vc.claim_types().map(String::from));
                }
            }
            CredentialVersion::V1_1 if self.claim.is_empty() => {
                if let Some(hashed) = &self.hashed_attribute {
                    types.extend(hashed.names().map(String::from));
                }
            }
            _ => types.extend(self.claim.keys().cloned()),
        }
        types
    }

    /// Commit the claims of a 1.1 credential and return the disclosure
    /// param for the holder. Each call draws fresh nonces.
    pub fn commit_claims(
        &mut self,
        alg: HashAlgorithm,
        nonce_bytes: usize,
    ) -> Result<DisclosureParam, IdentityError> {
        if self.version != CredentialVersion::V1_1 {
            return Err(IdentityError::InvalidVersion(format!(
                "claim commitments need version 1.1, credential is {}",
                self.version
            )));
        }
        if self.claim.is_empty() {
            return Err(IdentityError::InvalidClaim("no claims to commit".into()));
        }
        let (hashed, param) = commitment::build_with_nonce_len(&self.claim, alg, nonce_bytes);
        self.hashed_attribute = Some(hashed);
        self.disclosure = Some(param.clone());
        self.types = None;
        Ok(param)
    }

    /// Salt the claims of a 2.0 credential and build its VC body.
    pub fn attach_json_ld(&mut self, alg: HashAlgorithm) -> Result<&JsonLdParam, IdentityError> {
        if self.version != CredentialVersion::V2_0 {
            return Err(IdentityError::InvalidVersion(format!(
                "json-ld credentials need version 2.0, credential is {}",
                self.version
            )));
        }
        if self.claim.is_empty() {
            return Err(IdentityError::InvalidClaim("no claims to attach".into()));
        }
        let param = JsonLdParam::new(&self.claim, alg);
        self.vc = Some(param.to_vc(format!("urn:uuid:{}", self.jti), self.target_did.clone()));
        self.types = None;
        Ok(self.json_ld_param.insert(param))
    }

    /// Check a revealed 1.1 disclosure against the signed commitment.
    pub fn verify_disclosure(
        &self,
        param: &DisclosureParam,
    ) -> Result<VerifyResult, IdentityError> {
        let hashed = self.hashed_attribute.as_ref().ok_or_else(|| {
            IdentityError::InvalidClaim("credential carries no hashed attribute".into())
        })?;
        Ok(hashed.verify(param))
    }

    /// Check a revealed 2.0 JSON-LD param against the signed VC digests.
    pub fn verify_json_ld(&self, param: &JsonLdParam) -> Result<VerifyResult, IdentityError> {
        let vc = self
            .vc
            .as_ref()
            .ok_or_else(|| IdentityError::InvalidClaim("credential carries no vc".into()))?;
        Ok(param.verify_digests(&vc.credential_subject.claim))
    }

    /// Rebuild a credential from a decoded token.
    pub fn from_token(token: &Token) -> Result<Self, IdentityError> {
        let payload = token.payload();
        let version = CredentialVersion::from_payload(payload.version.as_deref())?;
        let issuer = IssuerDid::from_token(token)?;
        if let Some(iss) = payload.iss.as_deref() {
            if iss != issuer.did {
                return Err(IdentityError::MalformedToken(format!(
                    "iss {} does not match kid {}",
                    iss,
                    issuer.kid()
                )));
            }
        }

        let mut credential = Self::new(issuer, version);
        credential.target_did = payload.sub.clone();
        credential.nonce = payload.nonce.clone();
        if let Some(jti) = &payload.jti {
            credential.jti = jti.clone();
        }
        if let (Some(iat), Some(exp)) = (payload.iat, payload.exp) {
            credential.duration = exp.saturating_sub(iat);
        }

        match version {
            CredentialVersion::V1_0 => {
                credential.claim = match &payload.claim {
                    Some(Value::Object(map)) => map.clone(),
                    _ => {
                        return Err(IdentityError::MalformedToken(
                            "claim must be an object".into(),
                        ))
                    }
                };
            }
            CredentialVersion::V1_1 => {
                let claim = payload
                    .claim
                    .as_ref()
                    .ok_or_else(|| IdentityError::MalformedToken("missing claim".into()))?;
                credential.hashed_attribute = Some(HashedAttribute::from_claim_value(claim)?);
            }
            CredentialVersion::V2_0 => {
                let vc = payload
                    .vc
                    .clone()
                    .ok_or_else(|| IdentityError::MalformedToken("missing vc".into()))?;
                credential.vc = Some(
                    serde_json::from_value(vc)
                        .map_err(|e| IdentityError::MalformedToken(format!("vc: {}", e)))?,
                );
            }
        }
        credential.types = payload.types.clone();
        Ok(credential)
    }

    /// Decode a compact token and rebuild the credential. Does not verify.
    pub fn from_encoded(compact: &str) -> Result<Self, IdentityError> {
        Self::from_token(&Token::decode(compact)?)
    }
}

impl ConvertToken for Credential {
    fn duration(&self) -> i64 {
        self.duration
    }

    fn as_token(&self, issued: i64, expiration: i64) -> Result<Token, IdentityError> {
        let header = Header::new(self.issuer.algorithm.name(), Some(self.issuer.kid()));
        let mut payload = Payload {
            iss: Some(self.issuer.did.clone()),
            sub: self.target_did.clone(),
            iat: Some(issued),
            exp: Some(expiration),
            nonce: self.nonce.clone(),
            jti: Some(self.jti.clone()),
            types: Some(self.types()),
            version: Some(self.version.to_string()),
            ..Default::default()
        };

        match self.version {
            CredentialVersion::V1_0 => payload.claim = Some(Value::Object(self.claim.clone())),
            CredentialVersion::V1_1 => {
                let hashed = self.hashed_attribute.as_ref().ok_or_else(|| {
                    IdentityError::InvalidClaim("1.1 credential claims are not committed".into())
                })?;
                payload.claim = Some(hashed.to_claim_value());
            }
            CredentialVersion::V2_0 => {
                let vc = self.vc.as_ref().ok_or_else(|| {
                    IdentityError::InvalidClaim("2.0 credential has no json-ld vc".into())
                })?;
                payload.vc = Some(
                    serde_json::to_value(vc)
                        .map_err(|e| IdentityError::Serialization(e.to_string()))?,
                );
            }
        }

        tracing::info!(
            issuer = %self.issuer.did,
            subject = ?self.target_did,
            version = %self.version,
            jti = %self.jti,
            "credential token built"
        );
        Ok(Token::new(header, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credo_crypto::{AlgorithmProvider, AlgorithmType, PrivateKey};
    use serde_json::json;

    fn holder() -> DidKeyHolder {
        DidKeyHolder::new(
            "did:method:issuer",
            "key-1",
            AlgorithmType::Es256k,
            PrivateKey::generate(),
        )
    }

    fn claims() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), json!("Alice"));
        map.insert("age".into(), json!("18"));
        map
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!("1.1".parse::<CredentialVersion>().unwrap(), CredentialVersion::V1_1);
        assert!(matches!(
            "3.0".parse::<CredentialVersion>(),
            Err(IdentityError::InvalidVersion(_))
        ));
        assert!(matches!(
            CredentialVersion::from_payload(None),
            Err(IdentityError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_types_follow_claim_order() {
        let credential = Credential::from_key_holder(&holder(), CredentialVersion::V1_0)
            .with_claim(claims());
        assert_eq!(credential.types(), vec!["CREDENTIAL", "name", "age"]);
    }

    #[test]
    fn test_v1_roundtrip() {
        let provider = AlgorithmProvider::new();
        let holder = holder();
        let credential = Credential::from_key_holder(&holder, CredentialVersion::V1_0)
            .with_target_did("did:method:holder")
            .with_claim(claims())
            .with_nonce("n-1");

        let mut token = credential.as_token(1_000, 2_000).unwrap();
        let compact = holder.sign(&provider, &mut token).unwrap();
        let restored = Credential::from_encoded(&compact).unwrap();

        assert_eq!(restored.did(), "did:method:issuer");
        assert_eq!(restored.target_did(), Some("did:method:holder"));
        assert_eq!(restored.claim(), credential.claim());
        assert_eq!(restored.nonce(), Some("n-1"));
        assert_eq!(restored.jti(), credential.jti());
        assert_eq!(restored.version(), CredentialVersion::V1_0);
        assert_eq!(restored.types(), credential.types());
        assert_eq!(restored.duration(), 1_000);
    }

    #[test]
    fn test_v11_commitment_flow() {
        let holder = holder();
        let mut credential = Credential::from_key_holder(&holder, CredentialVersion::V1_1)
            .with_claim(claims());
        assert!(credential.as_token(1, 2).is_err());

        let param = credential.commit_claims(HashAlgorithm::Sha256, 16).unwrap();
        let token = credential.as_token(1, 2).unwrap();
        assert_eq!(token.payload().claim.as_ref().unwrap()["attributeType"], "hash");

        let restored = Credential::from_token(&token).unwrap();
        assert!(restored.claim().is_empty());
        assert_eq!(restored.types(), vec!["CREDENTIAL", "name", "age"]);
        assert!(restored.verify_disclosure(&param).unwrap().success);
        assert!(restored.verify_disclosure(&param.select(&["age"])).unwrap().success);

        let mut forged = param.select(&["age"]);
        forged.value.insert("age".into(), json!("30"));
        assert!(!restored.verify_disclosure(&forged).unwrap().success);
    }

    #[test]
    fn test_commit_requires_v11() {
        let mut credential = Credential::from_key_holder(&holder(), CredentialVersion::V1_0)
            .with_claim(claims());
        assert!(matches!(
            credential.commit_claims(HashAlgorithm::Sha256, 16),
            Err(IdentityError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_v20_json_ld_flow() {
        let mut credential = Credential::from_key_holder(&holder(), CredentialVersion::V2_0)
            .with_target_did("did:method:holder")
            .with_claim(claims());
        let param = credential.attach_json_ld(HashAlgorithm::Sha256).unwrap().clone();
        assert_eq!(credential.types(), vec!["CREDENTIAL", "age", "name"]);

        let token = credential.as_token(1, 2).unwrap();
        let restored = Credential::from_token(&token).unwrap();
        let vc = restored.vc().unwrap();
        assert_eq!(vc.credential_subject.id.as_deref(), Some("did:method:holder"));
        assert!(restored.verify_json_ld(&param).unwrap().success);
        assert!(restored.verify_json_ld(&param.select(&["name"])).unwrap().success);
    }

    #[test]
    fn test_from_token_requires_version() {
        let credential = Credential::from_key_holder(&holder(), CredentialVersion::V1_0)
            .with_claim(claims());
        let mut token = credential.as_token(1, 2).unwrap();
        token.payload_mut().version = None;
        assert!(matches!(
            Credential::from_token(&token),
            Err(IdentityError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_from_token_rejects_mismatched_issuer() {
        let credential = Credential::from_key_holder(&holder(), CredentialVersion::V1_0)
            .with_claim(claims());
        let mut token = credential.as_token(1, 2).unwrap();
        token.payload_mut().iss = Some("did:method:someone-else".into());
        assert!(matches!(
            Credential::from_token(&token),
            Err(IdentityError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_as_token_now_uses_duration() {
        let credential = Credential::from_key_holder(&holder(), CredentialVersion::V1_0)
            .with_claim(claims())
            .with_duration(5_000_000);
        let token = credential.as_token_now().unwrap();
        let payload = token.payload();
        assert_eq!(payload.exp.unwrap() - payload.iat.unwrap(), 5_000_000);
    }
}
