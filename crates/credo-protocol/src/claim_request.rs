use credo_core::time::now_micros;
use credo_core::VerifyResult;
use credo_crypto::{AlgorithmProvider, AlgorithmType, EphemeralPublicKey, PublicKey};
use credo_identity::{DidKeyHolder, Header, Payload, Token};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::json_ld_request::{JsonLdVcr, JsonLdVpr};
use crate::message_type::ProtocolType;

/// Which side of the handshake a token belongs to. Selects the error
/// variant and the allowed type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Request,
    Response,
}

impl Direction {
    pub(crate) fn error(&self, message: String) -> ProtocolError {
        match self {
            Direction::Request => ProtocolError::InvalidRequest(message),
            Direction::Response => ProtocolError::InvalidResponse(message),
        }
    }

    fn accepts(&self, message_type: ProtocolType) -> bool {
        match self {
            Direction::Request => message_type.is_request(),
            Direction::Response => message_type.is_response(),
        }
    }
}

/// Validation shared by requests and responses, whether built locally or
/// parsed from the wire. Returns the type tag.
pub(crate) fn validate_token(
    token: &Token,
    direction: Direction,
) -> Result<ProtocolType, ProtocolError> {
    let header = token.header();
    let payload = token.payload();

    if payload.version.as_deref().map_or(true, str::is_empty) {
        return Err(direction.error("version is required".into()));
    }

    let tag = payload
        .primary_type()
        .ok_or_else(|| direction.error("type is required".into()))?;
    let message_type: ProtocolType = tag
        .parse()
        .map_err(|_| direction.error(format!("unknown type {}", tag)))?;
    if !direction.accepts(message_type) {
        return Err(direction.error(format!(
            "{} is a {} type",
            message_type,
            message_type.category()
        )));
    }

    let has_response_id = payload.aud.as_deref().or(payload.sub.as_deref()).is_some();
    let needs_response_id = !matches!(
        message_type,
        ProtocolType::RequestPresentation | ProtocolType::DidInit
    );
    if needs_response_id && !has_response_id {
        return Err(direction.error("responseId is required".into()));
    }

    let algorithm = AlgorithmType::from_name(&header.alg)
        .map_err(|_| direction.error(format!("unsupported algorithm {}", header.alg)))?;
    if algorithm == AlgorithmType::None {
        if message_type != ProtocolType::RequestPresentation {
            return Err(direction.error(format!(
                "algorithm none is only allowed for {}",
                ProtocolType::RequestPresentation
            )));
        }
    } else if header.did().is_none() || header.key_id().is_none() {
        return Err(direction.error("kid must be <did>#<keyId> for signed messages".into()));
    }

    Ok(message_type)
}

/// Shared `kid` defaulting: explicit kid, else `did#publicKeyId`.
pub(crate) fn resolve_kid(
    algorithm: AlgorithmType,
    did: Option<&str>,
    public_key_id: Option<&str>,
    kid: Option<String>,
    direction: Direction,
) -> Result<Option<String>, ProtocolError> {
    let derived = match (did, public_key_id) {
        (Some(did), Some(key_id)) => Some(format!("{}#{}", did, key_id)),
        _ => None,
    };
    if algorithm == AlgorithmType::None {
        return Ok(kid.or(derived));
    }
    if did.is_none() {
        return Err(direction.error("did is required".into()));
    }
    kid.or(derived)
        .map(Some)
        .ok_or_else(|| direction.error("publicKeyId is required".into()))
}

/// A request to an issuer (credential, revocation, DID init) or to a
/// holder (presentation).
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    token: Token,
    request_type: ProtocolType,
}

impl ClaimRequest {
    pub fn builder(request_type: ProtocolType) -> ClaimRequestBuilder {
        ClaimRequestBuilder::new(request_type)
    }

    pub fn from_token(token: Token) -> Result<Self, ProtocolError> {
        let request_type = validate_token(&token, Direction::Request)?;
        Ok(Self {
            token,
            request_type,
        })
    }

    pub fn from_encoded(compact: &str) -> Result<Self, ProtocolError> {
        Self::from_token(Token::decode(compact)?)
    }

    /// Sign in place and return the compact token.
    pub fn sign(
        &mut self,
        provider: &AlgorithmProvider,
        holder: &DidKeyHolder,
    ) -> Result<String, ProtocolError> {
        Ok(holder.sign(provider, &mut self.token)?)
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn compact(&self) -> Result<String, ProtocolError> {
        Ok(self.token.compact()?)
    }

    pub fn request_type(&self) -> ProtocolType {
        self.request_type
    }

    pub fn algorithm(&self) -> &str {
        &self.token.header().alg
    }

    pub fn claims(&self) -> Option<&Map<String, Value>> {
        self.token.payload().request_claim.as_ref()
    }

    /// Requested claim types: the `type` list without the leading tag.
    pub fn claim_types(&self) -> &[String] {
        self.token
            .payload()
            .types
            .as_deref()
            .and_then(|types| types.get(1..))
            .unwrap_or_default()
    }

    pub fn did(&self) -> Option<&str> {
        self.token.header().did()
    }

    /// Full `did#keyId`.
    pub fn kid(&self) -> Option<&str> {
        self.token.header().kid.as_deref()
    }

    pub fn key_id(&self) -> Option<&str> {
        self.token.header().key_id()
    }

    pub fn nonce(&self) -> Option<&str> {
        self.token.payload().nonce.as_deref()
    }

    /// Requester's ephemeral key; responses are encrypted to it.
    pub fn public_key(&self) -> Option<&EphemeralPublicKey> {
        self.token.payload().public_key.as_ref()
    }

    pub fn request_date(&self) -> Option<i64> {
        self.token.payload().iat
    }

    pub fn request_id(&self) -> Option<&str> {
        self.token.payload().iss.as_deref()
    }

    pub fn response_id(&self) -> Option<&str> {
        let payload = self.token.payload();
        payload.aud.as_deref().or(payload.sub.as_deref())
    }

    /// Revocation signature.
    pub fn signature(&self) -> Option<&str> {
        self.token.payload().sig.as_deref()
    }

    pub fn vc_id(&self) -> Option<&str> {
        self.token.payload().vc_id.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.token.payload().version.as_deref()
    }

    pub fn vcr(&self) -> Result<Option<JsonLdVcr>, ProtocolError> {
        self.token
            .payload()
            .vcr
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ProtocolError::InvalidRequest(format!("vcr: {}", e)))
    }

    pub fn vpr(&self) -> Result<Option<JsonLdVpr>, ProtocolError> {
        self.token
            .payload()
            .vpr
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ProtocolError::InvalidRequest(format!("vpr: {}", e)))
    }

    pub fn verify(
        &self,
        provider: &AlgorithmProvider,
        public_key: &PublicKey,
    ) -> Result<VerifyResult, ProtocolError> {
        Ok(self.token.verify(provider, public_key)?)
    }

    /// Checks that the request was issued within `valid_window` microseconds.
    pub fn verify_result_time(&self, valid_window: i64) -> VerifyResult {
        self.token.verify_issued_at(valid_window)
    }
}

/// Builder for [`ClaimRequest`]. `build` runs the same validation as parsing.
#[derive(Debug, Clone)]
pub struct ClaimRequestBuilder {
    request_type: ProtocolType,
    algorithm: AlgorithmType,
    did: Option<String>,
    public_key_id: Option<String>,
    kid: Option<String>,
    response_id: Option<String>,
    version: Option<String>,
    nonce: Option<String>,
    claims: Map<String, Value>,
    claim_types: Vec<String>,
    public_key: Option<EphemeralPublicKey>,
    request_date: Option<i64>,
    expiration: Option<i64>,
    vc_id: Option<String>,
    signature: Option<String>,
    vcr: Option<JsonLdVcr>,
    vpr: Option<JsonLdVpr>,
}

impl ClaimRequestBuilder {
    fn new(request_type: ProtocolType) -> Self {
        Self {
            request_type,
            algorithm: AlgorithmType::Es256k,
            did: None,
            public_key_id: None,
            kid: None,
            response_id: None,
            version: None,
            nonce: None,
            claims: Map::new(),
            claim_types: Vec::new(),
            public_key: None,
            request_date: None,
            expiration: None,
            vc_id: None,
            signature: None,
            vcr: None,
            vpr: None,
        }
    }

    /// Take did, key id and algorithm from the signer.
    pub fn key_holder(mut self, holder: &DidKeyHolder) -> Self {
        self.algorithm = holder.algorithm();
        self.did = Some(holder.did().to_string());
        self.public_key_id = Some(holder.key_id().to_string());
        self
    }

    pub fn algorithm(mut self, algorithm: AlgorithmType) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn did(mut self, did: impl Into<String>) -> Self {
        self.did = Some(did.into());
        self
    }

    pub fn public_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.public_key_id = Some(key_id.into());
        self
    }

    pub fn kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn response_id(mut self, response_id: impl Into<String>) -> Self {
        self.response_id = Some(response_id.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn claims(mut self, claims: Map<String, Value>) -> Self {
        self.claims = claims;
        self
    }

    /// Requested claim types. Defaults to the claim names.
    pub fn claim_types(mut self, types: Vec<String>) -> Self {
        self.claim_types = types;
        self
    }

    pub fn public_key(mut self, key: EphemeralPublicKey) -> Self {
        self.public_key = Some(key);
        self
    }

    pub fn request_date(mut self, iat: i64) -> Self {
        self.request_date = Some(iat);
        self
    }

    pub fn expiration(mut self, exp: i64) -> Self {
        self.expiration = Some(exp);
        self
    }

    pub fn vc_id(mut self, vc_id: impl Into<String>) -> Self {
        self.vc_id = Some(vc_id.into());
        self
    }

    pub fn signature(mut self, sig: impl Into<String>) -> Self {
        self.signature = Some(sig.into());
        self
    }

    pub fn vcr(mut self, vcr: JsonLdVcr) -> Self {
        self.vcr = Some(vcr);
        self
    }

    pub fn vpr(mut self, vpr: JsonLdVpr) -> Self {
        self.vpr = Some(vpr);
        self
    }

    pub fn build(self) -> Result<ClaimRequest, ProtocolError> {
        let direction = Direction::Request;
        if !self.request_type.is_request() {
            return Err(direction.error(format!("{} is not a request type", self.request_type)));
        }
        let kid = resolve_kid(
            self.algorithm,
            self.did.as_deref(),
            self.public_key_id.as_deref(),
            self.kid,
            direction,
        )?;

        let mut types = vec![self.request_type.as_str().to_string()];
        if self.claim_types.is_empty() {
            types.extend(self.claims.keys().cloned());
        } else {
            types.extend(self.claim_types);
        }

        let payload = Payload {
            iss: self.did,
            aud: self.response_id,
            iat: Some(self.request_date.unwrap_or_else(now_micros)),
            exp: self.expiration,
            nonce: self.nonce,
            types: Some(types),
            version: self.version,
            request_claim: (!self.claims.is_empty()).then_some(self.claims),
            public_key: self.public_key,
            vc_id: self.vc_id,
            sig: self.signature,
            vcr: self.vcr.as_ref().map(to_json).transpose()?,
            vpr: self.vpr.as_ref().map(to_json).transpose()?,
            ..Default::default()
        };
        let header = Header::new(self.algorithm.name(), kid);
        ClaimRequest::from_token(Token::new(header, payload))
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(|e| ProtocolError::Serialization(e.to_string()))
}
