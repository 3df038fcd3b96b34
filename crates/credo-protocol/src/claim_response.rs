use credo_core::time::now_micros;
use credo_core::VerifyResult;
use credo_crypto::{AlgorithmProvider, AlgorithmType, EphemeralPublicKey, PublicKey};
use credo_identity::{DidKeyHolder, Header, Payload, Token};
use serde::{Deserialize, Serialize};

use crate::claim_request::{resolve_kid, validate_token, Direction};
use crate::error::ProtocolError;
use crate::message_type::ProtocolType;

/// Outcome reported by a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseResult {
    pub result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A reply to a request: DID authentication, credential result or
/// revocation result.
#[derive(Debug, Clone)]
pub struct ClaimResponse {
    token: Token,
    response_type: ProtocolType,
}

impl ClaimResponse {
    pub fn builder(response_type: ProtocolType) -> ClaimResponseBuilder {
        ClaimResponseBuilder::new(response_type)
    }

    pub fn from_token(token: Token) -> Result<Self, ProtocolError> {
        let response_type = validate_token(&token, Direction::Response)?;
        Ok(Self {
            token,
            response_type,
        })
    }

    pub fn from_encoded(compact: &str) -> Result<Self, ProtocolError> {
        Self::from_token(Token::decode(compact)?)
    }

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

    pub fn response_type(&self) -> ProtocolType {
        self.response_type
    }

    pub fn algorithm(&self) -> &str {
        &self.token.header().alg
    }

    pub fn did(&self) -> Option<&str> {
        self.token.header().did()
    }

    pub fn kid(&self) -> Option<&str> {
        self.token.header().kid.as_deref()
    }

    pub fn key_id(&self) -> Option<&str> {
        self.token.header().key_id()
    }

    pub fn nonce(&self) -> Option<&str> {
        self.token.payload().nonce.as_deref()
    }

    pub fn public_key(&self) -> Option<&EphemeralPublicKey> {
        self.token.payload().public_key.as_ref()
    }

    /// Responder DID.
    pub fn request_id(&self) -> Option<&str> {
        self.token.payload().iss.as_deref()
    }

    /// DID of the party being answered.
    pub fn response_id(&self) -> Option<&str> {
        let payload = self.token.payload();
        payload.aud.as_deref().or(payload.sub.as_deref())
    }

    pub fn response_date(&self) -> Option<i64> {
        self.token.payload().iat
    }

    pub fn version(&self) -> Option<&str> {
        self.token.payload().version.as_deref()
    }

    pub fn result(&self) -> Option<bool> {
        self.token.payload().result
    }

    pub fn error_code(&self) -> Option<&str> {
        self.token.payload().error_code.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.token.payload().error_message.as_deref()
    }

    /// `result` plus error details. A response without `result` reads as
    /// a failure.
    pub fn response_result(&self) -> ResponseResult {
        ResponseResult {
            result: self.result().unwrap_or(false),
            error_code: self.error_code().map(String::from),
            error_message: self.error_message().map(String::from),
        }
    }

    pub fn verify(
        &self,
        provider: &AlgorithmProvider,
        public_key: &PublicKey,
    ) -> Result<VerifyResult, ProtocolError> {
        Ok(self.token.verify(provider, public_key)?)
    }

    pub fn verify_result_time(&self, valid_window: i64) -> VerifyResult {
        self.token.verify_issued_at(valid_window)
    }
}

#[derive(Debug, Clone)]
pub struct ClaimResponseBuilder {
    response_type: ProtocolType,
    algorithm: AlgorithmType,
    did: Option<String>,
    public_key_id: Option<String>,
    kid: Option<String>,
    response_id: Option<String>,
    version: Option<String>,
    nonce: Option<String>,
    public_key: Option<EphemeralPublicKey>,
    response_date: Option<i64>,
    result: Option<ResponseResult>,
}

impl ClaimResponseBuilder {
    fn new(response_type: ProtocolType) -> Self {
        Self {
            response_type,
            algorithm: AlgorithmType::Es256k,
            did: None,
            public_key_id: None,
            kid: None,
            response_id: None,
            version: None,
            nonce: None,
            public_key: None,
            response_date: None,
            result: None,
        }
    }

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

    pub fn public_key(mut self, key: EphemeralPublicKey) -> Self {
        self.public_key = Some(key);
        self
    }

    pub fn response_date(mut self, iat: i64) -> Self {
        self.response_date = Some(iat);
        self
    }

    pub fn result(mut self, result: ResponseResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn build(self) -> Result<ClaimResponse, ProtocolError> {
        let direction = Direction::Response;
        if !self.response_type.is_response() {
            return Err(direction.error(format!("{} is not a response type", self.response_type)));
        }
        let kid = resolve_kid(
            self.algorithm,
            self.did.as_deref(),
            self.public_key_id.as_deref(),
            self.kid,
            direction,
        )?;

        let (result, error_code, error_message) = match self.result {
            Some(r) => (Some(r.result), r.error_code, r.error_message),
            None => (None, None, None),
        };
        let payload = Payload {
            iss: self.did,
            aud: self.response_id,
            iat: Some(self.response_date.unwrap_or_else(now_micros)),
            nonce: self.nonce,
            types: Some(vec![self.response_type.as_str().to_string()]),
            version: self.version,
            public_key: self.public_key,
            result,
            error_code,
            error_message,
            ..Default::default()
        };
        let header = Header::new(self.algorithm.name(), kid);
        ClaimResponse::from_token(Token::new(header, payload))
    }
}
