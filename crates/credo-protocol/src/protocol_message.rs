//! Protocol message envelope.
//!
//! A message is sent as `{type, protected, param?}`. `protected` is either
//! the signed compact token or, when the requester supplied an ephemeral
//! key, a compact JWE whose plaintext is the inner `{type, protected,
//! param?}` object. Inner envelopes are always plaintext.

use credo_core::encoding::{b64url_decode, b64url_encode};
use credo_core::time::now_micros;
use credo_core::VerifyResult;
use credo_crypto::{
    AlgorithmProvider, DisclosureParam, EphemeralKey, EphemeralPublicKey, Jwe, PublicKey,
};
use credo_identity::{
    ConvertToken, Credential, CredentialVersion, DidKeyHolder, JsonLdParam, Presentation, Token,
};
use serde::{Deserialize, Serialize};

use crate::claim_request::ClaimRequest;
use crate::claim_response::ClaimResponse;
use crate::error::ProtocolError;
use crate::message_type::ProtocolType;

/// Wire form of a protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEnvelope {
    #[serde(rename = "type")]
    pub message_type: ProtocolType,
    pub protected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl ProtocolEnvelope {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json)
            .map_err(|e| ProtocolError::Serialization(format!("envelope: {}", e)))
    }

    pub fn is_encrypted(&self) -> bool {
        Jwe::is_compact(&self.protected)
    }
}

/// Disclosure material shipped alongside a credential.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialParam {
    /// 1.1 hash commitment reveal.
    Disclosure(DisclosureParam),
    /// 2.0 JSON-LD claim param.
    JsonLd(JsonLdParam),
}

impl CredentialParam {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        match self {
            CredentialParam::Disclosure(param) => {
                let json = serde_json::to_vec(param)
                    .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
                Ok(b64url_encode(json))
            }
            CredentialParam::JsonLd(param) => Ok(param.encode()?),
        }
    }

    /// Parse an encoded param according to the credential version.
    pub fn decode(encoded: &str, version: CredentialVersion) -> Result<Self, ProtocolError> {
        match version {
            CredentialVersion::V1_1 => {
                let bytes = b64url_decode(encoded)?;
                let param = serde_json::from_slice(&bytes)
                    .map_err(|e| ProtocolError::InvalidParam(format!("disclosure: {}", e)))?;
                Ok(CredentialParam::Disclosure(param))
            }
            CredentialVersion::V2_0 => Ok(CredentialParam::JsonLd(JsonLdParam::decode(encoded)?)),
            CredentialVersion::V1_0 => Err(ProtocolError::InvalidParam(
                "version 1.0 credentials carry no param".into(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
enum Body {
    Request(ClaimRequest),
    Response(ClaimResponse),
    Credential(Credential),
    Presentation(Presentation),
}

/// A protocol message on either side of the wire.
///
/// Outgoing messages are built with one of the `for_*` constructors and
/// turned into an envelope by [`sign_encrypt`](Self::sign_encrypt).
/// Incoming messages come from [`from_envelope`](Self::from_envelope);
/// protected ones must be [`decrypt`](Self::decrypt)ed before their typed
/// views are readable.
#[derive(Debug, Clone)]
pub struct ProtocolMessage {
    message_type: ProtocolType,
    body: Option<Body>,
    issued: Option<i64>,
    expiration: Option<i64>,
    request_public_key: Option<EphemeralPublicKey>,
    plain_message: Option<String>,
    protected_message: Option<String>,
    jwe: Option<Jwe>,
    param_string: Option<String>,
    param: Option<CredentialParam>,
    decrypted: bool,
}

impl ProtocolMessage {
    fn outgoing(
        message_type: ProtocolType,
        body: Body,
        request_public_key: Option<EphemeralPublicKey>,
    ) -> Self {
        Self {
            message_type,
            body: Some(body),
            issued: None,
            expiration: None,
            request_public_key,
            plain_message: None,
            protected_message: None,
            jwe: None,
            param_string: None,
            param: None,
            decrypted: true,
        }
    }

    fn require_category(
        message_type: ProtocolType,
        accepted: bool,
        category: &str,
    ) -> Result<(), ProtocolError> {
        if accepted {
            Ok(())
        } else {
            Err(ProtocolError::InvalidMessageType(format!(
                "{} is not a {} type",
                message_type, category
            )))
        }
    }

    pub fn for_request(
        message_type: ProtocolType,
        request: ClaimRequest,
        request_public_key: Option<EphemeralPublicKey>,
    ) -> Result<Self, ProtocolError> {
        Self::require_category(message_type, message_type.is_request(), "request")?;
        if request.request_type() != message_type {
            return Err(ProtocolError::InvalidMessageType(format!(
                "request is {}, envelope is {}",
                request.request_type(),
                message_type
            )));
        }
        Ok(Self::outgoing(message_type, Body::Request(request), request_public_key))
    }

    pub fn for_response(
        message_type: ProtocolType,
        response: ClaimResponse,
        request_public_key: Option<EphemeralPublicKey>,
    ) -> Result<Self, ProtocolError> {
        Self::require_category(message_type, message_type.is_response(), "response")?;
        if response.response_type() != message_type {
            return Err(ProtocolError::InvalidMessageType(format!(
                "response is {}, envelope is {}",
                response.response_type(),
                message_type
            )));
        }
        Ok(Self::outgoing(message_type, Body::Response(response), request_public_key))
    }

    pub fn for_credential(
        message_type: ProtocolType,
        credential: Credential,
        request_public_key: Option<EphemeralPublicKey>,
    ) -> Result<Self, ProtocolError> {
        Self::require_category(message_type, message_type.is_credential(), "credential")?;
        Ok(Self::outgoing(message_type, Body::Credential(credential), request_public_key))
    }

    pub fn for_presentation(
        message_type: ProtocolType,
        presentation: Presentation,
        request_public_key: Option<EphemeralPublicKey>,
    ) -> Result<Self, ProtocolError> {
        Self::require_category(message_type, message_type.is_presentation(), "presentation")?;
        Ok(Self::outgoing(message_type, Body::Presentation(presentation), request_public_key))
    }

    /// Fix the token validity of a credential or presentation. Without it
    /// the token is issued now for the object's own duration.
    pub fn with_validity(mut self, issued: i64, expiration: i64) -> Self {
        self.issued = Some(issued);
        self.expiration = Some(expiration);
        self
    }

    fn validity<T: ConvertToken>(&self, item: &T) -> (i64, i64) {
        let issued = self.issued.unwrap_or_else(now_micros);
        let expiration = self
            .expiration
            .unwrap_or_else(|| issued.saturating_add(item.duration()));
        (issued, expiration)
    }

    fn sign_with(
        holder: Option<&DidKeyHolder>,
        provider: &AlgorithmProvider,
        token: &mut Token,
        message_type: ProtocolType,
    ) -> Result<String, ProtocolError> {
        let holder =
            holder.ok_or_else(|| ProtocolError::MissingKeyHolder(message_type.to_string()))?;
        Ok(holder.sign(provider, token)?)
    }

    /// Sign the wrapped object and produce the envelope.
    ///
    /// Presentation requests using the `none` algorithm are sent unsigned and
    /// need no key holder. When a requester key is attached the signed token
    /// is encrypted to it with `local_key`.
    pub fn sign_encrypt(
        &mut self,
        provider: &AlgorithmProvider,
        holder: Option<&DidKeyHolder>,
        local_key: Option<&EphemeralKey>,
    ) -> Result<ProtocolEnvelope, ProtocolError> {
        let message_type = self.message_type;
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| {
                ProtocolError::InvalidMessageType("message has no body to sign".into())
            })?;

        let (compact, param) = match body {
            Body::Request(request) => {
                let compact = if request.algorithm() == credo_crypto::AlgorithmType::None.name() {
                    request.compact()?
                } else {
                    let mut token = request.token().clone();
                    Self::sign_with(holder, provider, &mut token, message_type)?
                };
                (compact, None)
            }
            Body::Response(response) => {
                let mut token = response.token().clone();
                (Self::sign_with(holder, provider, &mut token, message_type)?, None)
            }
            Body::Credential(credential) => {
                let (issued, expiration) = self.validity(credential);
                let mut token = credential.as_token(issued, expiration)?;
                let compact = Self::sign_with(holder, provider, &mut token, message_type)?;
                let param = match credential.version() {
                    CredentialVersion::V1_0 => None,
                    CredentialVersion::V1_1 => {
                        credential.disclosure().cloned().map(CredentialParam::Disclosure)
                    }
                    CredentialVersion::V2_0 => {
                        credential.json_ld_param().cloned().map(CredentialParam::JsonLd)
                    }
                };
                (compact, param)
            }
            Body::Presentation(presentation) => {
                let (issued, expiration) = self.validity(presentation);
                let mut token = presentation.as_token(issued, expiration)?;
                (Self::sign_with(holder, provider, &mut token, message_type)?, None)
            }
        };

        let param_string = param.as_ref().map(CredentialParam::encode).transpose()?;
        let inner = ProtocolEnvelope {
            message_type,
            protected: compact.clone(),
            param: param_string.clone(),
        };
        self.plain_message = Some(compact);
        self.param_string = param_string;
        self.param = param;

        let Some(recipient) = self.request_public_key.as_ref() else {
            tracing::debug!(message_type = %message_type, "protocol message signed");
            return Ok(inner);
        };

        let local_key = local_key.ok_or(ProtocolError::MissingEncryptionKey)?;
        let plaintext = serde_json::to_vec(&inner)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        let recipient_key = recipient.epk.clone().with_kid(recipient.kid.clone());
        let jwe = Jwe::encrypt(&plaintext, local_key, &recipient_key)?;
        let protected = jwe.compact();

        tracing::debug!(
            message_type = %message_type,
            kid = %recipient.kid,
            "protocol message signed and encrypted"
        );
        self.protected_message = Some(protected.clone());
        self.jwe = Some(jwe);
        Ok(ProtocolEnvelope {
            message_type,
            protected,
            param: None,
        })
    }

    /// Parse a received envelope. Plaintext messages are materialized
    /// immediately; protected ones wait for [`decrypt`](Self::decrypt).
    pub fn from_envelope(envelope: &ProtocolEnvelope) -> Result<Self, ProtocolError> {
        let mut message = Self {
            message_type: envelope.message_type,
            body: None,
            issued: None,
            expiration: None,
            request_public_key: None,
            plain_message: None,
            protected_message: None,
            jwe: None,
            param_string: None,
            param: None,
            decrypted: false,
        };

        if envelope.is_encrypted() {
            message.jwe = Some(Jwe::parse(&envelope.protected)?);
            message.protected_message = Some(envelope.protected.clone());
        } else {
            message.materialize(&envelope.protected, envelope.param.as_deref())?;
        }
        Ok(message)
    }

    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Self::from_envelope(&ProtocolEnvelope::from_json(json)?)
    }

    /// Decrypt a protected message with the local private ephemeral key.
    pub fn decrypt(&mut self, local_key: &EphemeralKey) -> Result<(), ProtocolError> {
        if self.decrypted {
            return Err(ProtocolError::AlreadyDecrypted);
        }
        let jwe = self
            .jwe
            .as_ref()
            .ok_or_else(|| ProtocolError::InvalidMessageType("message carries no JWE".into()))?;
        let plaintext = jwe.decrypt(local_key)?;

        let inner: ProtocolEnvelope = serde_json::from_slice(&plaintext)
            .map_err(|e| ProtocolError::Serialization(format!("inner envelope: {}", e)))?;
        if inner.is_encrypted() {
            return Err(ProtocolError::InvalidMessageType(
                "inner envelope must not be encrypted".into(),
            ));
        }
        if inner.message_type != self.message_type {
            return Err(ProtocolError::InvalidMessageType(format!(
                "inner type {} does not match envelope type {}",
                inner.message_type, self.message_type
            )));
        }

        self.materialize(&inner.protected, inner.param.as_deref())?;
        tracing::debug!(message_type = %self.message_type, "protocol message decrypted");
        Ok(())
    }

    fn materialize(&mut self, compact: &str, param: Option<&str>) -> Result<(), ProtocolError> {
        let token = Token::decode(compact)?;
        let message_type = self.message_type;

        let (body, version) = if message_type.is_request() {
            let request = ClaimRequest::from_token(token)?;
            if request.request_type() != message_type {
                return Err(ProtocolError::InvalidMessageType(format!(
                    "token type {} does not match envelope type {}",
                    request.request_type(),
                    message_type
                )));
            }
            let version = request.version().map(str::to_string);
            (Body::Request(request), version)
        } else if message_type.is_response() {
            let response = ClaimResponse::from_token(token)?;
            if response.response_type() != message_type {
                return Err(ProtocolError::InvalidMessageType(format!(
                    "token type {} does not match envelope type {}",
                    response.response_type(),
                    message_type
                )));
            }
            let version = response.version().map(str::to_string);
            (Body::Response(response), version)
        } else if message_type.is_credential() {
            let credential = Credential::from_token(&token)?;
            let version = Some(credential.version().to_string());
            (Body::Credential(credential), version)
        } else {
            let presentation = Presentation::from_token(&token)?;
            let version = Some(presentation.version().to_string());
            (Body::Presentation(presentation), version)
        };

        if let Some(encoded) = param {
            let version = version
                .as_deref()
                .ok_or_else(|| ProtocolError::InvalidParam("param without a version".into()))?;
            let version: CredentialVersion = version.parse()?;
            self.param = Some(CredentialParam::decode(encoded, version)?);
            self.param_string = Some(encoded.to_string());
        }

        self.body = Some(body);
        self.plain_message = Some(compact.to_string());
        self.decrypted = true;
        Ok(())
    }

    pub fn message_type(&self) -> ProtocolType {
        self.message_type
    }

    pub fn is_decrypted(&self) -> bool {
        self.decrypted
    }

    /// Whether the message arrived or was sent encrypted.
    pub fn is_protected(&self) -> bool {
        self.protected_message.is_some()
    }

    /// Signed compact token, once signed or decrypted.
    pub fn plain_message(&self) -> Option<&str> {
        self.plain_message.as_deref()
    }

    pub fn protected_message(&self) -> Option<&str> {
        self.protected_message.as_deref()
    }

    pub fn param_string(&self) -> Option<&str> {
        self.param_string.as_deref()
    }

    pub fn param(&self) -> Option<&CredentialParam> {
        self.param.as_ref()
    }

    pub fn jwe(&self) -> Option<&Jwe> {
        self.jwe.as_ref()
    }

    /// Recipient key id from the JWE header.
    pub fn jwe_kid(&self) -> Option<&str> {
        self.jwe.as_ref().and_then(|jwe| jwe.header().kid.as_deref())
    }

    /// Sender's ephemeral public key from the JWE header.
    pub fn sender_key(&self) -> Option<&EphemeralKey> {
        self.jwe.as_ref().map(|jwe| &jwe.header().epk)
    }

    fn body(&self) -> Result<&Body, ProtocolError> {
        if !self.decrypted {
            return Err(ProtocolError::NotDecrypted);
        }
        self.body
            .as_ref()
            .ok_or_else(|| ProtocolError::InvalidMessageType("message has no body".into()))
    }

    fn wrong_type(&self, expected: &str) -> ProtocolError {
        ProtocolError::WrongMessageType {
            expected: expected.to_string(),
            actual: self.message_type.to_string(),
        }
    }

    pub fn claim_request(&self) -> Result<&ClaimRequest, ProtocolError> {
        match self.body()? {
            Body::Request(request) => Ok(request),
            _ => Err(self.wrong_type("request")),
        }
    }

    pub fn claim_response(&self) -> Result<&ClaimResponse, ProtocolError> {
        match self.body()? {
            Body::Response(response) => Ok(response),
            _ => Err(self.wrong_type("response")),
        }
    }

    pub fn credential(&self) -> Result<&Credential, ProtocolError> {
        match self.body()? {
            Body::Credential(credential) => Ok(credential),
            _ => Err(self.wrong_type("credential")),
        }
    }

    pub fn presentation(&self) -> Result<&Presentation, ProtocolError> {
        match self.body()? {
            Body::Presentation(presentation) => Ok(presentation),
            _ => Err(self.wrong_type("presentation")),
        }
    }

    /// Verify the signature and expiry of the carried token.
    pub fn verify(
        &self,
        provider: &AlgorithmProvider,
        public_key: &PublicKey,
    ) -> Result<VerifyResult, ProtocolError> {
        if !self.decrypted {
            return Err(ProtocolError::NotDecrypted);
        }
        let compact = self
            .plain_message
            .as_deref()
            .ok_or_else(|| ProtocolError::InvalidMessageType("message is not signed yet".into()))?;
        Ok(Token::decode(compact)?.verify(provider, public_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credo_crypto::{AlgorithmType, CurveType, HashAlgorithm, PrivateKey};
    use serde_json::{json, Map};

    fn issuer() -> DidKeyHolder {
        DidKeyHolder::new(
            "did:method:issuer",
            "key-1",
            AlgorithmType::Es256k,
            PrivateKey::generate(),
        )
    }

    fn credential(issuer: &DidKeyHolder, version: CredentialVersion) -> Credential {
        let mut claims = Map::new();
        claims.insert("age".into(), json!("18"));
        claims.insert("name".into(), json!("Alice"));
        Credential::from_key_holder(issuer, version)
            .with_target_did("did:method:holder")
            .with_claim(claims)
    }

    #[test]
    fn test_plain_credential_envelope() {
        let provider = AlgorithmProvider::new();
        let issuer = issuer();
        let mut message = ProtocolMessage::for_credential(
            ProtocolType::ResponseCredential,
            credential(&issuer, CredentialVersion::V1_0),
            None,
        )
        .unwrap()
        .with_validity(now_micros(), now_micros() + 60_000_000);
        let envelope = message.sign_encrypt(&provider, Some(&issuer), None).unwrap();
        assert!(!envelope.is_encrypted());
        assert!(envelope.param.is_none());

        let received = ProtocolMessage::from_json(&envelope.to_json().unwrap()).unwrap();
        assert!(received.is_decrypted());
        assert!(!received.is_protected());
        assert_eq!(received.credential().unwrap().claim()["age"], "18");
        assert!(received.verify(&provider, &issuer.public_key()).unwrap().success);
    }

    #[test]
    fn test_disclosure_param_travels_with_credential() {
        let provider = AlgorithmProvider::new();
        let issuer = issuer();
        let mut credential = credential(&issuer, CredentialVersion::V1_1);
        let disclosure = credential.commit_claims(HashAlgorithm::Sha256, 16).unwrap();

        let mut message =
            ProtocolMessage::for_credential(ProtocolType::ResponseCredential, credential, None)
                .unwrap();
        let envelope = message.sign_encrypt(&provider, Some(&issuer), None).unwrap();
        assert!(envelope.param.is_some());

        let received = ProtocolMessage::from_envelope(&envelope).unwrap();
        assert_eq!(received.param(), Some(&CredentialParam::Disclosure(disclosure.clone())));
        let restored = received.credential().unwrap();
        assert!(restored.verify_disclosure(&disclosure).unwrap().success);
    }

    #[test]
    fn test_encrypted_roundtrip() {
        let provider = AlgorithmProvider::new();
        let issuer = issuer();
        let requester = EphemeralKey::generate(CurveType::P256K);
        let responder = EphemeralKey::generate(CurveType::P256K);

        let mut credential = credential(&issuer, CredentialVersion::V2_0);
        let param = credential.attach_json_ld(HashAlgorithm::Sha256).unwrap().clone();

        let mut message = ProtocolMessage::for_credential(
            ProtocolType::ResponseProtectedCredential,
            credential,
            Some(EphemeralPublicKey::new("holder-ek", &requester)),
        )
        .unwrap();
        let envelope = message
            .sign_encrypt(&provider, Some(&issuer), Some(&responder))
            .unwrap();
        assert!(envelope.is_encrypted());
        assert!(envelope.param.is_none());

        let mut received = ProtocolMessage::from_envelope(&envelope).unwrap();
        assert!(received.is_protected());
        assert_eq!(received.jwe_kid(), Some("holder-ek"));
        assert!(matches!(received.credential(), Err(ProtocolError::NotDecrypted)));

        received.decrypt(&requester).unwrap();
        assert_eq!(received.param(), Some(&CredentialParam::JsonLd(param.clone())));
        let restored = received.credential().unwrap();
        assert!(restored.verify_json_ld(&param).unwrap().success);
        assert_eq!(received.plain_message(), message.plain_message());

        assert!(matches!(received.decrypt(&requester), Err(ProtocolError::AlreadyDecrypted)));
    }

    #[test]
    fn test_encryption_requires_local_key() {
        let provider = AlgorithmProvider::new();
        let issuer = issuer();
        let requester = EphemeralKey::generate(CurveType::P256K);
        let mut message = ProtocolMessage::for_credential(
            ProtocolType::ResponseProtectedCredential,
            credential(&issuer, CredentialVersion::V1_0),
            Some(EphemeralPublicKey::new("holder-ek", &requester)),
        )
        .unwrap();
        assert!(matches!(
            message.sign_encrypt(&provider, Some(&issuer), None),
            Err(ProtocolError::MissingEncryptionKey)
        ));
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let provider = AlgorithmProvider::new();
        let issuer = issuer();
        let requester = EphemeralKey::generate(CurveType::P256K);
        let responder = EphemeralKey::generate(CurveType::P256K);
        let stranger = EphemeralKey::generate(CurveType::P256K);

        let mut message = ProtocolMessage::for_credential(
            ProtocolType::ResponseProtectedCredential,
            credential(&issuer, CredentialVersion::V1_0),
            Some(EphemeralPublicKey::new("holder-ek", &requester)),
        )
        .unwrap();
        let envelope = message
            .sign_encrypt(&provider, Some(&issuer), Some(&responder))
            .unwrap();
        let mut received = ProtocolMessage::from_envelope(&envelope).unwrap();
        assert!(matches!(
            received.decrypt(&stranger),
            Err(ProtocolError::DecryptionFailed(_))
        ));
        assert!(!received.is_decrypted());
    }

    #[test]
    fn test_unsigned_presentation_request() {
        let provider = AlgorithmProvider::new();
        let request = ClaimRequest::builder(ProtocolType::RequestPresentation)
            .algorithm(AlgorithmType::None)
            .version("1.0")
            .nonce("challenge")
            .build()
            .unwrap();
        let mut message =
            ProtocolMessage::for_request(ProtocolType::RequestPresentation, request, None).unwrap();
        let envelope = message.sign_encrypt(&provider, None, None).unwrap();
        assert!(envelope.protected.ends_with('.'));

        let received = ProtocolMessage::from_envelope(&envelope).unwrap();
        assert_eq!(received.claim_request().unwrap().nonce(), Some("challenge"));
        assert!(matches!(
            received.credential(),
            Err(ProtocolError::WrongMessageType { .. })
        ));
    }

    #[test]
    fn test_signing_requires_key_holder() {
        let provider = AlgorithmProvider::new();
        let issuer = issuer();
        let mut message = ProtocolMessage::for_credential(
            ProtocolType::ResponseCredential,
            credential(&issuer, CredentialVersion::V1_0),
            None,
        )
        .unwrap();
        assert!(matches!(
            message.sign_encrypt(&provider, None, None),
            Err(ProtocolError::MissingKeyHolder(_))
        ));
    }

    #[test]
    fn test_constructors_check_category() {
        let issuer = issuer();
        assert!(matches!(
            ProtocolMessage::for_credential(
                ProtocolType::ResponsePresentation,
                credential(&issuer, CredentialVersion::V1_0),
                None,
            ),
            Err(ProtocolError::InvalidMessageType(_))
        ));
        let presentation = Presentation::from_key_holder(&issuer, CredentialVersion::V1_0);
        assert!(
            ProtocolMessage::for_presentation(ProtocolType::DidAuth, presentation, None).is_err()
        );
    }

    #[test]
    fn test_param_requires_versioned_credential() {
        let provider = AlgorithmProvider::new();
        let issuer = issuer();
        let mut message = ProtocolMessage::for_credential(
            ProtocolType::ResponseCredential,
            credential(&issuer, CredentialVersion::V1_0),
            None,
        )
        .unwrap();
        let mut envelope = message.sign_encrypt(&provider, Some(&issuer), None).unwrap();
        envelope.param = Some("e30".into());
        assert!(matches!(
            ProtocolMessage::from_envelope(&envelope),
            Err(ProtocolError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_envelope_type_must_match_token() {
        let provider = AlgorithmProvider::new();
        let issuer = issuer();
        let mut response = ClaimResponse::builder(ProtocolType::DidAuth)
            .key_holder(&issuer)
            .response_id("did:method:holder")
            .version("1.0")
            .build()
            .unwrap();
        let compact = response.sign(&provider, &issuer).unwrap();
        let envelope = ProtocolEnvelope {
            message_type: ProtocolType::CredentialResult,
            protected: compact,
            param: None,
        };
        assert!(matches!(
            ProtocolMessage::from_envelope(&envelope),
            Err(ProtocolError::InvalidMessageType(_))
        ));
    }
}
