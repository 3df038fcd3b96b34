use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Type tag of a protocol message. The same tag is the first entry of the
/// `type` list in request and response tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolType {
    #[serde(rename = "REQ_CREDENTIAL")]
    RequestCredential,
    #[serde(rename = "REQ_PRESENTATION")]
    RequestPresentation,
    #[serde(rename = "DID_INIT")]
    DidInit,
    #[serde(rename = "REQ_REVOCATION")]
    RequestRevocation,
    #[serde(rename = "RES_CREDENTIAL")]
    ResponseCredential,
    #[serde(rename = "RES_PROTECTED_CREDENTIAL")]
    ResponseProtectedCredential,
    #[serde(rename = "RES_PRESENTATION")]
    ResponsePresentation,
    #[serde(rename = "RES_PROTECTED_PRESENTATION")]
    ResponseProtectedPresentation,
    #[serde(rename = "DID_AUTH")]
    DidAuth,
    #[serde(rename = "CREDENTIAL_RESULT")]
    CredentialResult,
    #[serde(rename = "RES_REVOCATION")]
    ResponseRevocation,
}

const ALL: [ProtocolType; 11] = [
    ProtocolType::RequestCredential,
    ProtocolType::RequestPresentation,
    ProtocolType::DidInit,
    ProtocolType::RequestRevocation,
    ProtocolType::ResponseCredential,
    ProtocolType::ResponseProtectedCredential,
    ProtocolType::ResponsePresentation,
    ProtocolType::ResponseProtectedPresentation,
    ProtocolType::DidAuth,
    ProtocolType::CredentialResult,
    ProtocolType::ResponseRevocation,
];

impl ProtocolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolType::RequestCredential => "REQ_CREDENTIAL",
            ProtocolType::RequestPresentation => "REQ_PRESENTATION",
            ProtocolType::DidInit => "DID_INIT",
            ProtocolType::RequestRevocation => "REQ_REVOCATION",
            ProtocolType::ResponseCredential => "RES_CREDENTIAL",
            ProtocolType::ResponseProtectedCredential => "RES_PROTECTED_CREDENTIAL",
            ProtocolType::ResponsePresentation => "RES_PRESENTATION",
            ProtocolType::ResponseProtectedPresentation => "RES_PROTECTED_PRESENTATION",
            ProtocolType::DidAuth => "DID_AUTH",
            ProtocolType::CredentialResult => "CREDENTIAL_RESULT",
            ProtocolType::ResponseRevocation => "RES_REVOCATION",
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(
            self,
            ProtocolType::RequestCredential
                | ProtocolType::RequestPresentation
                | ProtocolType::DidInit
                | ProtocolType::RequestRevocation
        )
    }

    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            ProtocolType::ResponseCredential | ProtocolType::ResponseProtectedCredential
        )
    }

    pub fn is_presentation(&self) -> bool {
        matches!(
            self,
            ProtocolType::ResponsePresentation | ProtocolType::ResponseProtectedPresentation
        )
    }

    pub fn is_response(&self) -> bool {
        matches!(
            self,
            ProtocolType::DidAuth
                | ProtocolType::CredentialResult
                | ProtocolType::ResponseRevocation
        )
    }

    /// Category name used in error messages.
    pub fn category(&self) -> &'static str {
        if self.is_request() {
            "request"
        } else if self.is_credential() {
            "credential"
        } else if self.is_presentation() {
            "presentation"
        } else {
            "response"
        }
    }
}

impl FromStr for ProtocolType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidMessageType(s.to_string()))
    }
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
