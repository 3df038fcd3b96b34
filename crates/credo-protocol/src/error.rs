use credo_core::CoreError;
use credo_crypto::CryptoError;
use credo_identity::IdentityError;

/// Protocol layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid message type: {0}")]
    InvalidMessageType(String),

    #[error("invalid param: {0}")]
    InvalidParam(String),

    #[error("a DID key holder is required to sign {0}")]
    MissingKeyHolder(String),

    #[error("a local ephemeral key is required to encrypt for the requester")]
    MissingEncryptionKey,

    #[error("message is already decrypted")]
    AlreadyDecrypted,

    #[error("message is not decrypted yet")]
    NotDecrypted,

    #[error("wrong message type: expected a {expected} message, got {actual}")]
    WrongMessageType { expected: String, actual: String },

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("crypto error: {0}")]
    Crypto(#[source] CryptoError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl From<CryptoError> for ProtocolError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed(reason) => ProtocolError::DecryptionFailed(reason),
            other => ProtocolError::Crypto(other),
        }
    }
}
