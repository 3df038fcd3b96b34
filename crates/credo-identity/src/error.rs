use credo_core::CoreError;
use credo_crypto::CryptoError;

/// Identity layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token is not signed")]
    MissingSignature,

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    #[error("algorithm mismatch: key holder uses {expected}, token header says {actual}")]
    AlgorithmMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("DID document not found: {0}")]
    DocumentNotFound(String),

    #[error("public key not found: {0}")]
    KeyNotFound(String),

    #[error("public key revoked: {0}")]
    KeyRevoked(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
