/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    SigningError(String),

    #[error("curve mismatch: local {local}, remote {remote}")]
    CurveMismatch { local: String, remote: String },

    #[error("key agreement failed: {0}")]
    KeyAgreementFailure(String),

    #[error("encryption failed: {0}")]
    EncryptionError(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error(transparent)]
    Core(#[from] credo_core::CoreError),
}
