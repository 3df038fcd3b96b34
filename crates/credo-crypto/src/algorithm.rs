//! Signature algorithm registry.
//!
//! Tokens name their algorithm in the `alg` header. An [`AlgorithmProvider`]
//! maps that tag to a signing capability; callers build one and pass it to
//! every sign/verify call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::Signature;

use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// Algorithm tags known to the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmType {
    Rs256,
    Es256,
    Es256k,
    None,
}

impl AlgorithmType {
    /// Tag used in the token `alg` header.
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmType::Rs256 => "RS256",
            AlgorithmType::Es256 => "ES256",
            AlgorithmType::Es256k => "ES256K",
            AlgorithmType::None => "none",
        }
    }

    /// Key type identifier used in DID documents.
    pub fn identifier(&self) -> &'static str {
        match self {
            AlgorithmType::Rs256 => "RsaVerificationKey2018",
            AlgorithmType::Es256 => "Secp256r1VerificationKey",
            AlgorithmType::Es256k => "Secp256k1VerificationKey",
            AlgorithmType::None => "none",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CryptoError> {
        match name {
            "RS256" => Ok(AlgorithmType::Rs256),
            "ES256" => Ok(AlgorithmType::Es256),
            "ES256K" => Ok(AlgorithmType::Es256k),
            "none" => Ok(AlgorithmType::None),
            _ => Err(CryptoError::UnsupportedAlgorithm(name.to_string())),
        }
    }

    pub fn from_identifier(identifier: &str) -> Result<Self, CryptoError> {
        [
            AlgorithmType::Rs256,
            AlgorithmType::Es256,
            AlgorithmType::Es256k,
            AlgorithmType::None,
        ]
        .into_iter()
        .find(|alg| alg.identifier() == identifier)
        .ok_or_else(|| CryptoError::UnsupportedAlgorithm(identifier.to_string()))
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sign/verify capability for one algorithm tag.
pub trait Algorithm: Send + Sync {
    fn algorithm_type(&self) -> AlgorithmType;

    fn sign(&self, key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Never errors: a malformed signature simply does not verify.
    fn verify(&self, key: &PublicKey, data: &[u8], signature: &[u8]) -> bool;
}

/// ECDSA over secp256k1 with SHA-256, 64-byte `r || s` signatures.
#[derive(Debug, Default)]
pub struct Es256kAlgorithm;

impl Algorithm for Es256kAlgorithm {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::Es256k
    }

    fn sign(&self, key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signature: Signature = key
            .signing_key()
            .try_sign(data)
            .map_err(|e| CryptoError::SigningError(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&self, key: &PublicKey, data: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(sig) => key.verifying_key().verify(data, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

/// Unsigned tokens. Only valid where trust is established out of band.
#[derive(Debug, Default)]
pub struct NoneAlgorithm;

impl Algorithm for NoneAlgorithm {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::None
    }

    fn sign(&self, _key: &PrivateKey, _data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(Vec::new())
    }

    fn verify(&self, _key: &PublicKey, _data: &[u8], signature: &[u8]) -> bool {
        signature.is_empty()
    }
}

/// Registry of algorithm tag → capability.
#[derive(Clone)]
pub struct AlgorithmProvider {
    algorithms: HashMap<AlgorithmType, Arc<dyn Algorithm>>,
}

impl AlgorithmProvider {
    /// Registry with ES256K and `none`.
    pub fn new() -> Self {
        let mut provider = Self::empty();
        provider.register(Arc::new(Es256kAlgorithm));
        provider.register(Arc::new(NoneAlgorithm));
        provider
    }

    pub fn empty() -> Self {
        Self {
            algorithms: HashMap::new(),
        }
    }

    /// Register (or replace) the capability for its algorithm tag.
    pub fn register(&mut self, algorithm: Arc<dyn Algorithm>) {
        self.algorithms.insert(algorithm.algorithm_type(), algorithm);
    }

    pub fn get(&self, algorithm_type: AlgorithmType) -> Result<Arc<dyn Algorithm>, CryptoError> {
        self.algorithms
            .get(&algorithm_type)
            .cloned()
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(algorithm_type.name().to_string()))
    }

    /// Look up a capability by its `alg` header tag.
    pub fn create(&self, tag: &str) -> Result<Arc<dyn Algorithm>, CryptoError> {
        self.get(AlgorithmType::from_name(tag)?)
    }

    pub fn supports(&self, algorithm_type: AlgorithmType) -> bool {
        self.algorithms.contains_key(&algorithm_type)
    }
}

impl Default for AlgorithmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AlgorithmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.algorithms.keys().map(|a| a.name()).collect();
        names.sort_unstable();
        f.debug_struct("AlgorithmProvider")
            .field("algorithms", &names)
            .finish()
    }
}
