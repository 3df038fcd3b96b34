use credo_crypto::{AlgorithmProvider, AlgorithmType, PrivateKey, PublicKey};

use crate::error::IdentityError;
use crate::token::Token;

/// Signing identity: a DID, one of its key ids and the matching private key.
#[derive(Debug, Clone)]
pub struct DidKeyHolder {
    did: String,
    key_id: String,
    algorithm: AlgorithmType,
    private_key: PrivateKey,
}

impl DidKeyHolder {
    pub fn new(
        did: impl Into<String>,
        key_id: impl Into<String>,
        algorithm: AlgorithmType,
        private_key: PrivateKey,
    ) -> Self {
        Self {
            did: did.into(),
            key_id: key_id.into(),
            algorithm,
            private_key,
        }
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> AlgorithmType {
        self.algorithm
    }

    /// `did#keyId` as written into token headers.
    pub fn kid(&self) -> String {
        format!("{}#{}", self.did, self.key_id)
    }

    pub fn public_key(&self) -> PublicKey {
        self.private_key.public_key()
    }

    /// Sign `token` and return its compact form. The token header must name
    /// this holder's algorithm.
    pub fn sign(
        &self,
        provider: &AlgorithmProvider,
        token: &mut Token,
    ) -> Result<String, IdentityError> {
        if token.header().alg != self.algorithm.name() {
            return Err(IdentityError::AlgorithmMismatch {
                expected: self.algorithm.name().to_string(),
                actual: token.header().alg.clone(),
            });
        }
        token.sign(provider, &self.private_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Header, Payload};

    fn holder() -> DidKeyHolder {
        DidKeyHolder::new(
            "did:method:issuer",
            "key-1",
            AlgorithmType::Es256k,
            PrivateKey::generate(),
        )
    }

    #[test]
    fn test_kid_format() {
        assert_eq!(holder().kid(), "did:method:issuer#key-1");
    }

    #[test]
    fn test_sign_produces_verifiable_token() {
        let provider = AlgorithmProvider::new();
        let holder = holder();
        let mut token = Token::new(Header::new("ES256K", Some(holder.kid())), Payload::default());
        let compact = holder.sign(&provider, &mut token).unwrap();

        let decoded = Token::decode(&compact).unwrap();
        assert!(decoded.verify(&provider, &holder.public_key()).unwrap().success);
    }

    #[test]
    fn test_sign_rejects_algorithm_mismatch() {
        let provider = AlgorithmProvider::new();
        let mut token = Token::new(Header::new("none", None), Payload::default());
        let result = holder().sign(&provider, &mut token);
        assert!(matches!(result, Err(IdentityError::AlgorithmMismatch { .. })));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let printed = format!("{:?}", holder());
        assert!(printed.contains("PrivateKey(..)"));
    }
}
