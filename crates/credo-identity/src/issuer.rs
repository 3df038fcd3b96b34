use credo_crypto::AlgorithmType;

use crate::error::IdentityError;
use crate::key_holder::DidKeyHolder;
use crate::token::Token;

/// Reference to the signer of a token, taken from its `kid` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerDid {
    pub did: String,
    pub algorithm: AlgorithmType,
    pub key_id: String,
}

impl IssuerDid {
    pub fn new(
        did: impl Into<String>,
        algorithm: AlgorithmType,
        key_id: impl Into<String>,
    ) -> Self {
        Self {
            did: did.into(),
            algorithm,
            key_id: key_id.into(),
        }
    }

    pub fn from_key_holder(holder: &DidKeyHolder) -> Self {
        Self::new(holder.did(), holder.algorithm(), holder.key_id())
    }

    pub fn from_token(token: &Token) -> Result<Self, IdentityError> {
        let header = token.header();
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| IdentityError::MalformedToken("missing kid".into()))?;
        let (did, key_id) = kid.split_once('#').ok_or_else(|| {
            IdentityError::MalformedToken(format!("kid is not did#keyId: {}", kid))
        })?;
        let algorithm = AlgorithmType::from_name(&header.alg)?;
        Ok(Self::new(did, algorithm, key_id))
    }

    /// `did#keyId`
    pub fn kid(&self) -> String {
        format!("{}#{}", self.did, self.key_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Header, Payload};

    #[test]
    fn test_from_token() {
        let token = Token::new(
            Header::new("ES256K", Some("did:method:issuer#key-1".into())),
            Payload::default(),
        );
        let issuer = IssuerDid::from_token(&token).unwrap();
        assert_eq!(issuer.did, "did:method:issuer");
        assert_eq!(issuer.key_id, "key-1");
        assert_eq!(issuer.algorithm, AlgorithmType::Es256k);
        assert_eq!(issuer.kid(), "did:method:issuer#key-1");
    }

    #[test]
    fn test_from_token_requires_kid() {
        let token = Token::new(Header::new("ES256K", None), Payload::default());
        assert!(matches!(
            IssuerDid::from_token(&token),
            Err(IdentityError::MalformedToken(_))
        ));

        let token = Token::new(
            Header::new("ES256K", Some("did:method:issuer".into())),
            Payload::default(),
        );
        assert!(IssuerDid::from_token(&token).is_err());
    }
}
