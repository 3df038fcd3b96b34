use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use credo_core::time::{now_micros, to_datetime};
use credo_core::EncodeType;
use credo_crypto::{AlgorithmType, PublicKey};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// A public key entry of a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyProperty {
    /// Key id within the document (the part after `#`).
    pub id: String,
    /// Verification key types; the first one names the algorithm.
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// Public key bytes encoded with `encode_type`.
    pub public_key: String,
    pub encode_type: EncodeType,
    /// Microseconds.
    pub created: i64,
    /// Microseconds; zero while the key is active.
    #[serde(default)]
    pub revoked: i64,
}

impl PublicKeyProperty {
    /// Build an active property for `key`.
    pub fn new(id: impl Into<String>, algorithm: AlgorithmType, key: &PublicKey) -> Self {
        let encode_type = EncodeType::Hex;
        Self {
            id: id.into(),
            types: vec![algorithm.identifier().to_string()],
            public_key: encode_type.encode(key.to_bytes()),
            encode_type,
            created: now_micros(),
            revoked: 0,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked > 0
    }

    pub fn revoke(&mut self, at: i64) {
        self.revoked = at;
    }

    pub fn algorithm_type(&self) -> Result<AlgorithmType, IdentityError> {
        let identifier = self
            .types
            .first()
            .ok_or_else(|| IdentityError::KeyNotFound(format!("{} has no key type", self.id)))?;
        Ok(AlgorithmType::from_identifier(identifier)?)
    }

    /// Decode the stored key material.
    pub fn public_key(&self) -> Result<PublicKey, IdentityError> {
        let bytes = self.encode_type.decode(&self.public_key)?;
        Ok(PublicKey::from_bytes(&bytes)?)
    }

    pub fn created_at(&self) -> Result<DateTime<Utc>, IdentityError> {
        Ok(to_datetime(self.created)?)
    }
}

/// DID document as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub version: String,
    pub id: String,
    pub created: i64,
    pub updated: i64,
    /// Key id → key property.
    pub public_key: BTreeMap<String, PublicKeyProperty>,
    #[serde(default)]
    pub authentication: Vec<String>,
}

impl DidDocument {
    /// Create a document with a single authentication key.
    pub fn new(id: impl Into<String>, key: PublicKeyProperty) -> Self {
        let now = now_micros();
        let id = id.into();
        let authentication = vec![format!("{}#{}", id, key.id)];
        let mut public_key = BTreeMap::new();
        public_key.insert(key.id.clone(), key);
        Self {
            version: "1.0".to_string(),
            id,
            created: now,
            updated: now,
            public_key,
            authentication,
        }
    }

    /// Add a key. Key ids are unique within a document.
    pub fn add_public_key(&mut self, key: PublicKeyProperty) -> Result<(), IdentityError> {
        if self.public_key.contains_key(&key.id) {
            return Err(IdentityError::InvalidClaim(format!(
                "duplicate key id {} in {}",
                key.id, self.id
            )));
        }
        self.public_key.insert(key.id.clone(), key);
        self.updated = now_micros();
        Ok(())
    }

    pub fn public_key_property(&self, key_id: &str) -> Option<&PublicKeyProperty> {
        self.public_key.get(key_id)
    }

    /// Mark a key revoked at `at` microseconds.
    pub fn revoke_key(&mut self, key_id: &str, at: i64) -> Result<(), IdentityError> {
        let property = self
            .public_key
            .get_mut(key_id)
            .ok_or_else(|| IdentityError::KeyNotFound(format!("{}#{}", self.id, key_id)))?;
        property.revoke(at);
        self.updated = at;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, IdentityError> {
        serde_json::to_string(self).map_err(|e| IdentityError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, IdentityError> {
        serde_json::from_str(json)
            .map_err(|e| IdentityError::Serialization(format!("did document: {}", e)))
    }
}
