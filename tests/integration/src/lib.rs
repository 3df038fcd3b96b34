//! Fixtures shared by the cross-crate scenario tests.

use credo_crypto::{AlgorithmType, PrivateKey};
use credo_identity::{DidDocument, DidKeyHolder, InMemoryLedger, PublicKeyProperty};
use serde_json::{Map, Value};

pub const ISSUER_DID: &str = "did:method:issuer";
pub const HOLDER_DID: &str = "did:method:holder";
pub const VERIFIER_DID: &str = "did:method:verifier";

/// A party with a fresh ES256K key under `key-1`.
pub fn key_holder(did: &str) -> DidKeyHolder {
    DidKeyHolder::new(did, "key-1", AlgorithmType::Es256k, PrivateKey::generate())
}

/// Claim map from `(name, value)` pairs, in order.
pub fn claims(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

/// Ledger holding a DID document for every given party.
pub fn ledger_with(parties: &[&DidKeyHolder]) -> InMemoryLedger {
    let ledger = InMemoryLedger::new();
    for party in parties {
        let property =
            PublicKeyProperty::new(party.key_id(), party.algorithm(), &party.public_key());
        ledger.insert_document(DidDocument::new(party.did(), property));
    }
    ledger
}
