//! Integration test: encrypted envelopes and configuration-driven issuance.

use credo_core::encoding::b64url_encode;
use credo_core::ProtocolConfig;
use credo_crypto::{AlgorithmProvider, CurveType, EphemeralKey, EphemeralPublicKey, HashAlgorithm};
use credo_identity::{Credential, CredentialVersion};
use credo_integration_tests::{claims, key_holder, HOLDER_DID, ISSUER_DID};
use credo_protocol::{
    CredentialParam, CredentialVerifier, ProtocolEnvelope, ProtocolError, ProtocolMessage,
    ProtocolType,
};

fn protected_credential(requester: &EphemeralKey, version: CredentialVersion) -> ProtocolMessage {
    let issuer = key_holder(ISSUER_DID);
    let mut credential = Credential::from_key_holder(&issuer, version)
        .with_target_did(HOLDER_DID)
        .with_claim(claims(&[("age", "18")]));
    if version == CredentialVersion::V1_1 {
        credential.commit_claims(HashAlgorithm::Sha256, 16).unwrap();
    }
    ProtocolMessage::for_credential(
        ProtocolType::ResponseProtectedCredential,
        credential,
        Some(EphemeralPublicKey::new("holder-ek", requester)),
    )
    .unwrap()
}

#[test]
fn test_curve_mismatch_rejected() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let requester = EphemeralKey::generate(CurveType::P256K);
    let responder = EphemeralKey::generate(CurveType::P256);

    let mut message = protected_credential(&requester, CredentialVersion::V1_0);
    assert!(matches!(
        message.sign_encrypt(&provider, Some(&issuer), Some(&responder)),
        Err(ProtocolError::Crypto(_))
    ));
}

#[test]
fn test_tampered_tag_fails_decryption() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let requester = EphemeralKey::generate(CurveType::P256K);
    let responder = EphemeralKey::generate(CurveType::P256K);

    let mut message = protected_credential(&requester, CredentialVersion::V1_0);
    let mut envelope = message.sign_encrypt(&provider, Some(&issuer), Some(&responder)).unwrap();

    let mut segments: Vec<String> = envelope.protected.split('.').map(String::from).collect();
    segments[4] = b64url_encode([0u8; 16]);
    envelope.protected = segments.join(".");

    let mut received = ProtocolMessage::from_envelope(&envelope).unwrap();
    assert!(matches!(
        received.decrypt(&requester),
        Err(ProtocolError::DecryptionFailed(_))
    ));
    assert!(!received.is_decrypted());
}

#[test]
fn test_p256_channel_carries_disclosure() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let requester = EphemeralKey::generate(CurveType::P256);
    let responder = EphemeralKey::generate(CurveType::P256);

    let mut credential = Credential::from_key_holder(&issuer, CredentialVersion::V1_1)
        .with_target_did(HOLDER_DID)
        .with_claim(claims(&[("age", "18"), ("name", "Alice")]));
    let disclosure = credential.commit_claims(HashAlgorithm::Blake3, 32).unwrap();
    let mut message = ProtocolMessage::for_credential(
        ProtocolType::ResponseProtectedCredential,
        credential,
        Some(EphemeralPublicKey::new("holder-ek", &requester)),
    )
    .unwrap();
    let wire = message
        .sign_encrypt(&provider, Some(&issuer), Some(&responder))
        .unwrap()
        .to_json()
        .unwrap();

    let envelope = ProtocolEnvelope::from_json(&wire).unwrap();
    assert!(envelope.param.is_none());
    let mut received = ProtocolMessage::from_envelope(&envelope).unwrap();
    received.decrypt(&requester).unwrap();
    assert_eq!(received.param(), Some(&CredentialParam::Disclosure(disclosure.clone())));

    let verifier = CredentialVerifier::new(provider);
    verifier.add_trusted_issuer(ISSUER_DID, issuer.public_key());
    let compact = received.plain_message().unwrap();
    let report = verifier.verify_disclosure(compact, &disclosure.select(&["name"])).unwrap();
    assert!(report.valid, "{:?}", report.checks);
}

#[test]
fn test_configured_issuance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credo.toml");
    let config = ProtocolConfig::from_toml(
        r#"
        [credential]
        duration_secs = 3600

        [commitment]
        hash_algorithm = "sha512"
        nonce_bytes = 24

        [key_agreement]
        curve = "P-256"
        "#,
    )
    .unwrap();
    config.save(&path).unwrap();
    let config = ProtocolConfig::load(&path).unwrap();
    assert_eq!(config.presentation.duration_secs, 300);

    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let curve = CurveType::from_name(&config.key_agreement.curve).unwrap();
    let requester = EphemeralKey::generate(curve);
    let responder = EphemeralKey::generate(curve);

    let mut credential = Credential::from_key_holder(&issuer, CredentialVersion::V1_1)
        .with_target_did(HOLDER_DID)
        .with_duration(config.credential_duration_micros())
        .with_claim(claims(&[("age", "18")]));
    let alg = HashAlgorithm::from_name(&config.commitment.hash_algorithm).unwrap();
    credential.commit_claims(alg, config.commitment.nonce_bytes).unwrap();

    let mut message = ProtocolMessage::for_credential(
        ProtocolType::ResponseProtectedCredential,
        credential,
        Some(EphemeralPublicKey::new("holder-ek", &requester)),
    )
    .unwrap();
    let envelope = message.sign_encrypt(&provider, Some(&issuer), Some(&responder)).unwrap();

    let mut received = ProtocolMessage::from_envelope(&envelope).unwrap();
    received.decrypt(&requester).unwrap();
    let token = credo_identity::Token::decode(received.plain_message().unwrap()).unwrap();
    let payload = token.payload();
    let lifetime = payload.exp.unwrap() - payload.iat.unwrap();
    assert_eq!(lifetime, 3_600_000_000);
}
