//! Integration test: credential issuance and verification across crates.
//!
//! Issuer signs, holder decodes, verifier resolves the issuer key from the
//! ledger and checks signature, expiry and disclosed claims.

use credo_core::VerifyFailure;
use credo_crypto::{AlgorithmProvider, HashAlgorithm};
use credo_identity::ledger::resolve_public_key;
use credo_identity::{ConvertToken, Credential, CredentialVersion, Token};
use credo_integration_tests::{claims, key_holder, ledger_with, HOLDER_DID, ISSUER_DID};
use credo_protocol::CredentialVerifier;

const ISSUED: i64 = 1_700_000_000_000_000;
const EXPIRES: i64 = 1_800_000_000_000_000;

#[test]
fn test_issue_decode_and_verify() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);

    let credential = Credential::from_key_holder(&issuer, CredentialVersion::V1_0)
        .with_target_did(HOLDER_DID)
        .with_claim(claims(&[("age", "18")]));
    let mut token = credential.as_token(ISSUED, EXPIRES).unwrap();
    let compact = issuer.sign(&provider, &mut token).unwrap();

    let decoded = Token::decode(&compact).unwrap();
    let signature_check = decoded.verify(&provider, &issuer.public_key()).unwrap();
    // The fixed expiration may already have passed on the test clock.
    assert!(
        signature_check.success || signature_check.failure == Some(VerifyFailure::Expired),
        "{:?}",
        signature_check
    );
    assert!(decoded.verify_expired_at(ISSUED + 1).success);
    assert!(!decoded.verify_expired_at(EXPIRES).success);

    let restored = Credential::from_token(&decoded).unwrap();
    assert_eq!(restored.claim(), &claims(&[("age", "18")]));
    assert_eq!(restored.did(), ISSUER_DID);
    assert_eq!(restored.target_did(), Some(HOLDER_DID));
    assert_eq!(restored.jti(), credential.jti());
    assert_eq!(restored.types(), vec!["CREDENTIAL", "age"]);
}

#[test]
fn test_unrelated_key_reports_mismatch() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let stranger = key_holder(ISSUER_DID);

    let mut token = Credential::from_key_holder(&issuer, CredentialVersion::V1_0)
        .with_claim(claims(&[("age", "18")]))
        .as_token_now()
        .unwrap();
    let compact = issuer.sign(&provider, &mut token).unwrap();

    let result = Token::decode(&compact)
        .unwrap()
        .verify(&provider, &stranger.public_key())
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.failure, Some(VerifyFailure::SignatureMismatch));
    assert_eq!(result.fail_message().as_deref(), Some("JWT signature does not match."));
}

#[tokio::test]
async fn test_verify_with_ledger_resolved_key() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let ledger = ledger_with(&[&issuer]);

    let mut token = Credential::from_key_holder(&issuer, CredentialVersion::V1_0)
        .with_target_did(HOLDER_DID)
        .with_claim(claims(&[("age", "18")]))
        .as_token_now()
        .unwrap();
    let compact = issuer.sign(&provider, &mut token).unwrap();

    let decoded = Token::decode(&compact).unwrap();
    let kid = decoded.header().kid.clone().unwrap();
    let key = resolve_public_key(&ledger, &kid).await.unwrap();
    assert!(decoded.verify(&provider, &key).unwrap().success);
}

#[test]
fn test_selective_disclosure_through_verifier() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let verifier = CredentialVerifier::new(provider.clone());
    verifier.add_trusted_issuer(ISSUER_DID, issuer.public_key());

    let mut credential = Credential::from_key_holder(&issuer, CredentialVersion::V1_1)
        .with_target_did(HOLDER_DID)
        .with_claim(claims(&[("name", "Alice"), ("age", "18"), ("country", "BR")]));
    let full = credential.commit_claims(HashAlgorithm::Sha256, 16).unwrap();
    let mut token = credential.as_token_now().unwrap();
    let compact = issuer.sign(&provider, &mut token).unwrap();

    // Claim values never appear in the signed token.
    let decoded = Token::decode(&compact).unwrap();
    let claim = decoded.payload().claim.clone().unwrap().to_string();
    assert!(!claim.contains("Alice"));

    let age_only = full.select(&["age"]);
    let report = verifier.verify_disclosure(&compact, &age_only).unwrap();
    assert!(report.valid, "{:?}", report.checks);

    let mut tampered = full.clone();
    tampered.nonce.insert("country".into(), "00".repeat(16));
    let report = verifier.verify_disclosure(&compact, &tampered).unwrap();
    assert!(!report.valid);
}

#[test]
fn test_json_ld_credential_digests() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let verifier = CredentialVerifier::new(provider.clone());
    verifier.add_trusted_issuer(ISSUER_DID, issuer.public_key());

    let mut credential = Credential::from_key_holder(&issuer, CredentialVersion::V2_0)
        .with_target_did(HOLDER_DID)
        .with_claim(claims(&[("name", "Alice"), ("age", "18")]));
    let param = credential.attach_json_ld(HashAlgorithm::Sha256).unwrap().clone();
    let mut token = credential.as_token_now().unwrap();
    let compact = issuer.sign(&provider, &mut token).unwrap();

    let restored = Credential::from_encoded(&compact).unwrap();
    assert_eq!(restored.types(), vec!["CREDENTIAL", "age", "name"]);
    assert!(verifier.verify_json_ld(&compact, &param.select(&["name"])).unwrap().valid);

    let mut forged = param.clone();
    if let Some(claim) = forged.claim.get_mut("age") {
        claim.claim_value = serde_json::json!("21");
    }
    assert!(!verifier.verify_json_ld(&compact, &forged).unwrap().valid);
}
