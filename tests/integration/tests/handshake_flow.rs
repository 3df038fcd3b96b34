//! Integration test: request / response handshakes between verifier,
//! holder and issuer, carried in protocol envelopes.

use credo_crypto::{AlgorithmProvider, AlgorithmType, CurveType, EphemeralKey, EphemeralPublicKey};
use credo_identity::ledger::resolve_public_key;
use credo_identity::{
    ConvertToken, Credential, CredentialVersion, DidKeyHolder, Presentation, Token,
};
use credo_integration_tests::{
    claims, key_holder, ledger_with, HOLDER_DID, ISSUER_DID, VERIFIER_DID,
};
use credo_protocol::{
    ClaimRequest, ClaimResponse, CredentialVerifier, ProtocolError, ProtocolMessage, ProtocolType,
    ResponseResult,
};

fn issue(provider: &AlgorithmProvider, issuer: &DidKeyHolder, name: &str, value: &str) -> String {
    let mut token = Credential::from_key_holder(issuer, CredentialVersion::V1_0)
        .with_target_did(HOLDER_DID)
        .with_claim(claims(&[(name, value)]))
        .as_token_now()
        .unwrap();
    issuer.sign(provider, &mut token).unwrap()
}

#[tokio::test]
async fn test_presentation_handshake() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let holder = key_holder(HOLDER_DID);
    let ledger = ledger_with(&[&issuer, &holder]);

    let vc_a = issue(&provider, &issuer, "a", "1");
    let vc_b = issue(&provider, &issuer, "b", "2");

    // Verifier asks for a presentation without signing the request.
    let verifier_key = EphemeralKey::generate(CurveType::P256K);
    let request = ClaimRequest::builder(ProtocolType::RequestPresentation)
        .algorithm(AlgorithmType::None)
        .version("1.0")
        .nonce("challenge-1")
        .claim_types(vec!["a".into(), "b".into()])
        .public_key(EphemeralPublicKey::new("verifier-ek", &verifier_key))
        .build()
        .unwrap();
    let mut outgoing =
        ProtocolMessage::for_request(ProtocolType::RequestPresentation, request, None).unwrap();
    let wire = outgoing.sign_encrypt(&provider, None, None).unwrap().to_json().unwrap();

    // Holder reads the request and answers over the requested key.
    let received = ProtocolMessage::from_json(&wire).unwrap();
    let request = received.claim_request().unwrap();
    assert_eq!(request.algorithm(), "none");
    assert_eq!(request.claim_types(), &["a".to_string(), "b".to_string()]);
    let requester_key = request.public_key().cloned().unwrap();

    let mut presentation = Presentation::from_key_holder(&holder, CredentialVersion::V1_0)
        .with_nonce(request.nonce().unwrap());
    presentation.add_credential(&vc_a).unwrap();
    presentation.add_credential(&vc_b).unwrap();
    assert_eq!(presentation.types(), vec!["PRESENTATION", "a", "b"]);

    let holder_key = EphemeralKey::generate(CurveType::P256K);
    let mut reply = ProtocolMessage::for_presentation(
        ProtocolType::ResponseProtectedPresentation,
        presentation,
        Some(requester_key),
    )
    .unwrap();
    let envelope = reply.sign_encrypt(&provider, Some(&holder), Some(&holder_key)).unwrap();
    assert!(envelope.is_encrypted());
    let wire = envelope.to_json().unwrap();

    // Verifier decrypts, checks the nonce and verifies against the ledger.
    let mut received = ProtocolMessage::from_json(&wire).unwrap();
    assert_eq!(received.jwe_kid(), Some("verifier-ek"));
    received.decrypt(&verifier_key).unwrap();
    let presentation = received.presentation().unwrap();
    assert_eq!(presentation.nonce(), Some("challenge-1"));
    assert_eq!(presentation.credentials().len(), 2);
    assert_eq!(presentation.types(), vec!["PRESENTATION", "a", "b"]);

    let compact = received.plain_message().unwrap().to_string();
    let kid = Token::decode(&compact).unwrap().header().kid.clone().unwrap();
    let holder_public = resolve_public_key(&ledger, &kid).await.unwrap();

    let verifier = CredentialVerifier::new(provider.clone());
    verifier.add_trusted_issuer(ISSUER_DID, issuer.public_key());
    let report = verifier.verify_presentation(&compact, &holder_public).unwrap();
    assert!(report.valid, "{:?}", report.checks);
    assert!(report.check("credential[1].issuer_trusted").unwrap().passed);
}

#[test]
fn test_untrusted_issuer_fails_presentation() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let holder = key_holder(HOLDER_DID);
    let vc = issue(&provider, &issuer, "a", "1");

    let mut presentation = Presentation::from_key_holder(&holder, CredentialVersion::V1_0);
    presentation.add_credential(&vc).unwrap();
    let mut token = presentation.as_token_now().unwrap();
    let compact = holder.sign(&provider, &mut token).unwrap();

    let verifier = CredentialVerifier::new(provider);
    let report = verifier.verify_presentation(&compact, &holder.public_key()).unwrap();
    assert!(!report.valid);
    assert!(report.check("signature_valid").unwrap().passed);
    assert!(!report.check("credential[0].issuer_trusted").unwrap().passed);
}

#[test]
fn test_none_algorithm_only_for_presentation_requests() {
    let unsigned = ClaimRequest::builder(ProtocolType::RequestPresentation)
        .algorithm(AlgorithmType::None)
        .version("1.0")
        .build();
    assert!(unsigned.is_ok());

    let unsigned_credential = ClaimRequest::builder(ProtocolType::RequestCredential)
        .algorithm(AlgorithmType::None)
        .response_id(ISSUER_DID)
        .version("1.0")
        .build();
    assert!(matches!(unsigned_credential, Err(ProtocolError::InvalidRequest(_))));
}

#[test]
fn test_credential_request_and_result() {
    let provider = AlgorithmProvider::new();
    let issuer = key_holder(ISSUER_DID);
    let holder = key_holder(HOLDER_DID);

    let request = ClaimRequest::builder(ProtocolType::RequestCredential)
        .key_holder(&holder)
        .response_id(ISSUER_DID)
        .version("1.0")
        .nonce("n-7")
        .claims(claims(&[("age", "18")]))
        .build()
        .unwrap();
    let mut outgoing =
        ProtocolMessage::for_request(ProtocolType::RequestCredential, request, None).unwrap();
    let wire = outgoing.sign_encrypt(&provider, Some(&holder), None).unwrap().to_json().unwrap();

    let received = ProtocolMessage::from_json(&wire).unwrap();
    assert!(received.verify(&provider, &holder.public_key()).unwrap().success);
    let request = received.claim_request().unwrap();
    assert_eq!(request.request_id(), Some(HOLDER_DID));
    assert_eq!(request.response_id(), Some(ISSUER_DID));

    let response = ClaimResponse::builder(ProtocolType::CredentialResult)
        .key_holder(&issuer)
        .response_id(request.request_id().unwrap())
        .version("1.0")
        .nonce(request.nonce().unwrap())
        .result(ResponseResult {
            result: false,
            error_code: Some("E_CLAIM".into()),
            error_message: Some("age is not attested".into()),
        })
        .build()
        .unwrap();
    let mut reply =
        ProtocolMessage::for_response(ProtocolType::CredentialResult, response, None).unwrap();
    let wire = reply.sign_encrypt(&provider, Some(&issuer), None).unwrap().to_json().unwrap();

    let received = ProtocolMessage::from_json(&wire).unwrap();
    assert!(received.verify(&provider, &issuer.public_key()).unwrap().success);
    let response = received.claim_response().unwrap();
    assert_eq!(response.result(), Some(false));
    assert_eq!(response.error_code(), Some("E_CLAIM"));
    assert_eq!(response.nonce(), Some("n-7"));
}

#[test]
fn test_signed_request_needs_key_holder() {
    let provider = AlgorithmProvider::new();
    let verifier = key_holder(VERIFIER_DID);
    let request = ClaimRequest::builder(ProtocolType::RequestPresentation)
        .key_holder(&verifier)
        .version("1.0")
        .build()
        .unwrap();
    let mut outgoing =
        ProtocolMessage::for_request(ProtocolType::RequestPresentation, request, None).unwrap();
    assert!(matches!(
        outgoing.sign_encrypt(&provider, None, None),
        Err(ProtocolError::MissingKeyHolder(_))
    ));
}
