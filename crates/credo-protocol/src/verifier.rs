use credo_core::time::now_micros;
use credo_core::{VerifyFailure, VerifyResult};
use credo_crypto::{AlgorithmProvider, DisclosureParam, PublicKey};
use credo_identity::{Credential, CredentialVersion, JsonLdParam, Presentation, Token};
use dashmap::DashMap;
use serde::Serialize;

use crate::error::ProtocolError;

/// Result of verifying a credential or presentation.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// Whether every check passed.
    pub valid: bool,
    pub checks: Vec<VerificationCheck>,
}

/// An individual verification check.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VerificationReport {
    fn new() -> Self {
        Self {
            valid: true,
            checks: Vec::new(),
        }
    }

    fn push(&mut self, name: impl Into<String>, passed: bool, detail: impl FnOnce() -> String) {
        self.valid &= passed;
        self.checks.push(VerificationCheck {
            name: name.into(),
            passed,
            detail: if passed { None } else { Some(detail()) },
        });
    }

    fn push_result(&mut self, name: impl Into<String>, result: &VerifyResult) {
        self.push(name, result.success, || {
            result
                .fail_message()
                .unwrap_or_else(|| "verification failed".to_string())
        });
    }

    /// Look up a check by name.
    pub fn check(&self, name: &str) -> Option<&VerificationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Verifies credentials and presentations against a set of trusted issuers.
pub struct CredentialVerifier {
    provider: AlgorithmProvider,
    /// Trusted issuer DIDs → public keys.
    trusted_issuers: DashMap<String, PublicKey>,
}

impl CredentialVerifier {
    pub fn new(provider: AlgorithmProvider) -> Self {
        Self {
            provider,
            trusted_issuers: DashMap::new(),
        }
    }

    pub fn add_trusted_issuer(&self, did: impl Into<String>, public_key: PublicKey) {
        self.trusted_issuers.insert(did.into(), public_key);
    }

    pub fn remove_trusted_issuer(&self, did: &str) -> bool {
        self.trusted_issuers.remove(did).is_some()
    }

    pub fn is_trusted_issuer(&self, did: &str) -> bool {
        self.trusted_issuers.contains_key(did)
    }

    pub fn trusted_issuer_count(&self) -> usize {
        self.trusted_issuers.len()
    }

    /// Signature, trust and expiry checks for one token signed by a
    /// trusted issuer. `prefix` namespaces the check names.
    fn check_issued_token(
        &self,
        report: &mut VerificationReport,
        prefix: &str,
        token: &Token,
        now: i64,
    ) {
        let name = |check: &str| format!("{}{}", prefix, check);

        let signed = token.is_signed();
        report.push(name("signature_present"), signed, || "token is not signed".into());

        let issuer = token
            .header()
            .did()
            .or(token.payload().iss.as_deref())
            .unwrap_or_default()
            .to_string();
        let key = self.trusted_issuers.get(&issuer).map(|k| k.clone());
        report.push(name("issuer_trusted"), key.is_some(), || {
            format!("issuer {} is not trusted", issuer)
        });

        match (signed, key) {
            (true, Some(key)) => {
                self.check_signature(report, &name("signature_valid"), token, &key)
            }
            _ => report.push(name("signature_valid"), false, || {
                "signature missing or issuer unknown".into()
            }),
        }

        report.push_result(name("not_expired"), &token.verify_expired_at(now));
    }

    fn check_signature(
        &self,
        report: &mut VerificationReport,
        name: &str,
        token: &Token,
        key: &PublicKey,
    ) {
        match token.verify(&self.provider, key) {
            // Expiry is reported separately.
            Ok(result) if result.success || result.failure == Some(VerifyFailure::Expired) => {
                report.push(name, true, String::new)
            }
            Ok(result) => report.push_result(name, &result),
            Err(e) => report.push(name, false, || e.to_string()),
        }
    }

    /// Verify an encoded credential.
    pub fn verify_credential(&self, compact: &str) -> Result<VerificationReport, ProtocolError> {
        let token = Token::decode(compact)?;
        let mut report = VerificationReport::new();
        self.check_issued_token(&mut report, "", &token, now_micros());
        tracing::debug!(valid = report.valid, kid = ?token.header().kid, "credential verified");
        Ok(report)
    }

    /// Verify a 1.1 credential together with revealed claims.
    pub fn verify_disclosure(
        &self,
        compact: &str,
        param: &DisclosureParam,
    ) -> Result<VerificationReport, ProtocolError> {
        let mut report = self.verify_credential(compact)?;
        let credential = Credential::from_encoded(compact)?;
        report.push_result("disclosure_valid", &credential.verify_disclosure(param)?);
        Ok(report)
    }

    /// Verify a 2.0 credential together with its JSON-LD param.
    pub fn verify_json_ld(
        &self,
        compact: &str,
        param: &JsonLdParam,
    ) -> Result<VerificationReport, ProtocolError> {
        let mut report = self.verify_credential(compact)?;
        let credential = Credential::from_encoded(compact)?;
        report.push_result("disclosure_valid", &credential.verify_json_ld(param)?);
        Ok(report)
    }

    /// Verify a presentation signed by `holder_key` and every credential in
    /// it. Embedded credential checks are named `credential[i].<check>`.
    pub fn verify_presentation(
        &self,
        compact: &str,
        holder_key: &PublicKey,
    ) -> Result<VerificationReport, ProtocolError> {
        let now = now_micros();
        let token = Token::decode(compact)?;
        let presentation = Presentation::from_token(&token)?;
        let mut report = VerificationReport::new();

        let signed = token.is_signed();
        report.push("signature_present", signed, || "presentation is not signed".into());
        if signed {
            self.check_signature(&mut report, "signature_valid", &token, holder_key);
        } else {
            report.push("signature_valid", false, || "presentation is not signed".into());
        }
        report.push_result("not_expired", &token.verify_expired_at(now));

        match presentation.version() {
            CredentialVersion::V1_0 => {
                for (i, vc) in presentation.credentials().iter().enumerate() {
                    let prefix = format!("credential[{}].", i);
                    self.check_issued_token(&mut report, &prefix, &Token::decode(vc)?, now);
                }
            }
            CredentialVersion::V1_1 => {
                for (i, presented) in presentation.presented().iter().enumerate() {
                    let prefix = format!("credential[{}].", i);
                    let token = Token::decode(&presented.vc)?;
                    self.check_issued_token(&mut report, &prefix, &token, now);
                    let result = presented.is_valid()?;
                    report.push_result(format!("{}disclosure_valid", prefix), &result);
                }
            }
            CredentialVersion::V2_0 => {
                let criteria = presentation
                    .json_ld_vp()
                    .map(|vp| vp.fulfilled_criteria.as_slice())
                    .unwrap_or_default();
                for (i, criteria) in criteria.iter().enumerate() {
                    let prefix = format!("credential[{}].", i);
                    let token = Token::decode(&criteria.vc)?;
                    self.check_issued_token(&mut report, &prefix, &token, now);
                    let credential = Credential::from_encoded(&criteria.vc)?;
                    let result = credential.verify_json_ld(&criteria.param()?)?;
                    report.push_result(format!("{}disclosure_valid", prefix), &result);
                }
            }
        }

        if !report.valid {
            tracing::warn!(
                holder = presentation.did(),
                failed = report.checks.iter().filter(|c| !c.passed).count(),
                "presentation failed verification"
            );
        }
        Ok(report)
    }
}
