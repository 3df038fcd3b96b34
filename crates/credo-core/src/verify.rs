use serde::{Deserialize, Serialize};

/// Reason a cryptographic check did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VerifyFailure {
    #[error("JWT signature does not match.")]
    SignatureMismatch,

    #[error("The expiration date has expired.")]
    Expired,

    #[error("The issued time is not within the valid period.")]
    IssuedAtOutOfRange,

    #[error("Commitment does not match for claim: {0}")]
    CommitmentMismatch(String),
}

/// Outcome of a verification. Failures are values, not errors: a bad
/// signature is an expected answer, not an exceptional condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<VerifyFailure>,
}

impl VerifyResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            failure: None,
        }
    }

    pub fn fail(failure: VerifyFailure) -> Self {
        Self {
            success: false,
            failure: Some(failure),
        }
    }

    /// Human-readable failure reason, if any.
    pub fn fail_message(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.to_string())
    }

    /// Run `next` only when this result succeeded.
    pub fn and_then(self, next: impl FnOnce() -> VerifyResult) -> VerifyResult {
        if self.success {
            next()
        } else {
            self
        }
    }
}
