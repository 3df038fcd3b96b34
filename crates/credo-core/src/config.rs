//! Protocol configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CoreError;
use crate::time::micros_from_secs;

/// Tunables for token lifetimes, commitments and key agreement.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProtocolConfig {
    /// Credential issuance settings.
    #[serde(default)]
    pub credential: CredentialConfig,

    /// Presentation settings.
    #[serde(default)]
    pub presentation: PresentationConfig,

    /// Claim request / response settings.
    #[serde(default)]
    pub request: RequestConfig,

    /// Selective disclosure settings.
    #[serde(default)]
    pub commitment: CommitmentConfig,

    /// Ephemeral key agreement settings.
    #[serde(default)]
    pub key_agreement: KeyAgreementConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Lifetime of an issued credential, in seconds.
    #[serde(default = "default_credential_duration")]
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Lifetime of a presentation, in seconds.
    #[serde(default = "default_presentation_duration")]
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// How long after `iat` a request or response is still accepted.
    #[serde(default = "default_request_window")]
    pub valid_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentConfig {
    /// Hash algorithm name (sha256, sha512, blake3).
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
    /// Random nonce length per claim; values below 16 are raised to 16.
    #[serde(default = "default_nonce_bytes")]
    pub nonce_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAgreementConfig {
    /// Curve for ephemeral keys (P-256K, P-256).
    #[serde(default = "default_curve")]
    pub curve: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_credential_duration() -> u64 {
    24 * 60 * 60
}
fn default_presentation_duration() -> u64 {
    5 * 60
}
fn default_request_window() -> u64 {
    5 * 60
}
fn default_hash_algorithm() -> String {
    "sha256".into()
}
fn default_nonce_bytes() -> usize {
    16
}
fn default_curve() -> String {
    "P-256K".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_credential_duration(),
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_presentation_duration(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            valid_window_secs: default_request_window(),
        }
    }
}

impl Default for CommitmentConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: default_hash_algorithm(),
            nonce_bytes: default_nonce_bytes(),
        }
    }
}

impl Default for KeyAgreementConfig {
    fn default() -> Self {
        Self {
            curve: default_curve(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ProtocolConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, CoreError> {
        toml::from_str(contents).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn credential_duration_micros(&self) -> i64 {
        micros_from_secs(self.credential.duration_secs)
    }

    pub fn presentation_duration_micros(&self) -> i64 {
        micros_from_secs(self.presentation.duration_secs)
    }

    pub fn request_window_micros(&self) -> i64 {
        micros_from_secs(self.request.valid_window_secs)
    }
}
