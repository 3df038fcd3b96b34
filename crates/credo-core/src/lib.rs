//! Credo Core: shared building blocks for the Credo DID protocol crates.
//!
//! - base64url / hex codecs used by every wire format
//! - microsecond timestamps
//! - `VerifyResult`, the outcome type of every cryptographic check
//! - protocol configuration (TOML) and tracing bootstrap

pub mod config;
pub mod encoding;
pub mod error;
pub mod logging;
pub mod time;
pub mod verify;

pub use config::ProtocolConfig;
pub use encoding::EncodeType;
pub use error::CoreError;
pub use verify::{VerifyFailure, VerifyResult};
