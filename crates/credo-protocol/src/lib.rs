//! Credo Protocol Layer
//!
//! The handshake between holders, issuers and verifiers:
//! - typed claim requests and responses with construction-time validation
//! - JSON-LD credential and presentation request objects
//! - the protocol message envelope, signed and optionally encrypted to the
//!   requester's ephemeral key
//! - a verifier that checks credentials and presentations against trusted
//!   issuers

pub mod claim_request;
pub mod claim_response;
pub mod error;
pub mod json_ld_request;
pub mod message_type;
pub mod protocol_message;
pub mod verifier;

pub use claim_request::{ClaimRequest, ClaimRequestBuilder};
pub use claim_response::{ClaimResponse, ClaimResponseBuilder, ResponseResult};
pub use error::ProtocolError;
pub use json_ld_request::{JsonLdVcr, JsonLdVpr, PresentationRequest, VprCondition};
pub use message_type::ProtocolType;
pub use protocol_message::{CredentialParam, ProtocolEnvelope, ProtocolMessage};
pub use verifier::{CredentialVerifier, VerificationCheck, VerificationReport};
