//! Credo Identity Layer
//!
//! Identity primitives on top of `credo-crypto`:
//! - compact signed tokens (header, payload, detached signature)
//! - DID key holders and issuer references
//! - credentials in plain (1.0), hash-committed (1.1) and JSON-LD (2.0) form
//! - presentations aggregating issued credentials
//! - DID documents and the ledger gateway boundary

pub mod credential;
pub mod document;
pub mod error;
pub mod issuer;
pub mod json_ld;
pub mod key_holder;
pub mod ledger;
pub mod presentation;
pub mod token;

pub use credential::{ConvertToken, Credential, CredentialVersion, CREDENTIAL_TYPE};
pub use document::{DidDocument, PublicKeyProperty};
pub use error::IdentityError;
pub use issuer::IssuerDid;
pub use json_ld::{ClaimParam, JsonLdParam, JsonLdVc, JsonLdVp, VpCriteria};
pub use key_holder::DidKeyHolder;
pub use ledger::{InMemoryLedger, LedgerGateway, TransactionStatus};
pub use presentation::{Presentation, PresentedCredential, PRESENTATION_TYPE};
pub use token::{Header, Payload, Token};
