//! Ledger gateway boundary.
//!
//! DID documents live on an external ledger. This module only defines how
//! the rest of the crate talks to it: read a document, submit a transaction,
//! poll its status. [`InMemoryLedger`] backs tests and local tooling.

use std::time::Duration;

use async_trait::async_trait;
use credo_crypto::PublicKey;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::DidDocument;
use crate::error::IdentityError;

/// Status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed(String),
}

/// Access to the ledger that anchors DID documents.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Fetch the current document of `did`.
    async fn read_document(&self, did: &str) -> Result<DidDocument, IdentityError>;

    /// Submit a transaction and return its hash.
    async fn submit(&self, transaction: Value) -> Result<String, IdentityError>;

    async fn transaction_status(&self, tx_hash: &str) -> Result<TransactionStatus, IdentityError>;
}

/// Submit `transaction` and poll until it is confirmed or fails.
///
/// Returns `Timeout` once `timeout` elapses. Dropping the future stops the
/// polling.
pub async fn submit_and_wait<G>(
    gateway: &G,
    transaction: Value,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String, IdentityError>
where
    G: LedgerGateway + ?Sized,
{
    let tx_hash = gateway.submit(transaction).await?;
    tracing::debug!(tx_hash = %tx_hash, "transaction submitted");

    let poll = async {
        loop {
            match gateway.transaction_status(&tx_hash).await? {
                TransactionStatus::Confirmed => return Ok::<(), IdentityError>(()),
                TransactionStatus::Failed(reason) => {
                    return Err(IdentityError::Ledger(format!("{} failed: {}", tx_hash, reason)))
                }
                TransactionStatus::Pending => tokio::time::sleep(poll_interval).await,
            }
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(Ok(())) => {
            tracing::info!(tx_hash = %tx_hash, "transaction confirmed");
            Ok(tx_hash)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            tracing::warn!(tx_hash = %tx_hash, ?timeout, "transaction not confirmed in time");
            Err(IdentityError::Timeout(format!("transaction {}", tx_hash)))
        }
    }
}

/// Resolve the verification key behind a `did#keyId` reference.
pub async fn resolve_public_key<G>(gateway: &G, kid: &str) -> Result<PublicKey, IdentityError>
where
    G: LedgerGateway + ?Sized,
{
    let (did, key_id) = kid
        .split_once('#')
        .ok_or_else(|| IdentityError::MalformedToken(format!("kid is not did#keyId: {}", kid)))?;
    let document = gateway.read_document(did).await?;
    let property = document
        .public_key_property(key_id)
        .ok_or_else(|| IdentityError::KeyNotFound(kid.to_string()))?;
    if property.is_revoked() {
        return Err(IdentityError::KeyRevoked(kid.to_string()));
    }
    property.public_key()
}

/// Ledger kept in memory. Transactions confirm on submit.
///
/// A transaction carrying a `document` object creates or replaces that
/// DID document.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    documents: DashMap<String, DidDocument>,
    transactions: DashMap<String, TransactionStatus>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_document(&self, document: DidDocument) {
        self.documents.insert(document.id.clone(), document);
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn read_document(&self, did: &str) -> Result<DidDocument, IdentityError> {
        self.documents
            .get(did)
            .map(|doc| doc.clone())
            .ok_or_else(|| IdentityError::DocumentNotFound(did.to_string()))
    }

    async fn submit(&self, transaction: Value) -> Result<String, IdentityError> {
        let tx_hash = format!("0x{}", uuid::Uuid::now_v7().simple());
        let status = match transaction.get("document") {
            Some(document) => match serde_json::from_value::<DidDocument>(document.clone()) {
                Ok(document) => {
                    self.insert_document(document);
                    TransactionStatus::Confirmed
                }
                Err(e) => TransactionStatus::Failed(format!("invalid document: {}", e)),
            },
            None => TransactionStatus::Confirmed,
        };
        self.transactions.insert(tx_hash.clone(), status);
        Ok(tx_hash)
    }

    async fn transaction_status(&self, tx_hash: &str) -> Result<TransactionStatus, IdentityError> {
        self.transactions
            .get(tx_hash)
            .map(|status| status.clone())
            .ok_or_else(|| IdentityError::Ledger(format!("unknown transaction {}", tx_hash)))
    }
}
