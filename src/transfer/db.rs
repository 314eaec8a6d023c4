//! Transfer storage
//!
//! Status updates are compare-and-swap: a write lands only if the stored
//! status still equals the status the caller read.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::error::TransferError;
use super::state::TransferStatus;
use super::types::{Transfer, TransferId};

#[async_trait]
pub trait TransferRepository: Send + Sync {
    /// Fails with `DuplicateClaim` if `claim_id` was already recorded.
    async fn insert(&self, transfer: &Transfer) -> Result<(), TransferError>;

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>, TransferError>;

    async fn get_by_claim_id(&self, claim_id: &str) -> Result<Option<Transfer>, TransferError>;

    /// Persist `transfer` only if the stored status equals `expected`.
    ///
    /// Returns true if the update succeeded, false if another writer got there first.
    async fn update_if(
        &self,
        transfer: &Transfer,
        expected: TransferStatus,
    ) -> Result<bool, TransferError>;

    /// Transfers sent or received by any of `accounts`, newest first
    async fn list_by_accounts(&self, accounts: &[String]) -> Result<Vec<Transfer>, TransferError>;
}

#[derive(Default)]
pub struct MemoryTransferRepository {
    transfers: DashMap<TransferId, Transfer>,
    claims: DashMap<String, TransferId>,
}

impl MemoryTransferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferRepository for MemoryTransferRepository {
    async fn insert(&self, transfer: &Transfer) -> Result<(), TransferError> {
        if let Some(claim_id) = &transfer.claim_id {
            match self.claims.entry(claim_id.clone()) {
                Entry::Occupied(_) => return Err(TransferError::DuplicateClaim),
                Entry::Vacant(v) => {
                    v.insert(transfer.id);
                }
            }
        }
        self.transfers.insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>, TransferError> {
        Ok(self.transfers.get(&id).map(|t| t.value().clone()))
    }

    async fn get_by_claim_id(&self, claim_id: &str) -> Result<Option<Transfer>, TransferError> {
        let Some(id) = self.claims.get(claim_id).map(|e| *e.value()) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn update_if(
        &self,
        transfer: &Transfer,
        expected: TransferStatus,
    ) -> Result<bool, TransferError> {
        let Some(mut stored) = self.transfers.get_mut(&transfer.id) else {
            return Err(TransferError::NotFound(format!("Transfer {}", transfer.id)));
        };
        if stored.status != expected {
            return Ok(false);
        }
        *stored = transfer.clone();
        Ok(true)
    }

    async fn list_by_accounts(&self, accounts: &[String]) -> Result<Vec<Transfer>, TransferError> {
        let mut found: Vec<Transfer> = self
            .transfers
            .iter()
            .filter(|t| t.involves_any(accounts))
            .map(|t| t.value().clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }
}
