//! TransferStateMachine: the only writer of transfer status.
//!
//! Each transition appends one history entry and is persisted with a
//! compare-and-swap on the previous status, so two writers racing on the
//! same transfer cannot both succeed.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use super::db::TransferRepository;
use super::error::TransferError;
use super::state::TransferStatus;
use super::types::{NewTransfer, StatusEntry, Transfer, TransferId};

#[derive(Clone)]
pub struct TransferStateMachine {
    repo: Arc<dyn TransferRepository>,
}

impl TransferStateMachine {
    pub fn new(repo: Arc<dyn TransferRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn TransferRepository> {
        &self.repo
    }

    /// Record a new transfer in `pending`.
    pub async fn create(&self, new: NewTransfer) -> Result<Transfer, TransferError> {
        if new.amount <= Decimal::ZERO {
            return Err(TransferError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if new.from_account.trim().is_empty() || new.to_account.trim().is_empty() {
            return Err(TransferError::Validation(
                "Source and destination accounts are required".to_string(),
            ));
        }

        let now = Utc::now();
        let transfer = Transfer {
            id: TransferId::new(),
            claim_id: new.claim_id,
            is_external: new.kind.is_external(),
            bank_prefix: new.kind.bank_prefix().map(str::to_string),
            from_account: new.from_account,
            to_account: new.to_account,
            amount: new.amount,
            currency: new.currency,
            explanation: new.explanation,
            sender_name: new.sender_name,
            receiver_name: new.receiver_name,
            status: TransferStatus::Pending,
            status_history: vec![StatusEntry {
                status: TransferStatus::Pending,
                timestamp: now,
                error_message: None,
            }],
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        self.repo.insert(&transfer).await?;
        info!(
            transfer_id = %transfer.id,
            from = %transfer.from_account,
            to = %transfer.to_account,
            amount = %transfer.amount,
            currency = %transfer.currency,
            external = transfer.is_external,
            "Transfer created"
        );
        Ok(transfer)
    }

    /// Move `transfer` to `next`, persisting any other field changes the
    /// caller made to it (receiver name).
    pub async fn advance(
        &self,
        transfer: &Transfer,
        next: TransferStatus,
        error_message: Option<String>,
    ) -> Result<Transfer, TransferError> {
        let current = transfer.status;
        if !current.can_transition_to(next) {
            return Err(TransferError::InvalidTransition(format!(
                "{} -> {}",
                current, next
            )));
        }

        let now = Utc::now();
        let mut updated = transfer.clone();
        updated.status = next;
        updated.updated_at = now;
        if next == TransferStatus::Failed {
            updated.error_message = error_message.clone();
        }
        updated.status_history.push(StatusEntry {
            status: next,
            timestamp: now,
            error_message,
        });

        if !self.repo.update_if(&updated, current).await? {
            return Err(TransferError::InvalidTransition(format!(
                "{} -> {}: transfer {} was modified concurrently",
                current, next, transfer.id
            )));
        }

        info!(transfer_id = %updated.id, from = %current, to = %next, "Transfer status changed");
        Ok(updated)
    }

    /// Record `err` on `transfer` and move it to `failed`. A failure to
    /// record is logged, never returned: the caller is already propagating `err`.
    pub async fn fail(&self, transfer: &Transfer, err: &TransferError) -> Option<Transfer> {
        if transfer.status.is_terminal() {
            return None;
        }
        match self
            .advance(transfer, TransferStatus::Failed, Some(err.to_string()))
            .await
        {
            Ok(failed) => Some(failed),
            Err(e) => {
                warn!(transfer_id = %transfer.id, error = %e, cause = %err, "Failed to record transfer failure");
                None
            }
        }
    }

    pub async fn get(&self, id: TransferId) -> Result<Transfer, TransferError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| TransferError::NotFound(format!("Transfer {}", id)))
    }
}
