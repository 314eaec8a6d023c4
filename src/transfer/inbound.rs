//! InboundTransferProcessor: the receiving side of an external transfer.
//!
//! The claim is read unverified only to find the destination account and
//! the sender bank's key. Nothing is written until the signature verifies.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::claim::{TransferClaim, UnverifiedClaim};
use super::error::TransferError;
use super::machine::TransferStateMachine;
use super::state::TransferStatus;
use super::types::{NewTransfer, Transfer, TransferId, TransferKind};
use crate::account::{AccountError, AccountLedger, bank_prefix_of};
use crate::central_bank::{CentralBankDirectory, DirectoryError};
use crate::currency::CurrencyConverter;
use crate::keys::{Jwks, KeyError, KeyManager, verify_claim};

/// Answer to the sending bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundReceipt {
    #[serde(skip)]
    pub transfer_id: TransferId,
    pub receiver_name: String,
}

#[derive(Clone)]
pub struct InboundTransferProcessor {
    ledger: AccountLedger,
    machine: TransferStateMachine,
    directory: Arc<dyn CentralBankDirectory>,
    converter: Arc<CurrencyConverter>,
}

impl InboundTransferProcessor {
    pub fn new(
        ledger: AccountLedger,
        machine: TransferStateMachine,
        directory: Arc<dyn CentralBankDirectory>,
        converter: Arc<CurrencyConverter>,
    ) -> Self {
        Self {
            ledger,
            machine,
            directory,
            converter,
        }
    }

    /// Authenticate and settle a claim asserted by a partner bank.
    pub async fn receive_claim(&self, token: &str) -> Result<InboundReceipt, TransferError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TransferError::MissingToken);
        }

        let peeked = UnverifiedClaim::peek(token).map_err(TransferError::MalformedClaim)?;

        let destination = match self.ledger.find_any(&peeked.account_to).await {
            Ok(account) => account,
            Err(AccountError::NotFound) => {
                warn!(account = %peeked.account_to, "Inbound claim for unknown account");
                return Err(TransferError::DestinationNotFound);
            }
            Err(e) => return Err(e.into()),
        };

        let sender_prefix = bank_prefix_of(&peeked.account_from)
            .ok_or_else(|| TransferError::UnknownSenderBank(peeked.account_from.clone()))?
            .to_string();
        let sender = match self.directory.lookup(&sender_prefix).await {
            Ok(entry) => entry,
            Err(DirectoryError::NotFound(prefix)) => {
                warn!(bank = %prefix, "Inbound claim from unregistered bank");
                return Err(TransferError::UnknownSenderBank(prefix));
            }
            Err(DirectoryError::Unavailable(msg)) => {
                return Err(TransferError::KeyFetchFailed(msg));
            }
        };

        let jwks = self
            .directory
            .fetch_key_set(&sender.key_set_endpoint)
            .await
            .map_err(|e| {
                warn!(bank = %sender_prefix, error = %e, "Could not fetch sender key set");
                TransferError::KeyFetchFailed(e.to_string())
            })?;

        let payload = verify(token, &peeked, &jwks).map_err(|reason| {
            warn!(bank = %sender_prefix, reason = %reason, "Inbound claim signature rejected");
            TransferError::InvalidSignature(reason)
        })?;

        let claim = TransferClaim::from_payload(&payload).map_err(TransferError::InvalidPayload)?;
        if !self.converter.is_supported(claim.currency) {
            return Err(TransferError::InvalidPayload(format!(
                "Unsupported currency: {}",
                claim.currency
            )));
        }

        if let Some(receipt) = self.replayed(&peeked.claim_id).await? {
            return Ok(receipt);
        }

        let credit = self
            .converter
            .convert(claim.amount, claim.currency, destination.currency)?;
        if credit <= rust_decimal::Decimal::ZERO {
            return Err(TransferError::InvalidPayload(format!(
                "amount is below the smallest {} unit",
                destination.currency
            )));
        }

        let created = self
            .machine
            .create(NewTransfer {
                from_account: claim.account_from.clone(),
                to_account: claim.account_to.clone(),
                amount: claim.amount,
                currency: claim.currency,
                explanation: claim.explanation.clone(),
                sender_name: claim.sender_name.clone(),
                receiver_name: Some(destination.holder_name.clone()),
                kind: TransferKind::External {
                    bank_prefix: sender_prefix,
                },
                claim_id: Some(peeked.claim_id.clone()),
            })
            .await;
        let transfer = match created {
            Ok(t) => t,
            // Lost a race with an identical claim
            Err(TransferError::DuplicateClaim) => {
                return match self.replayed(&peeked.claim_id).await? {
                    Some(receipt) => Ok(receipt),
                    None => Err(TransferError::DuplicateClaim),
                };
            }
            Err(e) => return Err(e),
        };

        let transfer = match self.settle(transfer, credit).await {
            Ok(t) => t,
            Err((latest, err)) => {
                warn!(transfer_id = %latest.id, error = %err, "Inbound settlement failed");
                self.machine.fail(&latest, &err).await;
                return Err(err);
            }
        };

        info!(
            transfer_id = %transfer.id,
            from = %transfer.from_account,
            to = %transfer.to_account,
            amount = %transfer.amount,
            "Inbound transfer credited"
        );
        Ok(InboundReceipt {
            transfer_id: transfer.id,
            receiver_name: destination.holder_name,
        })
    }

    async fn settle(
        &self,
        transfer: Transfer,
        credit: rust_decimal::Decimal,
    ) -> Result<Transfer, (Transfer, TransferError)> {
        let transfer = match self
            .machine
            .advance(&transfer, TransferStatus::InProgress, None)
            .await
        {
            Ok(t) => t,
            Err(e) => return Err((transfer, e)),
        };
        if let Err(e) = self.ledger.credit(&transfer.to_account, credit).await {
            return Err((transfer, e.into()));
        }
        match self
            .machine
            .advance(&transfer, TransferStatus::Completed, None)
            .await
        {
            Ok(t) => Ok(t),
            Err(e) => {
                error!(
                    transfer_id = %transfer.id,
                    account = %transfer.to_account,
                    amount = %credit,
                    error = %e,
                    "Funds credited but transfer could not be completed; manual reconciliation required"
                );
                Err((transfer, e))
            }
        }
    }

    /// Receipt for a claim that was already settled. A claim that is still
    /// being processed, or that failed, is a `DuplicateClaim`.
    async fn replayed(&self, claim_id: &str) -> Result<Option<InboundReceipt>, TransferError> {
        let Some(existing) = self
            .machine
            .repository()
            .get_by_claim_id(claim_id)
            .await?
        else {
            return Ok(None);
        };

        if existing.status != TransferStatus::Completed {
            return Err(TransferError::DuplicateClaim);
        }
        info!(transfer_id = %existing.id, "Replayed claim answered from record");
        Ok(Some(InboundReceipt {
            transfer_id: existing.id,
            receiver_name: existing.receiver_name.unwrap_or_default(),
        }))
    }
}

fn verify(token: &str, peeked: &UnverifiedClaim, jwks: &Jwks) -> Result<Value, String> {
    if peeked.algorithm != jsonwebtoken::Algorithm::RS256 {
        return Err(format!("Unsupported algorithm: {:?}", peeked.algorithm));
    }
    let jwk = jwks
        .find(peeked.key_id.as_deref())
        .ok_or_else(|| "No matching key in sender key set".to_string())?;
    verify_claim::<Value>(token, jwk).map_err(|e| e.to_string())
}

/// Our own key set, served to partners verifying the claims we send.
pub fn serve_key_set(keys: &KeyManager) -> Result<Jwks, KeyError> {
    keys.export_key_set()
}
