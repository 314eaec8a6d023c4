//! Transfers between two accounts of this bank.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

use super::error::TransferError;
use super::machine::TransferStateMachine;
use super::state::TransferStatus;
use super::types::{NewTransfer, Transfer, TransferKind, TransferRequest};
use crate::account::AccountLedger;
use crate::currency::CurrencyConverter;
use crate::money::check_amount;

#[derive(Clone)]
pub struct InternalTransferProcessor {
    ledger: AccountLedger,
    machine: TransferStateMachine,
    converter: Arc<CurrencyConverter>,
}

impl InternalTransferProcessor {
    pub fn new(
        ledger: AccountLedger,
        machine: TransferStateMachine,
        converter: Arc<CurrencyConverter>,
    ) -> Self {
        Self {
            ledger,
            machine,
            converter,
        }
    }

    pub async fn process(
        &self,
        req: &TransferRequest,
        user_id: i64,
    ) -> Result<Transfer, TransferError> {
        check_amount(req.amount).map_err(TransferError::Validation)?;
        let source = self
            .ledger
            .find_owned(&req.from_account, user_id)
            .await
            .map_err(|_| TransferError::NotFound("Source account".to_string()))?;
        if req.from_account == req.to_account {
            return Err(TransferError::Validation(
                "Source and destination accounts must differ".to_string(),
            ));
        }
        if !self.ledger.is_local(&req.to_account) {
            return Err(TransferError::Validation(
                "Destination account does not belong to this bank".to_string(),
            ));
        }
        let destination = self
            .ledger
            .find_any(&req.to_account)
            .await
            .map_err(|_| TransferError::NotFound("Destination account".to_string()))?;

        let currency = req.currency.unwrap_or(source.currency);
        let debit = self.converter.convert(req.amount, currency, source.currency)?;
        let credit = self
            .converter
            .convert(req.amount, currency, destination.currency)?;
        if debit <= Decimal::ZERO || credit <= Decimal::ZERO {
            return Err(TransferError::Validation(
                "Amount is below the smallest unit after conversion".to_string(),
            ));
        }

        let transfer = self
            .machine
            .create(NewTransfer {
                from_account: source.account_number.clone(),
                to_account: destination.account_number.clone(),
                amount: req.amount,
                currency,
                explanation: req.explanation.clone(),
                sender_name: source.holder_name.clone(),
                receiver_name: Some(destination.holder_name.clone()),
                kind: TransferKind::Internal,
                claim_id: None,
            })
            .await?;

        let transfer = match self
            .machine
            .advance(&transfer, TransferStatus::InProgress, None)
            .await
        {
            Ok(t) => t,
            Err(e) => return Err(self.abort(&transfer, e).await),
        };

        if let Err(e) = self
            .ledger
            .move_funds(&source.account_number, debit, &destination.account_number, credit)
            .await
        {
            return Err(self.abort(&transfer, e.into()).await);
        }

        self.machine
            .advance(&transfer, TransferStatus::Completed, None)
            .await
    }

    async fn abort(&self, transfer: &Transfer, err: TransferError) -> TransferError {
        warn!(transfer_id = %transfer.id, error = %err, "Internal transfer failed");
        self.machine.fail(transfer, &err).await;
        err
    }
}
