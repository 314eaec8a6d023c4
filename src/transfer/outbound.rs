//! OutboundTransferProcessor: the sending side of an external transfer.
//!
//! # Ordering
//!
//! The source account is debited only after the partner bank confirms the
//! claim. A delivery that was sent but never confirmed is reported as
//! `AmbiguousOutcome` and is not retried, since the partner may already
//! have credited the destination.
//!
//! ```text
//! pending ─lookup─▶ inProgress ─sign─▶ deliver (retry) ─▶ debit ─▶ completed
//!    │                  │                   │               │
//!    └──────────────────┴───────────────────┴───────────────┴──▶ failed
//! ```

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

use super::claim::TransferClaim;
use super::error::TransferError;
use super::machine::TransferStateMachine;
use super::state::TransferStatus;
use super::types::{NewTransfer, Transfer, TransferKind, TransferRequest};
use crate::account::{Account, AccountLedger};
use crate::central_bank::{CentralBankDirectory, DirectoryError};
use crate::currency::CurrencyConverter;
use crate::keys::KeyManager;
use crate::money::check_amount;

/// Delivery retry budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later one
    pub base_delay: Duration,
    /// Cap on the whole delivery loop, delays included
    pub total_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            total_timeout: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Wait before `attempt` (1-based); zero for the first.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(2)))
    }
}

/// What the partner told us after accepting a claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerReceipt {
    #[serde(default)]
    pub receiver_name: Option<String>,
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryAttempt {
    /// Partner confirmed with a success response
    Accepted(PartnerReceipt),
    /// Partner definitely did not accept: safe to retry
    Rejected(String),
    /// Request may have reached the partner but no answer came back
    Ambiguous(String),
}

/// Carries a signed claim to a partner bank's transfer endpoint.
#[async_trait]
pub trait ClaimTransport: Send + Sync {
    async fn deliver(&self, endpoint: &str, token: &str) -> DeliveryAttempt;
}

/// `POST {endpoint}` with body `{"jwt": <token>}`
pub struct HttpClaimTransport {
    client: reqwest::Client,
}

impl HttpClaimTransport {
    pub fn new(attempt_timeout: Duration) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .timeout(attempt_timeout)
            .build()
            .map_err(|e| {
                TransferError::PartnerUnreachable(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ClaimTransport for HttpClaimTransport {
    async fn deliver(&self, endpoint: &str, token: &str) -> DeliveryAttempt {
        let response = self
            .client
            .post(endpoint)
            .json(&serde_json::json!({ "jwt": token }))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            // Nothing reached the partner
            Err(e) if e.is_connect() || e.is_builder() => {
                return DeliveryAttempt::Rejected(format!("Connection failed: {}", e));
            }
            Err(e) => return DeliveryAttempt::Ambiguous(format!("No response: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            return DeliveryAttempt::Rejected(format!(
                "Partner responded with status {}: {}",
                status, body
            ));
        }

        // A success status is the confirmation; the body is informational
        let receipt = response.json::<PartnerReceipt>().await.unwrap_or_default();
        DeliveryAttempt::Accepted(receipt)
    }
}

#[derive(Clone)]
pub struct OutboundTransferProcessor {
    ledger: AccountLedger,
    machine: TransferStateMachine,
    directory: Arc<dyn CentralBankDirectory>,
    keys: Arc<KeyManager>,
    transport: Arc<dyn ClaimTransport>,
    converter: Arc<CurrencyConverter>,
    policy: RetryPolicy,
}

impl OutboundTransferProcessor {
    pub fn new(
        ledger: AccountLedger,
        machine: TransferStateMachine,
        directory: Arc<dyn CentralBankDirectory>,
        keys: Arc<KeyManager>,
        transport: Arc<dyn ClaimTransport>,
        converter: Arc<CurrencyConverter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            machine,
            directory,
            keys,
            transport,
            converter,
            policy,
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

        let bank_prefix = match TransferKind::classify(&req.to_account, self.ledger.bank_prefix())? {
            TransferKind::Internal => return Err(TransferError::UseInternalEndpoint),
            TransferKind::External { bank_prefix } => bank_prefix,
        };

        let currency = req.currency.unwrap_or(source.currency);
        let debit = self.converter.convert(req.amount, currency, source.currency)?;
        if debit <= Decimal::ZERO {
            return Err(TransferError::Validation(format!(
                "Amount is below the smallest {} unit",
                source.currency
            )));
        }
        if source.balance < debit {
            return Err(TransferError::InsufficientFunds);
        }

        let transfer = self
            .machine
            .create(NewTransfer {
                from_account: source.account_number.clone(),
                to_account: req.to_account.clone(),
                amount: req.amount,
                currency,
                explanation: req.explanation.clone(),
                sender_name: source.holder_name.clone(),
                receiver_name: None,
                kind: TransferKind::External {
                    bank_prefix: bank_prefix.clone(),
                },
                claim_id: None,
            })
            .await?;

        match self.execute(transfer, &source, &bank_prefix, debit).await {
            Ok(completed) => Ok(completed),
            Err((latest, err)) => {
                warn!(transfer_id = %latest.id, error = %err, "Outbound transfer failed");
                self.machine.fail(&latest, &err).await;
                Err(err)
            }
        }
    }

    /// Steps after the record exists. Errors carry the latest transfer
    /// snapshot so the caller can mark it failed.
    async fn execute(
        &self,
        transfer: Transfer,
        source: &Account,
        bank_prefix: &str,
        debit: Decimal,
    ) -> Result<Transfer, (Transfer, TransferError)> {
        let partner = match self.directory.lookup(bank_prefix).await {
            Ok(entry) => entry,
            Err(DirectoryError::NotFound(_)) => {
                return Err((transfer, TransferError::UnknownBank(bank_prefix.to_string())));
            }
            Err(DirectoryError::Unavailable(msg)) => {
                return Err((transfer, TransferError::PartnerUnreachable(msg)));
            }
        };

        let mut transfer = match self
            .machine
            .advance(&transfer, TransferStatus::InProgress, None)
            .await
        {
            Ok(t) => t,
            Err(e) => return Err((transfer, e)),
        };

        let claim = TransferClaim::new(
            &transfer.from_account,
            &transfer.to_account,
            transfer.currency,
            transfer.amount,
            &transfer.explanation,
            &transfer.sender_name,
        );
        let token = match self.keys.sign(&claim) {
            Ok(token) => token,
            Err(e) => return Err((transfer, e.into())),
        };

        info!(
            transfer_id = %transfer.id,
            bank = %partner.bank_prefix,
            endpoint = %partner.transfer_endpoint,
            "Delivering transfer claim"
        );
        let receipt = match self.deliver(&partner.transfer_endpoint, &token).await {
            Ok(receipt) => receipt,
            Err(e) => return Err((transfer, e)),
        };
        transfer.receiver_name = receipt.receiver_name;

        if let Err(e) = self.ledger.debit(&source.account_number, debit).await {
            error!(
                transfer_id = %transfer.id,
                account = %source.account_number,
                amount = %debit,
                error = %e,
                "Partner accepted claim but local debit failed; manual reconciliation required"
            );
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
                    error = %e,
                    "Funds moved but transfer could not be completed"
                );
                Err((transfer, e))
            }
        }
    }

    /// Deliver with exponential backoff under the total time cap.
    async fn deliver(&self, endpoint: &str, token: &str) -> Result<PartnerReceipt, TransferError> {
        let policy = &self.policy;
        let max_attempts = policy.max_attempts.max(1);
        let in_flight = AtomicBool::new(false);

        let attempts = async {
            let mut last_error = String::new();
            for attempt in 1..=max_attempts {
                tokio::time::sleep(policy.delay_before(attempt)).await;

                in_flight.store(true, Ordering::SeqCst);
                let outcome = self.transport.deliver(endpoint, token).await;
                in_flight.store(false, Ordering::SeqCst);

                match outcome {
                    DeliveryAttempt::Accepted(receipt) => return Ok(receipt),
                    DeliveryAttempt::Rejected(reason) => {
                        warn!(attempt, max_attempts, reason = %reason, "Claim delivery attempt failed");
                        last_error = reason;
                    }
                    DeliveryAttempt::Ambiguous(reason) => {
                        return Err(TransferError::AmbiguousOutcome(reason));
                    }
                }
            }
            Err(TransferError::PartnerUnreachable(format!(
                "Failed after {} attempts: {}",
                max_attempts, last_error
            )))
        };

        match tokio::time::timeout(policy.total_timeout, attempts).await {
            Ok(result) => result,
            Err(_) if in_flight.load(Ordering::SeqCst) => Err(TransferError::AmbiguousOutcome(
                format!("No confirmation within {:?}", policy.total_timeout),
            )),
            Err(_) => Err(TransferError::PartnerUnreachable(format!(
                "Delivery budget of {:?} exhausted",
                policy.total_timeout
            ))),
        }
    }
}
