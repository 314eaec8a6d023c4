//! Shared fixtures for transfer processor tests.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use super::outbound::{ClaimTransport, DeliveryAttempt, PartnerReceipt, RetryPolicy};
use super::{
    InboundTransferProcessor, MemoryTransferRepository, OutboundTransferProcessor, Transfer,
    TransferRequest, TransferStateMachine,
};
use crate::account::{AccountLedger, MemoryAccountRepository, OpenAccount};
use crate::central_bank::{BankDirectoryEntry, StaticDirectory};
use crate::currency::CurrencyConverter;
use crate::keys::KeyManager;
use crate::money::Currency;

pub const LOCAL_PREFIX: &str = "353";
pub const PARTNER_PREFIX: &str = "TST";
pub const PARTNER_JWKS_URL: &str = "http://tst.local/jwks.json";

// RSA generation is slow in debug builds; one keypair per role per test binary
static LOCAL_KEYS: Lazy<(TempDir, Arc<KeyManager>)> = Lazy::new(|| {
    let dir = tempfile::tempdir().unwrap();
    let keys = Arc::new(KeyManager::new(dir.path()));
    keys.ensure_identity().unwrap();
    (dir, keys)
});

static PARTNER_KEYS: Lazy<(TempDir, Arc<KeyManager>)> = Lazy::new(|| {
    let dir = tempfile::tempdir().unwrap();
    let keys = Arc::new(KeyManager::new(dir.path()));
    keys.ensure_identity().unwrap();
    (dir, keys)
});

pub fn local_keys() -> Arc<KeyManager> {
    LOCAL_KEYS.1.clone()
}

/// Signing identity of the `TST` partner bank
pub fn partner_keys() -> Arc<KeyManager> {
    PARTNER_KEYS.1.clone()
}

/// Scripted transport counting its calls
pub struct MockTransport {
    script: Mutex<VecDeque<DeliveryAttempt>>,
    /// Answer once the script runs out; `None` never answers
    fallback: Option<DeliveryAttempt>,
    calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl MockTransport {
    fn with(script: Vec<DeliveryAttempt>, fallback: Option<DeliveryAttempt>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        }
    }

    pub fn accepting(receiver_name: &str) -> Self {
        Self::with(
            vec![],
            Some(DeliveryAttempt::Accepted(PartnerReceipt {
                receiver_name: Some(receiver_name.to_string()),
            })),
        )
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::with(vec![], Some(DeliveryAttempt::Rejected(reason.to_string())))
    }

    pub fn scripted(script: Vec<DeliveryAttempt>) -> Self {
        Self::with(
            script,
            Some(DeliveryAttempt::Rejected("script exhausted".to_string())),
        )
    }

    pub fn hanging() -> Self {
        Self::with(vec![], None)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClaimTransport for MockTransport {
    async fn deliver(&self, _endpoint: &str, token: &str) -> DeliveryAttempt {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.to_string());

        let next = self.script.lock().unwrap().pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(attempt) => attempt,
            None => std::future::pending().await,
        }
    }
}

/// One bank (`353`) with a registered `TST` partner
pub struct Fixture {
    pub ledger: AccountLedger,
    pub machine: TransferStateMachine,
    pub keys: Arc<KeyManager>,
    pub directory: Arc<StaticDirectory>,
    pub outbound: OutboundTransferProcessor,
    pub inbound: InboundTransferProcessor,
}

impl Fixture {
    pub fn new(transport: Arc<dyn ClaimTransport>, policy: RetryPolicy) -> Self {
        Self::with_converter(transport, policy, CurrencyConverter::default())
    }

    pub fn with_converter(
        transport: Arc<dyn ClaimTransport>,
        policy: RetryPolicy,
        converter: CurrencyConverter,
    ) -> Self {
        let ledger = AccountLedger::new(Arc::new(MemoryAccountRepository::new()), LOCAL_PREFIX);
        let machine = TransferStateMachine::new(Arc::new(MemoryTransferRepository::new()));
        let converter = Arc::new(converter);
        let keys = local_keys();

        let directory = Arc::new(
            StaticDirectory::new()
                .with_bank(BankDirectoryEntry {
                    bank_prefix: PARTNER_PREFIX.to_string(),
                    name: "Test Partner Bank".to_string(),
                    transfer_endpoint: "http://tst.local/transfers/incoming".to_string(),
                    key_set_endpoint: PARTNER_JWKS_URL.to_string(),
                })
                .with_key_set(PARTNER_JWKS_URL, partner_keys().export_key_set().unwrap()),
        );

        let outbound = OutboundTransferProcessor::new(
            ledger.clone(),
            machine.clone(),
            directory.clone(),
            keys.clone(),
            transport,
            converter.clone(),
            policy,
        );
        let inbound = InboundTransferProcessor::new(
            ledger.clone(),
            machine.clone(),
            directory.clone(),
            converter,
        );

        Self {
            ledger,
            machine,
            keys,
            directory,
            outbound,
            inbound,
        }
    }

    /// Open an EUR account for `user_id`
    pub async fn open(&self, user_id: i64, balance: i64) -> String {
        self.ledger
            .open_account(OpenAccount {
                user_id,
                holder_name: format!("User {}", user_id),
                name: None,
                currency: Currency::Eur,
                initial_balance: Decimal::from(balance),
            })
            .await
            .unwrap()
            .account_number
    }

    pub fn request(&self, from: &str, to: &str, amount: i64) -> TransferRequest {
        TransferRequest {
            from_account: from.to_string(),
            to_account: to.to_string(),
            amount: Decimal::from(amount),
            currency: None,
            explanation: "test".to_string(),
        }
    }

    pub async fn balance(&self, account: &str) -> Decimal {
        self.ledger.find_any(account).await.unwrap().balance
    }

    pub async fn transfers_of(&self, account: &str) -> Vec<Transfer> {
        self.machine
            .repository()
            .list_by_accounts(&[account.to_string()])
            .await
            .unwrap()
    }

    pub async fn only_transfer(&self, account: &str) -> Transfer {
        let mut transfers = self.transfers_of(account).await;
        assert_eq!(transfers.len(), 1, "expected exactly one transfer");
        transfers.remove(0)
    }
}
