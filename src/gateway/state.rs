use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::account::{AccountLedger, AccountRepository, MemoryAccountRepository, PgAccountRepository};
use crate::auth::TokenVerifier;
use crate::central_bank::{CentralBankDirectory, HttpDirectory, StaticDirectory};
use crate::config::AppConfig;
use crate::currency::CurrencyConverter;
use crate::db::Database;
use crate::keys::KeyManager;
use crate::transfer::{
    ClaimTransport, HttpClaimTransport, InboundTransferProcessor, InternalTransferProcessor,
    MemoryTransferRepository, OutboundTransferProcessor, PgTransferRepository, RetryPolicy,
    TransferRepository, TransferService, TransferStateMachine,
};

/// Everything a bank instance is wired from
pub struct BankComponents {
    pub name: String,
    pub prefix: String,
    pub accounts: Arc<dyn AccountRepository>,
    pub transfers: Arc<dyn TransferRepository>,
    pub directory: Arc<dyn CentralBankDirectory>,
    pub transport: Arc<dyn ClaimTransport>,
    pub keys: Arc<KeyManager>,
    pub converter: Arc<CurrencyConverter>,
    pub policy: RetryPolicy,
    pub tokens: TokenVerifier,
    pub db: Option<Arc<Database>>,
}

/// Gateway state (shared)
#[derive(Clone)]
pub struct AppState {
    pub bank_name: String,
    pub bank_prefix: String,
    pub ledger: AccountLedger,
    pub transfers: TransferService,
    pub keys: Arc<KeyManager>,
    pub tokens: TokenVerifier,
    /// PostgreSQL; `None` on in-memory storage
    pub db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(parts: BankComponents) -> Self {
        let ledger = AccountLedger::new(parts.accounts, parts.prefix.clone());
        let machine = TransferStateMachine::new(parts.transfers);

        let internal =
            InternalTransferProcessor::new(ledger.clone(), machine.clone(), parts.converter.clone());
        let outbound = OutboundTransferProcessor::new(
            ledger.clone(),
            machine.clone(),
            parts.directory.clone(),
            parts.keys.clone(),
            parts.transport,
            parts.converter.clone(),
            parts.policy,
        );
        let inbound = InboundTransferProcessor::new(
            ledger.clone(),
            machine.clone(),
            parts.directory,
            parts.converter,
        );
        let transfers = TransferService::new(ledger.clone(), machine, internal, outbound, inbound);

        Self {
            bank_name: parts.name,
            bank_prefix: parts.prefix,
            ledger,
            transfers,
            keys: parts.keys,
            tokens: parts.tokens,
            db: parts.db,
        }
    }

    /// Wire a bank from configuration: storage, registry, signing identity.
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let (accounts, transfers, db): (
            Arc<dyn AccountRepository>,
            Arc<dyn TransferRepository>,
            Option<Arc<Database>>,
        ) = match &config.postgres_url {
            Some(url) => {
                let db = Database::connect(url)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                db.migrate().await.context("Failed to apply schema")?;
                info!("Storage: PostgreSQL");
                let pool = db.pool().clone();
                (
                    Arc::new(PgAccountRepository::new(pool.clone())),
                    Arc::new(PgTransferRepository::new(pool)),
                    Some(Arc::new(db)),
                )
            }
            None => {
                info!("Storage: in-memory (no postgres_url configured)");
                (
                    Arc::new(MemoryAccountRepository::new()),
                    Arc::new(MemoryTransferRepository::new()),
                    None,
                )
            }
        };

        let cb = &config.central_bank;
        let directory: Arc<dyn CentralBankDirectory> = if cb.test_mode {
            info!(banks = cb.test_banks.len(), "Central bank directory: test mode");
            Arc::new(StaticDirectory::from_entries(
                cb.test_banks.iter().cloned(),
                Duration::from_millis(cb.request_timeout_ms),
            ))
        } else {
            Arc::new(
                HttpDirectory::new(
                    cb.url.clone(),
                    cb.api_key.clone(),
                    Duration::from_millis(cb.request_timeout_ms),
                )
                .context("Failed to create central bank client")?,
            )
        };

        let transport = HttpClaimTransport::new(Duration::from_millis(
            config.delivery.attempt_timeout_ms,
        ))
        .context("Failed to create delivery client")?;

        let keys = Arc::new(KeyManager::new(&config.bank.key_dir));
        keys.ensure_identity()
            .context("Failed to load or generate signing keys")?;

        Ok(Self::new(BankComponents {
            name: config.bank.name.clone(),
            prefix: config.bank.prefix.clone(),
            accounts,
            transfers,
            directory,
            transport: Arc::new(transport),
            keys,
            converter: Arc::new(CurrencyConverter::new(config.rates.clone())),
            policy: config.delivery.retry_policy(),
            tokens: TokenVerifier::new(config.jwt_secret.clone()),
            db,
        }))
    }
}
