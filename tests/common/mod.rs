//! Shared helpers for integration tests: in-memory banks and HTTP servers.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio::net::TcpListener;

use interbank::account::{MemoryAccountRepository, OpenAccount};
use interbank::auth::TokenVerifier;
use interbank::central_bank::{BankDirectoryEntry, StaticDirectory};
use interbank::currency::CurrencyConverter;
use interbank::gateway::{BankComponents, create_router};
use interbank::keys::KeyManager;
use interbank::money::Currency;
use interbank::transfer::{ClaimTransport, MemoryTransferRepository, RetryPolicy};
use interbank::AppState;

pub const JWT_SECRET: &str = "integration-secret";

fn key_pair() -> (TempDir, Arc<KeyManager>) {
    let dir = tempfile::tempdir().unwrap();
    let keys = Arc::new(KeyManager::new(dir.path()));
    keys.ensure_identity().unwrap();
    (dir, keys)
}

// RSA generation dominates test time; one keypair per bank role per binary
static FIRST_BANK_KEYS: Lazy<(TempDir, Arc<KeyManager>)> = Lazy::new(key_pair);
static SECOND_BANK_KEYS: Lazy<(TempDir, Arc<KeyManager>)> = Lazy::new(key_pair);

pub fn first_bank_keys() -> Arc<KeyManager> {
    FIRST_BANK_KEYS.1.clone()
}

pub fn second_bank_keys() -> Arc<KeyManager> {
    SECOND_BANK_KEYS.1.clone()
}

pub fn directory_entry(prefix: &str, base_url: &str) -> BankDirectoryEntry {
    BankDirectoryEntry {
        bank_prefix: prefix.to_string(),
        name: format!("Bank {}", prefix),
        transfer_endpoint: format!("{}/transfers/incoming", base_url),
        key_set_endpoint: format!("{}/jwks.json", base_url),
    }
}

/// Short delays so retry tests stay fast
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: std::time::Duration::from_millis(20),
        total_timeout: std::time::Duration::from_secs(5),
    }
}

pub fn memory_bank(
    prefix: &str,
    keys: Arc<KeyManager>,
    directory: Arc<StaticDirectory>,
    transport: Arc<dyn ClaimTransport>,
    policy: RetryPolicy,
) -> Arc<AppState> {
    Arc::new(AppState::new(BankComponents {
        name: format!("Bank {}", prefix),
        prefix: prefix.to_string(),
        accounts: Arc::new(MemoryAccountRepository::new()),
        transfers: Arc::new(MemoryTransferRepository::new()),
        directory,
        transport,
        keys,
        converter: Arc::new(CurrencyConverter::default()),
        policy,
        tokens: TokenVerifier::new(JWT_SECRET),
        db: None,
    }))
}

pub async fn open(state: &AppState, user_id: i64, currency: Currency, balance: i64) -> String {
    state
        .ledger
        .open_account(OpenAccount {
            user_id,
            holder_name: format!("User {}", user_id),
            name: None,
            currency,
            initial_balance: Decimal::from(balance),
        })
        .await
        .unwrap()
        .account_number
}

pub async fn balance(state: &AppState, account: &str) -> Decimal {
    state.ledger.find_any(account).await.unwrap().balance
}

pub fn bearer(user_id: i64, name: &str) -> String {
    let token = TokenVerifier::new(JWT_SECRET)
        .issue(user_id, Some(name), Duration::hours(1))
        .unwrap();
    format!("Bearer {}", token)
}

/// Ephemeral listener and its base URL
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

pub fn serve(listener: TcpListener, state: Arc<AppState>) {
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
}
