//! Interbank - multi-currency bank API with signed bank-to-bank transfers.
//!
//! # Modules
//!
//! - [`money`] - Currency set and fixed-point amounts
//! - [`currency`] - Rate table and conversion
//! - [`keys`] - RSA signing identity and JWKS export
//! - [`central_bank`] - Registry of partner banks (HTTP and static)
//! - [`account`] - Accounts, balances, conditional debits
//! - [`transfer`] - Transfer lifecycle: internal, outbound, inbound
//! - [`auth`] - End-user bearer tokens
//! - [`gateway`] - axum HTTP surface
//! - [`db`] - PostgreSQL pool and schema
//! - [`config`] / [`logging`] - Process bootstrap

pub mod config;
pub mod logging;

pub mod currency;
pub mod money;

pub mod central_bank;
pub mod keys;

pub mod account;
pub mod db;
pub mod transfer;

pub mod auth;
pub mod gateway;

// Convenient re-exports at crate root
pub use account::{Account, AccountLedger};
pub use config::AppConfig;
pub use currency::CurrencyConverter;
pub use gateway::state::AppState;
pub use keys::KeyManager;
pub use money::Currency;
pub use transfer::{Transfer, TransferError, TransferService, TransferStatus};
