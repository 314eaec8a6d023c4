//! Accounts and balance mutation

pub mod error;
pub mod ledger;
pub mod models;
pub mod postgres;
pub mod repository;

pub use error::AccountError;
pub use ledger::{AccountLedger, OpenAccount};
pub use models::{Account, BANK_PREFIX_LEN, bank_prefix_of, generate_account_number};
pub use postgres::PgAccountRepository;
pub use repository::{AccountRepository, MemoryAccountRepository};
