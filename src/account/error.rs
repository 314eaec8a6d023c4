use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Also returned for accounts owned by someone else
    #[error("Account not found")]
    NotFound,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Account number already exists: {0}")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for AccountError {
    fn from(e: sqlx::Error) -> Self {
        AccountError::Storage(e.to_string())
    }
}
