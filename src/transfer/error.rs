//! Transfer error types
//!
//! Every failure a caller can observe maps to a stable code and HTTP status.

use thiserror::Error;

use crate::account::AccountError;
use crate::central_bank::DirectoryError;
use crate::currency::ConversionError;
use crate::keys::KeyError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Request errors ===
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Destination account belongs to this bank, use the internal transfer endpoint")]
    UseInternalEndpoint,

    #[error("Authentication required")]
    Unauthorized,

    // === Partner bank errors ===
    #[error("Bank not registered with the central bank: {0}")]
    UnknownBank(String),

    #[error("Partner bank unreachable: {0}")]
    PartnerUnreachable(String),

    /// Claim may have been accepted by the partner; needs manual reconciliation
    #[error("Partner outcome unknown: {0}")]
    AmbiguousOutcome(String),

    #[error("Failed to sign claim: {0}")]
    Signing(String),

    // === Inbound claim errors ===
    #[error("JWT token is missing")]
    MissingToken,

    #[error("Malformed transfer claim: {0}")]
    MalformedClaim(String),

    #[error("Destination account not found")]
    DestinationNotFound,

    #[error("Sender bank not registered: {0}")]
    UnknownSenderBank(String),

    #[error("Failed to fetch sender bank keys: {0}")]
    KeyFetchFailed(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid transfer payload: {0}")]
    InvalidPayload(String),

    #[error("Claim already processed")]
    DuplicateClaim,

    // === System errors ===
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("{0}")]
    UnsupportedCurrencyPair(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TransferError {
    /// Error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::Validation(_) => "ValidationError",
            TransferError::NotFound(_) => "NotFound",
            TransferError::InsufficientFunds => "InsufficientFunds",
            TransferError::UseInternalEndpoint => "UseInternalEndpoint",
            TransferError::Unauthorized => "Unauthorized",
            TransferError::UnknownBank(_) => "UnknownBank",
            TransferError::PartnerUnreachable(_) => "PartnerUnreachable",
            TransferError::AmbiguousOutcome(_) => "AmbiguousOutcome",
            TransferError::Signing(_) => "SigningError",
            TransferError::MissingToken => "MISSING_TOKEN",
            TransferError::MalformedClaim(_) => "MalformedClaim",
            TransferError::DestinationNotFound => "DestinationNotFound",
            TransferError::UnknownSenderBank(_) => "UnknownSenderBank",
            TransferError::KeyFetchFailed(_) => "KeyFetchFailed",
            TransferError::InvalidSignature(_) => "InvalidSignature",
            TransferError::InvalidPayload(_) => "InvalidPayload",
            TransferError::DuplicateClaim => "DuplicateClaim",
            TransferError::InvalidTransition(_) => "InvalidTransition",
            TransferError::UnsupportedCurrencyPair(_) => "UnsupportedCurrencyPair",
            TransferError::Storage(_) => "StorageError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::Validation(_)
            | TransferError::UseInternalEndpoint
            | TransferError::UnknownSenderBank(_)
            | TransferError::MissingToken
            | TransferError::MalformedClaim(_)
            | TransferError::InvalidSignature(_)
            | TransferError::InvalidPayload(_) => 400,
            TransferError::Unauthorized => 401,
            TransferError::InsufficientFunds => 402,
            TransferError::NotFound(_)
            | TransferError::UnknownBank(_)
            | TransferError::DestinationNotFound => 404,
            TransferError::InvalidTransition(_) | TransferError::DuplicateClaim => 409,
            TransferError::UnsupportedCurrencyPair(_) => 422,
            TransferError::Signing(_) | TransferError::Storage(_) => 500,
            TransferError::PartnerUnreachable(_) | TransferError::KeyFetchFailed(_) => 502,
            TransferError::AmbiguousOutcome(_) => 504,
        }
    }
}

impl From<AccountError> for TransferError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::NotFound => TransferError::NotFound("Account".to_string()),
            AccountError::InsufficientFunds => TransferError::InsufficientFunds,
            AccountError::InvalidAmount => TransferError::Validation(e.to_string()),
            AccountError::Duplicate(_) | AccountError::Storage(_) => {
                TransferError::Storage(e.to_string())
            }
        }
    }
}

impl From<KeyError> for TransferError {
    fn from(e: KeyError) -> Self {
        TransferError::Signing(e.to_string())
    }
}

impl From<ConversionError> for TransferError {
    fn from(e: ConversionError) -> Self {
        TransferError::UnsupportedCurrencyPair(e.to_string())
    }
}

impl From<DirectoryError> for TransferError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound(prefix) => TransferError::UnknownBank(prefix),
            DirectoryError::Unavailable(msg) => TransferError::PartnerUnreachable(msg),
        }
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        TransferError::Storage(e.to_string())
    }
}
