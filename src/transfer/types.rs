//! Transfer core types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::error::TransferError;
use super::state::TransferStatus;
use crate::account::bank_prefix_of;
use crate::money::{Currency, amount_serde, check_amount};

/// Transfer identifier, ULID-based: sortable by creation time, no coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(ulid::Ulid);

impl TransferId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for TransferId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TransferId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which path a transfer takes, decided once from the destination prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferKind {
    Internal,
    External { bank_prefix: String },
}

impl TransferKind {
    pub fn classify(to_account: &str, own_prefix: &str) -> Result<Self, TransferError> {
        match bank_prefix_of(to_account) {
            Some(prefix) if prefix == own_prefix => Ok(TransferKind::Internal),
            Some(prefix) => Ok(TransferKind::External {
                bank_prefix: prefix.to_string(),
            }),
            None => Err(TransferError::Validation(format!(
                "Invalid account number: {}",
                to_account
            ))),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, TransferKind::External { .. })
    }

    pub fn bank_prefix(&self) -> Option<&str> {
        match self {
            TransferKind::Internal => None,
            TransferKind::External { bank_prefix } => Some(bank_prefix),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub status: TransferStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Input to [`TransferStateMachine::create`](super::TransferStateMachine::create)
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub explanation: String,
    pub sender_name: String,
    pub receiver_name: Option<String>,
    pub kind: TransferKind,
    /// Replay key of the inbound claim this record settles
    pub claim_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: TransferId,
    #[serde(skip)]
    pub claim_id: Option<String>,
    pub from_account: String,
    pub to_account: String,
    #[serde(with = "amount_serde")]
    pub amount: Decimal,
    pub currency: Currency,
    pub explanation: String,
    pub sender_name: String,
    pub receiver_name: Option<String>,
    pub is_external: bool,
    pub bank_prefix: Option<String>,
    pub status: TransferStatus,
    pub status_history: Vec<StatusEntry>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transfer {
    /// Whether any of `accounts` sent or received this transfer
    pub fn involves_any(&self, accounts: &[String]) -> bool {
        accounts
            .iter()
            .any(|a| *a == self.from_account || *a == self.to_account)
    }
}

/// Client request to move funds
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[validate(length(min = 4, max = 64))]
    pub from_account: String,
    #[validate(length(min = 4, max = 64))]
    pub to_account: String,
    #[serde(with = "amount_serde")]
    #[schema(value_type = f64, example = 150.0)]
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    /// Defaults to the source account's currency
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub explanation: String,
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    check_amount(*amount).map_err(|msg| ValidationError::new("amount").with_message(msg.into()))
}
