//! Account entity

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::money::{Currency, amount_serde};

/// Length of the bank code leading every account number
pub const BANK_PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_number: String,
    pub user_id: i64,
    /// Display name of the owner, reported to counterparties
    pub holder_name: String,
    /// Account label chosen by the owner
    pub name: String,
    #[serde(with = "amount_serde")]
    pub balance: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn bank_prefix(&self) -> &str {
        bank_prefix_of(&self.account_number).unwrap_or_default()
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// Leading bank code of an account number, if it has one.
pub fn bank_prefix_of(account_number: &str) -> Option<&str> {
    let end = account_number
        .char_indices()
        .nth(BANK_PREFIX_LEN)
        .map(|(i, _)| i)
        .unwrap_or(account_number.len());
    if account_number[..end].chars().count() == BANK_PREFIX_LEN {
        Some(&account_number[..end])
    } else {
        None
    }
}

/// `<prefix><unix millis><6 random alphanumerics>`
pub fn generate_account_number(bank_prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}{}{}", bank_prefix, Utc::now().timestamp_millis(), suffix)
}
