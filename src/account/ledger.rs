//! AccountLedger: account lookup and the balance-mutation primitives.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::AccountError;
use super::models::{Account, bank_prefix_of, generate_account_number};
use super::repository::AccountRepository;
use crate::money::{AMOUNT_SCALE, Currency};

const DEFAULT_ACCOUNT_NAME: &str = "Main Account";
const MAX_NUMBER_ATTEMPTS: usize = 3;

/// Parameters for [`AccountLedger::open_account`]
#[derive(Debug, Clone)]
pub struct OpenAccount {
    pub user_id: i64,
    pub holder_name: String,
    pub name: Option<String>,
    pub currency: Currency,
    pub initial_balance: Decimal,
}

#[derive(Clone)]
pub struct AccountLedger {
    repo: Arc<dyn AccountRepository>,
    bank_prefix: String,
}

impl AccountLedger {
    pub fn new(repo: Arc<dyn AccountRepository>, bank_prefix: impl Into<String>) -> Self {
        Self {
            repo,
            bank_prefix: bank_prefix.into(),
        }
    }

    pub fn bank_prefix(&self) -> &str {
        &self.bank_prefix
    }

    /// Whether `account_number` was issued by this bank.
    pub fn is_local(&self, account_number: &str) -> bool {
        bank_prefix_of(account_number) == Some(self.bank_prefix.as_str())
    }

    pub async fn open_account(&self, req: OpenAccount) -> Result<Account, AccountError> {
        if req.initial_balance.is_sign_negative() {
            return Err(AccountError::InvalidAmount);
        }

        let name = req
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ACCOUNT_NAME.to_string());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let account = Account {
                account_number: generate_account_number(&self.bank_prefix),
                user_id: req.user_id,
                holder_name: req.holder_name.clone(),
                name: name.clone(),
                balance: req.initial_balance.round_dp(AMOUNT_SCALE),
                currency: req.currency,
                created_at: Utc::now(),
            };
            match self.repo.insert(&account).await {
                Ok(()) => {
                    info!(
                        account = %account.account_number,
                        user_id = account.user_id,
                        currency = %account.currency,
                        "Account opened"
                    );
                    return Ok(account);
                }
                Err(AccountError::Duplicate(number)) if attempt < MAX_NUMBER_ATTEMPTS => {
                    debug!(account = %number, "Account number collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The account if it exists and belongs to `user_id`; `NotFound` otherwise.
    pub async fn find_owned(
        &self,
        account_number: &str,
        user_id: i64,
    ) -> Result<Account, AccountError> {
        match self.repo.get(account_number).await? {
            Some(account) if account.is_owned_by(user_id) => Ok(account),
            _ => Err(AccountError::NotFound),
        }
    }

    pub async fn find_any(&self, account_number: &str) -> Result<Account, AccountError> {
        self.repo
            .get(account_number)
            .await?
            .ok_or(AccountError::NotFound)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Account>, AccountError> {
        self.repo.list_by_owner(user_id).await
    }

    pub async fn debit(&self, account_number: &str, amount: Decimal) -> Result<Account, AccountError> {
        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount);
        }
        let account = self.repo.debit(account_number, amount).await?;
        debug!(account = %account_number, %amount, balance = %account.balance, "Debited");
        Ok(account)
    }

    pub async fn credit(&self, account_number: &str, amount: Decimal) -> Result<Account, AccountError> {
        if amount.is_sign_negative() {
            return Err(AccountError::InvalidAmount);
        }
        let account = self.repo.credit(account_number, amount).await?;
        debug!(account = %account_number, %amount, balance = %account.balance, "Credited");
        Ok(account)
    }

    /// Debit `from` and credit `to` atomically. The two amounts differ only
    /// when the accounts hold different currencies.
    pub async fn move_funds(
        &self,
        from: &str,
        debit: Decimal,
        to: &str,
        credit: Decimal,
    ) -> Result<(), AccountError> {
        if debit <= Decimal::ZERO || credit.is_sign_negative() {
            return Err(AccountError::InvalidAmount);
        }
        self.repo.transfer(from, debit, to, credit).await
    }
}
