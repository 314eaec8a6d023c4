//! Account storage
//!
//! Balance mutations are conditional at the storage layer: the sufficiency
//! check and the write happen under one lock (memory) or one statement /
//! transaction (PostgreSQL), so concurrent debits can never both pass.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::AccountError;
use super::models::Account;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn insert(&self, account: &Account) -> Result<(), AccountError>;

    async fn get(&self, account_number: &str) -> Result<Option<Account>, AccountError>;

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Account>, AccountError>;

    /// Subtract `amount` only if the balance covers it.
    async fn debit(&self, account_number: &str, amount: Decimal) -> Result<Account, AccountError>;

    async fn credit(&self, account_number: &str, amount: Decimal) -> Result<Account, AccountError>;

    /// Debit `from` by `debit` and credit `to` by `credit` as one unit.
    async fn transfer(
        &self,
        from: &str,
        debit: Decimal,
        to: &str,
        credit: Decimal,
    ) -> Result<(), AccountError>;
}

/// In-memory store: one mutex per account, no global lock.
#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: DashMap<String, Arc<Mutex<Account>>>,
}

fn lock(slot: &Mutex<Account>) -> MutexGuard<'_, Account> {
    // Balances are only written after all checks pass, so a poisoned slot is consistent
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, account_number: &str) -> Result<Arc<Mutex<Account>>, AccountError> {
        self.accounts
            .get(account_number)
            .map(|e| e.value().clone())
            .ok_or(AccountError::NotFound)
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn insert(&self, account: &Account) -> Result<(), AccountError> {
        use dashmap::mapref::entry::Entry;
        match self.accounts.entry(account.account_number.clone()) {
            Entry::Occupied(_) => Err(AccountError::Duplicate(account.account_number.clone())),
            Entry::Vacant(v) => {
                v.insert(Arc::new(Mutex::new(account.clone())));
                Ok(())
            }
        }
    }

    async fn get(&self, account_number: &str) -> Result<Option<Account>, AccountError> {
        Ok(self
            .accounts
            .get(account_number)
            .map(|e| lock(e.value()).clone()))
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Account>, AccountError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|e| lock(e.value()).clone())
            .filter(|a| a.user_id == user_id)
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    async fn debit(&self, account_number: &str, amount: Decimal) -> Result<Account, AccountError> {
        let slot = self.slot(account_number)?;
        let mut account = lock(&slot);
        if account.balance < amount {
            return Err(AccountError::InsufficientFunds);
        }
        account.balance -= amount;
        Ok(account.clone())
    }

    async fn credit(&self, account_number: &str, amount: Decimal) -> Result<Account, AccountError> {
        let slot = self.slot(account_number)?;
        let mut account = lock(&slot);
        account.balance += amount;
        Ok(account.clone())
    }

    async fn transfer(
        &self,
        from: &str,
        debit: Decimal,
        to: &str,
        credit: Decimal,
    ) -> Result<(), AccountError> {
        let source = self.slot(from)?;
        let target = self.slot(to)?;
        if Arc::ptr_eq(&source, &target) {
            let mut account = lock(&source);
            if account.balance < debit {
                return Err(AccountError::InsufficientFunds);
            }
            account.balance = account.balance - debit + credit;
            return Ok(());
        }

        // Fixed lock order by account number prevents deadlock between opposite transfers
        let (mut source_guard, mut target_guard) = if from < to {
            let s = lock(&source);
            let t = lock(&target);
            (s, t)
        } else {
            let t = lock(&target);
            let s = lock(&source);
            (s, t)
        };

        if source_guard.balance < debit {
            return Err(AccountError::InsufficientFunds);
        }
        source_guard.balance -= debit;
        target_guard.balance += credit;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use chrono::Utc;

    fn account(number: &str, user_id: i64, balance: i64) -> Account {
        Account {
            account_number: number.to_string(),
            user_id,
            holder_name: format!("User {}", user_id),
            name: "Main Account".to_string(),
            balance: Decimal::from(balance),
            currency: Currency::Eur,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let repo = MemoryAccountRepository::new();
        repo.insert(&account("353a", 1, 0)).await.unwrap();
        assert_eq!(
            repo.insert(&account("353a", 2, 0)).await.unwrap_err(),
            AccountError::Duplicate("353a".to_string())
        );
    }

    #[tokio::test]
    async fn test_debit_never_goes_negative() {
        let repo = MemoryAccountRepository::new();
        repo.insert(&account("353a", 1, 100)).await.unwrap();

        let after = repo.debit("353a", Decimal::from(60)).await.unwrap();
        assert_eq!(after.balance, Decimal::from(40));
        assert_eq!(
            repo.debit("353a", Decimal::from(50)).await.unwrap_err(),
            AccountError::InsufficientFunds
        );
        let current = repo.get("353a").await.unwrap().unwrap();
        assert_eq!(current.balance, Decimal::from(40));
    }

    #[tokio::test]
    async fn test_transfer_moves_both_sides() {
        let repo = MemoryAccountRepository::new();
        repo.insert(&account("353a", 1, 100)).await.unwrap();
        repo.insert(&account("353b", 2, 0)).await.unwrap();

        repo.transfer("353a", Decimal::from(30), "353b", Decimal::from(30))
            .await
            .unwrap();
        // Reverse direction exercises the other lock order
        repo.transfer("353b", Decimal::from(10), "353a", Decimal::from(10))
            .await
            .unwrap();

        assert_eq!(repo.get("353a").await.unwrap().unwrap().balance, Decimal::from(80));
        assert_eq!(repo.get("353b").await.unwrap().unwrap().balance, Decimal::from(20));

        assert_eq!(
            repo.transfer("353b", Decimal::from(21), "353a", Decimal::from(21))
                .await
                .unwrap_err(),
            AccountError::InsufficientFunds
        );
        assert_eq!(
            repo.transfer("353a", Decimal::ONE, "missing", Decimal::ONE)
                .await
                .unwrap_err(),
            AccountError::NotFound
        );
        assert_eq!(repo.get("353a").await.unwrap().unwrap().balance, Decimal::from(80));
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let repo = MemoryAccountRepository::new();
        repo.insert(&account("353a", 1, 0)).await.unwrap();
        repo.insert(&account("353b", 1, 0)).await.unwrap();
        repo.insert(&account("353c", 2, 0)).await.unwrap();

        assert_eq!(repo.list_by_owner(1).await.unwrap().len(), 2);
        assert_eq!(repo.list_by_owner(3).await.unwrap().len(), 0);
    }
}
