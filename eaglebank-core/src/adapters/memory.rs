//! In-memory store
//!
//! Implements every store port behind a single mutex. Used by tests and by
//! embedders that do not need durability. The mutex only guards the maps;
//! it does not serialize read-validate-write sequences in the services, so
//! compare-and-swap conflicts surface exactly as they do against DuckDB.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Transaction, User};
use crate::ports::{AccountStore, LedgerStore, TransactionStore, UserStore};

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    transactions: Vec<Transaction>,
    users: HashMap<String, User>,
}

impl State {
    /// Check the expected version and build the row that would be stored
    fn next_version(&self, account: &Account) -> Result<Account> {
        let stored = self
            .accounts
            .get(&account.account_number)
            .ok_or_else(|| Error::not_found(format!("account {}", account.account_number)))?;

        if stored.version != account.version {
            return Err(Error::ConcurrencyConflict {
                account_number: account.account_number.clone(),
                expected_version: account.version,
            });
        }

        let mut next = account.clone();
        next.version = stored.version + 1;
        Ok(next)
    }

    fn check_new_transaction(&self, transaction: &Transaction) -> Result<()> {
        if self.transactions.iter().any(|t| t.id == transaction.id) {
            return Err(Error::store(format!(
                "duplicate transaction id {}",
                transaction.id
            )));
        }
        Ok(())
    }
}

/// Thread-safe in-memory implementation of the store ports
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))
    }
}

impl AccountStore for InMemoryStore {
    fn insert_account(&self, account: &Account) -> Result<Account> {
        let mut state = self.state()?;
        if state.accounts.contains_key(&account.account_number) {
            return Err(Error::validation(format!(
                "account number {} already exists",
                account.account_number
            )));
        }
        state
            .accounts
            .insert(account.account_number.clone(), account.clone());
        Ok(account.clone())
    }

    fn find_by_account_number(&self, account_number: &str) -> Result<Option<Account>> {
        Ok(self.state()?.accounts.get(account_number).cloned())
    }

    fn list_accounts_by_owner(&self, owner_id: &str) -> Result<Vec<Account>> {
        let state = self.state()?;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.account_number.cmp(&b.account_number))
        });
        Ok(accounts)
    }

    fn save_account(&self, account: &Account) -> Result<Account> {
        let mut state = self.state()?;
        let next = state.next_version(account)?;
        state
            .accounts
            .insert(next.account_number.clone(), next.clone());
        Ok(next)
    }
}

impl TransactionStore for InMemoryStore {
    fn save_transaction(&self, transaction: &Transaction) -> Result<Transaction> {
        let mut state = self.state()?;
        state.check_new_transaction(transaction)?;
        state.transactions.push(transaction.clone());
        Ok(transaction.clone())
    }

    fn list_by_account(&self, account_number: &str) -> Result<Vec<Transaction>> {
        let state = self.state()?;
        // Vec order is insertion order, which is commit order
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.account_number == account_number)
            .cloned()
            .collect())
    }

    fn find_by_account_and_id(
        &self,
        account_number: &str,
        transaction_id: &str,
    ) -> Result<Option<Transaction>> {
        let state = self.state()?;
        Ok(state
            .transactions
            .iter()
            .find(|t| t.account_number == account_number && t.id == transaction_id)
            .cloned())
    }
}

impl LedgerStore for InMemoryStore {
    fn commit(&self, account: &Account, transaction: &Transaction) -> Result<Account> {
        let mut state = self.state()?;
        // Both checks run before either write
        let next = state.next_version(account)?;
        state.check_new_transaction(transaction)?;

        state
            .accounts
            .insert(next.account_number.clone(), next.clone());
        state.transactions.push(transaction.clone());
        Ok(next)
    }
}

impl UserStore for InMemoryStore {
    fn insert_user(&self, user: &User) -> Result<User> {
        let mut state = self.state()?;
        let email = User::normalize_email(&user.email);
        if state.users.values().any(|u| u.email == email) {
            return Err(Error::validation(format!("email {} is already registered", email)));
        }
        let mut stored = user.clone();
        stored.email = email;
        state.users.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.state()?.users.get(id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = User::normalize_email(email);
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}
