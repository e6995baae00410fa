//! Transaction engine
//!
//! Applies one deposit or withdrawal to one account. Concurrent writers are
//! never locked out; each one reads the account, decides, and commits
//! against the version it read. A writer that loses the race re-reads and
//! decides again, up to the bound in its [`RetryPolicy`].

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::ids::is_valid_account_number;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Identity, Transaction, TransactionRequest};
use crate::ports::{AccountStore, LedgerStore, TransactionStore};
use crate::services::gate::authorize;

/// Default attempt bound for conflicting writes
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 10;

/// Bound on optimistic-concurrency retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

pub struct TransactionService {
    store: Arc<dyn LedgerStore>,
    policy: RetryPolicy,
}

impl TransactionService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Apply `request` to `account_number` on behalf of `caller`
    ///
    /// Checks run in a fixed order on every attempt: the account exists,
    /// the caller owns it, the currency is the settlement currency, then
    /// the funds or balance limit allow the movement. Only a version
    /// conflict at commit time is retried.
    pub fn create_transaction(
        &self,
        account_number: &str,
        caller: &Identity,
        request: &TransactionRequest,
    ) -> Result<Transaction> {
        check_account_number(account_number)?;
        let request = &request.validate()?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_apply(account_number, caller, request) {
                Ok((account, transaction)) => {
                    info!(
                        account = %account_number,
                        transaction = %transaction.id,
                        kind = %transaction.transaction_type,
                        amount = %transaction.amount,
                        balance = %account.balance,
                        version = account.version,
                        attempt,
                        "transaction committed"
                    );
                    return Ok(transaction);
                }
                Err(e) if e.is_conflict() => {
                    if attempt >= self.policy.max_attempts {
                        warn!(account = %account_number, attempts = attempt, "giving up after conflicts");
                        return Err(Error::ConcurrencyExhausted {
                            account_number: account_number.to_string(),
                            attempts: attempt,
                        });
                    }
                    warn!(
                        account = %account_number,
                        attempt,
                        max = self.policy.max_attempts,
                        "concurrent modification, retrying"
                    );
                    thread::sleep(self.policy.delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_apply(
        &self,
        account_number: &str,
        caller: &Identity,
        request: &TransactionRequest,
    ) -> Result<(Account, Transaction)> {
        let account = self.load_owned(account_number, caller)?;

        if !request.currency.is_settlement() {
            return Err(Error::UnsupportedCurrency(request.currency.to_string()));
        }

        let next = account.apply(request.transaction_type, request.amount)?;
        let transaction = Transaction::new(&account.account_number, &caller.owner_id, request);
        let stored = self.store.commit(&next, &transaction)?;
        Ok((stored, transaction))
    }

    /// Transactions on an account the caller owns, oldest first
    pub fn list_transactions(
        &self,
        account_number: &str,
        caller: &Identity,
    ) -> Result<Vec<Transaction>> {
        check_account_number(account_number)?;
        self.load_owned(account_number, caller)?;
        self.store.list_by_account(account_number)
    }

    pub fn fetch_transaction(
        &self,
        account_number: &str,
        transaction_id: &str,
        caller: &Identity,
    ) -> Result<Transaction> {
        check_account_number(account_number)?;
        if !Transaction::is_valid_id(transaction_id) {
            return Err(Error::validation(format!(
                "transaction id {} is not a tan- identifier",
                transaction_id
            )));
        }
        self.load_owned(account_number, caller)?;
        self.store
            .find_by_account_and_id(account_number, transaction_id)?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "transaction {} on account {}",
                    transaction_id, account_number
                ))
            })
    }

    fn load_owned(&self, account_number: &str, caller: &Identity) -> Result<Account> {
        let account = self
            .store
            .find_by_account_number(account_number)?
            .ok_or_else(|| Error::not_found(format!("account {}", account_number)))?;
        authorize(caller, &account.owner_id)?;
        Ok(account)
    }
}

fn check_account_number(account_number: &str) -> Result<()> {
    if !is_valid_account_number(account_number) {
        return Err(Error::validation(format!(
            "account number {} does not match 01NNNNNN",
            account_number
        )));
    }
    Ok(())
}
