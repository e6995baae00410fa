//! Account service - opening and reading bank accounts

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::ids::{is_valid_account_number, new_account_number};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Identity};
use crate::ports::AccountStore;
use crate::services::gate::authorize;

/// How many random account numbers to try before giving up
const MAX_NUMBER_ATTEMPTS: u32 = 10;

pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Open an empty GBP account for the caller
    pub fn create_account(&self, caller: &Identity, name: &str) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("account name cannot be empty"));
        }

        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let number = new_account_number();
            if self.store.find_by_account_number(&number)?.is_some() {
                debug!(account = %number, "account number taken, drawing another");
                continue;
            }

            let account = Account::new(number, caller.owner_id.as_str(), name);
            account.validate()?;
            match self.store.insert_account(&account) {
                Ok(account) => {
                    info!(account = %account.account_number, owner = %account.owner_id, "account opened");
                    return Ok(account);
                }
                // Lost a race for the same number
                Err(Error::Validation(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::store(format!(
            "no free account number after {} attempts",
            MAX_NUMBER_ATTEMPTS
        )))
    }

    pub fn list_accounts(&self, caller: &Identity) -> Result<Vec<Account>> {
        self.store.list_accounts_by_owner(&caller.owner_id)
    }

    pub fn fetch_account(&self, account_number: &str, caller: &Identity) -> Result<Account> {
        if !is_valid_account_number(account_number) {
            return Err(Error::validation(format!(
                "account number {} does not match 01NNNNNN",
                account_number
            )));
        }
        let account = self
            .store
            .find_by_account_number(account_number)?
            .ok_or_else(|| Error::not_found(format!("account {}", account_number)))?;
        authorize(caller, &account.owner_id)?;
        Ok(account)
    }
}
