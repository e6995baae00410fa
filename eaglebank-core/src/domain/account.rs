//! Account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::is_valid_account_number;
use super::money::{Currency, MAX_AMOUNT};
use super::result::{Error, Result};
use super::transaction::TransactionType;

/// Every account is opened under this branch
pub const SORT_CODE: &str = "10-10-10";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Personal,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(Self::Personal),
            _ => None,
        }
    }
}

/// A bank account belonging to one user
///
/// `owner_id` is a lookup key into the user domain, not an owning reference.
/// `version` is bumped by the store on every successful compare-and-swap
/// write and is never edited by domain code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_number: String,
    pub owner_id: String,
    pub name: String,
    pub account_type: AccountType,
    pub sort_code: String,
    pub balance: Decimal,
    pub currency: Currency,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new, empty GBP account
    pub fn new(
        account_number: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = super::now();
        Self {
            account_number: account_number.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            account_type: AccountType::Personal,
            sort_code: SORT_CODE.to_string(),
            balance: Decimal::new(0, 2),
            currency: Currency::GBP,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }

    /// Compute the account state after a movement of `amount`
    ///
    /// Returns the next state with the same `version`; the store assigns
    /// the new version when the write lands.
    pub fn apply(&self, transaction_type: TransactionType, amount: Decimal) -> Result<Account> {
        let balance = match transaction_type {
            TransactionType::Deposit => {
                let next = self.balance + amount;
                if next > MAX_AMOUNT {
                    return Err(Error::BalanceLimitExceeded {
                        balance: self.balance,
                        requested: amount,
                        limit: MAX_AMOUNT,
                    });
                }
                next
            }
            TransactionType::Withdrawal => {
                if amount > self.balance {
                    return Err(Error::InsufficientFunds {
                        balance: self.balance,
                        requested: amount,
                    });
                }
                self.balance - amount
            }
        };

        Ok(Account {
            balance,
            updated_at: super::now(),
            ..self.clone()
        })
    }

    /// Validate account data
    pub fn validate(&self) -> Result<()> {
        if !is_valid_account_number(&self.account_number) {
            return Err(Error::validation(format!(
                "account number {} does not match 01NNNNNN",
                self.account_number
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::validation("account name cannot be empty"));
        }
        if self.owner_id.trim().is_empty() {
            return Err(Error::validation("account owner cannot be empty"));
        }
        if self.balance.is_sign_negative() && !self.balance.is_zero() {
            return Err(Error::validation("balance cannot be negative"));
        }
        if self.balance > MAX_AMOUNT {
            return Err(Error::validation(format!("balance cannot exceed {}", MAX_AMOUNT)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(balance: i64) -> Account {
        let mut account = Account::new("01000001", "usr-1", "Current");
        account.balance = Decimal::new(balance, 2);
        account
    }

    #[test]
    fn test_new_account_defaults() {
        let account = Account::new("01000001", "usr-1", "Current");
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.currency, Currency::GBP);
        assert_eq!(account.version, 0);
        assert_eq!(account.sort_code, SORT_CODE);
        assert!(account.validate().is_ok());
    }

    #[test]
    fn test_withdrawal_reduces_balance_without_touching_version() {
        let account = funded(50000);
        let next = account
            .apply(TransactionType::Withdrawal, Decimal::new(20000, 2))
            .unwrap();
        assert_eq!(next.balance, Decimal::new(30000, 2));
        assert_eq!(next.version, account.version);
    }

    #[test]
    fn test_withdrawal_of_entire_balance_is_allowed() {
        let account = funded(15000);
        let next = account
            .apply(TransactionType::Withdrawal, Decimal::new(15000, 2))
            .unwrap();
        assert!(next.balance.is_zero());
    }

    #[test]
    fn test_overdraw_is_rejected() {
        let account = funded(15000);
        let err = account
            .apply(TransactionType::Withdrawal, Decimal::new(15001, 2))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
    }

    #[test]
    fn test_deposit_over_limit_is_rejected() {
        let account = funded(999_000);
        assert!(account
            .apply(TransactionType::Deposit, Decimal::new(1000, 2))
            .is_ok());
        let err = account
            .apply(TransactionType::Deposit, Decimal::new(1001, 2))
            .unwrap_err();
        assert!(matches!(err, Error::BalanceLimitExceeded { .. }));
    }

    #[test]
    fn test_account_validation() {
        let mut account = Account::new("01000001", "usr-1", "Current");
        account.account_number = "99".to_string();
        assert!(account.validate().is_err());

        let mut account = Account::new("01000001", "usr-1", "Current");
        account.name = " ".to_string();
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let account = Account::new("01000001", "usr-1", "Current");
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["accountNumber"], "01000001");
        assert_eq!(json["ownerId"], "usr-1");
        assert_eq!(json["accountType"], "personal");
        assert_eq!(json["currency"], "GBP");
    }
}
