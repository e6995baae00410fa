//! Store ports - persistence abstraction
//!
//! The services depend only on these traits. Implementations must be safe to
//! share between threads; each request worker holds an `Arc` to the same
//! store and no other synchronization is layered on top.

use crate::domain::result::Result;
use crate::domain::{Account, Transaction, User};

/// Durable keyed storage of accounts with optimistic versioning
pub trait AccountStore: Send + Sync {
    /// Insert a brand new account
    ///
    /// Fails with `Validation` if the account number is already taken.
    fn insert_account(&self, account: &Account) -> Result<Account>;

    /// Look an account up by its external number
    fn find_by_account_number(&self, account_number: &str) -> Result<Option<Account>>;

    /// All accounts owned by `owner_id`, ordered by creation time
    fn list_accounts_by_owner(&self, owner_id: &str) -> Result<Vec<Account>>;

    /// Compare-and-swap write
    ///
    /// `account.version` is the version the caller read. The write only lands
    /// if the stored version still equals it; the stored row then carries
    /// `version + 1`, which is what the returned account reports. Otherwise
    /// fails with `ConcurrencyConflict` and leaves the row untouched.
    fn save_account(&self, account: &Account) -> Result<Account>;
}

/// Append-only storage of applied transactions
pub trait TransactionStore: Send + Sync {
    fn save_transaction(&self, transaction: &Transaction) -> Result<Transaction>;

    /// Transactions on one account, oldest first
    fn list_by_account(&self, account_number: &str) -> Result<Vec<Transaction>>;

    fn find_by_account_and_id(
        &self,
        account_number: &str,
        transaction_id: &str,
    ) -> Result<Option<Transaction>>;
}

/// Unit of work spanning an account write and its transaction record
pub trait LedgerStore: AccountStore + TransactionStore {
    /// Apply the compare-and-swap account write and insert `transaction`
    /// atomically: either both persist or neither does.
    ///
    /// Conflict semantics are those of [`AccountStore::save_account`].
    fn commit(&self, account: &Account, transaction: &Transaction) -> Result<Account>;
}

/// Registered users
pub trait UserStore: Send + Sync {
    /// Fails with `Validation` if the email is already registered
    fn insert_user(&self, user: &User) -> Result<User>;

    fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;

    /// `email` is matched after normalization
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}
