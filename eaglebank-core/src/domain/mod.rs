//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod ids;
pub mod money;
pub mod result;
pub mod token;
mod transaction;
mod user;

pub use account::{Account, AccountType, SORT_CODE};
pub use money::Currency;
pub use token::{Claims, Identity};
pub use transaction::{Transaction, TransactionRequest, TransactionType};
pub use user::{is_valid_phone_number, Address, NewUser, User};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the microsecond precision the store keeps
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
