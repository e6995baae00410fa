//! Identifier generation and format checks
//!
//! Transaction and user ids are `<prefix>-<uuid v4 hex>`. Each id is drawn
//! from 122 bits of randomness, so there is no shared counter to coordinate.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use uuid::Uuid;

pub const TRANSACTION_PREFIX: &str = "tan";
pub const USER_PREFIX: &str = "usr";

static OPAQUE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<prefix>[a-z]+)-[A-Za-z0-9]+$").unwrap());

static ACCOUNT_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^01[0-9]{6}$").unwrap());

/// Generate a fresh `<prefix>-<opaque>` identifier
pub fn new_opaque_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// True if `id` is `<prefix>-` followed by one or more alphanumerics
pub fn has_opaque_format(prefix: &str, id: &str) -> bool {
    OPAQUE_ID_RE
        .captures(id)
        .and_then(|caps| caps.name("prefix"))
        .is_some_and(|p| p.as_str() == prefix)
}

/// Draw a candidate account number: `01` followed by six digits
///
/// Uniqueness is the caller's job; see `AccountService::create_account`.
pub fn new_account_number() -> String {
    let number: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("01{:06}", number)
}

pub fn is_valid_account_number(account_number: &str) -> bool {
    ACCOUNT_NUMBER_RE.is_match(account_number)
}
