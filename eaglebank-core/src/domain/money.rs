//! Currency and amount rules

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Upper bound for both balances and single transaction amounts (10000.00)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 2);

/// Amounts carry at most this many decimal places
pub const AMOUNT_SCALE: u32 = 2;

/// ISO 4217 currencies the API understands
///
/// Only [`Currency::GBP`] settles; the others parse so that a request in
/// them can be rejected as unsupported rather than malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    USD,
    EUR,
}

impl Currency {
    /// The single settlement currency
    pub const SETTLEMENT: Currency = Currency::GBP;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GBP => "GBP",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }

    pub fn is_settlement(&self) -> bool {
        *self == Self::SETTLEMENT
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = Error;

    /// Normalizes to uppercase; unknown codes are unsupported, not invalid
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "GBP" => Ok(Self::GBP),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "" => Err(Error::validation("currency cannot be empty")),
            other => Err(Error::UnsupportedCurrency(other.to_string())),
        }
    }
}

/// Check a request amount: within `[0, MAX_AMOUNT]` and at most 2 dp
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::validation(format!("amount {} is negative", amount)));
    }
    if amount > MAX_AMOUNT {
        return Err(Error::validation(format!(
            "amount {} exceeds the maximum of {}",
            amount, MAX_AMOUNT
        )));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(Error::validation(format!(
            "amount {} has more than {} decimal places",
            amount, AMOUNT_SCALE
        )));
    }
    let mut normalized = amount;
    normalized.rescale(AMOUNT_SCALE);
    if normalized.is_zero() {
        normalized.set_sign_positive(true);
    }
    Ok(normalized)
}

/// Convert to pence for integer storage
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount.round_dp(AMOUNT_SCALE) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| Error::validation(format!("amount {} out of range", amount)))
}

/// Convert stored pence back into a 2 dp decimal
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, AMOUNT_SCALE)
}
