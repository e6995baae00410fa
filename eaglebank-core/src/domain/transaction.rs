//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{has_opaque_format, new_opaque_id, TRANSACTION_PREFIX};
use super::money::{validate_amount, Currency};
use super::result::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }

    /// Signed effect on the balance
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            Self::Deposit => amount,
            Self::Withdrawal => -amount,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" | "withdraw" => Ok(Self::Withdrawal),
            other => Err(Error::validation(format!("unknown transaction type: {}", other))),
        }
    }
}

/// A requested money movement, before it touches any account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl TransactionRequest {
    pub fn new(amount: Decimal, currency: Currency, transaction_type: TransactionType) -> Self {
        Self {
            amount,
            currency,
            transaction_type,
            reference: None,
        }
    }

    pub fn deposit(amount: Decimal) -> Self {
        Self::new(amount, Currency::GBP, TransactionType::Deposit)
    }

    pub fn withdrawal(amount: Decimal) -> Self {
        Self::new(amount, Currency::GBP, TransactionType::Withdrawal)
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Shape checks only; currency support and funds are the engine's call
    ///
    /// Returns the request with its amount fixed at two decimal places, the
    /// form it is stored in.
    pub fn validate(&self) -> Result<Self> {
        Ok(Self {
            amount: validate_amount(self.amount)?,
            ..self.clone()
        })
    }
}

/// An applied money movement
///
/// Append-only: created once by the transaction engine, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_number: String,
    pub owner_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Record `request` against `account_number` with a fresh id
    pub fn new(
        account_number: impl Into<String>,
        owner_id: impl Into<String>,
        request: &TransactionRequest,
    ) -> Self {
        Self {
            id: new_opaque_id(TRANSACTION_PREFIX),
            account_number: account_number.into(),
            owner_id: owner_id.into(),
            amount: request.amount,
            currency: request.currency,
            transaction_type: request.transaction_type,
            reference: request.reference.clone(),
            created_at: super::now(),
        }
    }

    pub fn is_valid_id(id: &str) -> bool {
        has_opaque_format(TRANSACTION_PREFIX, id)
    }

    /// Signed effect of this transaction on its account balance
    pub fn signed_amount(&self) -> Decimal {
        self.transaction_type.signed(self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_copies_request() {
        let request = TransactionRequest::withdrawal(Decimal::new(20000, 2)).with_reference("rent");
        let tx = Transaction::new("01000001", "usr-1", &request);

        assert!(Transaction::is_valid_id(&tx.id));
        assert_eq!(tx.amount, Decimal::new(20000, 2));
        assert_eq!(tx.transaction_type, TransactionType::Withdrawal);
        assert_eq!(tx.reference.as_deref(), Some("rent"));
        assert_eq!(tx.signed_amount(), Decimal::new(-20000, 2));
    }

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!("Deposit".parse::<TransactionType>().unwrap(), TransactionType::Deposit);
        assert_eq!("withdraw".parse::<TransactionType>().unwrap(), TransactionType::Withdrawal);
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_request_wire_format() {
        let request: TransactionRequest = serde_json::from_str(
            r#"{"amount": "200.00", "currency": "GBP", "type": "withdrawal"}"#,
        )
        .unwrap();
        assert_eq!(request.transaction_type, TransactionType::Withdrawal);
        assert_eq!(request.amount, Decimal::new(20000, 2));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_amount_bounds() {
        assert!(TransactionRequest::deposit(Decimal::new(1_000_001, 2)).validate().is_err());
        assert!(TransactionRequest::deposit(Decimal::new(-100, 2)).validate().is_err());
    }

    #[test]
    fn test_validated_amount_has_two_places() {
        let request = TransactionRequest::deposit("1.000".parse().unwrap())
            .validate()
            .unwrap();
        assert_eq!(request.amount.to_string(), "1.00");

        let whole = TransactionRequest::deposit(Decimal::from(5)).validate().unwrap();
        assert_eq!(whole.amount.to_string(), "5.00");
        assert_eq!(serde_json::to_value(&whole).unwrap()["amount"], "5.00");
    }
}
