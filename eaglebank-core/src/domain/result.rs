//! Result and error types for the core library

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Every operation in the core returns one of these. Variants map onto the
/// caller-visible failure kinds; `ConcurrencyConflict` is the only one the
/// transaction engine retries internally.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Identity incomplete: {0}")]
    IdentityIncomplete(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unsupported currency: {0} (only GBP is accepted)")]
    UnsupportedCurrency(String),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("Balance limit exceeded: balance {balance} plus {requested} is over {limit}")]
    BalanceLimitExceeded {
        balance: Decimal,
        requested: Decimal,
        limit: Decimal,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Concurrent modification of account {account_number} (expected version {expected_version})")]
    ConcurrencyConflict {
        account_number: String,
        expected_version: u64,
    },

    #[error("Transaction on account {account_number} failed after {attempts} attempts due to concurrent modification")]
    ConcurrencyExhausted { account_number: String, attempts: u32 },

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stable, serializable name of an [`Error`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    IdentityIncomplete,
    NotFound,
    Forbidden,
    UnsupportedCurrency,
    InsufficientFunds,
    BalanceLimitExceeded,
    Validation,
    ConcurrencyConflict,
    ConcurrencyExhausted,
    StoreFailure,
    Config,
    Internal,
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a store failure
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create an unauthenticated error
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::IdentityIncomplete(_) => ErrorKind::IdentityIncomplete,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::UnsupportedCurrency(_) => ErrorKind::UnsupportedCurrency,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::BalanceLimitExceeded { .. } => ErrorKind::BalanceLimitExceeded,
            Self::Validation(_) => ErrorKind::Validation,
            Self::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::ConcurrencyExhausted { .. } => ErrorKind::ConcurrencyExhausted,
            Self::Store(_) => ErrorKind::StoreFailure,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status a transport layer should answer with
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Unauthenticated => 401,
            ErrorKind::IdentityIncomplete | ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Validation | ErrorKind::UnsupportedCurrency => 400,
            ErrorKind::ConcurrencyConflict | ErrorKind::ConcurrencyExhausted => 409,
            ErrorKind::InsufficientFunds | ErrorKind::BalanceLimitExceeded => 422,
            ErrorKind::StoreFailure | ErrorKind::Config | ErrorKind::Internal => 500,
        }
    }

    /// True only for optimistic-lock conflicts
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }

    /// Create a failed result carrying the error kind and status
    pub fn from_error(error: &Error) -> Self {
        let mut context = HashMap::new();
        context.insert("kind".to_string(), serde_json::json!(error.kind()));
        context.insert("status".to_string(), serde_json::json!(error.status_code()));
        Self::fail_with_context(error.to_string(), context)
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::from_error(&e),
        }
    }
}
