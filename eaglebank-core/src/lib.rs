//! Eaglebank Core - accounts, users and money movement
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Transaction, User, token claims)
//! - **ports**: Trait definitions for the stores the services depend on
//! - **services**: Business logic orchestration (tokens, gate, transaction engine)
//! - **adapters**: Concrete store implementations (DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult};
pub use domain::{
    Account, Address, Currency, Identity, NewUser, Transaction, TransactionRequest, TransactionType,
    User,
};

pub const DATABASE_FILE: &str = "eaglebank.duckdb";

/// Main context for Eaglebank operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct BankContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub gate: AuthGate,
    pub authentication_service: AuthenticationService,
    pub user_service: UserService,
    pub account_service: AccountService,
    pub transaction_service: TransactionService,
}

impl BankContext {
    /// Open (or create) the bank in `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load_or_init(data_dir)?;
        let repository = Arc::new(
            DuckDbRepository::new(&data_dir.join(DATABASE_FILE))
                .context("cannot open database")?,
        );
        Self::with_repository(config, repository)
    }

    /// Wire services around an already opened repository
    pub fn with_repository(config: Config, repository: Arc<DuckDbRepository>) -> Result<Self> {
        repository.ensure_schema().context("cannot migrate database")?;

        let tokens = Arc::new(config.token_service()?);
        let gate = AuthGate::new(Arc::clone(&tokens));
        let authentication_service = AuthenticationService::new(repository.clone(), tokens);
        let user_service = UserService::new(repository.clone());
        let account_service = AccountService::new(repository.clone());
        let transaction_service =
            TransactionService::new(repository.clone()).with_policy(config.retry);

        Ok(Self {
            config,
            repository,
            gate,
            authentication_service,
            user_service,
            account_service,
            transaction_service,
        })
    }

    /// Authenticate an `Authorization` header value
    pub fn authenticate(&self, authorization: Option<&str>) -> domain::result::Result<Identity> {
        self.gate.authenticate(authorization)
    }
}
