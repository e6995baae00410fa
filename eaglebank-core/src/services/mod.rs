//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod authentication;
pub mod gate;
pub mod migration;
pub mod token;
pub mod transaction;
pub mod user;

pub use account::AccountService;
pub use authentication::AuthenticationService;
pub use gate::{AuthGate, GateDecision};
pub use migration::{MigrationResult, MigrationService};
pub use token::TokenService;
pub use transaction::{RetryPolicy, TransactionService};
pub use user::UserService;
