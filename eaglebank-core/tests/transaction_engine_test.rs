//! End-to-end tests for the transaction engine against a DuckDB file
//!
//! Run with: cargo test --test transaction_engine_test -- --nocapture

use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use eaglebank_core::adapters::duckdb::DuckDbRepository;
use eaglebank_core::config::Config;
use eaglebank_core::ports::{AccountStore, TransactionStore};
use eaglebank_core::services::gate::BEARER_PREFIX;
use eaglebank_core::services::TransactionService;
use eaglebank_core::{
    Account, Address, BankContext, Currency, Error, Identity, NewUser, TransactionRequest,
    TransactionType,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).unwrap();
    repo.ensure_schema().unwrap();
    Arc::new(repo)
}

fn seed_account(repo: &DuckDbRepository, number: &str, owner: &str, balance: Decimal) -> Account {
    let mut account = Account::new(number, owner, "Current");
    account.balance = balance;
    repo.insert_account(&account).unwrap()
}

fn caller(owner: &str) -> Identity {
    Identity {
        subject: format!("{}@example.com", owner),
        owner_id: owner.to_string(),
    }
}

fn registration(name: &str, email: &str, password: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        phone_number: "+447700900123".to_string(),
        address: Address::new("1 High Street", "Leeds", "West Yorkshire", "LS1 1AA"),
        password: password.to_string(),
    }
}

fn gbp(pence: i64) -> Decimal {
    Decimal::new(pence, 2)
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn test_owner_withdrawal_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    seed_account(&repo, "01000001", "usr-1", gbp(50000));
    let service = TransactionService::new(repo.clone());

    let tx = service
        .create_transaction(
            "01000001",
            &caller("usr-1"),
            &TransactionRequest::withdrawal(gbp(20000)),
        )
        .unwrap();

    assert_eq!(tx.transaction_type, TransactionType::Withdrawal);
    assert_eq!(tx.amount, gbp(20000));
    assert_eq!(tx.currency, Currency::GBP);
    assert_eq!(tx.account_number, "01000001");

    let account = repo.find_by_account_number("01000001").unwrap().unwrap();
    assert_eq!(account.balance, gbp(30000));
    assert_eq!(account.version, 1);

    let recorded = repo.list_by_account("01000001").unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].id, tx.id);
}

#[test]
fn test_non_owner_is_forbidden_and_nothing_changes() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    seed_account(&repo, "01000001", "usr-1", gbp(50000));
    let service = TransactionService::new(repo.clone());

    for request in [
        TransactionRequest::withdrawal(gbp(100)),
        TransactionRequest::deposit(gbp(100)),
        TransactionRequest::new(gbp(100), Currency::USD, TransactionType::Deposit),
        TransactionRequest::withdrawal(gbp(900_000)),
    ] {
        let err = service
            .create_transaction("01000001", &caller("usr-2"), &request)
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)), "got {:?}", err);
        assert_eq!(err.status_code(), 403);
    }

    let account = repo.find_by_account_number("01000001").unwrap().unwrap();
    assert_eq!(account.balance, gbp(50000));
    assert_eq!(account.version, 0);
    assert!(repo.list_by_account("01000001").unwrap().is_empty());
}

#[test]
fn test_unsupported_currency_leaves_state_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    seed_account(&repo, "01000001", "usr-1", gbp(50000));
    let service = TransactionService::new(repo.clone());

    for currency in [Currency::USD, Currency::EUR] {
        let request = TransactionRequest::new(gbp(100), currency, TransactionType::Deposit);
        let err = service
            .create_transaction("01000001", &caller("usr-1"), &request)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCurrency(_)));
        assert_eq!(err.status_code(), 400);
    }

    let account = repo.find_by_account_number("01000001").unwrap().unwrap();
    assert_eq!(account.version, 0);
    assert!(repo.list_by_account("01000001").unwrap().is_empty());
}

#[test]
fn test_insufficient_funds_leaves_state_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    seed_account(&repo, "01000001", "usr-1", gbp(15000));
    let service = TransactionService::new(repo.clone());

    let err = service
        .create_transaction(
            "01000001",
            &caller("usr-1"),
            &TransactionRequest::withdrawal(gbp(15001)),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));
    assert_eq!(err.status_code(), 422);

    let account = repo.find_by_account_number("01000001").unwrap().unwrap();
    assert_eq!(account.balance, gbp(15000));
    assert_eq!(account.version, 0);

    // Withdrawing the whole balance is allowed
    service
        .create_transaction(
            "01000001",
            &caller("usr-1"),
            &TransactionRequest::withdrawal(gbp(15000)),
        )
        .unwrap();
    let account = repo.find_by_account_number("01000001").unwrap().unwrap();
    assert_eq!(account.balance, Decimal::ZERO);
}

#[test]
fn test_returned_amount_matches_stored_amount() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    seed_account(&repo, "01000001", "usr-1", gbp(0));
    let service = TransactionService::new(repo.clone());

    let tx = service
        .create_transaction(
            "01000001",
            &caller("usr-1"),
            &TransactionRequest::deposit("1.000".parse().unwrap()),
        )
        .unwrap();
    let stored = repo
        .find_by_account_and_id("01000001", &tx.id)
        .unwrap()
        .unwrap();

    assert_eq!(tx.amount.to_string(), "1.00");
    assert_eq!(
        serde_json::to_value(&tx).unwrap(),
        serde_json::to_value(&stored).unwrap()
    );
}

#[test]
fn test_history_is_ordered_and_scoped() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    seed_account(&repo, "01000001", "usr-1", Decimal::ZERO);
    seed_account(&repo, "01000002", "usr-1", Decimal::ZERO);
    let service = TransactionService::new(repo.clone());
    let me = caller("usr-1");

    let first = service
        .create_transaction("01000001", &me, &TransactionRequest::deposit(gbp(1000)))
        .unwrap();
    let second = service
        .create_transaction(
            "01000001",
            &me,
            &TransactionRequest::withdrawal(gbp(250)).with_reference("coffee"),
        )
        .unwrap();
    let elsewhere = service
        .create_transaction("01000002", &me, &TransactionRequest::deposit(gbp(1)))
        .unwrap();

    let history = service.list_transactions("01000001", &me).unwrap();
    let ids: Vec<&str> = history.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    assert_eq!(history[1].reference.as_deref(), Some("coffee"));

    // A transaction id from another account is not found here
    assert!(matches!(
        service.fetch_transaction("01000001", &elsewhere.id, &me),
        Err(Error::NotFound(_))
    ));
    assert_eq!(
        service.fetch_transaction("01000002", &elsewhere.id, &me).unwrap(),
        elsewhere
    );
}

#[test]
fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let repo = create_test_repo(&temp_dir);
        seed_account(&repo, "01000001", "usr-1", Decimal::ZERO);
        TransactionService::new(repo.clone())
            .create_transaction("01000001", &caller("usr-1"), &TransactionRequest::deposit(gbp(4242)))
            .unwrap();
    }

    let repo = create_test_repo(&temp_dir);
    let account = repo.find_by_account_number("01000001").unwrap().unwrap();
    assert_eq!(account.balance, gbp(4242));
    assert_eq!(account.version, 1);
    assert_eq!(repo.list_by_account("01000001").unwrap().len(), 1);
}

// ============================================================================
// Full context: login, gate, accounts
// ============================================================================

#[test]
fn test_bank_context_flow() {
    let temp_dir = TempDir::new().unwrap();
    let bank = BankContext::new(temp_dir.path()).unwrap();

    let ada = bank
        .user_service
        .create_user(&registration("Ada", "ada@example.com", "pw-ada"))
        .unwrap();
    bank.user_service
        .create_user(&registration("Bob", "bob@example.com", "pw-bob"))
        .unwrap();

    let ada_token = bank
        .authentication_service
        .authenticate("ada@example.com", "pw-ada")
        .unwrap();
    let bob_token = bank
        .authentication_service
        .authenticate("bob@example.com", "pw-bob")
        .unwrap();

    let ada_header = format!("{}{}", BEARER_PREFIX, ada_token);
    let bob_header = format!("{}{}", BEARER_PREFIX, bob_token);

    let ada_id = bank.authenticate(Some(&ada_header)).unwrap();
    assert_eq!(ada_id.owner_id, ada.id);
    let profile = bank.user_service.fetch_user(&ada.id, &ada_id).unwrap();
    assert_eq!(profile.phone_number, "+447700900123");
    assert_eq!(profile.address.town, "Leeds");

    let account = bank.account_service.create_account(&ada_id, "Main").unwrap();
    bank.transaction_service
        .create_transaction(
            &account.account_number,
            &ada_id,
            &TransactionRequest::deposit(gbp(10000)),
        )
        .unwrap();

    let bob_id = bank.authenticate(Some(&bob_header)).unwrap();
    assert!(matches!(
        bank.account_service.fetch_account(&account.account_number, &bob_id),
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        bank.authenticate(Some("Bearer not-a-token")),
        Err(Error::Unauthenticated(_))
    ));

    let fetched = bank
        .account_service
        .fetch_account(&account.account_number, &ada_id)
        .unwrap();
    assert_eq!(fetched.balance, gbp(10000));
}

#[test]
fn test_tokens_survive_context_restart() {
    let temp_dir = TempDir::new().unwrap();
    let token = {
        let bank = BankContext::new(temp_dir.path()).unwrap();
        bank.user_service
            .create_user(&registration("Ada", "ada@example.com", "pw"))
            .unwrap();
        bank.authentication_service
            .authenticate("ada@example.com", "pw")
            .unwrap()
    };

    let config = Config::load(temp_dir.path()).unwrap();
    assert!(config.token_service().unwrap().validate(&token));

    let bank = BankContext::new(temp_dir.path()).unwrap();
    assert!(bank
        .authenticate(Some(&format!("{}{}", BEARER_PREFIX, token)))
        .is_ok());
}
