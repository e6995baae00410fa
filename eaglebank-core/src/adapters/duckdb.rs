//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};
use tracing::warn;

use crate::domain::money::{from_minor_units, to_minor_units};
use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountType, Address, Currency, Transaction, TransactionType, User,
};
use crate::ports::{AccountStore, LedgerStore, TransactionStore, UserStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "account_number, owner_id, name, account_type, sort_code,
     balance_minor, currency, version, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "transaction_id, account_number, owner_id, amount_minor,
     currency, transaction_type, reference, created_at";

const USER_COLUMNS: &str = "user_id, name, email, phone_number, address_line1, address_line2,
     address_line3, address_town, address_county, address_postcode, password_hash,
     created_at, updated_at";

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Error::Store(e.to_string())
    }
}

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
}

/// DuckDB repository implementation
///
/// Implements every store port. Connection access is serialized by a
/// mutex, but a find followed by a save is two separate lock acquisitions,
/// so writers racing on one account are resolved by the version check.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process holds the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        // Exponential backoff: 50ms, 100ms, 200ms, 400ms
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::store(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    /// Attempt to open a database connection (called by new() with retry logic)
    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs one
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }
}

// === Row mapping ===

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::store(format!("bad timestamp {:?}: {}", s, e)))
}

fn parse_currency(s: &str) -> Result<Currency> {
    s.parse()
        .map_err(|_| Error::store(format!("bad currency {:?} in store", s)))
}

struct AccountRow {
    account_number: String,
    owner_id: String,
    name: String,
    account_type: String,
    sort_code: String,
    balance_minor: i64,
    currency: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl AccountRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            account_number: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            account_type: row.get(3)?,
            sort_code: row.get(4)?,
            balance_minor: row.get(5)?,
            currency: row.get(6)?,
            version: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_account(self) -> Result<Account> {
        let account_type = AccountType::parse(&self.account_type)
            .ok_or_else(|| Error::store(format!("bad account type {:?}", self.account_type)))?;
        Ok(Account {
            account_number: self.account_number,
            owner_id: self.owner_id,
            name: self.name,
            account_type,
            sort_code: self.sort_code,
            balance: from_minor_units(self.balance_minor),
            currency: parse_currency(&self.currency)?,
            version: self.version as u64,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct TransactionRow {
    id: String,
    account_number: String,
    owner_id: String,
    amount_minor: i64,
    currency: String,
    transaction_type: String,
    reference: Option<String>,
    created_at: String,
}

impl TransactionRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_number: row.get(1)?,
            owner_id: row.get(2)?,
            amount_minor: row.get(3)?,
            currency: row.get(4)?,
            transaction_type: row.get(5)?,
            reference: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_transaction(self) -> Result<Transaction> {
        let transaction_type: TransactionType = self
            .transaction_type
            .parse()
            .map_err(|_| Error::store(format!("bad transaction type {:?}", self.transaction_type)))?;
        Ok(Transaction {
            id: self.id,
            account_number: self.account_number,
            owner_id: self.owner_id,
            amount: from_minor_units(self.amount_minor),
            currency: parse_currency(&self.currency)?,
            transaction_type,
            reference: self.reference,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    phone_number: String,
    address: Address,
    password_hash: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone_number: row.get(3)?,
            address: Address {
                line1: row.get(4)?,
                line2: row.get(5)?,
                line3: row.get(6)?,
                town: row.get(7)?,
                county: row.get(8)?,
                postcode: row.get(9)?,
            },
            password_hash: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            phone_number: self.phone_number,
            address: self.address,
            password_hash: self.password_hash,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

// === Statements shared by plain and transactional writes ===

fn select_account(conn: &Connection, account_number: &str) -> Result<Option<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM accounts WHERE account_number = ?",
        ACCOUNT_COLUMNS
    ))?;
    let mut rows = stmt.query_map(params![account_number], AccountRow::read)?;
    rows.next().transpose()?.map(AccountRow::into_account).transpose()
}

/// Versioned update; returns the account as stored
fn compare_and_swap(conn: &Connection, account: &Account) -> Result<Account> {
    let changed = conn.execute(
        "UPDATE accounts
         SET name = ?, balance_minor = ?, updated_at = ?, version = version + 1
         WHERE account_number = ? AND version = ?",
        params![
            account.name,
            to_minor_units(account.balance)?,
            format_timestamp(&account.updated_at),
            account.account_number,
            account.version as i64,
        ],
    )?;

    if changed == 0 {
        return match select_account(conn, &account.account_number)? {
            None => Err(Error::not_found(format!("account {}", account.account_number))),
            Some(_) => Err(Error::ConcurrencyConflict {
                account_number: account.account_number.clone(),
                expected_version: account.version,
            }),
        };
    }

    let mut stored = account.clone();
    stored.version = account.version + 1;
    Ok(stored)
}

fn insert_transaction_row(conn: &Connection, tx: &Transaction) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO transactions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            TRANSACTION_COLUMNS
        ),
        params![
            tx.id,
            tx.account_number,
            tx.owner_id,
            to_minor_units(tx.amount)?,
            tx.currency.as_str(),
            tx.transaction_type.as_str(),
            tx.reference,
            format_timestamp(&tx.created_at),
        ],
    )?;
    Ok(())
}

impl AccountStore for DuckDbRepository {
    fn insert_account(&self, account: &Account) -> Result<Account> {
        let conn = self.conn()?;
        if select_account(&conn, &account.account_number)?.is_some() {
            return Err(Error::validation(format!(
                "account number {} already exists",
                account.account_number
            )));
        }
        conn.execute(
            &format!(
                "INSERT INTO accounts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                ACCOUNT_COLUMNS
            ),
            params![
                account.account_number,
                account.owner_id,
                account.name,
                account.account_type.as_str(),
                account.sort_code,
                to_minor_units(account.balance)?,
                account.currency.as_str(),
                account.version as i64,
                format_timestamp(&account.created_at),
                format_timestamp(&account.updated_at),
            ],
        )?;
        Ok(account.clone())
    }

    fn find_by_account_number(&self, account_number: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        select_account(&conn, account_number)
    }

    fn list_accounts_by_owner(&self, owner_id: &str) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE owner_id = ? ORDER BY created_at, account_number",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![owner_id], AccountRow::read)?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?.into_account()?);
        }
        Ok(accounts)
    }

    fn save_account(&self, account: &Account) -> Result<Account> {
        let conn = self.conn()?;
        compare_and_swap(&conn, account)
    }
}

impl TransactionStore for DuckDbRepository {
    fn save_transaction(&self, transaction: &Transaction) -> Result<Transaction> {
        let conn = self.conn()?;
        insert_transaction_row(&conn, transaction)?;
        Ok(transaction.clone())
    }

    fn list_by_account(&self, account_number: &str) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE account_number = ?
             ORDER BY created_at, transaction_id",
            TRANSACTION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![account_number], TransactionRow::read)?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?.into_transaction()?);
        }
        Ok(transactions)
    }

    fn find_by_account_and_id(
        &self,
        account_number: &str,
        transaction_id: &str,
    ) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE account_number = ? AND transaction_id = ?",
            TRANSACTION_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![account_number, transaction_id], TransactionRow::read)?;
        rows.next()
            .transpose()?
            .map(TransactionRow::into_transaction)
            .transpose()
    }
}

impl LedgerStore for DuckDbRepository {
    fn commit(&self, account: &Account, transaction: &Transaction) -> Result<Account> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // Any early return drops `tx`, which rolls back
        let stored = compare_and_swap(&tx, account)?;
        insert_transaction_row(&tx, transaction)?;

        tx.commit()?;
        Ok(stored)
    }
}

impl UserStore for DuckDbRepository {
    fn insert_user(&self, user: &User) -> Result<User> {
        let conn = self.conn()?;
        let email = User::normalize_email(&user.email);

        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?",
            params![email],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::validation(format!("email {} is already registered", email)));
        }

        conn.execute(
            &format!(
                "INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                USER_COLUMNS
            ),
            params![
                user.id,
                user.name,
                email,
                user.phone_number,
                user.address.line1,
                user.address.line2,
                user.address.line3,
                user.address.town,
                user.address.county,
                user.address.postcode,
                user.password_hash,
                format_timestamp(&user.created_at),
                format_timestamp(&user.updated_at),
            ],
        )?;

        let mut stored = user.clone();
        stored.email = email;
        Ok(stored)
    }

    fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE user_id = ?",
            USER_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![id], UserRow::read)?;
        rows.next().transpose()?.map(UserRow::into_user).transpose()
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![User::normalize_email(email)], UserRow::read)?;
        rows.next().transpose()?.map(UserRow::into_user).transpose()
    }
}
