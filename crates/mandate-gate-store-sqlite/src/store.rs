// crates/mandate-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Mandate and Job Store
// Description: Durable MandateStore and MonitorJobStore backed by SQLite WAL.
// Purpose: Persist append-only mandates and host the atomic exactly-once claim.
// Dependencies: mandate-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements the persistence contracts over a single `SQLite`
//! database. Mandates and transactions are append-only rows keyed by their
//! identifiers; a duplicate insert fails closed. Monitoring jobs are the one
//! mutable table, and the exactly-once guard is expressed as a single
//! conditional `UPDATE ... WHERE active = 1` whose affected-row count decides
//! the winner. `SQLite` serializes writers, so of any number of concurrent
//! claims for a job id exactly one observes a changed row.
//!
//! Database contents are treated as untrusted on load and fail closed on
//! parse or integrity errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use mandate_gate_core::Cart;
use mandate_gate_core::CartId;
use mandate_gate_core::Intent;
use mandate_gate_core::IntentId;
use mandate_gate_core::JobStoreError;
use mandate_gate_core::MandateStore;
use mandate_gate_core::MonitorJob;
use mandate_gate_core::MonitorJobStore;
use mandate_gate_core::Payment;
use mandate_gate_core::PaymentId;
use mandate_gate_core::PurchaseConstraints;
use mandate_gate_core::StoreError;
use mandate_gate_core::TerminalReason;
use mandate_gate_core::Timestamp;
use mandate_gate_core::Transaction;
use mandate_gate_core::TransactionId;
use mandate_gate_core::UserId;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4_096;

/// Mandate kind labels stored alongside record bodies.
mod kind {
    /// Intent mandate kind label.
    pub const INTENT: &str = "intent";
    /// Cart mandate kind label.
    pub const CART: &str = "cart";
    /// Payment mandate kind label.
    pub const PAYMENT: &str = "payment";
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Database operation failed.
    #[error("sqlite error: {0}")]
    Db(String),
    /// Record already exists under its identifier.
    #[error("duplicate record: {0}")]
    Duplicate(String),
    /// Stored data failed to parse or failed integrity checks.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// Referenced record does not exist.
    #[error("missing record: {0}")]
    NotFound(String),
    /// Store input or configuration is invalid.
    #[error("invalid store input: {0}")]
    Invalid(String),
    /// Store schema version is incompatible.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(err: SqliteStoreError) -> Self {
        match err {
            SqliteStoreError::Duplicate(id) => Self::Duplicate(id),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::Invalid(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Invalid(message)
            }
            SqliteStoreError::Db(message) | SqliteStoreError::NotFound(message) => {
                Self::Io(message)
            }
        }
    }
}

impl From<SqliteStoreError> for JobStoreError {
    fn from(err: SqliteStoreError) -> Self {
        match err {
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::NotFound(id) => Self::NotFound(id),
            SqliteStoreError::Invalid(message)
            | SqliteStoreError::VersionMismatch(message)
            | SqliteStoreError::Duplicate(message) => Self::Invalid(message),
            SqliteStoreError::Db(message) => Self::Io(message),
        }
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with defaults for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable mandate and monitoring job store backed by `SQLite`.
///
/// # Invariants
/// - One writer connection guarded by a mutex; `SQLite` serializes writes.
/// - Mandate and transaction rows are never updated or deleted.
pub struct SqliteMandateStore {
    /// Guarded database connection.
    connection: Mutex<Connection>,
}

impl SqliteMandateStore {
    /// Opens an `SQLite`-backed store, creating and migrating as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Locks the connection for one operation.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_string()))
    }

    /// Inserts one mandate row, failing closed on duplicates.
    fn insert_mandate<T: Serialize>(
        &self,
        mandate_id: &str,
        kind_label: &str,
        user_id: &UserId,
        record: &T,
        created_at: Option<Timestamp>,
    ) -> Result<(), SqliteStoreError> {
        let body = serde_json::to_vec(record)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let created_at = created_at.map(|at| at.to_string());
        let guard = self.lock()?;
        let result = guard.execute(
            "INSERT INTO mandates (mandate_id, kind, user_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![mandate_id, kind_label, user_id.as_str(), body, created_at],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => {
                Err(SqliteStoreError::Duplicate(mandate_id.to_string()))
            }
            Err(err) => Err(SqliteStoreError::Db(err.to_string())),
        }
    }

    /// Loads one mandate body by identifier and expected kind.
    fn load_mandate<T: DeserializeOwned>(
        &self,
        mandate_id: &str,
        kind_label: &str,
    ) -> Result<Option<T>, SqliteStoreError> {
        let guard = self.lock()?;
        let body: Option<Vec<u8>> = guard
            .query_row(
                "SELECT body FROM mandates WHERE mandate_id = ?1 AND kind = ?2",
                params![mandate_id, kind_label],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        match body {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| SqliteStoreError::Corrupt(format!("{mandate_id}: {err}"))),
        }
    }
}

// ============================================================================
// SECTION: Mandate Store Impl
// ============================================================================

impl MandateStore for SqliteMandateStore {
    fn insert_intent(&self, intent: &Intent) -> Result<(), StoreError> {
        self.insert_mandate(intent.intent_id.as_str(), kind::INTENT, &intent.user_id, intent, None)
            .map_err(StoreError::from)
    }

    fn load_intent(&self, intent_id: &IntentId) -> Result<Option<Intent>, StoreError> {
        self.load_mandate(intent_id.as_str(), kind::INTENT).map_err(StoreError::from)
    }

    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        self.insert_mandate(
            cart.cart_id.as_str(),
            kind::CART,
            &cart.user_id,
            cart,
            Some(cart.signature.timestamp),
        )
        .map_err(StoreError::from)
    }

    fn load_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, StoreError> {
        self.load_mandate(cart_id.as_str(), kind::CART).map_err(StoreError::from)
    }

    fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.insert_mandate(
            payment.payment_id.as_str(),
            kind::PAYMENT,
            &payment.user_id,
            payment,
            Some(payment.created_at),
        )
        .map_err(StoreError::from)
    }

    fn load_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        self.load_mandate(payment_id.as_str(), kind::PAYMENT).map_err(StoreError::from)
    }

    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let body = serde_json::to_vec(transaction)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        let amount = i64::try_from(transaction.amount_cents)
            .map_err(|_| StoreError::Invalid("transaction amount exceeds i64".to_string()))?;
        let guard = self.lock().map_err(StoreError::from)?;
        let result = guard.execute(
            "INSERT INTO transactions (transaction_id, user_id, status, intent_id, cart_id,
                 payment_id, amount_cents, currency, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                transaction.transaction_id.as_str(),
                transaction.user_id.as_str(),
                transaction.status.as_str(),
                transaction.intent_ref.as_ref().map(|id| id.as_str().to_string()),
                transaction.cart_ref.as_str(),
                transaction.payment_ref.as_str(),
                amount,
                transaction.currency.code(),
                body,
                transaction.created_at.to_string(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => {
                Err(StoreError::Duplicate(transaction.transaction_id.to_string()))
            }
            Err(err) => Err(StoreError::Io(err.to_string())),
        }
    }

    fn load_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        let body: Option<Vec<u8>> = guard
            .query_row(
                "SELECT body FROM transactions WHERE transaction_id = ?1",
                params![transaction_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::Io(err.to_string()))?;
        match body {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| StoreError::Corrupt(format!("{transaction_id}: {err}"))),
        }
    }

    fn list_transactions_for(&self, user_id: &UserId) -> Result<Vec<Transaction>, StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        let mut statement = guard
            .prepare(
                "SELECT body FROM transactions WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(|err| StoreError::Io(err.to_string()))?;
        let rows = statement
            .query_map(params![user_id.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .map_err(|err| StoreError::Io(err.to_string()))?;
        let mut transactions = Vec::new();
        for row in rows {
            let bytes = row.map_err(|err| StoreError::Io(err.to_string()))?;
            let transaction = serde_json::from_slice(&bytes)
                .map_err(|err| StoreError::Corrupt(err.to_string()))?;
            transactions.push(transaction);
        }
        Ok(transactions)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        guard.execute("SELECT 1", []).map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Job Store Impl
// ============================================================================

/// Row shape read back for a monitoring job.
struct JobRow {
    /// Job identifier.
    job_id: String,
    /// Owning user.
    user_id: String,
    /// Product query snapshot.
    product_query: String,
    /// Constraint snapshot JSON.
    constraints_json: Vec<u8>,
    /// Check interval in seconds.
    check_interval_secs: i64,
    /// Active flag.
    active: bool,
    /// Last check timestamp, RFC 3339.
    last_check_at: Option<String>,
    /// Creation timestamp, RFC 3339.
    created_at: String,
    /// Expiration timestamp, RFC 3339.
    expires_at: String,
    /// Terminal reason label, when inactive.
    terminal_reason: Option<String>,
}

impl JobRow {
    /// Converts a raw row into a domain job, failing closed on bad data.
    fn into_job(self) -> Result<MonitorJob, SqliteStoreError> {
        let constraints: PurchaseConstraints = serde_json::from_slice(&self.constraints_json)
            .map_err(|err| SqliteStoreError::Corrupt(format!("{}: {err}", self.job_id)))?;
        let parse_time = |value: &str| {
            Timestamp::parse_rfc3339(value)
                .map_err(|err| SqliteStoreError::Corrupt(format!("{}: {err}", self.job_id)))
        };
        let last_check_at = match self.last_check_at.as_deref() {
            None => None,
            Some(value) => Some(parse_time(value)?),
        };
        let terminal_reason = match self.terminal_reason.as_deref() {
            None => None,
            Some(label) => Some(TerminalReason::parse(label).ok_or_else(|| {
                SqliteStoreError::Corrupt(format!("{}: bad terminal reason {label}", self.job_id))
            })?),
        };
        Ok(MonitorJob {
            job_id: IntentId::new(self.job_id.clone()),
            user_id: UserId::new(self.user_id),
            product_query: self.product_query,
            constraints,
            check_interval_secs: u64::try_from(self.check_interval_secs).map_err(|_| {
                SqliteStoreError::Corrupt(format!("{}: negative interval", self.job_id))
            })?,
            active: self.active,
            last_check_at,
            created_at: parse_time(&self.created_at)?,
            expires_at: parse_time(&self.expires_at)?,
            terminal_reason,
        })
    }
}

/// Column list shared by job queries.
const JOB_COLUMNS: &str = "job_id, user_id, product_query, constraints_json, \
                           check_interval_secs, active, last_check_at, created_at, expires_at, \
                           terminal_reason";

/// Maps one query row into a [`JobRow`].
fn read_job_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRow> {
    Ok(JobRow {
        job_id: row.get(0)?,
        user_id: row.get(1)?,
        product_query: row.get(2)?,
        constraints_json: row.get(3)?,
        check_interval_secs: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
        last_check_at: row.get(6)?,
        created_at: row.get(7)?,
        expires_at: row.get(8)?,
        terminal_reason: row.get(9)?,
    })
}

impl MonitorJobStore for SqliteMandateStore {
    fn upsert_job(&self, job: &MonitorJob) -> Result<(), JobStoreError> {
        let constraints_json = serde_json::to_vec(&job.constraints)
            .map_err(|err| JobStoreError::Invalid(err.to_string()))?;
        let interval = i64::try_from(job.check_interval_secs)
            .map_err(|_| JobStoreError::Invalid("check interval exceeds i64".to_string()))?;
        let guard = self.lock().map_err(JobStoreError::from)?;
        guard
            .execute(
                "INSERT OR REPLACE INTO monitoring_jobs (job_id, user_id, product_query,
                     constraints_json, check_interval_secs, active, last_check_at, created_at,
                     expires_at, terminal_reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    job.job_id.as_str(),
                    job.user_id.as_str(),
                    job.product_query,
                    constraints_json,
                    interval,
                    i64::from(job.active),
                    job.last_check_at.map(|at| at.to_string()),
                    job.created_at.to_string(),
                    job.expires_at.to_string(),
                    job.terminal_reason.map(|reason| reason.as_str().to_string()),
                ],
            )
            .map_err(|err| JobStoreError::Io(err.to_string()))?;
        Ok(())
    }

    fn load_job(&self, job_id: &IntentId) -> Result<Option<MonitorJob>, JobStoreError> {
        let guard = self.lock().map_err(JobStoreError::from)?;
        let row = guard
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM monitoring_jobs WHERE job_id = ?1"),
                params![job_id.as_str()],
                read_job_row,
            )
            .optional()
            .map_err(|err| JobStoreError::Io(err.to_string()))?;
        match row {
            None => Ok(None),
            Some(row) => Ok(Some(row.into_job().map_err(JobStoreError::from)?)),
        }
    }

    fn list_active_jobs(&self) -> Result<Vec<MonitorJob>, JobStoreError> {
        let guard = self.lock().map_err(JobStoreError::from)?;
        let mut statement = guard
            .prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM monitoring_jobs WHERE active = 1 ORDER BY created_at"
            ))
            .map_err(|err| JobStoreError::Io(err.to_string()))?;
        let rows = statement
            .query_map([], read_job_row)
            .map_err(|err| JobStoreError::Io(err.to_string()))?;
        let mut jobs = Vec::new();
        for row in rows {
            let row = row.map_err(|err| JobStoreError::Io(err.to_string()))?;
            jobs.push(row.into_job().map_err(JobStoreError::from)?);
        }
        Ok(jobs)
    }

    fn record_check(&self, job_id: &IntentId, at: Timestamp) -> Result<(), JobStoreError> {
        let guard = self.lock().map_err(JobStoreError::from)?;
        let changed = guard
            .execute(
                "UPDATE monitoring_jobs SET last_check_at = ?2 WHERE job_id = ?1",
                params![job_id.as_str(), at.to_string()],
            )
            .map_err(|err| JobStoreError::Io(err.to_string()))?;
        if changed == 0 {
            return Err(JobStoreError::NotFound(job_id.to_string()));
        }
        Ok(())
    }

    fn claim(&self, job_id: &IntentId) -> Result<bool, JobStoreError> {
        // Single conditional UPDATE: SQLite serializes writers, so exactly
        // one of any number of concurrent claims observes a changed row.
        let guard = self.lock().map_err(JobStoreError::from)?;
        let changed = guard
            .execute(
                "UPDATE monitoring_jobs SET active = 0 WHERE job_id = ?1 AND active = 1",
                params![job_id.as_str()],
            )
            .map_err(|err| JobStoreError::Io(err.to_string()))?;
        Ok(changed == 1)
    }

    fn tag_terminal(&self, job_id: &IntentId, reason: TerminalReason) -> Result<(), JobStoreError> {
        let guard = self.lock().map_err(JobStoreError::from)?;
        let changed = guard
            .execute(
                "UPDATE monitoring_jobs SET terminal_reason = ?2 WHERE job_id = ?1",
                params![job_id.as_str(), reason.as_str()],
            )
            .map_err(|err| JobStoreError::Io(err.to_string()))?;
        if changed == 0 {
            return Err(JobStoreError::NotFound(job_id.to_string()));
        }
        Ok(())
    }

    fn deactivate(
        &self,
        job_id: &IntentId,
        reason: TerminalReason,
    ) -> Result<bool, JobStoreError> {
        let guard = self.lock().map_err(JobStoreError::from)?;
        let changed = guard
            .execute(
                "UPDATE monitoring_jobs SET active = 0, terminal_reason = ?2
                 WHERE job_id = ?1 AND active = 1",
                params![job_id.as_str(), reason.as_str()],
            )
            .map_err(|err| JobStoreError::Io(err.to_string()))?;
        Ok(changed == 1)
    }

    fn readiness(&self) -> Result<(), JobStoreError> {
        let guard = self.lock().map_err(JobStoreError::from)?;
        guard.execute("SELECT 1", []).map_err(|err| JobStoreError::Io(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Returns true when an error is a uniqueness or constraint violation.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == ErrorCode::ConstraintViolation
    )
}

/// Validates store path guards before touching the filesystem.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let rendered = path.to_string_lossy();
    if rendered.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid("store path component too long".to_string()));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS mandates (
                    mandate_id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    body BLOB NOT NULL,
                    created_at TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_mandates_user_kind
                    ON mandates (user_id, kind);
                CREATE TABLE IF NOT EXISTS transactions (
                    transaction_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    intent_id TEXT,
                    cart_id TEXT NOT NULL,
                    payment_id TEXT NOT NULL,
                    amount_cents INTEGER NOT NULL,
                    currency TEXT NOT NULL,
                    body BLOB NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_transactions_user
                    ON transactions (user_id, created_at);
                CREATE TABLE IF NOT EXISTS monitoring_jobs (
                    job_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    product_query TEXT NOT NULL,
                    constraints_json BLOB NOT NULL,
                    check_interval_secs INTEGER NOT NULL,
                    active INTEGER NOT NULL,
                    last_check_at TEXT,
                    created_at TEXT NOT NULL,
                    expires_at TEXT NOT NULL,
                    terminal_reason TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_monitoring_jobs_active
                    ON monitoring_jobs (active, expires_at);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
