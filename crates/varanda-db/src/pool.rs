//! # SQLite Store
//!
//! One SQLite file is the system of record for the whole POS. Two processes
//! open it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   POS process                         printer-listener                  │
//! │   (services: caixa, comandas,         (polls fila_impressao,            │
//! │    vendas, despesas, estoque)          marks impresso / erro)           │
//! │        │                                      │                         │
//! │        ▼                                      ▼                         │
//! │   Database::new(DbConfig)            Database::new(DbConfig)            │
//! │        │  migrations                          │  migrations (no-op)     │
//! │        ▼                                      ▼                         │
//! │   ┌──────────────────────── varanda.db (WAL) ─────────────────────┐     │
//! │   │  cash_registers · orders · order_items · sales · expenses     │     │
//! │   │  catalog tables · stock_movements · fila_impressao            │     │
//! │   └───────────────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL lets the listener read while the POS writes; `busy_timeout` makes
//! the rare write/write overlap (`mark_printed` vs. a new order) wait
//! instead of failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::catalog::CatalogRepository;
use crate::repository::discount::DiscountRepository;
use crate::repository::print_queue::PrintQueueRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::service_tax::ServiceTaxRepository;
use crate::service::cash_register::CashRegisterService;
use crate::service::expense::ExpenseService;
use crate::service::order::OrderService;
use crate::service::stock::StockService;

/// Environment variable overriding the database file location.
pub const DB_PATH_ENV: &str = "VARANDA_DB_PATH";

/// Database file used when nothing else is configured.
pub const DEFAULT_DB_PATH: &str = "varanda.db";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings for [`Database::new`].
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/varanda/varanda.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `:memory:` for a throwaway store.
    pub database_path: PathBuf,

    /// Default 5.
    pub max_connections: u32,

    /// Default 1.
    pub min_connections: u32,

    /// Pool acquire limit. Default 30 s.
    pub connect_timeout: Duration,

    /// Default 10 min.
    pub idle_timeout: Duration,

    /// How long a writer waits on a locked file. Default 5 s.
    pub busy_timeout: Duration,

    /// Apply pending migrations on open. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Store at `path`; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Reads the path from `VARANDA_DB_PATH`, defaulting to `varanda.db`.
    pub fn from_env() -> Self {
        let path = std::env::var(DB_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        DbConfig::new(path)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Throwaway store for tests.
    ///
    /// Pinned to one connection: each new `:memory:` connection would be an
    /// empty database of its own. Services must therefore never touch the
    /// pool while holding a transaction.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(1),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository and service access.
///
/// Cheap to clone; every accessor hands out a handle sharing the pool.
///
/// ## Usage
/// ```rust,ignore
/// let register = db.cash_registers().require_open(&session).await?;
/// let sale = db.orders().close_order(&session, &order_id, close).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and applies migrations when configured to.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening Varanda store");

        let connect_options = connect_options(&config)?;
        debug!(busy_ms = config.busy_timeout.as_millis() as u64, "SQLite options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Store open");

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    /// Cash register lifecycle: open, close, reports.
    pub fn cash_registers(&self) -> CashRegisterService {
        CashRegisterService::new(self.pool.clone())
    }

    /// Order tabs and their conversion into sales.
    pub fn orders(&self) -> OrderService {
        OrderService::new(self.pool.clone())
    }

    /// Manual stock adjustments and low-stock queries.
    pub fn stock(&self) -> StockService {
        StockService::new(self.pool.clone())
    }

    /// Expenses booked against the open register.
    pub fn expenses(&self) -> ExpenseService {
        ExpenseService::new(self.pool.clone())
    }

    // -------------------------------------------------------------------------
    // Repositories
    // -------------------------------------------------------------------------

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Ingredients, external products, foods and recipes.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    pub fn discounts(&self) -> DiscountRepository {
        DiscountRepository::new(self.pool.clone())
    }

    pub fn service_taxes(&self) -> ServiceTaxRepository {
        ServiceTaxRepository::new(self.pool.clone())
    }

    /// The `fila_impressao` table.
    pub fn print_queue(&self) -> PrintQueueRepository {
        PrintQueueRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        info!("Closing Varanda store");
        self.pool.close().await;
    }

    /// `SELECT 1` succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// WAL, NORMAL sync, foreign keys on, busy timeout, create if missing.
fn connect_options(config: &DbConfig) -> DbResult<SqliteConnectOptions> {
    let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
    let options = SqliteConnectOptions::from_str(&url)
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout)
        .create_if_missing(true);
    Ok(options)
}

// =============================================================================
// Unit Tests
// =============================================================================
