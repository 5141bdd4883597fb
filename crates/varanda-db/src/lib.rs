//! # varanda-db: Database Layer for Varanda POS
//!
//! SQLite persistence plus the transactional services that implement the
//! cash-register lifecycle, the order → sale pipeline and the stock and
//! expense ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Varanda POS Data Flow                            │
//! │                                                                         │
//! │  UI action (abrir caixa, fechar comanda, lançar despesa)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   varanda-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐    │   │
//! │  │   │   Services    │──►│  Repositories  │──►│  Database    │    │   │
//! │  │   │ (one tx per   │   │ (one table     │   │  (pool.rs)   │    │   │
//! │  │   │  operation)   │   │  each)         │   │  migrations  │    │   │
//! │  │   └───────────────┘   └────────────────┘   └──────────────┘    │   │
//! │  │         │ pure rules                                            │   │
//! │  │         ▼                                                       │   │
//! │  │   varanda-core (checkout, ledger, validation)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (varanda.db) ── fila_impressao ──► printer listener            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and service error types
//! - [`repository`] - One repository per table group
//! - [`service`] - Multi-table operations, each in one transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use varanda_core::{Actor, Money, Session};
//! use varanda_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("varanda.db")).await?;
//! let session = Session::resolve(Actor::owner("owner-1"))?;
//!
//! db.cash_registers().open(&session, Money::from_cents(5000)).await?;
//! let open_orders = db.orders().list_open(&session).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::discount::DiscountRepository;
pub use repository::print_queue::PrintQueueRepository;
pub use repository::sale::SaleRepository;
pub use repository::service_tax::ServiceTaxRepository;

// Service re-exports
pub use service::cash_register::CashRegisterService;
pub use service::expense::ExpenseService;
pub use service::order::OrderService;
pub use service::stock::StockService;
