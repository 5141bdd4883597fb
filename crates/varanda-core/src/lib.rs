//! # varanda-core: Pure Business Logic for Varanda POS
//!
//! This crate holds every rule of the point-of-sale that can be expressed
//! without touching the database or the printer.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Varanda POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Front End (out of scope)                 │   │
//! │  │   Caixa ──► Comandas ──► Checkout ──► Despesas ──► Relatórios   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ varanda-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   types · money · units · checkout · ledger · actor             │   │
//! │  │   receipt · report · ticket · validation                        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          varanda-db (repositories + transactional services)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CashRegister, Order, Sale, Expense, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`units`] - Mass/volume unit conversion
//! - [`checkout`] - Order totals and service-tax computation
//! - [`ledger`] - Stock consumption planning and expense pricing
//! - [`actor`] - Actor and resolved session (effective owner)
//! - [`receipt`] - Fixed-width sale receipts
//! - [`report`] - Cash register close report and WhatsApp hand-off
//! - [`ticket`] - Print-queue payload parsing and kitchen tickets
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use varanda_core::money::Money;
//! use varanda_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(10000); // R$ 100,00
//! let service = TaxRate::from_bps(1000);   // 10% serviço
//! assert_eq!(subtotal.calculate_tax(service).cents(), 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod actor;
pub mod checkout;
pub mod error;
pub mod ledger;
pub mod money;
pub mod receipt;
pub mod report;
pub mod ticket;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use actor::{Actor, Role, Session};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use units::Unit;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single item on an order line.
///
/// Guards against typing 1000 instead of 10 at the bar.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of lines on a single order.
pub const MAX_ORDER_ITEMS: usize = 200;

/// Offset of printed local times from UTC (Brasília).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -180;
