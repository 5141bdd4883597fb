//! # Service Module
//!
//! Multi-table operations. Each public operation runs in exactly one SQLite
//! transaction: every write commits together or none does.
//!
//! ## Gate
//! ```text
//! operation(&Session, ..)
//!      │
//!      ▼
//! pool.begin()
//!      │
//!      ▼
//! open_register(&mut tx, session) ── none ──► CoreError::RegisterClosed
//!      │                                      (tx dropped, nothing written)
//!      ▼
//! writes ... tx.commit()
//! ```
//!
//! - [`cash_register::CashRegisterService`] - Open, close, reports
//! - [`order::OrderService`] - Orders, items, close into sale, direct sale
//! - [`stock::StockService`] - Manual stock adjustments, low stock
//! - [`expense::ExpenseService`] - Expense creation and compensating delete

use sqlx::SqliteConnection;

use crate::error::ServiceResult;
use crate::repository::cash_register as registers;
use varanda_core::{CashRegister, CoreError, Session};

pub mod cash_register;
pub mod expense;
pub mod order;
pub mod stock;

/// The session owner's open register, or `RegisterClosed`.
pub(crate) async fn open_register(
    conn: &mut SqliteConnection,
    session: &Session,
) -> ServiceResult<CashRegister> {
    registers::find_open(conn, session.effective_owner_id())
        .await?
        .ok_or_else(|| CoreError::RegisterClosed.into())
}
