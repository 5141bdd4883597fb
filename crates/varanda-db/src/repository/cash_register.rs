//! # Cash Register Repository
//!
//! Register rows and their denormalized running totals.
//!
//! ## Running Totals
//! ```text
//! open ──► total_sales / total_cost / total_expenses / total_orders = 0
//!   │
//!   ├── add_order()     total_orders   += 1
//!   ├── add_sale()      total_sales    += sale.total, total_cost += cost
//!   ├── add_expenses()  total_expenses += amount  (negative on delete)
//!   │
//! close ──► is_open = 0, closing_amount, closed_at   (immutable afterwards)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use varanda_core::CashRegister;

const COLUMNS: &str = "id, owner_id, opened_by, opening_amount_cents, closing_amount_cents, \
     total_sales_cents, total_cost_cents, total_expenses_cents, total_orders, \
     is_open, opened_at, closed_at";

pub(crate) async fn insert(conn: &mut SqliteConnection, register: &CashRegister) -> DbResult<()> {
    debug!(id = %register.id, owner_id = %register.owner_id, "Inserting cash register");

    sqlx::query(
        r#"
        INSERT INTO cash_registers (
            id, owner_id, opened_by, opening_amount_cents, closing_amount_cents,
            total_sales_cents, total_cost_cents, total_expenses_cents, total_orders,
            is_open, opened_at, closed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&register.id)
    .bind(&register.owner_id)
    .bind(&register.opened_by)
    .bind(register.opening_amount_cents)
    .bind(register.closing_amount_cents)
    .bind(register.total_sales_cents)
    .bind(register.total_cost_cents)
    .bind(register.total_expenses_cents)
    .bind(register.total_orders)
    .bind(register.is_open)
    .bind(register.opened_at)
    .bind(register.closed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CashRegister>> {
    let register = sqlx::query_as::<_, CashRegister>(&format!(
        "SELECT {COLUMNS} FROM cash_registers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(register)
}

/// The owner's open register, if any. The partial unique index guarantees
/// there is at most one.
pub(crate) async fn find_open(
    conn: &mut SqliteConnection,
    owner_id: &str,
) -> DbResult<Option<CashRegister>> {
    let register = sqlx::query_as::<_, CashRegister>(&format!(
        "SELECT {COLUMNS} FROM cash_registers WHERE owner_id = ?1 AND is_open = 1"
    ))
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(register)
}

/// Registers of an owner, newest first.
pub(crate) async fn list(
    conn: &mut SqliteConnection,
    owner_id: &str,
    limit: u32,
) -> DbResult<Vec<CashRegister>> {
    let registers = sqlx::query_as::<_, CashRegister>(&format!(
        "SELECT {COLUMNS} FROM cash_registers WHERE owner_id = ?1 \
         ORDER BY opened_at DESC, rowid DESC LIMIT ?2"
    ))
    .bind(owner_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(registers)
}

/// Closes an open register. Returns false if it was not open.
pub(crate) async fn close(
    conn: &mut SqliteConnection,
    id: &str,
    closing_amount_cents: i64,
    closed_at: DateTime<Utc>,
) -> DbResult<bool> {
    debug!(id = %id, closing_amount_cents, "Closing cash register");

    let result = sqlx::query(
        r#"
        UPDATE cash_registers
        SET is_open = 0, closing_amount_cents = ?2, closed_at = ?3
        WHERE id = ?1 AND is_open = 1
        "#,
    )
    .bind(id)
    .bind(closing_amount_cents)
    .bind(closed_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn add_order(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("UPDATE cash_registers SET total_orders = total_orders + 1 WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn add_sale(
    conn: &mut SqliteConnection,
    id: &str,
    sale_cents: i64,
    cost_cents: i64,
) -> DbResult<()> {
    debug!(id = %id, sale_cents, cost_cents, "Adding sale to register totals");

    sqlx::query(
        r#"
        UPDATE cash_registers
        SET total_sales_cents = total_sales_cents + ?2,
            total_cost_cents = total_cost_cents + ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(sale_cents)
    .bind(cost_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Adds `delta_cents` (negative to reverse) to the expense total.
pub(crate) async fn add_expenses(
    conn: &mut SqliteConnection,
    id: &str,
    delta_cents: i64,
) -> DbResult<()> {
    debug!(id = %id, delta_cents, "Adjusting register expenses");

    sqlx::query(
        "UPDATE cash_registers SET total_expenses_cents = total_expenses_cents + ?2 WHERE id = ?1",
    )
    .bind(id)
    .bind(delta_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
