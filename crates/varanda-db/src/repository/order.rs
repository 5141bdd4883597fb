//! # Order Repository
//!
//! Orders ("comandas") and their items.
//!
//! The header's subtotal/total are derived from the items; callers recompute
//! them with [`varanda_core::checkout::order_totals`] after every item change
//! and persist with [`update_totals`] in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use varanda_core::checkout::OrderTotals;
use varanda_core::{Order, OrderItem};

const ORDER_COLUMNS: &str = "id, owner_id, cash_register_id, customer_name, table_number, \
     status, subtotal_cents, tax_cents, total_cents, total_discount_cents, \
     created_at, updated_at, closed_at";

const ITEM_COLUMNS: &str = "id, order_id, product_type, product_id, product_name, quantity, \
     unit_price_cents, total_price_cents, original_price_cents, discount_value_cents, \
     discount_id, notes, created_at";

// =============================================================================
// Orders
// =============================================================================

pub(crate) async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, register_id = %order.cash_register_id, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, owner_id, cash_register_id, customer_name, table_number,
            status, subtotal_cents, tax_cents, total_cents, total_discount_cents,
            created_at, updated_at, closed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&order.id)
    .bind(&order.owner_id)
    .bind(&order.cash_register_id)
    .bind(&order.customer_name)
    .bind(&order.table_number)
    .bind(order.status)
    .bind(order.subtotal_cents)
    .bind(order.tax_cents)
    .bind(order.total_cents)
    .bind(order.total_discount_cents)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(order.closed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

/// Open orders of a register, oldest first.
pub(crate) async fn list_open(
    conn: &mut SqliteConnection,
    cash_register_id: &str,
) -> DbResult<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders \
         WHERE cash_register_id = ?1 AND status = 'open' \
         ORDER BY created_at, rowid"
    ))
    .bind(cash_register_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(orders)
}

pub(crate) async fn update_totals(
    conn: &mut SqliteConnection,
    id: &str,
    totals: &OrderTotals,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(id = %id, subtotal = %totals.subtotal, "Updating order totals");

    sqlx::query(
        r#"
        UPDATE orders
        SET subtotal_cents = ?2, tax_cents = ?3, total_cents = ?4, updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(totals.subtotal.cents())
    .bind(totals.tax.cents())
    .bind(totals.total.cents())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Header amounts frozen when an order closes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClosedTotals {
    pub tax_cents: i64,
    /// Subtotal plus tax, before the manual discount.
    pub total_cents: i64,
    pub total_discount_cents: i64,
}

/// Marks an open order closed. Returns false if it was already closed.
pub(crate) async fn close(
    conn: &mut SqliteConnection,
    id: &str,
    totals: &ClosedTotals,
    closed_at: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'closed', tax_cents = ?2, total_cents = ?3, total_discount_cents = ?4,
            closed_at = ?5, updated_at = ?5
        WHERE id = ?1 AND status = 'open'
        "#,
    )
    .bind(id)
    .bind(totals.tax_cents)
    .bind(totals.total_cents)
    .bind(totals.total_discount_cents)
    .bind(closed_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Items
// =============================================================================

pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    debug!(
        order_id = %item.order_id,
        product = %item.product_name,
        quantity = item.quantity,
        "Inserting order item"
    );

    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_type, product_id, product_name, quantity,
            unit_price_cents, total_price_cents, original_price_cents,
            discount_value_cents, discount_id, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(item.product_type)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.total_price_cents)
    .bind(item.original_price_cents)
    .bind(item.discount_value_cents)
    .bind(&item.discount_id)
    .bind(&item.notes)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, rowid"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

pub(crate) async fn get_item(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<OrderItem>> {
    let item = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

pub(crate) async fn delete_item(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM order_items WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Sets a new quantity, keeping the per-unit discount proportional.
pub(crate) async fn update_item_quantity(
    conn: &mut SqliteConnection,
    item: &OrderItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE order_items
        SET quantity = ?2, total_price_cents = ?3, discount_value_cents = ?4
        WHERE id = ?1
        "#,
    )
    .bind(&item.id)
    .bind(item.quantity)
    .bind(item.total_price_cents)
    .bind(item.discount_value_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
