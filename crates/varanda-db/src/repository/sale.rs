//! # Sale Repository
//!
//! Database operations for sales ("vendas").
//!
//! ## Frozen Snapshots
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Row                                          │
//! │                                                                         │
//! │  id, cash_register_id, order_id (UNIQUE, NULL for direct sales)        │
//! │  items     TEXT  ← JSON copy of the order items at close               │
//! │  payments  TEXT  ← JSON [{ method, amount_cents }]                     │
//! │  subtotal / tax / total_discount / total / total_cost                  │
//! │                                                                         │
//! │  Written once at order close. Later edits are limited to the           │
//! │  customer name and the payment methods.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use varanda_core::{Payment, Sale};

const COLUMNS: &str = "id, owner_id, cash_register_id, order_id, customer_name, items, payments, \
     subtotal_cents, tax_cents, total_discount_cents, total_cents, total_cost_cents, \
     created_at, updated_at";

/// A sales row before its JSON columns are decoded.
#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    owner_id: String,
    cash_register_id: String,
    order_id: Option<String>,
    customer_name: Option<String>,
    items: String,
    payments: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_discount_cents: Option<i64>,
    total_cents: i64,
    total_cost_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Sale> {
        Ok(Sale {
            items: serde_json::from_str(&row.items).map_err(|e| DbError::corrupt("sales.items", e))?,
            payments: serde_json::from_str(&row.payments)
                .map_err(|e| DbError::corrupt("sales.payments", e))?,
            id: row.id,
            owner_id: row.owner_id,
            cash_register_id: row.cash_register_id,
            order_id: row.order_id,
            customer_name: row.customer_name,
            subtotal_cents: row.subtotal_cents,
            tax_cents: row.tax_cents,
            total_discount_cents: row.total_discount_cents,
            total_cents: row.total_cents,
            total_cost_cents: row.total_cost_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn payments_json(payments: &[Payment]) -> DbResult<String> {
    serde_json::to_string(payments).map_err(|e| DbError::corrupt("sales.payments", e))
}

// =============================================================================
// Query Functions
// =============================================================================

pub(crate) async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(
        id = %sale.id,
        order_id = ?sale.order_id,
        total_cents = sale.total_cents,
        "Inserting sale"
    );

    let items = serde_json::to_string(&sale.items).map_err(|e| DbError::corrupt("sales.items", e))?;
    let payments = payments_json(&sale.payments)?;

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, owner_id, cash_register_id, order_id, customer_name, items, payments,
            subtotal_cents, tax_cents, total_discount_cents, total_cents, total_cost_cents,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.owner_id)
    .bind(&sale.cash_register_id)
    .bind(&sale.order_id)
    .bind(&sale.customer_name)
    .bind(items)
    .bind(payments)
    .bind(sale.subtotal_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_discount_cents)
    .bind(sale.total_cents)
    .bind(sale.total_cost_cents)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let row = sqlx::query_as::<_, SaleRow>(&format!("SELECT {COLUMNS} FROM sales WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Sale::try_from).transpose()
}

/// Sales of a register in the order they were made.
pub(crate) async fn list_by_register(
    conn: &mut SqliteConnection,
    cash_register_id: &str,
) -> DbResult<Vec<Sale>> {
    let rows = sqlx::query_as::<_, SaleRow>(&format!(
        "SELECT {COLUMNS} FROM sales WHERE cash_register_id = ?1 ORDER BY created_at, rowid"
    ))
    .bind(cash_register_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Sale::try_from).collect()
}

/// Rewrites the two correctable fields of a sale.
pub(crate) async fn update_correction(
    conn: &mut SqliteConnection,
    id: &str,
    customer_name: Option<&str>,
    payments: &[Payment],
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(id = %id, "Correcting sale");

    let result = sqlx::query(
        "UPDATE sales SET customer_name = ?2, payments = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(id)
    .bind(customer_name)
    .bind(payments_json(payments)?)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Venda", id));
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to sales.
///
/// Sales are created by [`crate::OrderService`]; corrections go through
/// [`crate::OrderService::correct_sale`] so payments are re-validated.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, id).await
    }

    /// Lists the sales of a register.
    pub async fn list_by_register(&self, cash_register_id: &str) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        list_by_register(&mut conn, cash_register_id).await
    }

    /// The sale created when an order was closed.
    pub async fn get_by_order(&self, order_id: &str) -> DbResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {COLUMNS} FROM sales WHERE order_id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Sale::try_from).transpose()
    }
}
