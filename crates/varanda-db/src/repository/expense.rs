//! # Expense Repository
//!
//! Expense rows ("despesas"). The register's `total_expenses` is kept in step
//! by [`crate::ExpenseService`], never here.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use varanda_core::Expense;

const COLUMNS: &str = "id, owner_id, cash_register_id, expense_type, amount_cents, quantity, \
     product_type, product_id, ingredient_id, description, created_at";

pub(crate) async fn insert(conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
    debug!(
        id = %expense.id,
        expense_type = ?expense.expense_type,
        amount_cents = expense.amount_cents,
        "Inserting expense"
    );

    sqlx::query(
        r#"
        INSERT INTO expenses (
            id, owner_id, cash_register_id, expense_type, amount_cents, quantity,
            product_type, product_id, ingredient_id, description, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&expense.id)
    .bind(&expense.owner_id)
    .bind(&expense.cash_register_id)
    .bind(expense.expense_type)
    .bind(expense.amount_cents)
    .bind(expense.quantity)
    .bind(expense.product_type)
    .bind(&expense.product_id)
    .bind(&expense.ingredient_id)
    .bind(&expense.description)
    .bind(expense.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Expense>> {
    let expense =
        sqlx::query_as::<_, Expense>(&format!("SELECT {COLUMNS} FROM expenses WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(expense)
}

pub(crate) async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM expenses WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn list_by_register(
    conn: &mut SqliteConnection,
    cash_register_id: &str,
) -> DbResult<Vec<Expense>> {
    let expenses = sqlx::query_as::<_, Expense>(&format!(
        "SELECT {COLUMNS} FROM expenses WHERE cash_register_id = ?1 ORDER BY created_at, rowid"
    ))
    .bind(cash_register_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(expenses)
}
