//! # Stock Movement Repository
//!
//! Append-only audit trail of every stock change: manual adjustments, order
//! consumption and losses.

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::DbResult;
use varanda_core::{StockItemType, StockMovement, StockOperation};

/// Builds a movement stamped now. `quantity` is the unsigned magnitude.
pub(crate) fn new_movement(
    owner_id: &str,
    user_id: &str,
    item_type: StockItemType,
    item_id: &str,
    (operation, quantity): (StockOperation, f64),
    reason: Option<&str>,
) -> StockMovement {
    StockMovement {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        item_type,
        item_id: item_id.to_string(),
        operation,
        quantity,
        reason: reason.map(str::to_string),
        user_id: user_id.to_string(),
        created_at: Utc::now(),
    }
}

pub(crate) async fn insert(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, owner_id, item_type, item_id, operation, quantity, reason, user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.owner_id)
    .bind(movement.item_type)
    .bind(&movement.item_id)
    .bind(movement.operation)
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(&movement.user_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Movements of one item, newest first.
pub(crate) async fn list_for_item(
    conn: &mut SqliteConnection,
    item_type: StockItemType,
    item_id: &str,
) -> DbResult<Vec<StockMovement>> {
    let movements = sqlx::query_as::<_, StockMovement>(
        r#"
        SELECT id, owner_id, item_type, item_id, operation, quantity, reason, user_id, created_at
        FROM stock_movements
        WHERE item_type = ?1 AND item_id = ?2
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(item_type)
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(movements)
}
