//! # Stock Service
//!
//! Every stock change goes through [`apply_delta`]: the signed quantity picks
//! the operation (add/remove), the magnitude is applied, and a movement row is
//! appended. Order consumption and loss expenses reuse it inside their own
//! transactions.
//!
//! ## Order Consumption
//! ```text
//! lines ──► load_stock_levels ──► plan_consumption (pure, collects issues)
//!                                        │
//!                     issues && !allow ──┴──► ServiceError::InsufficientStock
//!                                        │      (caller asks the operator)
//!                                        ▼
//!                              apply_delta(-qty) per merged item
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::repository::{catalog, stock_movement};
use varanda_core::ledger::{plan_consumption, split_signed, ConsumptionLine, ConsumptionPlan};
use varanda_core::{
    CoreError, LowStockItem, Session, StockItemType, StockMovement, StockOperation,
    ValidationError,
};

/// Applies a signed delta and records the movement.
pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    session: &Session,
    item_type: StockItemType,
    item_id: &str,
    signed_quantity: f64,
    reason: Option<&str>,
) -> ServiceResult<StockMovement> {
    let movement = stock_movement::new_movement(
        session.effective_owner_id(),
        session.user_id(),
        item_type,
        item_id,
        split_signed(signed_quantity),
        reason,
    );

    let level = catalog::adjust_stock(conn, item_type, item_id, signed_quantity, movement.created_at)
        .await?;
    stock_movement::insert(conn, &movement).await?;

    debug!(
        item_type = ?item_type,
        item_id = %item_id,
        delta = signed_quantity,
        level,
        "Stock adjusted"
    );
    Ok(movement)
}

/// Plans and applies consumption for sold lines.
///
/// With `allow_insufficient` the deltas are applied even when stock runs
/// short; levels may go negative until the next restock.
pub(crate) async fn consume(
    conn: &mut SqliteConnection,
    session: &Session,
    lines: &[ConsumptionLine],
    allow_insufficient: bool,
    reason: &str,
) -> ServiceResult<ConsumptionPlan> {
    let levels = catalog::load_stock_levels(conn, session.effective_owner_id(), lines).await?;
    let plan = plan_consumption(lines, &levels);

    if plan.has_issues() {
        if !allow_insufficient {
            debug!(issues = plan.issues.len(), "Consumption blocked by stock issues");
            return Err(ServiceError::InsufficientStock(plan.issues));
        }
        warn!(
            issues = plan.issues.len(),
            "Consuming despite stock issues (operator confirmed)"
        );
    }

    for delta in &plan.deltas {
        apply_delta(conn, session, delta.item_type, &delta.item_id, -delta.quantity, Some(reason))
            .await?;
    }

    Ok(plan)
}

/// Manual stock adjustments and stock queries.
#[derive(Debug, Clone)]
pub struct StockService {
    pool: SqlitePool,
}

impl StockService {
    pub fn new(pool: SqlitePool) -> Self {
        StockService { pool }
    }

    /// Adds (positive) or removes (negative) stock.
    ///
    /// ## Errors
    /// - `ProductNotFound` for an unknown item
    /// - `InsufficientStock` when a removal would go below zero
    pub async fn update_stock(
        &self,
        session: &Session,
        item_type: StockItemType,
        item_id: &str,
        signed_quantity: f64,
        reason: Option<&str>,
    ) -> ServiceResult<StockMovement> {
        if !signed_quantity.is_finite() || signed_quantity == 0.0 {
            return Err(ValidationError::MustBePositive {
                field: "quantidade".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let (name, available, _unit) =
            catalog::stock_item(&mut tx, session.effective_owner_id(), item_type, item_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(item_id.to_string()))?;

        let (operation, magnitude) = split_signed(signed_quantity);
        if operation == StockOperation::Remove && magnitude > available {
            return Err(CoreError::InsufficientStock {
                name,
                available,
                requested: magnitude,
            }
            .into());
        }

        let movement = apply_delta(&mut tx, session, item_type, item_id, signed_quantity, reason).await?;
        tx.commit().await?;

        info!(
            item = %name,
            operation = ?operation,
            quantity = magnitude,
            user_id = %session.user_id(),
            "Stock updated"
        );
        Ok(movement)
    }

    /// Items at or below their minimum.
    pub async fn low_stock(&self, session: &Session) -> ServiceResult<Vec<LowStockItem>> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::low_stock(&mut conn, session.effective_owner_id()).await?)
    }

    /// Audit trail of one item, newest first.
    pub async fn movements(
        &self,
        item_type: StockItemType,
        item_id: &str,
    ) -> ServiceResult<Vec<StockMovement>> {
        let mut conn = self.pool.acquire().await?;
        Ok(stock_movement::list_for_item(&mut conn, item_type, item_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use varanda_core::Unit;

    #[tokio::test]
    async fn test_sign_selects_operation() {
        let db = testing::test_db().await;
        let session = testing::owner();
        let beer = testing::external_product(&db, "Heineken", 600, 1200, 10.0).await;
        let stock = db.stock();

        let added = stock
            .update_stock(&session, StockItemType::ExternalProduct, &beer.id, 6.0, Some("Entrega"))
            .await
            .unwrap();
        assert_eq!(added.operation, StockOperation::Add);
        assert_eq!(added.quantity, 6.0);

        let removed = stock
            .update_stock(&session, StockItemType::ExternalProduct, &beer.id, -4.0, None)
            .await
            .unwrap();
        assert_eq!(removed.operation, StockOperation::Remove);
        assert_eq!(removed.quantity, 4.0);

        let product = db
            .catalog()
            .get_external_product(testing::OWNER, &beer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.current_stock, 12.0);

        let history = stock
            .movements(StockItemType::ExternalProduct, &beer.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].operation, StockOperation::Remove);
    }

    #[tokio::test]
    async fn test_removal_below_zero_is_rejected() {
        let db = testing::test_db().await;
        let session = testing::employee();
        let cheese = testing::ingredient(&db, "Queijo", Unit::Kg, 4000, 1.5).await;

        let err = db
            .stock()
            .update_stock(&session, StockItemType::Ingredient, &cheese.id, -2.0, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.core(),
            Some(CoreError::InsufficientStock { available, requested, .. })
                if *available == 1.5 && *requested == 2.0
        ));

        let movements = db
            .stock()
            .movements(StockItemType::Ingredient, &cheese.id)
            .await
            .unwrap();
        assert!(movements.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let db = testing::test_db().await;
        let err = db
            .stock()
            .update_stock(&testing::owner(), StockItemType::Ingredient, "missing", 1.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err.core(), Some(CoreError::ProductNotFound(_))));
    }
}
