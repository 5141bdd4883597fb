//! # Discount Repository
//!
//! Replacement prices keyed by `(product_type, product_id)`. A discount does
//! nothing until an order line for that product is created; the line then
//! carries `original_price`, `discount_value` and `discount_id`.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult, ServiceResult};
use varanda_core::validation::validate_amount_cents;
use varanda_core::{Discount, ProductType};

const COLUMNS: &str =
    "id, owner_id, product_type, product_id, discount_price_cents, active, created_at";

/// The newest active discount for a product.
pub(crate) async fn find_active(
    conn: &mut SqliteConnection,
    owner_id: &str,
    product_type: ProductType,
    product_id: &str,
) -> DbResult<Option<Discount>> {
    let discount = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {COLUMNS} FROM discounts \
         WHERE owner_id = ?1 AND product_type = ?2 AND product_id = ?3 AND active = 1 \
         ORDER BY created_at DESC, rowid DESC LIMIT 1"
    ))
    .bind(owner_id)
    .bind(product_type)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(discount)
}

/// Repository for discounts.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Creates an active discount.
    pub async fn create(
        &self,
        owner_id: &str,
        product_type: ProductType,
        product_id: &str,
        discount_price_cents: i64,
    ) -> ServiceResult<Discount> {
        validate_amount_cents("preço promocional", discount_price_cents)?;

        let discount = Discount {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            product_type,
            product_id: product_id.to_string(),
            discount_price_cents,
            active: true,
            created_at: Utc::now(),
        };

        info!(
            id = %discount.id,
            product_id = %product_id,
            discount_price_cents,
            "Creating discount"
        );

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, owner_id, product_type, product_id, discount_price_cents, active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.owner_id)
        .bind(discount.product_type)
        .bind(&discount.product_id)
        .bind(discount.discount_price_cents)
        .bind(discount.active)
        .bind(discount.created_at)
        .execute(&self.pool)
        .await?;

        Ok(discount)
    }

    pub async fn list_active(&self, owner_id: &str) -> DbResult<Vec<Discount>> {
        let discounts = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {COLUMNS} FROM discounts WHERE owner_id = ?1 AND active = 1 \
             ORDER BY created_at, rowid"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    pub async fn find_active(
        &self,
        owner_id: &str,
        product_type: ProductType,
        product_id: &str,
    ) -> DbResult<Option<Discount>> {
        let mut conn = self.pool.acquire().await?;
        find_active(&mut conn, owner_id, product_type, product_id).await
    }

    /// Turns a discount on or off. Lines already on orders keep their price.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        info!(id = %id, active, "Toggling discount");

        let result = sqlx::query("UPDATE discounts SET active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Desconto", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_find_active_ignores_disabled() {
        let db = testing::test_db().await;
        let beer = testing::external_product(&db, "Heineken", 600, 1200, 10.0).await;
        let repo = db.discounts();

        let discount = repo
            .create(testing::OWNER, ProductType::ExternalProduct, &beer.id, 900)
            .await
            .unwrap();
        let found = repo
            .find_active(testing::OWNER, ProductType::ExternalProduct, &beer.id)
            .await
            .unwrap();
        assert_eq!(found.map(|d| d.discount_price_cents), Some(900));

        repo.set_active(&discount.id, false).await.unwrap();
        assert!(repo
            .find_active(testing::OWNER, ProductType::ExternalProduct, &beer.id)
            .await
            .unwrap()
            .is_none());
        assert!(repo.list_active(testing::OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_active_unknown_id() {
        let db = testing::test_db().await;
        let err = db.discounts().set_active("missing", true).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
