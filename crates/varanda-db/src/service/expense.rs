//! # Expense Service
//!
//! Expenses ("despesas") booked against the open register.
//!
//! ## Create
//! ```text
//! validate ──► open register ──► price the loss (unless amount given)
//!                                     │
//!                   ┌─────────────────┼──────────────────────┐
//!                   ▼                 ▼                      ▼
//!             ingredient_loss    product_loss            other
//!             unit cost × qty    cost|price × qty        amount as entered
//!             stock -= qty       stock -= qty            (no stock effect)
//!                                (food: recipe consumed)
//!                   └─────────────────┬──────────────────────┘
//!                                     ▼
//!                 insert expense, register.total_expenses += amount
//! ```
//!
//! Delete is the inverse on the register only; lost stock stays lost.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::stock;
use crate::error::ServiceResult;
use crate::repository::{cash_register as registers, catalog, expense as expenses};
use varanda_core::ledger::{loss_amount, ConsumptionLine, LossSubject};
use varanda_core::validation::{normalize_optional, validate_new_expense};
use varanda_core::{
    CoreError, CostBasis, Expense, ExpenseType, Money, NewExpense, ProductType, Session,
    StockItemType,
};

/// Loss priced against the catalog.
struct PricedLoss {
    name: String,
    amount: Money,
}

fn loss_reason(basis: CostBasis) -> &'static str {
    match basis {
        CostBasis::Cost => "Perda (consumo)",
        CostBasis::Price => "Perda",
    }
}

/// Prices an ingredient loss and takes the quantity out of stock.
async fn ingredient_loss(
    conn: &mut SqliteConnection,
    session: &Session,
    input: &NewExpense,
    quantity: f64,
) -> ServiceResult<PricedLoss> {
    let id = input.ingredient_id.as_deref().unwrap_or_default();
    let ingredient = catalog::get_ingredient(conn, session.effective_owner_id(), id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;
    let amount = loss_amount(LossSubject::Ingredient(&ingredient), input.cost_basis, quantity);

    let reason = loss_reason(input.cost_basis);
    stock::apply_delta(conn, session, StockItemType::Ingredient, id, -quantity, Some(reason)).await?;

    Ok(PricedLoss {
        name: ingredient.name,
        amount,
    })
}

/// Prices a product loss. External products leave stock directly, dishes
/// consume their recipe.
async fn product_loss(
    conn: &mut SqliteConnection,
    session: &Session,
    input: &NewExpense,
    quantity: f64,
) -> ServiceResult<PricedLoss> {
    let owner_id = session.effective_owner_id();
    let id = input.product_id.as_deref().unwrap_or_default();
    let reason = loss_reason(input.cost_basis);

    if input.product_type == Some(ProductType::ExternalProduct) {
        let product = catalog::get_external_product(conn, owner_id, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;
        let amount = loss_amount(LossSubject::ExternalProduct(&product), input.cost_basis, quantity);

        stock::apply_delta(
            conn,
            session,
            StockItemType::ExternalProduct,
            id,
            -quantity,
            Some(reason),
        )
        .await?;
        return Ok(PricedLoss {
            name: product.name,
            amount,
        });
    }

    let food = catalog::get_food(conn, owner_id, id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;
    let unit_cost = catalog::food_cost(conn, owner_id, id).await?;
    let amount = loss_amount(
        LossSubject::Food {
            food: &food,
            unit_cost,
        },
        input.cost_basis,
        quantity,
    );

    // Dishes are lost in whole portions.
    let line = ConsumptionLine {
        product_type: ProductType::Food,
        product_id: food.id.clone(),
        product_name: food.name.clone(),
        quantity: (quantity.round() as i64).max(1),
    };
    stock::consume(conn, session, &[line], true, reason).await?;

    Ok(PricedLoss {
        name: food.name,
        amount,
    })
}

/// Expense creation, deletion and listing.
#[derive(Debug, Clone)]
pub struct ExpenseService {
    pool: SqlitePool,
}

impl ExpenseService {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseService { pool }
    }

    /// Records an expense against the open register.
    ///
    /// ## Errors
    /// - `RegisterClosed` when no register is open
    /// - Validation errors (missing description, non-positive quantity)
    /// - `ProductNotFound` for an unknown loss item
    pub async fn create_expense(&self, session: &Session, input: NewExpense) -> ServiceResult<Expense> {
        validate_new_expense(&input)?;

        let mut tx = self.pool.begin().await?;
        let register = super::open_register(&mut tx, session).await?;

        let (amount, quantity) = match input.expense_type {
            ExpenseType::Other => (
                Money::from_cents(input.amount_cents.unwrap_or_default()),
                None,
            ),
            ExpenseType::ProductLoss | ExpenseType::IngredientLoss => {
                let quantity = input.quantity.unwrap_or_default();
                let loss = if input.expense_type == ExpenseType::IngredientLoss {
                    ingredient_loss(&mut tx, session, &input, quantity).await?
                } else {
                    product_loss(&mut tx, session, &input, quantity).await?
                };
                debug!(item = %loss.name, computed = %loss.amount, "Priced loss");
                let amount = input.amount_cents.map(Money::from_cents).unwrap_or(loss.amount);
                (amount, Some(quantity))
            }
        };

        let (product_type, product_id, ingredient_id) = match input.expense_type {
            ExpenseType::ProductLoss => (input.product_type, input.product_id.clone(), None),
            ExpenseType::IngredientLoss => (None, None, input.ingredient_id.clone()),
            ExpenseType::Other => (None, None, None),
        };

        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            owner_id: session.effective_owner_id().to_string(),
            cash_register_id: register.id.clone(),
            expense_type: input.expense_type,
            amount_cents: amount.cents(),
            quantity,
            product_type,
            product_id,
            ingredient_id,
            description: normalize_optional(input.description.as_deref()),
            created_at: Utc::now(),
        };

        expenses::insert(&mut tx, &expense).await?;
        registers::add_expenses(&mut tx, &register.id, expense.amount_cents).await?;
        tx.commit().await?;

        info!(
            id = %expense.id,
            register_id = %register.id,
            expense_type = ?expense.expense_type,
            amount = %amount,
            "Expense recorded"
        );
        Ok(expense)
    }

    /// Deletes an expense and takes its amount back off the register.
    ///
    /// Expenses of a closed register are frozen with it.
    pub async fn delete_expense(&self, session: &Session, expense_id: &str) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;

        let expense = expenses::get(&mut tx, expense_id)
            .await?
            .filter(|e| e.owner_id == session.effective_owner_id())
            .ok_or_else(|| CoreError::ExpenseNotFound(expense_id.to_string()))?;

        let register = registers::get(&mut tx, &expense.cash_register_id)
            .await?
            .ok_or_else(|| CoreError::RegisterNotFound(expense.cash_register_id.clone()))?;
        if !register.is_open {
            return Err(CoreError::RegisterAlreadyClosed(register.id).into());
        }

        registers::add_expenses(&mut tx, &register.id, -expense.amount_cents).await?;
        expenses::delete(&mut tx, expense_id).await?;
        tx.commit().await?;

        info!(
            id = %expense_id,
            register_id = %register.id,
            amount = %expense.amount(),
            "Expense deleted"
        );
        Ok(())
    }

    /// Expenses of one register, oldest first.
    pub async fn list_expenses(
        &self,
        session: &Session,
        cash_register_id: &str,
    ) -> ServiceResult<Vec<Expense>> {
        let mut conn = self.pool.acquire().await?;
        let list = expenses::list_by_register(&mut conn, cash_register_id).await?;
        Ok(list
            .into_iter()
            .filter(|e| e.owner_id == session.effective_owner_id())
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog::{NewFood, RecipeLine};
    use crate::testing;
    use varanda_core::{Unit, ValidationError};

    fn other(cents: i64, description: &str) -> NewExpense {
        NewExpense {
            expense_type: ExpenseType::Other,
            amount_cents: Some(cents),
            quantity: None,
            product_type: None,
            product_id: None,
            ingredient_id: None,
            cost_basis: CostBasis::default(),
            description: Some(description.to_string()),
        }
    }

    fn product_loss(product_type: ProductType, id: &str, quantity: f64, basis: CostBasis) -> NewExpense {
        NewExpense {
            expense_type: ExpenseType::ProductLoss,
            amount_cents: None,
            quantity: Some(quantity),
            product_type: Some(product_type),
            product_id: Some(id.to_string()),
            ingredient_id: None,
            cost_basis: basis,
            description: None,
        }
    }

    async fn total_expenses(db: &crate::Database, register_id: &str) -> i64 {
        db.cash_registers()
            .report(&testing::owner(), register_id)
            .await
            .unwrap()
            .register
            .total_expenses_cents
    }

    #[tokio::test]
    async fn test_delete_takes_amount_off_the_register() {
        let db = testing::test_db().await;
        let session = testing::owner();
        let register = testing::open_register(&db, 0).await;
        let service = db.expenses();

        service.create_expense(&session, other(2500, "Gás")).await.unwrap();
        let ice = service.create_expense(&session, other(1500, "Gelo")).await.unwrap();
        assert_eq!(total_expenses(&db, &register.id).await, 4000);

        service.delete_expense(&session, &ice.id).await.unwrap();
        assert_eq!(total_expenses(&db, &register.id).await, 2500);

        let remaining = service.list_expenses(&session, &register.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].description.as_deref(), Some("Gás"));

        let err = service.delete_expense(&session, &ice.id).await.unwrap_err();
        assert!(matches!(err.core(), Some(CoreError::ExpenseNotFound(_))));
    }

    #[tokio::test]
    async fn test_requires_open_register() {
        let db = testing::test_db().await;
        let err = db
            .expenses()
            .create_expense(&testing::owner(), other(1000, "Gelo"))
            .await
            .unwrap_err();
        assert!(matches!(err.core(), Some(CoreError::RegisterClosed)));
    }

    #[tokio::test]
    async fn test_other_needs_a_description() {
        let db = testing::test_db().await;
        testing::open_register(&db, 0).await;
        let err = db
            .expenses()
            .create_expense(&testing::owner(), other(1000, "   "))
            .await
            .unwrap_err();
        assert!(matches!(
            err.core(),
            Some(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[tokio::test]
    async fn test_product_loss_priced_by_basis() {
        let db = testing::test_db().await;
        let session = testing::employee();
        let register = testing::open_register(&db, 0).await;
        let beer = testing::external_product(&db, "Heineken", 600, 1200, 10.0).await;

        let consumo = db
            .expenses()
            .create_expense(
                &session,
                product_loss(ProductType::ExternalProduct, &beer.id, 2.0, CostBasis::Cost),
            )
            .await
            .unwrap();
        assert_eq!(consumo.amount_cents, 1200);

        let perda = db
            .expenses()
            .create_expense(
                &session,
                product_loss(ProductType::ExternalProduct, &beer.id, 2.0, CostBasis::Price),
            )
            .await
            .unwrap();
        assert_eq!(perda.amount_cents, 2400);

        let stock = db
            .catalog()
            .get_external_product(testing::OWNER, &beer.id)
            .await
            .unwrap()
            .unwrap()
            .current_stock;
        assert_eq!(stock, 6.0);
        assert_eq!(total_expenses(&db, &register.id).await, 3600);
    }

    #[tokio::test]
    async fn test_ingredient_loss_and_explicit_amount() {
        let db = testing::test_db().await;
        let session = testing::owner();
        testing::open_register(&db, 0).await;
        let cheese = testing::ingredient(&db, "Queijo", Unit::Kg, 4000, 2.0).await;

        let mut input = NewExpense {
            expense_type: ExpenseType::IngredientLoss,
            amount_cents: None,
            quantity: Some(0.5),
            product_type: None,
            product_id: None,
            ingredient_id: Some(cheese.id.clone()),
            // Ingredients ignore the basis.
            cost_basis: CostBasis::Price,
            description: Some("Mofou".to_string()),
        };
        let priced = db.expenses().create_expense(&session, input.clone()).await.unwrap();
        assert_eq!(priced.amount_cents, 2000);
        assert_eq!(priced.quantity, Some(0.5));

        input.amount_cents = Some(999);
        let explicit = db.expenses().create_expense(&session, input).await.unwrap();
        assert_eq!(explicit.amount_cents, 999);

        let level = db
            .catalog()
            .get_ingredient(testing::OWNER, &cheese.id)
            .await
            .unwrap()
            .unwrap()
            .current_stock;
        assert!((level - 1.0).abs() < 1e-9);

        let movements = db
            .stock()
            .movements(StockItemType::Ingredient, &cheese.id)
            .await
            .unwrap();
        assert_eq!(movements.len(), 2);
    }

    #[tokio::test]
    async fn test_food_loss_consumes_recipe() {
        let db = testing::test_db().await;
        let session = testing::owner();
        testing::open_register(&db, 0).await;
        let flour = testing::ingredient(&db, "Farinha", Unit::Kg, 500, 1.0).await;
        let food = db
            .catalog()
            .create_food(
                testing::OWNER,
                NewFood {
                    name: "Pastel".to_string(),
                    description: None,
                    price_cents: 900,
                    recipe: vec![RecipeLine {
                        ingredient_id: flour.id.clone(),
                        quantity: 100.0,
                        unit: Unit::G,
                    }],
                },
            )
            .await
            .unwrap();

        let expense = db
            .expenses()
            .create_expense(&session, product_loss(ProductType::Food, &food.id, 3.0, CostBasis::Cost))
            .await
            .unwrap();
        // 100 g at R$ 5,00/kg, three portions
        assert_eq!(expense.amount_cents, 150);

        let level = db
            .catalog()
            .get_ingredient(testing::OWNER, &flour.id)
            .await
            .unwrap()
            .unwrap()
            .current_stock;
        assert!((level - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_loss_priced_at_zero_is_recorded() {
        let db = testing::test_db().await;
        let session = testing::owner();
        let register = testing::open_register(&db, 0).await;
        let tap_water = db
            .catalog()
            .create_food(
                testing::OWNER,
                NewFood {
                    name: "Água da casa".to_string(),
                    description: None,
                    price_cents: 300,
                    recipe: Vec::new(),
                },
            )
            .await
            .unwrap();

        let expense = db
            .expenses()
            .create_expense(
                &session,
                product_loss(ProductType::Food, &tap_water.id, 1.0, CostBasis::Cost),
            )
            .await
            .unwrap();
        assert_eq!(expense.amount_cents, 0);
        assert_eq!(total_expenses(&db, &register.id).await, 0);

        let listed = db.expenses().list_expenses(&session, &register.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_tiny_ingredient_loss_still_moves_stock() {
        let db = testing::test_db().await;
        let session = testing::owner();
        let register = testing::open_register(&db, 0).await;
        // R$ 2,00/kg: one gram is worth a fifth of a centavo.
        let salt = testing::ingredient(&db, "Sal", Unit::Kg, 200, 1.0).await;

        let expense = db
            .expenses()
            .create_expense(
                &session,
                NewExpense {
                    expense_type: ExpenseType::IngredientLoss,
                    amount_cents: None,
                    quantity: Some(0.001),
                    product_type: None,
                    product_id: None,
                    ingredient_id: Some(salt.id.clone()),
                    cost_basis: CostBasis::Cost,
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(expense.amount_cents, 0);
        assert_eq!(total_expenses(&db, &register.id).await, 0);

        let level = db
            .catalog()
            .get_ingredient(testing::OWNER, &salt.id)
            .await
            .unwrap()
            .unwrap()
            .current_stock;
        assert!((level - 0.999).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_other_expense_of_zero_is_rejected() {
        let db = testing::test_db().await;
        testing::open_register(&db, 0).await;
        let err = db
            .expenses()
            .create_expense(&testing::owner(), other(0, "Gelo"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.core(),
            Some(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
    }

    #[tokio::test]
    async fn test_closed_register_expenses_are_frozen() {
        let db = testing::test_db().await;
        let session = testing::owner();
        let register = testing::open_register(&db, 0).await;
        let expense = db.expenses().create_expense(&session, other(500, "Gelo")).await.unwrap();

        db.cash_registers()
            .close(&session, &register.id, Money::zero())
            .await
            .unwrap();

        let err = db.expenses().delete_expense(&session, &expense.id).await.unwrap_err();
        assert!(matches!(err.core(), Some(CoreError::RegisterAlreadyClosed(_))));
        assert_eq!(total_expenses(&db, &register.id).await, 500);
    }
}
