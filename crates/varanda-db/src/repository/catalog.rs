//! # Catalog Repository
//!
//! Ingredients, external products (bottled drinks and the like) and foods with
//! their recipes.
//!
//! ## Stock Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ingredients         current_stock in the ingredient's own unit (kg, l) │
//! │  external_products   current_stock in units                             │
//! │  foods               no stock; consumption expands the recipe           │
//! │                                                                         │
//! │  food_ingredients: (food, ingredient, quantity, unit)                   │
//! │       └── unit may differ from the ingredient's (200 g of a kg item)    │
//! │           and is converted when planning consumption or costing         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult, ServiceResult};
use varanda_core::ledger::{food_unit_cost, ConsumptionLine, StockLevels};
use varanda_core::validation::{
    normalize_optional, validate_amount_cents, validate_name, validate_stock_quantity,
};
use varanda_core::{
    ExternalProduct, Food, FoodIngredient, Ingredient, LowStockItem, Money, ProductType,
    StockItemType, Unit,
};

const INGREDIENT_COLUMNS: &str = "id, owner_id, name, unit, unit_cost_cents, current_stock, \
     min_stock, created_at, updated_at";

const EXTERNAL_COLUMNS: &str = "id, owner_id, name, cost_cents, price_cents, current_stock, \
     min_stock, created_at, updated_at";

const FOOD_COLUMNS: &str =
    "id, owner_id, name, description, price_cents, is_active, created_at, updated_at";

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub unit: Unit,
    /// Cost of one stock unit (one kg, one l, one unit).
    pub unit_cost_cents: i64,
    pub current_stock: f64,
    pub min_stock: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExternalProduct {
    pub name: String,
    pub cost_cents: i64,
    pub price_cents: i64,
    pub current_stock: f64,
    pub min_stock: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: String,
    pub quantity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFood {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub recipe: Vec<RecipeLine>,
}

// =============================================================================
// Query Functions
// =============================================================================

pub(crate) async fn get_ingredient(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<Ingredient>> {
    let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
        "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = ?1 AND owner_id = ?2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(ingredient)
}

pub(crate) async fn get_external_product(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<ExternalProduct>> {
    let product = sqlx::query_as::<_, ExternalProduct>(&format!(
        "SELECT {EXTERNAL_COLUMNS} FROM external_products WHERE id = ?1 AND owner_id = ?2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

pub(crate) async fn get_food(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<Food>> {
    let food = sqlx::query_as::<_, Food>(&format!(
        "SELECT {FOOD_COLUMNS} FROM foods WHERE id = ?1 AND owner_id = ?2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(food)
}

pub(crate) async fn recipe(
    conn: &mut SqliteConnection,
    food_id: &str,
) -> DbResult<Vec<FoodIngredient>> {
    let lines = sqlx::query_as::<_, FoodIngredient>(
        r#"
        SELECT id, food_id, ingredient_id, quantity, unit
        FROM food_ingredients
        WHERE food_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(food_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

/// Catalog name and sale price of a product, as frozen onto an order line.
pub(crate) async fn product_listing(
    conn: &mut SqliteConnection,
    owner_id: &str,
    product_type: ProductType,
    product_id: &str,
) -> DbResult<Option<(String, Money)>> {
    Ok(match product_type {
        ProductType::Food => get_food(conn, owner_id, product_id)
            .await?
            .filter(|f| f.is_active)
            .map(|f| (f.name.clone(), f.price())),
        ProductType::ExternalProduct => get_external_product(conn, owner_id, product_id)
            .await?
            .map(|p| (p.name.clone(), p.price())),
    })
}

/// Applies a signed delta to a stock item. Returns the new stock level.
pub(crate) async fn adjust_stock(
    conn: &mut SqliteConnection,
    item_type: StockItemType,
    item_id: &str,
    delta: f64,
    now: DateTime<Utc>,
) -> DbResult<f64> {
    let table = match item_type {
        StockItemType::Ingredient => "ingredients",
        StockItemType::ExternalProduct => "external_products",
    };

    let level: Option<f64> = sqlx::query_scalar(&format!(
        "UPDATE {table} SET current_stock = current_stock + ?2, updated_at = ?3 \
         WHERE id = ?1 RETURNING current_stock"
    ))
    .bind(item_id)
    .bind(delta)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    level.ok_or_else(|| DbError::not_found("Item de estoque", item_id))
}

/// Name, stock level and unit of an ingredient or external product.
pub(crate) async fn stock_item(
    conn: &mut SqliteConnection,
    owner_id: &str,
    item_type: StockItemType,
    item_id: &str,
) -> DbResult<Option<(String, f64, Unit)>> {
    Ok(match item_type {
        StockItemType::Ingredient => get_ingredient(conn, owner_id, item_id)
            .await?
            .map(|i| (i.name, i.current_stock, i.unit)),
        StockItemType::ExternalProduct => get_external_product(conn, owner_id, item_id)
            .await?
            .map(|p| (p.name, p.current_stock, Unit::Unidade)),
    })
}

/// Loads every catalog row the given lines can touch.
///
/// Missing rows are left out; the planner reports them as issues.
pub(crate) async fn load_stock_levels(
    conn: &mut SqliteConnection,
    owner_id: &str,
    lines: &[ConsumptionLine],
) -> DbResult<StockLevels> {
    let mut levels = StockLevels::default();

    for line in lines {
        match line.product_type {
            ProductType::ExternalProduct => {
                if levels.external_products.contains_key(&line.product_id) {
                    continue;
                }
                if let Some(product) = get_external_product(conn, owner_id, &line.product_id).await? {
                    levels = levels.with_external_product(product);
                }
            }
            ProductType::Food => {
                if levels.recipes.contains_key(&line.product_id) {
                    continue;
                }
                let components = recipe(conn, &line.product_id).await?;
                for component in &components {
                    if levels.ingredients.contains_key(&component.ingredient_id) {
                        continue;
                    }
                    if let Some(ingredient) =
                        get_ingredient(conn, owner_id, &component.ingredient_id).await?
                    {
                        levels = levels.with_ingredient(ingredient);
                    }
                }
                if !components.is_empty() {
                    levels = levels.with_recipe(&line.product_id, components);
                }
            }
        }
    }

    Ok(levels)
}

/// Recipe cost of one dish.
pub(crate) async fn food_cost(
    conn: &mut SqliteConnection,
    owner_id: &str,
    food_id: &str,
) -> ServiceResult<Money> {
    let lines = recipe(conn, food_id).await?;
    let mut ingredients = HashMap::new();
    for component in &lines {
        if let Some(ingredient) = get_ingredient(conn, owner_id, &component.ingredient_id).await? {
            ingredients.insert(ingredient.id.clone(), ingredient);
        }
    }
    Ok(food_unit_cost(&lines, &ingredients)?)
}

pub(crate) async fn low_stock(
    conn: &mut SqliteConnection,
    owner_id: &str,
) -> DbResult<Vec<LowStockItem>> {
    let items = sqlx::query_as::<_, LowStockItem>(
        r#"
        SELECT 'ingredient' AS item_type, id AS item_id, name, current_stock, min_stock, unit
        FROM ingredients
        WHERE owner_id = ?1 AND current_stock <= min_stock
        UNION ALL
        SELECT 'external_product' AS item_type, id AS item_id, name, current_stock, min_stock,
               'unidade' AS unit
        FROM external_products
        WHERE owner_id = ?1 AND current_stock <= min_stock
        ORDER BY name
        "#,
    )
    .bind(owner_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the catalog tables.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog();
/// let picanha = catalog.create_food(owner, NewFood { .. }).await?;
/// let cost = catalog.food_cost(owner, &picanha.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Ingredients
    // -------------------------------------------------------------------------

    pub async fn create_ingredient(
        &self,
        owner_id: &str,
        input: NewIngredient,
    ) -> ServiceResult<Ingredient> {
        validate_name("nome", &input.name)?;
        validate_amount_cents("custo", input.unit_cost_cents)?;
        validate_stock_quantity("estoque", input.current_stock)?;
        validate_stock_quantity("estoque mínimo", input.min_stock)?;

        let now = Utc::now();
        let ingredient = Ingredient {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: input.name.trim().to_string(),
            unit: input.unit,
            unit_cost_cents: input.unit_cost_cents,
            current_stock: input.current_stock,
            min_stock: input.min_stock,
            created_at: now,
            updated_at: now,
        };

        info!(id = %ingredient.id, name = %ingredient.name, unit = %ingredient.unit, "Creating ingredient");

        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, owner_id, name, unit, unit_cost_cents, current_stock, min_stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.owner_id)
        .bind(&ingredient.name)
        .bind(ingredient.unit)
        .bind(ingredient.unit_cost_cents)
        .bind(ingredient.current_stock)
        .bind(ingredient.min_stock)
        .bind(ingredient.created_at)
        .bind(ingredient.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(ingredient)
    }

    pub async fn get_ingredient(&self, owner_id: &str, id: &str) -> DbResult<Option<Ingredient>> {
        let mut conn = self.pool.acquire().await?;
        get_ingredient(&mut conn, owner_id, id).await
    }

    pub async fn list_ingredients(&self, owner_id: &str) -> DbResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE owner_id = ?1 ORDER BY name"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ingredients)
    }

    // -------------------------------------------------------------------------
    // External products
    // -------------------------------------------------------------------------

    pub async fn create_external_product(
        &self,
        owner_id: &str,
        input: NewExternalProduct,
    ) -> ServiceResult<ExternalProduct> {
        validate_name("nome", &input.name)?;
        validate_amount_cents("custo", input.cost_cents)?;
        validate_amount_cents("preço", input.price_cents)?;
        validate_stock_quantity("estoque", input.current_stock)?;
        validate_stock_quantity("estoque mínimo", input.min_stock)?;

        let now = Utc::now();
        let product = ExternalProduct {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: input.name.trim().to_string(),
            cost_cents: input.cost_cents,
            price_cents: input.price_cents,
            current_stock: input.current_stock,
            min_stock: input.min_stock,
            created_at: now,
            updated_at: now,
        };

        info!(id = %product.id, name = %product.name, "Creating external product");

        sqlx::query(
            r#"
            INSERT INTO external_products (
                id, owner_id, name, cost_cents, price_cents, current_stock, min_stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.owner_id)
        .bind(&product.name)
        .bind(product.cost_cents)
        .bind(product.price_cents)
        .bind(product.current_stock)
        .bind(product.min_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn get_external_product(
        &self,
        owner_id: &str,
        id: &str,
    ) -> DbResult<Option<ExternalProduct>> {
        let mut conn = self.pool.acquire().await?;
        get_external_product(&mut conn, owner_id, id).await
    }

    pub async fn list_external_products(&self, owner_id: &str) -> DbResult<Vec<ExternalProduct>> {
        let products = sqlx::query_as::<_, ExternalProduct>(&format!(
            "SELECT {EXTERNAL_COLUMNS} FROM external_products WHERE owner_id = ?1 ORDER BY name"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    // -------------------------------------------------------------------------
    // Foods
    // -------------------------------------------------------------------------

    /// Creates a dish and its recipe in one transaction.
    ///
    /// Every recipe ingredient must exist and have a unit compatible with the
    /// line's unit.
    pub async fn create_food(&self, owner_id: &str, input: NewFood) -> ServiceResult<Food> {
        validate_name("nome", &input.name)?;
        validate_amount_cents("preço", input.price_cents)?;

        let now = Utc::now();
        let food = Food {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: input.name.trim().to_string(),
            description: normalize_optional(input.description.as_deref()),
            price_cents: input.price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        info!(id = %food.id, name = %food.name, recipe_lines = input.recipe.len(), "Creating food");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO foods (
                id, owner_id, name, description, price_cents, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&food.id)
        .bind(&food.owner_id)
        .bind(&food.name)
        .bind(&food.description)
        .bind(food.price_cents)
        .bind(food.is_active)
        .bind(food.created_at)
        .bind(food.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &input.recipe {
            if !(line.quantity.is_finite() && line.quantity > 0.0) {
                return Err(varanda_core::ValidationError::MustBePositive {
                    field: "quantidade".to_string(),
                }
                .into());
            }
            let ingredient = get_ingredient(&mut tx, owner_id, &line.ingredient_id)
                .await?
                .ok_or_else(|| DbError::not_found("Ingrediente", line.ingredient_id.as_str()))?;
            varanda_core::units::convert_value(line.quantity, line.unit, ingredient.unit)?;

            sqlx::query(
                r#"
                INSERT INTO food_ingredients (id, food_id, ingredient_id, quantity, unit)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&food.id)
            .bind(&line.ingredient_id)
            .bind(line.quantity)
            .bind(line.unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(food)
    }

    pub async fn get_food(&self, owner_id: &str, id: &str) -> DbResult<Option<Food>> {
        let mut conn = self.pool.acquire().await?;
        get_food(&mut conn, owner_id, id).await
    }

    /// Active dishes, by name.
    pub async fn list_foods(&self, owner_id: &str) -> DbResult<Vec<Food>> {
        let foods = sqlx::query_as::<_, Food>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE owner_id = ?1 AND is_active = 1 ORDER BY name"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(foods)
    }

    pub async fn recipe(&self, food_id: &str) -> DbResult<Vec<FoodIngredient>> {
        let mut conn = self.pool.acquire().await?;
        recipe(&mut conn, food_id).await
    }

    /// Σ ingredient unit cost × recipe quantity converted to the ingredient unit.
    pub async fn food_cost(&self, owner_id: &str, food_id: &str) -> ServiceResult<Money> {
        let mut conn = self.pool.acquire().await?;
        let cost = food_cost(&mut conn, owner_id, food_id).await?;
        debug!(food_id = %food_id, cost = %cost, "Computed food cost");
        Ok(cost)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_food_cost_converts_recipe_units() {
        let db = testing::test_db().await;
        let catalog = db.catalog();

        // R$ 60,00/kg; 200 g per dish → R$ 12,00
        let picanha = testing::ingredient(&db, "Picanha", Unit::Kg, 6000, 10.0).await;
        // R$ 0,50 per unit; 2 per dish → R$ 1,00
        let pao = testing::ingredient(&db, "Pão", Unit::Unidade, 50, 100.0).await;

        let food = catalog
            .create_food(
                testing::OWNER,
                NewFood {
                    name: "Sanduíche de picanha".to_string(),
                    description: None,
                    price_cents: 3500,
                    recipe: vec![
                        RecipeLine {
                            ingredient_id: picanha.id.clone(),
                            quantity: 200.0,
                            unit: Unit::G,
                        },
                        RecipeLine {
                            ingredient_id: pao.id.clone(),
                            quantity: 2.0,
                            unit: Unit::Unidade,
                        },
                    ],
                },
            )
            .await
            .unwrap();

        assert_eq!(catalog.recipe(&food.id).await.unwrap().len(), 2);
        let cost = catalog.food_cost(testing::OWNER, &food.id).await.unwrap();
        assert_eq!(cost.cents(), 1300);
    }

    #[tokio::test]
    async fn test_create_food_rejects_incompatible_recipe_unit() {
        let db = testing::test_db().await;
        let leite = testing::ingredient(&db, "Leite", Unit::L, 500, 5.0).await;

        let err = db
            .catalog()
            .create_food(
                testing::OWNER,
                NewFood {
                    name: "Vitamina".to_string(),
                    description: None,
                    price_cents: 1200,
                    recipe: vec![RecipeLine {
                        ingredient_id: leite.id,
                        quantity: 300.0,
                        unit: Unit::G,
                    }],
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err.core(),
            Some(varanda_core::CoreError::IncompatibleUnits { .. })
        ));
        // Nothing was written.
        assert!(db.catalog().list_foods(testing::OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_low_stock_lists_both_item_types() {
        let db = testing::test_db().await;
        testing::ingredient(&db, "Queijo", Unit::Kg, 4000, 0.0).await;
        testing::ingredient(&db, "Farinha", Unit::Kg, 500, 20.0).await;
        testing::external_product(&db, "Heineken", 600, 1200, 0.0).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let low = low_stock(&mut conn, testing::OWNER).await.unwrap();
        let names: Vec<_> = low.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Heineken", "Queijo"]);
        assert_eq!(low[0].unit, Unit::Unidade);
        assert_eq!(low[1].item_type, StockItemType::Ingredient);
    }

    #[tokio::test]
    async fn test_catalog_is_scoped_by_owner() {
        let db = testing::test_db().await;
        let beer = testing::external_product(&db, "Heineken", 600, 1200, 10.0).await;

        let catalog = db.catalog();
        assert!(catalog
            .get_external_product("someone-else", &beer.id)
            .await
            .unwrap()
            .is_none());
        assert!(catalog
            .get_external_product(testing::OWNER, &beer.id)
            .await
            .unwrap()
            .is_some());
    }
}
