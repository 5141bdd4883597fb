//! # Stock and Expense Ledger (pure part)
//!
//! Plans how an order close consumes stock and prices loss expenses.
//! The database layer loads a [`StockLevels`] snapshot, calls into here,
//! then applies the returned deltas inside its transaction.
//!
//! ## Consumption
//! ```text
//! line: 2× X-Burger (food)          line: 3× Heineken (external)
//!   │ recipe                          │
//!   ├─ 150 g carne  → 0,3 kg          └─ 3 un
//!   └─ 1 un pão     → 2 un
//!
//! every line is attempted; shortfalls are collected, never fail fast
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    CostBasis, ExternalProduct, Food, FoodIngredient, Ingredient, ProductType, StockItemType,
    StockOperation,
};
use crate::units::{convert_value, format_decimal, Unit};

/// Maps a signed manual adjustment to its operation and magnitude.
///
/// ## Example
/// ```rust
/// use varanda_core::ledger::split_signed;
/// use varanda_core::types::StockOperation;
///
/// assert_eq!(split_signed(-2.5), (StockOperation::Remove, 2.5));
/// assert_eq!(split_signed(4.0), (StockOperation::Add, 4.0));
/// ```
pub fn split_signed(quantity: f64) -> (StockOperation, f64) {
    if quantity < 0.0 {
        (StockOperation::Remove, -quantity)
    } else {
        (StockOperation::Add, quantity)
    }
}

/// `current <= min` flags an item for restock.
#[inline]
pub fn is_low_stock(current: f64, min: f64) -> bool {
    current <= min
}

// =============================================================================
// Stock snapshot
// =============================================================================

/// Catalog state needed to plan consumption.
#[derive(Debug, Clone, Default)]
pub struct StockLevels {
    pub ingredients: HashMap<String, Ingredient>,
    pub external_products: HashMap<String, ExternalProduct>,
    /// Recipe lines keyed by food id.
    pub recipes: HashMap<String, Vec<FoodIngredient>>,
}

impl StockLevels {
    pub fn with_ingredient(mut self, ingredient: Ingredient) -> Self {
        self.ingredients.insert(ingredient.id.clone(), ingredient);
        self
    }

    pub fn with_external_product(mut self, product: ExternalProduct) -> Self {
        self.external_products.insert(product.id.clone(), product);
        self
    }

    pub fn with_recipe(mut self, food_id: &str, lines: Vec<FoodIngredient>) -> Self {
        self.recipes.insert(food_id.to_string(), lines);
        self
    }
}

/// One product line to consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionLine {
    pub product_type: ProductType,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
}

/// Net amount to remove from one stock item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockDelta {
    pub item_type: StockItemType,
    pub item_id: String,
    pub name: String,
    /// Positive amount to remove, in the item's stock unit.
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockIssueKind {
    Insufficient,
    MissingItem,
    IncompatibleUnits,
}

/// A per-line problem found while planning. Shown to the operator, who
/// decides whether to proceed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockIssue {
    pub kind: StockIssueKind,
    /// Order line that triggered it.
    pub product_name: String,
    /// Stock item that is short (ingredient or product name).
    pub item_name: String,
    pub available: f64,
    pub requested: f64,
}

impl StockIssue {
    pub fn message(&self) -> String {
        match self.kind {
            StockIssueKind::Insufficient if self.product_name == self.item_name => format!(
                "{}: estoque insuficiente (disponível {}, necessário {})",
                self.product_name,
                format_decimal(self.available),
                format_decimal(self.requested)
            ),
            StockIssueKind::Insufficient => format!(
                "{}: {} insuficiente (disponível {}, necessário {})",
                self.product_name,
                self.item_name,
                format_decimal(self.available),
                format_decimal(self.requested)
            ),
            StockIssueKind::MissingItem => format!(
                "{}: item de estoque '{}' não encontrado",
                self.product_name, self.item_name
            ),
            StockIssueKind::IncompatibleUnits => format!(
                "{}: unidade da receita incompatível com o estoque de {}",
                self.product_name, self.item_name
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConsumptionPlan {
    pub deltas: Vec<StockDelta>,
    pub issues: Vec<StockIssue>,
    /// Cost of goods for the consumed lines.
    pub total_cost: Money,
}

impl ConsumptionPlan {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Accumulates per-item deltas while tracking what is left.
struct Planner<'a> {
    levels: &'a StockLevels,
    plan: ConsumptionPlan,
    index: HashMap<(StockItemType, String), usize>,
    remaining: HashMap<(StockItemType, String), f64>,
}

impl<'a> Planner<'a> {
    fn consume(
        &mut self,
        product_name: &str,
        item_type: StockItemType,
        item_id: &str,
        item_name: &str,
        available: f64,
        requested: f64,
    ) {
        let key = (item_type, item_id.to_string());
        let left = self.remaining.entry(key.clone()).or_insert(available);
        if *left < requested {
            self.plan.issues.push(StockIssue {
                kind: StockIssueKind::Insufficient,
                product_name: product_name.to_string(),
                item_name: item_name.to_string(),
                available: left.max(0.0),
                requested,
            });
        }
        *left -= requested;

        match self.index.get(&key) {
            Some(&i) => self.plan.deltas[i].quantity += requested,
            None => {
                self.index.insert(key, self.plan.deltas.len());
                self.plan.deltas.push(StockDelta {
                    item_type,
                    item_id: item_id.to_string(),
                    name: item_name.to_string(),
                    quantity: requested,
                });
            }
        }
    }

    fn issue(&mut self, kind: StockIssueKind, product_name: &str, item_name: &str) {
        self.plan.issues.push(StockIssue {
            kind,
            product_name: product_name.to_string(),
            item_name: item_name.to_string(),
            available: 0.0,
            requested: 0.0,
        });
    }

    fn line(&mut self, line: &ConsumptionLine) {
        let levels = self.levels;
        let qty = line.quantity as f64;
        match line.product_type {
            ProductType::ExternalProduct => {
                let Some(product) = levels.external_products.get(&line.product_id) else {
                    self.issue(StockIssueKind::MissingItem, &line.product_name, &line.product_id);
                    return;
                };
                self.plan.total_cost += product.cost().multiply_quantity(line.quantity);
                self.consume(
                    &line.product_name,
                    StockItemType::ExternalProduct,
                    &product.id,
                    &product.name,
                    product.current_stock,
                    qty,
                );
            }
            ProductType::Food => {
                // A dish without a recipe consumes nothing.
                let Some(recipe) = levels.recipes.get(&line.product_id) else {
                    return;
                };
                for component in recipe {
                    let Some(ingredient) = levels.ingredients.get(&component.ingredient_id)
                    else {
                        self.issue(
                            StockIssueKind::MissingItem,
                            &line.product_name,
                            &component.ingredient_id,
                        );
                        continue;
                    };
                    let per_dish =
                        match convert_value(component.quantity, component.unit, ingredient.unit) {
                            Ok(v) => v,
                            Err(_) => {
                                self.issue(
                                    StockIssueKind::IncompatibleUnits,
                                    &line.product_name,
                                    &ingredient.name,
                                );
                                continue;
                            }
                        };
                    let requested = per_dish * qty;
                    self.plan.total_cost += ingredient.unit_cost().multiply_fractional(requested);
                    self.consume(
                        &line.product_name,
                        StockItemType::Ingredient,
                        &ingredient.id,
                        &ingredient.name,
                        ingredient.current_stock,
                        requested,
                    );
                }
            }
        }
    }
}

/// Plans stock consumption for a set of lines.
///
/// Lines sharing a stock item draw from the same remaining balance, so two
/// dishes using the last 200 g of cheese are both checked against it.
pub fn plan_consumption(lines: &[ConsumptionLine], levels: &StockLevels) -> ConsumptionPlan {
    let mut planner = Planner {
        levels,
        plan: ConsumptionPlan::default(),
        index: HashMap::new(),
        remaining: HashMap::new(),
    };
    for line in lines {
        planner.line(line);
    }
    planner.plan
}

// =============================================================================
// Costing
// =============================================================================

/// Cost of one dish from its recipe.
pub fn food_unit_cost(
    recipe: &[FoodIngredient],
    ingredients: &HashMap<String, Ingredient>,
) -> CoreResult<Money> {
    let mut total = Money::zero();
    for component in recipe {
        let ingredient = ingredients
            .get(&component.ingredient_id)
            .ok_or_else(|| CoreError::ProductNotFound(component.ingredient_id.clone()))?;
        let qty = convert_value(component.quantity, component.unit, ingredient.unit)?;
        total += ingredient.unit_cost().multiply_fractional(qty);
    }
    Ok(total)
}

/// What a loss expense is priced from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LossSubject<'a> {
    Ingredient(&'a Ingredient),
    ExternalProduct(&'a ExternalProduct),
    /// A dish with its recipe cost already computed.
    Food { food: &'a Food, unit_cost: Money },
}

impl LossSubject<'_> {
    pub fn name(&self) -> &str {
        match self {
            LossSubject::Ingredient(i) => &i.name,
            LossSubject::ExternalProduct(p) => &p.name,
            LossSubject::Food { food, .. } => &food.name,
        }
    }

    pub fn stock_unit(&self) -> Unit {
        match self {
            LossSubject::Ingredient(i) => i.unit,
            _ => Unit::Unidade,
        }
    }
}

/// Amount of a loss: basis price × quantity.
///
/// Ingredients have no sale price and are always priced at cost.
///
/// ## Example
/// A Heineken costing R$ 6,00 and selling at R$ 12,00, 2 bottles broken:
/// `Cost` basis → R$ 12,00, `Price` basis → R$ 24,00.
pub fn loss_amount(subject: LossSubject<'_>, basis: CostBasis, quantity: f64) -> Money {
    let unit = match (subject, basis) {
        (LossSubject::Ingredient(i), _) => i.unit_cost(),
        (LossSubject::ExternalProduct(p), CostBasis::Cost) => p.cost(),
        (LossSubject::ExternalProduct(p), CostBasis::Price) => p.price(),
        (LossSubject::Food { unit_cost, .. }, CostBasis::Cost) => unit_cost,
        (LossSubject::Food { food, .. }, CostBasis::Price) => food.price(),
    };
    unit.multiply_fractional(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ingredient(id: &str, name: &str, unit: Unit, cost: i64, stock: f64) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            owner_id: "o".to_string(),
            name: name.to_string(),
            unit,
            unit_cost_cents: cost,
            current_stock: stock,
            min_stock: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product(id: &str, name: &str, cost: i64, price: i64, stock: f64) -> ExternalProduct {
        ExternalProduct {
            id: id.to_string(),
            owner_id: "o".to_string(),
            name: name.to_string(),
            cost_cents: cost,
            price_cents: price,
            current_stock: stock,
            min_stock: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn recipe_line(food: &str, ingredient: &str, qty: f64, unit: Unit) -> FoodIngredient {
        FoodIngredient {
            id: format!("{food}-{ingredient}"),
            food_id: food.to_string(),
            ingredient_id: ingredient.to_string(),
            quantity: qty,
            unit,
        }
    }

    fn line(product_type: ProductType, id: &str, name: &str, qty: i64) -> ConsumptionLine {
        ConsumptionLine {
            product_type,
            product_id: id.to_string(),
            product_name: name.to_string(),
            quantity: qty,
        }
    }

    fn burger_levels(beef_kg: f64) -> StockLevels {
        StockLevels::default()
            .with_ingredient(ingredient("beef", "Carne", Unit::Kg, 4000, beef_kg))
            .with_ingredient(ingredient("bun", "Pão", Unit::Unidade, 100, 10.0))
            .with_recipe(
                "burger",
                vec![
                    recipe_line("burger", "beef", 150.0, Unit::G),
                    recipe_line("burger", "bun", 1.0, Unit::Unidade),
                ],
            )
            .with_external_product(product("beer", "Heineken", 600, 1200, 5.0))
    }

    #[test]
    fn test_food_expands_recipe_with_conversion() {
        let levels = burger_levels(2.0);
        let plan = plan_consumption(&[line(ProductType::Food, "burger", "X-Burger", 2)], &levels);

        assert!(!plan.has_issues());
        assert_eq!(plan.deltas.len(), 2);
        assert!((plan.deltas[0].quantity - 0.3).abs() < 1e-9);
        assert_eq!(plan.deltas[1].quantity, 2.0);
        // 0,3 kg × R$ 40,00 + 2 × R$ 1,00
        assert_eq!(plan.total_cost.cents(), 1400);
    }

    #[test]
    fn test_shortfalls_are_collected_not_fatal() {
        let levels = burger_levels(0.1);
        let plan = plan_consumption(
            &[
                line(ProductType::Food, "burger", "X-Burger", 1),
                line(ProductType::ExternalProduct, "beer", "Heineken", 7),
                line(ProductType::ExternalProduct, "ghost", "Fantasma", 1),
            ],
            &levels,
        );

        assert_eq!(plan.issues.len(), 3);
        assert_eq!(plan.issues[0].kind, StockIssueKind::Insufficient);
        assert_eq!(plan.issues[0].item_name, "Carne");
        assert_eq!(plan.issues[1].requested, 7.0);
        assert_eq!(plan.issues[2].kind, StockIssueKind::MissingItem);
        // deltas still cover every resolvable line
        assert_eq!(plan.deltas.len(), 3);
    }

    #[test]
    fn test_lines_share_remaining_balance() {
        let levels = burger_levels(2.0);
        let plan = plan_consumption(
            &[
                line(ProductType::ExternalProduct, "beer", "Heineken", 3),
                line(ProductType::ExternalProduct, "beer", "Heineken", 3),
            ],
            &levels,
        );
        assert_eq!(plan.deltas.len(), 1);
        assert_eq!(plan.deltas[0].quantity, 6.0);
        assert_eq!(plan.issues.len(), 1);
        assert_eq!(plan.issues[0].available, 2.0);
    }

    #[test]
    fn test_incompatible_recipe_unit_is_an_issue() {
        let levels = StockLevels::default()
            .with_ingredient(ingredient("milk", "Leite", Unit::L, 500, 5.0))
            .with_recipe("cafe", vec![recipe_line("cafe", "milk", 100.0, Unit::G)]);
        let plan = plan_consumption(&[line(ProductType::Food, "cafe", "Café", 1)], &levels);
        assert_eq!(plan.issues[0].kind, StockIssueKind::IncompatibleUnits);
        assert!(plan.deltas.is_empty());
    }

    #[test]
    fn test_food_unit_cost() {
        let levels = burger_levels(2.0);
        let cost = food_unit_cost(&levels.recipes["burger"], &levels.ingredients).unwrap();
        assert_eq!(cost.cents(), 700);
    }

    #[test]
    fn test_loss_amount_bases() {
        let beer = product("beer", "Heineken", 600, 1200, 5.0);
        assert_eq!(
            loss_amount(LossSubject::ExternalProduct(&beer), CostBasis::Cost, 2.0).cents(),
            1200
        );
        assert_eq!(
            loss_amount(LossSubject::ExternalProduct(&beer), CostBasis::Price, 2.0).cents(),
            2400
        );
        let beef = ingredient("beef", "Carne", Unit::Kg, 4000, 1.0);
        assert_eq!(
            loss_amount(LossSubject::Ingredient(&beef), CostBasis::Price, 0.5).cents(),
            2000
        );
    }

    #[test]
    fn test_issue_message() {
        let issue = StockIssue {
            kind: StockIssueKind::Insufficient,
            product_name: "Heineken".to_string(),
            item_name: "Heineken".to_string(),
            available: 2.0,
            requested: 3.0,
        };
        assert_eq!(
            issue.message(),
            "Heineken: estoque insuficiente (disponível 2, necessário 3)"
        );
    }
}
