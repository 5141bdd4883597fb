//! # Domain Types
//!
//! Core domain types used throughout Varanda POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CashRegister   │◄──│     Order       │──►│   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  owner_id       │   │  status         │   │  product_type   │       │
//! │  │  running totals │   │  subtotal/total │   │  discount_*     │       │
//! │  │  is_open        │   └────────┬────────┘   └─────────────────┘       │
//! │  └───────▲─────────┘            │ close                                 │
//! │          │                      ▼                                       │
//! │          │             ┌─────────────────┐   ┌─────────────────┐       │
//! │          ├─────────────│      Sale       │──►│ frozen items    │       │
//! │          │             │  (immutable)    │   │ + payments      │       │
//! │          │             └─────────────────┘   └─────────────────┘       │
//! │          │             ┌─────────────────┐                              │
//! │          └─────────────│    Expense      │  product/ingredient loss     │
//! │                        └─────────────────┘  or other                    │
//! │                                                                         │
//! │  Catalog: Food (+ FoodIngredient recipe), ExternalProduct, Ingredient   │
//! │  Pricing: Discount (replacement price), ServiceTax (percentage)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id`: UUID v4 string, immutable
//! - `owner_id`: the account the row is partitioned under (see [`crate::actor`])
//! - `*_cents`: integer centavos, accessors return [`Money`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::units::Unit;

// =============================================================================
// Tax Rate
// =============================================================================

/// Percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (the usual "taxa de serviço")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// What an order line or discount points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Prepared in the kitchen, consumes recipe ingredients.
    Food,
    /// Bought ready (drinks, packaged goods), stocked per unit.
    ExternalProduct,
}

/// Stock-carrying catalog entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockItemType {
    Ingredient,
    ExternalProduct,
}

/// Order state machine: `open → closed` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Pix,
    CreditCard,
    DebitCard,
    Other,
}

impl PaymentMethod {
    /// Label printed on receipts and reports.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Dinheiro",
            PaymentMethod::Pix => "Pix",
            PaymentMethod::CreditCard => "Cartão de crédito",
            PaymentMethod::DebitCard => "Cartão de débito",
            PaymentMethod::Other => "Outro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    ProductLoss,
    IngredientLoss,
    Other,
}

impl ExpenseType {
    pub const fn label(&self) -> &'static str {
        match self {
            ExpenseType::ProductLoss => "Perda de produto",
            ExpenseType::IngredientLoss => "Perda de ingrediente",
            ExpenseType::Other => "Outros",
        }
    }
}

/// Which catalog value prices a loss expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum CostBasis {
    /// Internal consumption, priced at cost.
    #[serde(rename = "consumo")]
    Cost,
    /// Lost/spoiled sellable item, priced at sale price.
    #[serde(rename = "perda")]
    Price,
}

impl Default for CostBasis {
    fn default() -> Self {
        CostBasis::Cost
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    Add,
    Remove,
}

/// Print-queue row state. Stored with the names the printer fleet already uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PrintJobStatus {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "pendente"))]
    #[serde(rename = "pendente")]
    Pending,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "impresso"))]
    #[serde(rename = "impresso")]
    Printed,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "erro"))]
    #[serde(rename = "erro")]
    Error,
}

// =============================================================================
// Cash Register
// =============================================================================

/// A cash-register session ("caixa").
///
/// Running totals are denormalized: every sale and expense booked against
/// the register updates them inside the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashRegister {
    pub id: String,
    pub owner_id: String,
    /// User who opened the register (owner or employee).
    pub opened_by: String,
    pub opening_amount_cents: i64,
    /// Operator-counted cash at close. Stored as entered.
    pub closing_amount_cents: Option<i64>,
    pub total_sales_cents: i64,
    pub total_cost_cents: i64,
    pub total_expenses_cents: i64,
    pub total_orders: i64,
    pub is_open: bool,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashRegister {
    #[inline]
    pub fn opening_amount(&self) -> Money {
        Money::from_cents(self.opening_amount_cents)
    }

    #[inline]
    pub fn closing_amount(&self) -> Option<Money> {
        self.closing_amount_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn total_sales(&self) -> Money {
        Money::from_cents(self.total_sales_cents)
    }

    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }

    #[inline]
    pub fn total_expenses(&self) -> Money {
        Money::from_cents(self.total_expenses_cents)
    }

    /// Sales minus cost of goods minus expenses.
    pub fn profit(&self) -> Money {
        self.total_sales() - self.total_cost() - self.total_expenses()
    }
}

// =============================================================================
// Orders
// =============================================================================

/// An order tab ("comanda") header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub owner_id: String,
    pub cash_register_id: String,
    pub customer_name: Option<String>,
    pub table_number: Option<String>,
    pub status: OrderStatus,
    /// Σ item total_price.
    pub subtotal_cents: i64,
    /// Always 0 while open; service taxes are applied at checkout.
    pub tax_cents: i64,
    pub total_cents: i64,
    /// Manual discount + Σ item discount_value, written at close.
    pub total_discount_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    /// Name shown on tickets: customer, else table, else a fallback.
    pub fn display_name(&self) -> String {
        match (&self.customer_name, &self.table_number) {
            (Some(name), _) if !name.trim().is_empty() => name.clone(),
            (_, Some(table)) if !table.trim().is_empty() => format!("Mesa {}", table),
            _ => "Balcão".to_string(),
        }
    }
}

/// A line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_type: ProductType,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    /// Charged unit price (the discount price when a discount applies).
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    /// Catalog price before discount.
    pub original_price_cents: Option<i64>,
    /// (original - unit) × quantity.
    pub discount_value_cents: Option<i64>,
    pub discount_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    #[inline]
    pub fn discount_value(&self) -> Money {
        Money::from_cents(self.discount_value_cents.unwrap_or(0))
    }
}

/// Order view model: header plus its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDetail {
    /// Σ item discount_value.
    pub fn item_discounts(&self) -> Money {
        self.items.iter().map(OrderItem::discount_value).sum()
    }
}

// =============================================================================
// Sales
// =============================================================================

/// One tender towards a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub method: PaymentMethod,
    pub amount_cents: i64,
}

impl Payment {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        Payment {
            method,
            amount_cents: amount.cents(),
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Frozen copy of a sold line. Catalog edits never reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub product_type: ProductType,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub discount_value_cents: Option<i64>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

impl From<&OrderItem> for SaleItem {
    fn from(item: &OrderItem) -> Self {
        SaleItem {
            product_type: item.product_type,
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            total_price_cents: item.total_price_cents,
            original_price_cents: item.original_price_cents,
            discount_value_cents: item.discount_value_cents,
        }
    }
}

/// Immutable record of a completed transaction ("venda").
///
/// Only `customer_name` and `payments` may be corrected afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub owner_id: String,
    pub cash_register_id: String,
    /// `None` for a direct sale.
    pub order_id: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<SaleItem>,
    pub payments: Vec<Payment>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_discount_cents: Option<i64>,
    pub total_cents: i64,
    pub total_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }

    pub fn paid(&self) -> Money {
        self.payments.iter().map(Payment::amount).sum()
    }

    /// Overpayment handed back in cash.
    pub fn change(&self) -> Money {
        (self.paid() - self.total()).non_negative()
    }

    /// Discount to display: stored value, else derived and never negative.
    ///
    /// ## Example
    /// subtotal 100, tax 10, total 100, nothing stored → 10.
    pub fn display_discount(&self) -> Money {
        match self.total_discount_cents {
            Some(cents) => Money::from_cents(cents),
            None => (self.subtotal() + self.tax() - self.total()).non_negative(),
        }
    }
}

// =============================================================================
// Expenses
// =============================================================================

/// An expense booked against a register ("despesa").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub owner_id: String,
    pub cash_register_id: String,
    pub expense_type: ExpenseType,
    pub amount_cents: i64,
    pub quantity: Option<f64>,
    pub product_type: Option<ProductType>,
    pub product_id: Option<String>,
    pub ingredient_id: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A raw ingredient kept in stock, costed per `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Ingredient {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub unit: Unit,
    /// Cost of one `unit` of this ingredient.
    pub unit_cost_cents: i64,
    pub current_stock: f64,
    pub min_stock: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }
}

/// A ready-made product resold per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ExternalProduct {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub cost_cents: i64,
    pub price_cents: i64,
    pub current_stock: f64,
    pub min_stock: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ExternalProduct {
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A kitchen dish. Cost derives from its recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Food {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Food {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// One recipe line: `quantity` of an ingredient, in `unit`, per dish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FoodIngredient {
    pub id: String,
    pub food_id: String,
    pub ingredient_id: String,
    pub quantity: f64,
    pub unit: Unit,
}

/// Replacement price for a catalog item while `active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Discount {
    pub id: String,
    pub owner_id: String,
    pub product_type: ProductType,
    pub product_id: String,
    pub discount_price_cents: i64,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Discount {
    #[inline]
    pub fn discount_price(&self) -> Money {
        Money::from_cents(self.discount_price_cents)
    }
}

/// A configurable checkout surcharge ("taxa de serviço", "couvert").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ServiceTax {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub rate_bps: i64,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ServiceTax {
    pub fn rate(&self) -> TaxRate {
        TaxRate::from_bps(self.rate_bps.clamp(0, u32::MAX as i64) as u32)
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Audit row for every stock change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub owner_id: String,
    pub item_type: StockItemType,
    pub item_id: String,
    pub operation: StockOperation,
    /// Always non-negative; `operation` carries the sign.
    pub quantity: f64,
    pub reason: Option<String>,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A stock item at or below its minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LowStockItem {
    pub item_type: StockItemType,
    pub item_id: String,
    pub name: String,
    pub current_stock: f64,
    pub min_stock: f64,
    pub unit: Unit,
}

// =============================================================================
// Print Queue
// =============================================================================

/// A row of the print queue ("fila_impressao").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PrintJob {
    pub id: String,
    /// JSON ticket payload or plain text.
    pub content: String,
    pub status: PrintJobStatus,
    pub error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub printed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Commands (service inputs)
// =============================================================================

/// A line requested by the operator; price comes from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    pub product_type: ProductType,
    pub product_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    pub customer_name: Option<String>,
    pub table_number: Option<String>,
    pub items: Vec<NewOrderItem>,
    /// Also queue a kitchen ticket for the printer listener.
    #[serde(default)]
    pub enqueue_ticket: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CloseOrder {
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub manual_discount_cents: i64,
    /// Service taxes the operator left selected at checkout.
    #[serde(default)]
    pub service_tax_ids: Vec<String>,
    /// Operator confirmed closing despite stock shortfalls.
    #[serde(default)]
    pub allow_insufficient_stock: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DirectSale {
    pub customer_name: Option<String>,
    pub items: Vec<NewOrderItem>,
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub manual_discount_cents: i64,
    #[serde(default)]
    pub service_tax_ids: Vec<String>,
    #[serde(default)]
    pub allow_insufficient_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExpense {
    pub expense_type: ExpenseType,
    /// Explicit amount. Computed from the catalog for losses when absent.
    pub amount_cents: Option<i64>,
    pub quantity: Option<f64>,
    pub product_type: Option<ProductType>,
    pub product_id: Option<String>,
    pub ingredient_id: Option<String>,
    #[serde(default)]
    pub cost_basis: CostBasis,
    pub description: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(subtotal: i64, tax: i64, total: i64, stored: Option<i64>) -> Sale {
        Sale {
            id: "s1".to_string(),
            owner_id: "o1".to_string(),
            cash_register_id: "r1".to_string(),
            order_id: None,
            customer_name: None,
            items: vec![],
            payments: vec![Payment::new(PaymentMethod::Cash, Money::from_cents(total + 500))],
            subtotal_cents: subtotal,
            tax_cents: tax,
            total_discount_cents: stored,
            total_cents: total,
            total_cost_cents: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(10.0);
        assert_eq!(rate.bps(), 1000);
        assert!((rate.percentage() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_display_discount_is_derived_when_absent() {
        let s = sale(10000, 1000, 10000, None);
        assert_eq!(s.display_discount().cents(), 1000);
    }

    #[test]
    fn test_display_discount_never_negative() {
        let s = sale(10000, 0, 11000, None);
        assert!(s.display_discount().is_zero());
    }

    #[test]
    fn test_display_discount_prefers_stored_value() {
        let s = sale(10000, 1000, 10000, Some(250));
        assert_eq!(s.display_discount().cents(), 250);
    }

    #[test]
    fn test_change() {
        let s = sale(2500, 0, 2500, Some(0));
        assert_eq!(s.paid().cents(), 3000);
        assert_eq!(s.change().cents(), 500);
    }

    #[test]
    fn test_print_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PrintJobStatus::Printed).unwrap(),
            "\"impresso\""
        );
        assert_eq!(serde_json::to_string(&CostBasis::Price).unwrap(), "\"perda\"");
    }

    #[test]
    fn test_order_display_name() {
        let now = Utc::now();
        let mut order = Order {
            id: "o".into(),
            owner_id: "w".into(),
            cash_register_id: "r".into(),
            customer_name: None,
            table_number: Some("7".into()),
            status: OrderStatus::Open,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            total_discount_cents: 0,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        assert_eq!(order.display_name(), "Mesa 7");
        order.customer_name = Some("Ana".into());
        assert_eq!(order.display_name(), "Ana");
    }
}
