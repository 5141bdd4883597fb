//! # Order Service
//!
//! Orders ("comandas") from creation to their conversion into a sale.
//!
//! ## Order → Sale Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add_order ──► OPEN ◄── add_item / remove_item / update_item_quantity   │
//! │                  │        (subtotal = Σ total_price, tax = 0)           │
//! │                  │                                                      │
//! │             close_order(payments, manual discount, taxes)               │
//! │                  │   one transaction:                                   │
//! │                  │   1. plan stock consumption (all items)              │
//! │                  │   2. shortfall && !allow → InsufficientStock         │
//! │                  │   3. checkout: subtotal + selected taxes             │
//! │                  │   4. total = checkout total − manual discount        │
//! │                  │   5. payments must cover the total                   │
//! │                  │   6. apply stock deltas + movements                  │
//! │                  │   7. insert frozen Sale, close order                 │
//! │                  │   8. register total_sales / total_cost += …          │
//! │                  ▼                                                      │
//! │               CLOSED ── Sale                                            │
//! │                                                                         │
//! │  direct_sale: steps 1-8 without an order                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, ServiceResult};
use crate::repository::{
    cash_register as registers, catalog, discount, order as orders, print_queue, sale as sales,
    service_tax,
};
use crate::service::{open_register, stock};
use varanda_core::checkout::{compute_checkout, order_totals, TaxSelection};
use varanda_core::ledger::ConsumptionLine;
use varanda_core::ticket::PrintTicket;
use varanda_core::validation::{
    normalize_optional, validate_amount_cents, validate_order_size, validate_payments,
    validate_quantity,
};
use varanda_core::{
    CashRegister, CloseOrder, CoreError, DirectSale, Money, NewOrder, NewOrderItem, Order,
    OrderDetail, OrderItem, OrderStatus, Payment, Sale, SaleItem, Session,
    DEFAULT_UTC_OFFSET_MINUTES,
};

// =============================================================================
// Pricing
// =============================================================================

/// A catalog-priced line, before it is attached to an order or a sale.
struct PricedLine {
    item: SaleItem,
    discount_id: Option<String>,
    notes: Option<String>,
}

impl PricedLine {
    fn into_order_item(self, order_id: &str, created_at: DateTime<Utc>) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_type: self.item.product_type,
            product_id: self.item.product_id,
            product_name: self.item.product_name,
            quantity: self.item.quantity,
            unit_price_cents: self.item.unit_price_cents,
            total_price_cents: self.item.total_price_cents,
            original_price_cents: self.item.original_price_cents,
            discount_value_cents: self.item.discount_value_cents,
            discount_id: self.discount_id,
            notes: self.notes,
            created_at,
        }
    }
}

/// Prices a requested line from the catalog, applying an active discount
/// when it lowers the price.
async fn price_line(
    conn: &mut SqliteConnection,
    owner_id: &str,
    input: &NewOrderItem,
) -> ServiceResult<PricedLine> {
    validate_quantity(input.quantity)?;

    let (name, price) =
        catalog::product_listing(conn, owner_id, input.product_type, &input.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(input.product_id.clone()))?;

    let discount = discount::find_active(conn, owner_id, input.product_type, &input.product_id)
        .await?
        .filter(|d| d.discount_price() < price);

    let qty = input.quantity;
    let item = match &discount {
        Some(d) => SaleItem {
            product_type: input.product_type,
            product_id: input.product_id.clone(),
            product_name: name,
            quantity: qty,
            unit_price_cents: d.discount_price_cents,
            total_price_cents: d.discount_price().multiply_quantity(qty).cents(),
            original_price_cents: Some(price.cents()),
            discount_value_cents: Some((price - d.discount_price()).multiply_quantity(qty).cents()),
        },
        None => SaleItem {
            product_type: input.product_type,
            product_id: input.product_id.clone(),
            product_name: name,
            quantity: qty,
            unit_price_cents: price.cents(),
            total_price_cents: price.multiply_quantity(qty).cents(),
            original_price_cents: None,
            discount_value_cents: None,
        },
    };

    Ok(PricedLine {
        item,
        discount_id: discount.map(|d| d.id),
        notes: normalize_optional(input.notes.as_deref()),
    })
}

// =============================================================================
// Shared steps
// =============================================================================

/// An order of the session's owner that can still change.
async fn load_open_order(
    conn: &mut SqliteConnection,
    session: &Session,
    order_id: &str,
) -> ServiceResult<Order> {
    let order = orders::get(conn, order_id)
        .await?
        .filter(|o| o.owner_id == session.effective_owner_id())
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

    if order.status != OrderStatus::Open {
        return Err(CoreError::OrderAlreadyClosed(order_id.to_string()).into());
    }
    Ok(order)
}

/// Recomputes and stores the header totals from the items.
async fn recompute(
    conn: &mut SqliteConnection,
    order: Order,
    now: DateTime<Utc>,
) -> ServiceResult<OrderDetail> {
    let items = orders::items(conn, &order.id).await?;
    let totals = order_totals(&items);
    orders::update_totals(conn, &order.id, &totals, now).await?;

    debug!(order_id = %order.id, items = items.len(), subtotal = %totals.subtotal, "Order recomputed");

    Ok(OrderDetail {
        order: Order {
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            updated_at: now,
            ..order
        },
        items,
    })
}

/// Everything needed to book a sale, with or without a backing order.
struct SaleDraft {
    order_id: Option<String>,
    customer_name: Option<String>,
    items: Vec<SaleItem>,
    payments: Vec<Payment>,
    manual_discount_cents: i64,
    service_tax_ids: Vec<String>,
    allow_insufficient_stock: bool,
}

/// Validates, consumes stock, inserts the sale and updates the register.
async fn book_sale(
    conn: &mut SqliteConnection,
    session: &Session,
    register: &CashRegister,
    draft: SaleDraft,
) -> ServiceResult<Sale> {
    validate_amount_cents("desconto", draft.manual_discount_cents)?;

    let owner_id = session.effective_owner_id();
    let subtotal: Money = draft.items.iter().map(SaleItem::total_price).sum();

    let taxes = service_tax::list(conn, owner_id).await?;
    let selected = TaxSelection::from_ids(&draft.service_tax_ids).pick(&taxes);
    let checkout = compute_checkout(subtotal, &[], &selected);

    let manual_discount = Money::from_cents(draft.manual_discount_cents);
    if manual_discount > checkout.total {
        return Err(CoreError::DiscountExceedsTotal {
            discount: manual_discount.to_string(),
            total: checkout.total.to_string(),
        }
        .into());
    }
    let total = checkout.total - manual_discount;

    let paid = validate_payments(&draft.payments, total)?;
    if paid < total {
        return Err(CoreError::InsufficientPayment {
            total: total.to_string(),
            paid: paid.to_string(),
        }
        .into());
    }

    let lines: Vec<ConsumptionLine> = draft
        .items
        .iter()
        .map(|item| ConsumptionLine {
            product_type: item.product_type,
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
        })
        .collect();
    let reason = match &draft.order_id {
        Some(id) => format!("Venda (comanda {id})"),
        None => "Venda direta".to_string(),
    };
    let plan = stock::consume(conn, session, &lines, draft.allow_insufficient_stock, &reason).await?;

    let item_discounts: Money = draft
        .items
        .iter()
        .map(|i| Money::from_cents(i.discount_value_cents.unwrap_or(0)))
        .sum();

    let now = Utc::now();
    let sale = Sale {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        cash_register_id: register.id.clone(),
        order_id: draft.order_id,
        customer_name: draft.customer_name,
        items: draft.items,
        payments: draft.payments,
        subtotal_cents: subtotal.cents(),
        tax_cents: checkout.tax_total.cents(),
        total_discount_cents: Some((manual_discount + item_discounts).cents()),
        total_cents: total.cents(),
        total_cost_cents: plan.total_cost.cents(),
        created_at: now,
        updated_at: now,
    };

    sales::insert(conn, &sale).await?;
    registers::add_sale(conn, &register.id, sale.total_cents, sale.total_cost_cents).await?;

    Ok(sale)
}

// =============================================================================
// Service
// =============================================================================

/// Order and sale operations.
///
/// ## Usage
/// ```rust,ignore
/// let detail = db.orders().add_order(&session, NewOrder { .. }).await?;
/// let sale = db.orders().close_order(&session, &detail.order.id, CloseOrder {
///     payments: vec![Payment::new(PaymentMethod::Pix, detail.order.total())],
///     ..Default::default()
/// }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderService {
    pool: SqlitePool,
}

impl OrderService {
    pub fn new(pool: SqlitePool) -> Self {
        OrderService { pool }
    }

    /// Creates an order with its items.
    ///
    /// Header, items, the register's order count and the optional kitchen
    /// ticket are written in one transaction.
    pub async fn add_order(&self, session: &Session, input: NewOrder) -> ServiceResult<OrderDetail> {
        validate_order_size(input.items.len())?;

        let owner_id = session.effective_owner_id();
        let mut tx = self.pool.begin().await?;
        let register = open_register(&mut tx, session).await?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            cash_register_id: register.id.clone(),
            customer_name: normalize_optional(input.customer_name.as_deref()),
            table_number: normalize_optional(input.table_number.as_deref()),
            status: OrderStatus::Open,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            total_discount_cents: 0,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        orders::insert(&mut tx, &order).await?;

        for requested in &input.items {
            let line = price_line(&mut tx, owner_id, requested).await?;
            orders::insert_item(&mut tx, &line.into_order_item(&order.id, now)).await?;
        }

        let detail = recompute(&mut tx, order, now).await?;
        registers::add_order(&mut tx, &register.id).await?;

        if input.enqueue_ticket {
            let ticket =
                PrintTicket::from_order(&detail.order, &detail.items, now, DEFAULT_UTC_OFFSET_MINUTES);
            let content = ticket
                .to_json()
                .map_err(|e| DbError::corrupt("fila_impressao.conteudo", e))?;
            print_queue::enqueue(&mut tx, &content).await?;
        }

        tx.commit().await?;

        info!(
            order_id = %detail.order.id,
            register_id = %register.id,
            items = detail.items.len(),
            total = %detail.order.total(),
            "Order created"
        );
        Ok(detail)
    }

    /// Appends one line to an open order.
    pub async fn add_item_to_order(
        &self,
        session: &Session,
        order_id: &str,
        input: NewOrderItem,
    ) -> ServiceResult<OrderDetail> {
        let mut tx = self.pool.begin().await?;
        open_register(&mut tx, session).await?;
        let order = load_open_order(&mut tx, session, order_id).await?;

        let existing = orders::items(&mut tx, order_id).await?;
        validate_order_size(existing.len() + 1)?;

        let now = Utc::now();
        let line = price_line(&mut tx, session.effective_owner_id(), &input).await?;
        let item = line.into_order_item(order_id, now);
        orders::insert_item(&mut tx, &item).await?;

        let detail = recompute(&mut tx, order, now).await?;
        tx.commit().await?;

        info!(order_id = %order_id, product = %item.product_name, quantity = item.quantity, "Item added");
        Ok(detail)
    }

    /// Removes one line from an open order.
    pub async fn remove_item(&self, session: &Session, item_id: &str) -> ServiceResult<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        let item = orders::get_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::OrderItemNotFound(item_id.to_string()))?;
        let order = load_open_order(&mut tx, session, &item.order_id).await?;

        orders::delete_item(&mut tx, item_id).await?;
        let detail = recompute(&mut tx, order, Utc::now()).await?;
        tx.commit().await?;

        info!(order_id = %item.order_id, product = %item.product_name, "Item removed");
        Ok(detail)
    }

    /// Changes the quantity of a line, keeping its unit price and discount.
    pub async fn update_item_quantity(
        &self,
        session: &Session,
        item_id: &str,
        quantity: i64,
    ) -> ServiceResult<OrderDetail> {
        validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;

        let item = orders::get_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::OrderItemNotFound(item_id.to_string()))?;
        let order = load_open_order(&mut tx, session, &item.order_id).await?;

        let updated = OrderItem {
            quantity,
            total_price_cents: item.unit_price().multiply_quantity(quantity).cents(),
            discount_value_cents: item
                .original_price_cents
                .map(|original| (original - item.unit_price_cents) * quantity),
            ..item
        };
        orders::update_item_quantity(&mut tx, &updated).await?;

        let detail = recompute(&mut tx, order, Utc::now()).await?;
        tx.commit().await?;

        debug!(item_id = %item_id, quantity, "Item quantity updated");
        Ok(detail)
    }

    /// Closes an order into a sale.
    ///
    /// The closed order keeps the checkout tax and the total before the
    /// manual discount. An order with no items closes into a zero sale.
    ///
    /// ## Errors
    /// - `RegisterClosed`, `OrderNotFound`, `OrderAlreadyClosed`
    /// - `ServiceError::InsufficientStock` unless `allow_insufficient_stock`
    /// - `DiscountExceedsTotal`, `InsufficientPayment`
    ///
    /// Nothing is written on any error.
    pub async fn close_order(
        &self,
        session: &Session,
        order_id: &str,
        input: CloseOrder,
    ) -> ServiceResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let register = open_register(&mut tx, session).await?;
        let order = load_open_order(&mut tx, session, order_id).await?;
        let items = orders::items(&mut tx, order_id).await?;
        let manual_discount = Money::from_cents(input.manual_discount_cents);

        let draft = SaleDraft {
            order_id: Some(order.id.clone()),
            customer_name: Some(order.display_name()),
            items: items.iter().map(SaleItem::from).collect(),
            payments: input.payments,
            manual_discount_cents: input.manual_discount_cents,
            service_tax_ids: input.service_tax_ids,
            allow_insufficient_stock: input.allow_insufficient_stock,
        };
        let sale = book_sale(&mut tx, session, &register, draft).await?;

        let closed = orders::ClosedTotals {
            tax_cents: sale.tax_cents,
            total_cents: (sale.total() + manual_discount).cents(),
            total_discount_cents: sale.total_discount_cents.unwrap_or(0),
        };
        if !orders::close(&mut tx, order_id, &closed, sale.created_at).await? {
            return Err(CoreError::OrderAlreadyClosed(order_id.to_string()).into());
        }

        tx.commit().await?;

        info!(
            order_id = %order_id,
            sale_id = %sale.id,
            total = %sale.total(),
            change = %sale.change(),
            "Order closed"
        );
        Ok(sale)
    }

    /// Sells at the counter without opening an order.
    pub async fn direct_sale(&self, session: &Session, input: DirectSale) -> ServiceResult<Sale> {
        if input.items.is_empty() {
            return Err(CoreError::EmptyOrder.into());
        }
        validate_order_size(input.items.len())?;

        let owner_id = session.effective_owner_id();
        let mut tx = self.pool.begin().await?;
        let register = open_register(&mut tx, session).await?;

        let mut items = Vec::with_capacity(input.items.len());
        for requested in &input.items {
            items.push(price_line(&mut tx, owner_id, requested).await?.item);
        }

        let draft = SaleDraft {
            order_id: None,
            customer_name: normalize_optional(input.customer_name.as_deref()),
            items,
            payments: input.payments,
            manual_discount_cents: input.manual_discount_cents,
            service_tax_ids: input.service_tax_ids,
            allow_insufficient_stock: input.allow_insufficient_stock,
        };
        let sale = book_sale(&mut tx, session, &register, draft).await?;
        tx.commit().await?;

        info!(sale_id = %sale.id, total = %sale.total(), "Direct sale recorded");
        Ok(sale)
    }

    /// Corrects the customer name and payment methods of a sale.
    ///
    /// Payments must still cover the sale total.
    pub async fn correct_sale(
        &self,
        session: &Session,
        sale_id: &str,
        customer_name: Option<&str>,
        payments: Vec<Payment>,
    ) -> ServiceResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let sale = sales::get(&mut tx, sale_id)
            .await?
            .filter(|s| s.owner_id == session.effective_owner_id())
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let paid = validate_payments(&payments, sale.total())?;
        if paid < sale.total() {
            return Err(CoreError::InsufficientPayment {
                total: sale.total().to_string(),
                paid: paid.to_string(),
            }
            .into());
        }

        let customer_name = normalize_optional(customer_name);
        let now = Utc::now();
        sales::update_correction(&mut tx, sale_id, customer_name.as_deref(), &payments, now).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, user_id = %session.user_id(), "Sale corrected");
        Ok(Sale {
            customer_name,
            payments,
            updated_at: now,
            ..sale
        })
    }

    /// An order of the session's owner with its items.
    pub async fn get(&self, session: &Session, order_id: &str) -> ServiceResult<OrderDetail> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::get(&mut conn, order_id)
            .await?
            .filter(|o| o.owner_id == session.effective_owner_id())
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        let items = orders::items(&mut conn, order_id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Open orders of the current register; empty when no register is open.
    pub async fn list_open(&self, session: &Session) -> ServiceResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        match registers::find_open(&mut conn, session.effective_owner_id()).await? {
            Some(register) => Ok(orders::list_open(&mut conn, &register.id).await?),
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
