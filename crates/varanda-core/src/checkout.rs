//! # Checkout
//!
//! Order totals and the service-tax computation shown in the checkout modal.
//!
//! ## Flow
//! ```text
//! order.subtotal ──┐
//!                  ├──► subtotal ──► Σ tax.rate × subtotal ──► total
//! extra items ─────┘                 (selected taxes only)
//! ```
//!
//! Taxes selected in the modal default to every active tax. Toggling one
//! changes only the in-flight [`TaxSelection`]; stored configuration is
//! never touched.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{OrderItem, ServiceTax, TaxRate};

/// Set of service-tax ids selected for one checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSelection {
    selected: Vec<String>,
}

impl TaxSelection {
    /// Starts with every active tax selected.
    pub fn from_active(taxes: &[ServiceTax]) -> Self {
        TaxSelection {
            selected: taxes
                .iter()
                .filter(|t| t.active)
                .map(|t| t.id.clone())
                .collect(),
        }
    }

    pub fn from_ids(ids: &[String]) -> Self {
        let mut selection = TaxSelection::default();
        for id in ids {
            if !selection.is_selected(id) {
                selection.selected.push(id.clone());
            }
        }
        selection
    }

    /// Flips one tax in or out of the selection.
    pub fn toggle(&mut self, tax_id: &str) {
        if let Some(pos) = self.selected.iter().position(|id| id == tax_id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(tax_id.to_string());
        }
    }

    pub fn is_selected(&self, tax_id: &str) -> bool {
        self.selected.iter().any(|id| id == tax_id)
    }

    pub fn ids(&self) -> &[String] {
        &self.selected
    }

    /// Taxes from `taxes` that are selected, in catalog order.
    pub fn pick<'a>(&self, taxes: &'a [ServiceTax]) -> Vec<&'a ServiceTax> {
        taxes.iter().filter(|t| self.is_selected(&t.id)).collect()
    }
}

/// A loose item added at checkout that is not on the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdditionalItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl AdditionalItem {
    pub fn total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxLine {
    pub tax_id: String,
    pub name: String,
    pub rate: TaxRate,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutTotals {
    pub subtotal: Money,
    pub taxes: Vec<TaxLine>,
    pub tax_total: Money,
    pub total: Money,
}

/// Computes checkout totals.
///
/// ## Example
/// ```rust
/// use varanda_core::checkout::compute_checkout;
/// use varanda_core::money::Money;
///
/// let totals = compute_checkout(Money::from_cents(2500), &[], &[]);
/// assert_eq!(totals.total.cents(), 2500);
/// ```
pub fn compute_checkout(
    order_subtotal: Money,
    additional_items: &[AdditionalItem],
    selected_taxes: &[&ServiceTax],
) -> CheckoutTotals {
    let subtotal = order_subtotal + additional_items.iter().map(AdditionalItem::total).sum::<Money>();

    let taxes: Vec<TaxLine> = selected_taxes
        .iter()
        .map(|tax| TaxLine {
            tax_id: tax.id.clone(),
            name: tax.name.clone(),
            rate: tax.rate(),
            amount: subtotal.calculate_tax(tax.rate()),
        })
        .collect();
    let tax_total: Money = taxes.iter().map(|line| line.amount).sum();

    CheckoutTotals {
        subtotal,
        taxes,
        tax_total,
        total: subtotal + tax_total,
    }
}

/// Totals of an open order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Recomputes an order after its lines changed: Σ total_price, no tax.
pub fn order_totals(items: &[OrderItem]) -> OrderTotals {
    let subtotal: Money = items.iter().map(OrderItem::total_price).sum();
    OrderTotals {
        subtotal,
        tax: Money::zero(),
        total: subtotal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tax(id: &str, name: &str, bps: i64, active: bool) -> ServiceTax {
        ServiceTax {
            id: id.to_string(),
            owner_id: "o".to_string(),
            name: name.to_string(),
            rate_bps: bps,
            active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_selection_defaults_to_active() {
        let taxes = vec![
            tax("t1", "Serviço", 1000, true),
            tax("t2", "Couvert", 500, false),
        ];
        let selection = TaxSelection::from_active(&taxes);
        assert!(selection.is_selected("t1"));
        assert!(!selection.is_selected("t2"));
    }

    #[test]
    fn test_toggle_only_changes_selection() {
        let taxes = vec![tax("t1", "Serviço", 1000, true)];
        let mut selection = TaxSelection::from_active(&taxes);
        selection.toggle("t1");
        assert!(selection.pick(&taxes).is_empty());
        assert!(taxes[0].active);
        selection.toggle("t1");
        assert_eq!(selection.pick(&taxes).len(), 1);
    }

    #[test]
    fn test_compute_checkout_with_extras_and_taxes() {
        let service = tax("t1", "Serviço", 1000, true);
        let extra = AdditionalItem {
            name: "Gelo".to_string(),
            quantity: 2,
            unit_price_cents: 250,
        };
        let totals = compute_checkout(Money::from_cents(2500), &[extra], &[&service]);
        assert_eq!(totals.subtotal.cents(), 3000);
        assert_eq!(totals.tax_total.cents(), 300);
        assert_eq!(totals.total.cents(), 3300);
        assert_eq!(totals.taxes[0].name, "Serviço");
    }

    #[test]
    fn test_order_totals_excludes_tax() {
        let now = Utc::now();
        let line = |qty: i64, unit: i64| OrderItem {
            id: format!("i{qty}{unit}"),
            order_id: "o".to_string(),
            product_type: crate::types::ProductType::ExternalProduct,
            product_id: "p".to_string(),
            product_name: "Item".to_string(),
            quantity: qty,
            unit_price_cents: unit,
            total_price_cents: qty * unit,
            original_price_cents: None,
            discount_value_cents: None,
            discount_id: None,
            notes: None,
            created_at: now,
        };
        let totals = order_totals(&[line(2, 1000), line(1, 500)]);
        assert_eq!(totals.subtotal.cents(), 2500);
        assert!(totals.tax.is_zero());
        assert_eq!(totals.total.cents(), 2500);
    }
}
