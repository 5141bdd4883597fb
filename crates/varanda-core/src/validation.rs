//! # Validation Module
//!
//! Business-rule validation run before any write.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end                                                    │
//! │  └── Required fields, inline toast                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Services (varanda-db)                                        │
//! │  └── THIS MODULE: amounts, quantities, payments, expenses              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── NOT NULL, CHECK, partial UNIQUE (one open register per owner)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed validation aborts the operation with no partial write.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{ExpenseType, NewExpense, Payment};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a catalog or customer name.
///
/// ## Rules
/// - Must not be empty
/// - At most 120 characters
///
/// ## Example
/// ```rust
/// use varanda_core::validation::validate_name;
///
/// assert!(validate_name("nome", "Heineken 600ml").is_ok());
/// assert!(validate_name("nome", "  ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 120 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 120,
        });
    }

    Ok(())
}

/// Trims an optional free-text field; blank becomes `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity of an order line.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantidade".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantidade".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a monetary amount that may be zero (prices, opening float).
///
/// ## Example
/// ```rust
/// use varanda_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("valor", 0).is_ok());
/// assert!(validate_amount_cents("valor", -100).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a stock quantity (finite, non-negative).
pub fn validate_stock_quantity(field: &str, qty: f64) -> ValidationResult<()> {
    if !qty.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "número inválido".to_string(),
        });
    }
    if qty < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a service-tax rate in basis points (0% to 100%).
pub fn validate_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=10_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "percentual".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on an order.
pub fn validate_order_size(items: usize) -> ValidationResult<()> {
    if items > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "itens".to_string(),
            min: 0,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates payments and returns the amount paid.
///
/// ## Rules
/// - At least one payment, unless `total` is zero
/// - Every amount positive
///
/// Coverage of the total is a business rule checked by the caller
/// (see `CoreError::InsufficientPayment`).
pub fn validate_payments(payments: &[Payment], total: Money) -> ValidationResult<Money> {
    if payments.is_empty() && !total.is_zero() {
        return Err(ValidationError::Required {
            field: "forma de pagamento".to_string(),
        });
    }

    if payments.iter().any(|p| p.amount_cents <= 0) {
        return Err(ValidationError::MustBePositive {
            field: "valor do pagamento".to_string(),
        });
    }

    Ok(payments.iter().map(Payment::amount).sum())
}

// =============================================================================
// Expense Validators
// =============================================================================

/// Validates an expense request before pricing.
///
/// ## Rules
/// ```text
/// product_loss     → product_type + product_id + quantity > 0
/// ingredient_loss  → ingredient_id + quantity > 0
/// other            → description + amount > 0
/// ```
pub fn validate_new_expense(expense: &NewExpense) -> ValidationResult<()> {
    if let Some(amount) = expense.amount_cents {
        if amount <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "valor".to_string(),
            });
        }
    }

    match expense.expense_type {
        ExpenseType::ProductLoss | ExpenseType::IngredientLoss => {
            let reference = match expense.expense_type {
                ExpenseType::ProductLoss => {
                    if expense.product_type.is_none() {
                        return Err(ValidationError::Required {
                            field: "tipo de produto".to_string(),
                        });
                    }
                    &expense.product_id
                }
                _ => &expense.ingredient_id,
            };
            if normalize_optional(reference.as_deref()).is_none() {
                return Err(ValidationError::Required {
                    field: "item".to_string(),
                });
            }
            match expense.quantity {
                Some(qty) if qty.is_finite() && qty > 0.0 => Ok(()),
                _ => Err(ValidationError::MustBePositive {
                    field: "quantidade".to_string(),
                }),
            }
        }
        ExpenseType::Other => {
            if normalize_optional(expense.description.as_deref()).is_none() {
                return Err(ValidationError::Required {
                    field: "descrição".to_string(),
                });
            }
            match expense.amount_cents {
                Some(_) => Ok(()),
                None => Err(ValidationError::MustBePositive {
                    field: "valor".to_string(),
                }),
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CostBasis, PaymentMethod, ProductType};

    fn expense(kind: ExpenseType) -> NewExpense {
        NewExpense {
            expense_type: kind,
            amount_cents: None,
            quantity: None,
            product_type: None,
            product_id: None,
            ingredient_id: None,
            cost_basis: CostBasis::Cost,
            description: None,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_payments() {
        let total = Money::from_cents(2500);
        assert!(validate_payments(&[], total).is_err());
        let zero = Payment::new(PaymentMethod::Pix, Money::zero());
        assert!(validate_payments(&[zero], total).is_err());
        let paid = validate_payments(
            &[
                Payment::new(PaymentMethod::Cash, Money::from_cents(1500)),
                Payment::new(PaymentMethod::Pix, Money::from_cents(1000)),
            ],
            total,
        )
        .unwrap();
        assert_eq!(paid.cents(), 2500);
    }

    #[test]
    fn test_nothing_to_pay_needs_no_payment() {
        let paid = validate_payments(&[], Money::zero()).unwrap();
        assert!(paid.is_zero());

        let zero = Payment::new(PaymentMethod::Cash, Money::zero());
        assert!(validate_payments(&[zero], Money::zero()).is_err());
    }

    #[test]
    fn test_other_expense_needs_description_and_amount() {
        let mut e = expense(ExpenseType::Other);
        e.amount_cents = Some(1500);
        assert_eq!(
            validate_new_expense(&e).unwrap_err(),
            ValidationError::Required {
                field: "descrição".to_string()
            }
        );
        e.description = Some("Gelo".to_string());
        assert!(validate_new_expense(&e).is_ok());
        e.amount_cents = Some(0);
        assert!(validate_new_expense(&e).is_err());
    }

    #[test]
    fn test_loss_expense_needs_item_and_quantity() {
        let mut e = expense(ExpenseType::ProductLoss);
        e.product_type = Some(ProductType::ExternalProduct);
        e.product_id = Some("beer".to_string());
        assert!(validate_new_expense(&e).is_err());
        e.quantity = Some(2.0);
        assert!(validate_new_expense(&e).is_ok());

        let mut i = expense(ExpenseType::IngredientLoss);
        i.quantity = Some(0.5);
        assert!(validate_new_expense(&i).is_err());
        i.ingredient_id = Some("beef".to_string());
        assert!(validate_new_expense(&i).is_ok());
    }

    #[test]
    fn test_validate_rate_bps() {
        assert!(validate_rate_bps(1000).is_ok());
        assert!(validate_rate_bps(10_001).is_err());
        assert!(validate_rate_bps(-1).is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  ")), None);
        assert_eq!(normalize_optional(Some(" Ana ")), Some("Ana".to_string()));
    }
}
