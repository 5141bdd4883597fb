//! Fixtures shared by the repository and service tests.

use varanda_core::{
    Actor, CashRegister, ExternalProduct, Ingredient, Money, NewOrderItem, Payment,
    PaymentMethod, ProductType, Session, Unit,
};

use crate::repository::catalog::{NewExternalProduct, NewIngredient};
use crate::{Database, DbConfig};

pub(crate) const OWNER: &str = "owner-1";

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) fn owner() -> Session {
    Session::resolve(Actor::owner(OWNER)).unwrap()
}

/// An employee acting on behalf of [`OWNER`].
pub(crate) fn employee() -> Session {
    Session::resolve(Actor::employee("employee-1", OWNER)).unwrap()
}

pub(crate) async fn ingredient(
    db: &Database,
    name: &str,
    unit: Unit,
    unit_cost_cents: i64,
    stock: f64,
) -> Ingredient {
    db.catalog()
        .create_ingredient(
            OWNER,
            NewIngredient {
                name: name.to_string(),
                unit,
                unit_cost_cents,
                current_stock: stock,
                min_stock: 0.0,
            },
        )
        .await
        .unwrap()
}

pub(crate) async fn external_product(
    db: &Database,
    name: &str,
    cost_cents: i64,
    price_cents: i64,
    stock: f64,
) -> ExternalProduct {
    db.catalog()
        .create_external_product(
            OWNER,
            NewExternalProduct {
                name: name.to_string(),
                cost_cents,
                price_cents,
                current_stock: stock,
                min_stock: 0.0,
            },
        )
        .await
        .unwrap()
}

pub(crate) async fn open_register(db: &Database, opening_cents: i64) -> CashRegister {
    db.cash_registers()
        .open(&owner(), Money::from_cents(opening_cents))
        .await
        .unwrap()
}

pub(crate) fn line(product_type: ProductType, product_id: &str, quantity: i64) -> NewOrderItem {
    NewOrderItem {
        product_type,
        product_id: product_id.to_string(),
        quantity,
        notes: None,
    }
}

pub(crate) fn cash(cents: i64) -> Vec<Payment> {
    vec![Payment::new(PaymentMethod::Cash, Money::from_cents(cents))]
}
