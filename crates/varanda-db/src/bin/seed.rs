//! # Seed Data Generator
//!
//! Populates the database with the Varanda demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./varanda.db (or $VARANDA_DB_PATH)
//! cargo run -p varanda-db --bin seed
//!
//! # Specify database path and owner
//! cargo run -p varanda-db --bin seed -- --db ./data/varanda.db --owner dono-1
//! ```
//!
//! ## Generated Catalog
//! - Ingredients with stock and minimums (kg / l / unidade)
//! - Bottled drinks as external products
//! - Kitchen dishes with recipes in mixed units (g against kg stock)
//! - One active promotion and the 10% service tax

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use varanda_core::{Actor, ProductType, Session, Unit};
use varanda_db::repository::catalog::{NewExternalProduct, NewFood, NewIngredient, RecipeLine};
use varanda_db::{Database, DbConfig};

/// (name, unit, unit cost in cents, stock, minimum)
const INGREDIENTS: &[(&str, Unit, i64, f64, f64)] = &[
    ("Carne moída", Unit::Kg, 3990, 5.0, 1.0),
    ("Queijo mussarela", Unit::Kg, 4290, 3.0, 0.5),
    ("Pão de hambúrguer", Unit::Unidade, 120, 60.0, 20.0),
    ("Batata", Unit::Kg, 690, 10.0, 2.0),
    ("Óleo", Unit::L, 890, 6.0, 2.0),
    ("Massa de pastel", Unit::Kg, 1590, 2.0, 0.5),
    ("Calabresa", Unit::Kg, 2890, 2.0, 0.5),
];

/// (name, cost, price, stock, minimum)
const DRINKS: &[(&str, i64, i64, f64, f64)] = &[
    ("Heineken 600ml", 900, 1800, 48.0, 12.0),
    ("Brahma 600ml", 650, 1300, 48.0, 12.0),
    ("Coca-Cola lata", 350, 700, 36.0, 12.0),
    ("Guaraná lata", 300, 650, 36.0, 12.0),
    ("Água sem gás", 150, 500, 24.0, 6.0),
    ("Caipirinha", 600, 1800, 100.0, 0.0),
];

/// (name, price, recipe: (ingredient, quantity, unit))
const DISHES: &[(&str, i64, &[(&str, f64, Unit)])] = &[
    (
        "X-Burguer",
        2800,
        &[
            ("Carne moída", 150.0, Unit::G),
            ("Queijo mussarela", 40.0, Unit::G),
            ("Pão de hambúrguer", 1.0, Unit::Unidade),
        ],
    ),
    (
        "Porção de fritas",
        2500,
        &[("Batata", 400.0, Unit::G), ("Óleo", 50.0, Unit::Ml)],
    ),
    (
        "Pastel de queijo",
        1200,
        &[
            ("Massa de pastel", 80.0, Unit::G),
            ("Queijo mussarela", 60.0, Unit::G),
            ("Óleo", 30.0, Unit::Ml),
        ],
    ),
    (
        "Calabresa acebolada",
        3900,
        &[("Calabresa", 500.0, Unit::G), ("Óleo", 20.0, Unit::Ml)],
    ),
];

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Varanda POS demo catalog")]
struct Args {
    /// Database file path
    #[arg(short, long, env = "VARANDA_DB_PATH", default_value = "varanda.db")]
    db: String,

    /// Owner the catalog belongs to
    #[arg(short, long, default_value = "owner-1")]
    owner: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    info!(db = %args.db, owner = %args.owner, "Varanda POS seed");

    let db = Database::new(DbConfig::new(&args.db))
        .await
        .with_context(|| format!("opening {}", args.db))?;
    let catalog = db.catalog();

    let existing = catalog.list_ingredients(&args.owner).await?;
    if !existing.is_empty() {
        warn!(
            ingredients = existing.len(),
            "Catalog already seeded; delete the database file to regenerate"
        );
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut ids = std::collections::HashMap::new();
    for (name, unit, unit_cost_cents, current_stock, min_stock) in INGREDIENTS {
        let ingredient = catalog
            .create_ingredient(
                &args.owner,
                NewIngredient {
                    name: name.to_string(),
                    unit: *unit,
                    unit_cost_cents: *unit_cost_cents,
                    current_stock: *current_stock,
                    min_stock: *min_stock,
                },
            )
            .await
            .with_context(|| format!("ingredient {name}"))?;
        ids.insert(*name, ingredient.id);
    }

    let mut promo = None;
    for (name, cost_cents, price_cents, current_stock, min_stock) in DRINKS {
        let product = catalog
            .create_external_product(
                &args.owner,
                NewExternalProduct {
                    name: name.to_string(),
                    cost_cents: *cost_cents,
                    price_cents: *price_cents,
                    current_stock: *current_stock,
                    min_stock: *min_stock,
                },
            )
            .await
            .with_context(|| format!("product {name}"))?;
        promo.get_or_insert(product.id);
    }

    for (name, price_cents, recipe) in DISHES {
        let recipe = recipe
            .iter()
            .map(|(ingredient, quantity, unit)| {
                let ingredient_id = ids
                    .get(ingredient)
                    .cloned()
                    .with_context(|| format!("{name} uses unknown ingredient {ingredient}"))?;
                Ok(RecipeLine {
                    ingredient_id,
                    quantity: *quantity,
                    unit: *unit,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let food = catalog
            .create_food(
                &args.owner,
                NewFood {
                    name: name.to_string(),
                    description: None,
                    price_cents: *price_cents,
                    recipe,
                },
            )
            .await
            .with_context(|| format!("dish {name}"))?;
        let cost = catalog.food_cost(&args.owner, &food.id).await?;
        info!(dish = %food.name, price = %food.price(), cost = %cost, "Dish created");
    }

    if let Some(product_id) = promo {
        db.discounts()
            .create(&args.owner, ProductType::ExternalProduct, &product_id, 1500)
            .await?;
    }
    db.service_taxes().create(&args.owner, "Taxa de serviço", 1000).await?;

    info!(
        ingredients = INGREDIENTS.len(),
        products = DRINKS.len(),
        dishes = DISHES.len(),
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    let session = Session::resolve(Actor::owner(&args.owner))?;
    let low = db.stock().low_stock(&session).await?;
    if !low.is_empty() {
        warn!(items = low.len(), "Seeded items already at or below minimum");
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,varanda=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
