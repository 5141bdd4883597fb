//! # Repository Module
//!
//! Database repository implementations for Varanda POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Reads and single-row writes                                           │
//! │       │  db.catalog().list_ingredients(owner)                          │
//! │       ▼                                                                 │
//! │  CatalogRepository (holds the pool)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  catalog::get_ingredient(&mut conn, ..) ◄───┐                          │
//! │                                             │                          │
//! │  Multi-table writes                          │                          │
//! │       │  db.orders().close_order(..)         │                          │
//! │       ▼                                      │                          │
//! │  OrderService: pool.begin() ── &mut *tx ─────┘                          │
//! │       └── commit() only when every step succeeded                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query function takes `&mut SqliteConnection` so the services can run
//! them inside a single transaction. Services must never touch the pool while
//! holding a transaction: in-memory databases have one connection.
//!
//! ## Available Repositories
//!
//! - [`cash_register`] - Register rows and running totals
//! - [`order`] - Orders and order items
//! - [`sale`] - Frozen sale snapshots
//! - [`expense`] - Expense rows
//! - [`catalog`] - Ingredients, external products, foods and recipes
//! - [`discount`] - Replacement prices
//! - [`service_tax`] - Checkout surcharges
//! - [`stock_movement`] - Stock audit trail
//! - [`print_queue`] - The `fila_impressao` table

pub mod cash_register;
pub mod catalog;
pub mod discount;
pub mod expense;
pub mod order;
pub mod print_queue;
pub mod sale;
pub mod service_tax;
pub mod stock_movement;
