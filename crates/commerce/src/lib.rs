//! Pomelo Commerce - the cart-to-order consistency engine.
//!
//! This crate owns the only part of the backend with real invariants:
//! shopping carts under concurrent mutation, and the checkout transaction
//! that atomically turns a cart into an immutable order while decrementing
//! inventory.
//!
//! # Components
//!
//! - [`cart::CartService`] - cart aggregate manager: add/update/remove lines,
//!   cart projections, per-cart price reconciliation
//! - [`order::OrderService`] - the atomic order-placement transaction
//! - [`catalog::CatalogService`] - price/stock propagation into carts when a
//!   product changes or disappears
//! - [`store`] - the unit-of-work abstraction over the relational store,
//!   with a `PostgreSQL` implementation and an in-memory implementation
//!
//! # Invariants
//!
//! - A cart line never exists with quantity <= 0.
//! - A cart's total price always equals the sum of its lines'
//!   `price * quantity` once an operation settles.
//! - Order lines are frozen snapshots: later catalog changes never touch them.
//! - Product stock never goes negative; racing checkouts on the last unit
//!   have exactly one winner.
//!
//! Every multi-row mutation runs inside a single store transaction. Business
//! rule violations are detected before any write; store-level failures abort
//! the whole unit of work.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod order;
pub mod store;
pub mod views;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use config::{CommerceConfig, ConfigError};
pub use error::{CommerceError, ErrorClass};
pub use order::OrderService;
