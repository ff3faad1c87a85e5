//! Store abstraction for the commerce engine.
//!
//! Every service operation runs against one [`StoreTx`]: an atomic unit of
//! work opened from a [`CommerceStore`]. Either the transaction commits and
//! every write in it is durable, or it is dropped and nothing is applied.
//! Partial application (stock decremented but cart not cleared, say) is the
//! single most important failure this layer exists to prevent.
//!
//! Two implementations:
//!
//! - [`postgres::PgStore`] - production store over `sqlx`/`PostgreSQL`
//! - [`memory::MemoryStore`] - in-process store with the same transactional
//!   semantics, used by the service test suites

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use pomelo_core::{AddressId, CartId, CartLineId, Email, Money, OrderId, ProductId};

use crate::models::{
    Address, Cart, CartLine, NewCartLine, NewOrder, NewOrderLine, NewPayment, Order, OrderLine,
    Payment, Product,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate cart line).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The unit of work lost a write conflict and was aborted; the whole
    /// operation may be retried.
    #[error("transient write conflict: {0}")]
    Serialization(sqlx::Error),
}

impl StoreError {
    /// Whether retrying the whole operation is reasonable.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Serialization(_) | Self::Database(sqlx::Error::PoolTimedOut)
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        // 40001 = serialization_failure, 40P01 = deadlock_detected
        if let sqlx::Error::Database(db_err) = &e
            && matches!(db_err.code().as_deref(), Some("40001" | "40P01"))
        {
            return Self::Serialization(e);
        }
        Self::Database(e)
    }
}

/// Handle to the relational store; opens atomic units of work.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Begin a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a connection cannot be acquired.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

/// One atomic unit of work against the store.
///
/// All reads observe the transaction's own uncommitted writes. Dropping the
/// transaction without calling [`StoreTx::commit`] rolls everything back.
#[async_trait]
pub trait StoreTx: Send {
    // =========================================================================
    // Products
    // =========================================================================

    /// Look up a product by id.
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Persist the product's current field values.
    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError>;

    /// Conditionally decrement stock.
    ///
    /// Returns `false` (without writing) if the decrement would take the
    /// stock below zero - the caller decides how to surface that. Two
    /// transactions racing on the last unit see exactly one `true`.
    async fn decrement_stock(&mut self, id: ProductId, quantity: i32)
    -> Result<bool, StoreError>;

    /// Delete a product row. Callers must have removed referencing cart
    /// lines first.
    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError>;

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Look up an address by id.
    async fn address(&mut self, id: AddressId) -> Result<Option<Address>, StoreError>;

    // =========================================================================
    // Carts
    // =========================================================================

    /// Look up a cart by id.
    async fn cart(&mut self, id: CartId) -> Result<Option<Cart>, StoreError>;

    /// Find the buyer's cart, if any.
    async fn cart_for_email(&mut self, email: &Email) -> Result<Option<Cart>, StoreError>;

    /// Find a cart only if it belongs to the given buyer.
    async fn cart_for_email_and_id(
        &mut self,
        email: &Email,
        id: CartId,
    ) -> Result<Option<Cart>, StoreError>;

    /// All carts in the system, id-ordered.
    async fn all_carts(&mut self) -> Result<Vec<Cart>, StoreError>;

    /// All carts currently holding a line on the given product, id-ordered.
    async fn carts_holding_product(&mut self, id: ProductId) -> Result<Vec<Cart>, StoreError>;

    /// Create an empty cart for the buyer with a zero total.
    async fn create_cart(&mut self, email: &Email) -> Result<Cart, StoreError>;

    /// Overwrite a cart's stored running total.
    async fn set_cart_total(&mut self, id: CartId, total: Money) -> Result<(), StoreError>;

    // =========================================================================
    // Cart lines
    // =========================================================================

    /// All lines of a cart, id-ordered.
    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, StoreError>;

    /// Find the cart's line for a product, if any.
    async fn cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError>;

    /// Insert a new cart line.
    async fn insert_cart_line(&mut self, line: &NewCartLine) -> Result<CartLine, StoreError>;

    /// Set a line's quantity and snapshot price.
    async fn update_cart_line(
        &mut self,
        id: CartLineId,
        quantity: i32,
        price: Money,
    ) -> Result<(), StoreError>;

    /// Delete the cart's line for a product. Returns whether a row existed.
    async fn delete_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, StoreError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Insert a new order and return it with its assigned id.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError>;

    /// Insert the payment record for an order.
    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment, StoreError>;

    /// Insert the frozen order lines.
    async fn insert_order_lines(
        &mut self,
        lines: &[NewOrderLine],
    ) -> Result<Vec<OrderLine>, StoreError>;

    /// Look up an order by id.
    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All lines of an order, id-ordered.
    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError>;

    // =========================================================================
    // Unit of work
    // =========================================================================

    /// Commit every write in this transaction.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
