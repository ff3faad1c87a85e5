//! `PostgreSQL` store implementation.
//!
//! Row structs mirror the table layout and convert into domain models via
//! `From`/`TryFrom`; queries are runtime-checked `sqlx::query_as` calls over
//! the transaction's connection. Stock decrements are conditional UPDATEs so
//! the database, not the application, arbitrates races on the last unit.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use pomelo_core::{
    AddressId, CartId, CartLineId, Email, Money, OrderId, OrderLineId, OrderStatus, PaymentId,
    PaymentMethod, ProductId,
};

use super::{CommerceStore, StoreError, StoreTx};
use crate::models::{
    Address, Cart, CartLine, NewCartLine, NewOrder, NewOrderLine, NewPayment, Order, OrderLine,
    Payment, Product,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock_quantity: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: Money::new(row.price),
            stock_quantity: row.stock_quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i64,
    street: String,
    building_name: Option<String>,
    city: String,
    state: String,
    country: String,
    pincode: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            street: row.street,
            building_name: row.building_name,
            city: row.city,
            state: row.state,
            country: row.country,
            pincode: row.pincode,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i64,
    owner_email: String,
    total_price: Decimal,
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self, StoreError> {
        let owner_email = Email::parse(&row.owner_email).map_err(|e| {
            StoreError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CartId::new(row.id),
            owner_email,
            total_price: Money::new(row.total_price),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i64,
    cart_id: i64,
    product_id: i64,
    quantity: i32,
    price: Decimal,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartLineId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            price: Money::new(row.price),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    email: String,
    order_date: NaiveDate,
    total_amount: Decimal,
    status: String,
    address_id: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, StoreError> {
        let email = Email::parse(&row.email).map_err(|e| {
            StoreError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let status = OrderStatus::from_str(&row.status).map_err(|e| {
            StoreError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            email,
            order_date: row.order_date,
            total_amount: Money::new(row.total_amount),
            status,
            address_id: AddressId::new(row.address_id),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i32,
    ordered_product_price: Decimal,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: OrderLineId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            ordered_product_price: Money::new(row.ordered_product_price),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    order_id: i64,
    payment_method: String,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, StoreError> {
        let method = PaymentMethod::parse(&row.payment_method).map_err(|e| {
            StoreError::DataCorruption(format!("invalid payment method in database: {e}"))
        })?;

        Ok(Self {
            id: PaymentId::new(row.id),
            order_id: OrderId::new(row.order_id),
            method,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL`-backed commerce store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommerceStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// One `PostgreSQL` transaction.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, stock_quantity
            FROM commerce.product
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE commerce.product
            SET name = $2, description = $3, price = $4, stock_quantity = $5
            WHERE id = $1
            ",
        )
        .bind(product.id.as_i64())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.stock_quantity)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, StoreError> {
        // The predicate makes the decrement conditional: concurrent
        // transactions racing on the last unit get exactly one affected row.
        let result = sqlx::query(
            r"
            UPDATE commerce.product
            SET stock_quantity = stock_quantity - $2
            WHERE id = $1 AND stock_quantity >= $2
            ",
        )
        .bind(id.as_i64())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            DELETE FROM commerce.product
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn address(&mut self, id: AddressId) -> Result<Option<Address>, StoreError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, street, building_name, city, state, country, pincode
            FROM commerce.address
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn cart(&mut self, id: CartId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, owner_email, total_price
            FROM commerce.cart
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn cart_for_email(&mut self, email: &Email) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, owner_email, total_price
            FROM commerce.cart
            WHERE owner_email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn cart_for_email_and_id(
        &mut self,
        email: &Email,
        id: CartId,
    ) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, owner_email, total_price
            FROM commerce.cart
            WHERE owner_email = $1 AND id = $2
            ",
        )
        .bind(email.as_str())
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn all_carts(&mut self) -> Result<Vec<Cart>, StoreError> {
        let rows = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, owner_email, total_price
            FROM commerce.cart
            ORDER BY id ASC
            ",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(Cart::try_from).collect()
    }

    async fn carts_holding_product(&mut self, id: ProductId) -> Result<Vec<Cart>, StoreError> {
        let rows = sqlx::query_as::<_, CartRow>(
            r"
            SELECT DISTINCT c.id, c.owner_email, c.total_price
            FROM commerce.cart c
            INNER JOIN commerce.cart_line l ON l.cart_id = c.id
            WHERE l.product_id = $1
            ORDER BY c.id ASC
            ",
        )
        .bind(id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(Cart::try_from).collect()
    }

    async fn create_cart(&mut self, email: &Email) -> Result<Cart, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO commerce.cart (owner_email, total_price)
            VALUES ($1, 0)
            RETURNING id, owner_email, total_price
            ",
        )
        .bind(email.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("cart_owner_email_key")
            {
                return StoreError::Conflict("buyer already has a cart".to_owned());
            }
            StoreError::from(e)
        })?;

        Cart::try_from(row)
    }

    async fn set_cart_total(&mut self, id: CartId, total: Money) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE commerce.cart
            SET total_price = $2
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .bind(total.amount())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, StoreError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT id, cart_id, product_id, quantity, price
            FROM commerce.cart_line
            WHERE cart_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(cart_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT id, cart_id, product_id, quantity, price
            FROM commerce.cart_line
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart_id.as_i64())
        .bind(product_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_cart_line(&mut self, line: &NewCartLine) -> Result<CartLine, StoreError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            INSERT INTO commerce.cart_line (cart_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, cart_id, product_id, quantity, price
            ",
        )
        .bind(line.cart_id.as_i64())
        .bind(line.product_id.as_i64())
        .bind(line.quantity)
        .bind(line.price.amount())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("cart_line_cart_id_product_id_key")
            {
                return StoreError::Conflict("cart already holds a line for this product".to_owned());
            }
            StoreError::from(e)
        })?;

        Ok(row.into())
    }

    async fn update_cart_line(
        &mut self,
        id: CartLineId,
        quantity: i32,
        price: Money,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE commerce.cart_line
            SET quantity = $2, price = $3
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .bind(quantity)
        .bind(price.amount())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            DELETE FROM commerce.cart_line
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart_id.as_i64())
        .bind(product_id.as_i64())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO commerce.orders (email, order_date, total_amount, status, address_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, order_date, total_amount, status, address_id
            ",
        )
        .bind(order.email.as_str())
        .bind(order.order_date)
        .bind(order.total_amount.amount())
        .bind(order.status.to_string())
        .bind(order.address_id.as_i64())
        .fetch_one(&mut *self.tx)
        .await?;

        Order::try_from(row)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r"
            INSERT INTO commerce.payment (order_id, payment_method)
            VALUES ($1, $2)
            RETURNING id, order_id, payment_method
            ",
        )
        .bind(payment.order_id.as_i64())
        .bind(payment.method.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Payment::try_from(row)
    }

    async fn insert_order_lines(
        &mut self,
        lines: &[NewOrderLine],
    ) -> Result<Vec<OrderLine>, StoreError> {
        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let row = sqlx::query_as::<_, OrderLineRow>(
                r"
                INSERT INTO commerce.order_line
                    (order_id, product_id, quantity, ordered_product_price)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, product_id, quantity, ordered_product_price
                ",
            )
            .bind(line.order_id.as_i64())
            .bind(line.product_id.as_i64())
            .bind(line.quantity)
            .bind(line.ordered_product_price.amount())
            .fetch_one(&mut *self.tx)
            .await?;

            inserted.push(row.into());
        }
        Ok(inserted)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, email, order_date, total_amount, status, address_id
            FROM commerce.orders
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT id, order_id, product_id, quantity, ordered_product_price
            FROM commerce.order_line
            WHERE order_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(order_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
