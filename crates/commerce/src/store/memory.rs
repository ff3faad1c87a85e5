//! In-memory store implementation.
//!
//! Backs the service test suites with the same transactional contract as the
//! `PostgreSQL` store: a transaction stages a clone of the state and swaps it
//! in on commit while holding the state lock. Dropping an uncommitted
//! transaction discards the staged copy, so rollback-on-failure behaves like
//! the real thing, and racing transactions serialize so the second one
//! observes the first one's committed stock.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pomelo_core::{
    AddressId, CartId, CartLineId, Email, Money, OrderId, OrderLineId, PaymentId, ProductId,
};

use super::{CommerceStore, StoreError, StoreTx};
use crate::models::{
    Address, Cart, CartLine, NewCartLine, NewOrder, NewOrderLine, NewPayment, Order, OrderLine,
    Payment, Product,
};

/// The whole store contents, keyed by raw id.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub products: BTreeMap<i64, Product>,
    pub addresses: BTreeMap<i64, Address>,
    pub carts: BTreeMap<i64, Cart>,
    pub cart_lines: BTreeMap<i64, CartLine>,
    pub orders: BTreeMap<i64, Order>,
    pub order_lines: BTreeMap<i64, OrderLine>,
    pub payments: BTreeMap<i64, Payment>,
    next_id: i64,
}

impl MemoryState {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process commerce store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product directly, outside any transaction.
    pub async fn insert_product(
        &self,
        name: &str,
        price: Money,
        stock_quantity: i32,
    ) -> Product {
        let mut state = self.state.lock().await;
        let id = state.alloc_id();
        let product = Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            description: None,
            price,
            stock_quantity,
        };
        state.products.insert(id, product.clone());
        product
    }

    /// Insert an address directly, outside any transaction.
    pub async fn insert_address(&self, street: &str, city: &str) -> Address {
        let mut state = self.state.lock().await;
        let id = state.alloc_id();
        let address = Address {
            id: AddressId::new(id),
            street: street.to_owned(),
            building_name: None,
            city: city.to_owned(),
            state: "CA".to_owned(),
            country: "US".to_owned(),
            pincode: "94000".to_owned(),
        };
        state.addresses.insert(id, address.clone());
        address
    }

    /// A copy of the current committed state, for inspection.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }
}

/// One staged unit of work; holds the store lock until committed or dropped.
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.staged.products.get(&id.as_i64()).cloned())
    }

    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let slot = self
            .staged
            .products
            .get_mut(&product.id.as_i64())
            .ok_or(StoreError::NotFound)?;
        *slot = product.clone();
        Ok(())
    }

    async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, StoreError> {
        let product = self
            .staged
            .products
            .get_mut(&id.as_i64())
            .ok_or(StoreError::NotFound)?;
        if product.stock_quantity < quantity {
            return Ok(false);
        }
        product.stock_quantity -= quantity;
        Ok(true)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError> {
        self.staged
            .products
            .remove(&id.as_i64())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn address(&mut self, id: AddressId) -> Result<Option<Address>, StoreError> {
        Ok(self.staged.addresses.get(&id.as_i64()).cloned())
    }

    async fn cart(&mut self, id: CartId) -> Result<Option<Cart>, StoreError> {
        Ok(self.staged.carts.get(&id.as_i64()).cloned())
    }

    async fn cart_for_email(&mut self, email: &Email) -> Result<Option<Cart>, StoreError> {
        Ok(self
            .staged
            .carts
            .values()
            .find(|cart| cart.owner_email == *email)
            .cloned())
    }

    async fn cart_for_email_and_id(
        &mut self,
        email: &Email,
        id: CartId,
    ) -> Result<Option<Cart>, StoreError> {
        Ok(self
            .staged
            .carts
            .get(&id.as_i64())
            .filter(|cart| cart.owner_email == *email)
            .cloned())
    }

    async fn all_carts(&mut self) -> Result<Vec<Cart>, StoreError> {
        Ok(self.staged.carts.values().cloned().collect())
    }

    async fn carts_holding_product(&mut self, id: ProductId) -> Result<Vec<Cart>, StoreError> {
        let cart_ids: std::collections::BTreeSet<i64> = self
            .staged
            .cart_lines
            .values()
            .filter(|line| line.product_id == id)
            .map(|line| line.cart_id.as_i64())
            .collect();

        Ok(self
            .staged
            .carts
            .values()
            .filter(|cart| cart_ids.contains(&cart.id.as_i64()))
            .cloned()
            .collect())
    }

    async fn create_cart(&mut self, email: &Email) -> Result<Cart, StoreError> {
        if self.cart_for_email(email).await?.is_some() {
            return Err(StoreError::Conflict("buyer already has a cart".to_owned()));
        }
        let id = self.staged.alloc_id();
        let cart = Cart {
            id: CartId::new(id),
            owner_email: email.clone(),
            total_price: Money::ZERO,
        };
        self.staged.carts.insert(id, cart.clone());
        Ok(cart)
    }

    async fn set_cart_total(&mut self, id: CartId, total: Money) -> Result<(), StoreError> {
        let cart = self
            .staged
            .carts
            .get_mut(&id.as_i64())
            .ok_or(StoreError::NotFound)?;
        cart.total_price = total;
        Ok(())
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, StoreError> {
        Ok(self
            .staged
            .cart_lines
            .values()
            .filter(|line| line.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError> {
        Ok(self
            .staged
            .cart_lines
            .values()
            .find(|line| line.cart_id == cart_id && line.product_id == product_id)
            .cloned())
    }

    async fn insert_cart_line(&mut self, line: &NewCartLine) -> Result<CartLine, StoreError> {
        if self.cart_line(line.cart_id, line.product_id).await?.is_some() {
            return Err(StoreError::Conflict(
                "cart already holds a line for this product".to_owned(),
            ));
        }
        let id = self.staged.alloc_id();
        let stored = CartLine {
            id: CartLineId::new(id),
            cart_id: line.cart_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
        };
        self.staged.cart_lines.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_cart_line(
        &mut self,
        id: CartLineId,
        quantity: i32,
        price: Money,
    ) -> Result<(), StoreError> {
        let line = self
            .staged
            .cart_lines
            .get_mut(&id.as_i64())
            .ok_or(StoreError::NotFound)?;
        line.quantity = quantity;
        line.price = price;
        Ok(())
    }

    async fn delete_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, StoreError> {
        let key = self
            .staged
            .cart_lines
            .values()
            .find(|line| line.cart_id == cart_id && line.product_id == product_id)
            .map(|line| line.id.as_i64());

        match key {
            Some(key) => {
                self.staged.cart_lines.remove(&key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        let id = self.staged.alloc_id();
        let stored = Order {
            id: OrderId::new(id),
            email: order.email.clone(),
            order_date: order.order_date,
            total_amount: order.total_amount,
            status: order.status,
            address_id: order.address_id,
        };
        self.staged.orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment, StoreError> {
        let id = self.staged.alloc_id();
        let stored = Payment {
            id: PaymentId::new(id),
            order_id: payment.order_id,
            method: payment.method.clone(),
        };
        self.staged.payments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn insert_order_lines(
        &mut self,
        lines: &[NewOrderLine],
    ) -> Result<Vec<OrderLine>, StoreError> {
        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let id = self.staged.alloc_id();
            let stored = OrderLine {
                id: OrderLineId::new(id),
                order_id: line.order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                ordered_product_price: line.ordered_product_price,
            };
            self.staged.order_lines.insert(id, stored.clone());
            inserted.push(stored);
        }
        Ok(inserted)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.staged.orders.get(&id.as_i64()).cloned())
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError> {
        Ok(self
            .staged
            .order_lines
            .values()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn money(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2))
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let store = MemoryStore::new();
        let product = store.insert_product("Widget", money(1000), 5).await;

        {
            let mut tx = store.begin().await.expect("begin");
            assert!(tx.decrement_stock(product.id, 5).await.expect("decrement"));
            // dropped without commit
        }

        let state = store.snapshot().await;
        let stored = state.products.get(&product.id.as_i64()).expect("product");
        assert_eq!(stored.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let store = MemoryStore::new();
        let product = store.insert_product("Widget", money(1000), 5).await;

        let mut tx = store.begin().await.expect("begin");
        assert!(tx.decrement_stock(product.id, 2).await.expect("decrement"));
        tx.commit().await.expect("commit");

        let state = store.snapshot().await;
        let stored = state.products.get(&product.id.as_i64()).expect("product");
        assert_eq!(stored.stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_decrement_stock_refuses_to_go_negative() {
        let store = MemoryStore::new();
        let product = store.insert_product("Widget", money(1000), 1).await;

        let mut tx = store.begin().await.expect("begin");
        assert!(!tx.decrement_stock(product.id, 2).await.expect("decrement"));
        let unchanged = tx.product(product.id).await.expect("get").expect("some");
        assert_eq!(unchanged.stock_quantity, 1);
    }
}
