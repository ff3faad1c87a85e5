//! Shared harness for the service test suites.

use std::sync::Arc;

use rust_decimal::Decimal;

use pomelo_commerce::store::{CommerceStore, MemoryStore};
use pomelo_commerce::{CartService, CatalogService, OrderService};
use pomelo_core::{Email, Money};

pub fn money(cents: i64) -> Money {
    Money::new(Decimal::new(cents, 2))
}

pub fn email(s: &str) -> Email {
    Email::parse(s).expect("valid test email")
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub carts: CartService,
    pub orders: OrderService,
    pub catalog: CatalogService,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let as_dyn: Arc<dyn CommerceStore> = Arc::clone(&store) as Arc<dyn CommerceStore>;
    Harness {
        store,
        carts: CartService::new(Arc::clone(&as_dyn)),
        orders: OrderService::new(Arc::clone(&as_dyn)),
        catalog: CatalogService::new(as_dyn),
    }
}
