//! Domain models for the commerce engine.
//!
//! Plain data structs; persistence lives in [`crate::store`] and the
//! mutation rules live in the services.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;

pub use address::Address;
pub use cart::{Cart, CartLine, NewCartLine};
pub use order::{NewOrder, NewOrderLine, NewPayment, Order, OrderLine, Payment};
pub use product::Product;
