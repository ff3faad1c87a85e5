//! Order, order line, and payment models.
//!
//! Everything here is written exactly once, at order placement, and never
//! mutated afterwards (the status field excepted - fulfillment flows own
//! it). Later product or price changes must not be observable through an
//! existing order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use pomelo_core::{AddressId, Email, Money, OrderId, OrderLineId, OrderStatus, PaymentId, PaymentMethod, ProductId};

/// An immutable record of a completed checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub email: Email,
    pub order_date: NaiveDate,
    /// Copied from the cart's total at placement time.
    pub total_amount: Money,
    pub status: OrderStatus,
    pub address_id: AddressId,
}

/// Input for inserting a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub email: Email,
    pub order_date: NaiveDate,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub address_id: AddressId,
}

/// A frozen per-product snapshot within an order.
///
/// `quantity` and `ordered_product_price` are copied from the cart line at
/// placement and never recomputed; the referenced product may later change
/// or disappear independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub ordered_product_price: Money,
}

/// Input for inserting a new order line.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub ordered_product_price: Money,
}

/// The payment record created one-to-one with an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
}

/// Input for inserting a new payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub method: PaymentMethod,
}
