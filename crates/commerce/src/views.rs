//! Response projections assembled from the aggregates.
//!
//! These are what the services hand back to the (out-of-scope) API layer:
//! carts with their lines expanded into product-level entries, and orders
//! composed with their payment, address, and frozen lines.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use pomelo_core::{AddressId, CartId, Email, Money, OrderId, OrderStatus, ProductId};

use crate::models::{Address, Order, OrderLine, Payment};

/// One cart line expanded with product details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    /// The snapshot price held by the line, not the live product price.
    pub unit_price: Money,
    pub quantity: i32,
    pub line_total: Money,
}

/// A cart with its lines expanded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartView {
    pub id: CartId,
    pub owner_email: Email,
    pub total_price: Money,
    pub lines: Vec<CartLineView>,
}

/// One frozen order line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub quantity: i32,
    pub ordered_product_price: Money,
    pub line_total: Money,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            ordered_product_price: line.ordered_product_price,
            line_total: line.ordered_product_price.times(line.quantity),
        }
    }
}

/// The composed result of a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderView {
    pub id: OrderId,
    pub email: Email,
    pub order_date: NaiveDate,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub address_id: AddressId,
    pub payment_method: String,
    pub address: Address,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    /// Compose the order view from its freshly persisted parts.
    #[must_use]
    pub fn compose(order: Order, payment: &Payment, address: Address, lines: &[OrderLine]) -> Self {
        Self {
            id: order.id,
            email: order.email,
            order_date: order.order_date,
            total_amount: order.total_amount,
            status: order.status,
            address_id: order.address_id,
            payment_method: payment.method.as_str().to_owned(),
            address,
            lines: lines.iter().map(OrderLineView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cart_line_view_wire_shape() {
        let view = CartLineView {
            product_id: ProductId::new(7),
            name: "Keyboard".to_owned(),
            unit_price: Money::new(Decimal::new(1099, 2)),
            quantity: 2,
            line_total: Money::new(Decimal::new(2198, 2)),
        };

        // Ids serialize transparently as numbers, money as exact strings.
        let value = serde_json::to_value(&view).expect("serialize");
        assert_eq!(
            value,
            json!({
                "product_id": 7,
                "name": "Keyboard",
                "unit_price": "10.99",
                "quantity": 2,
                "line_total": "21.98",
            })
        );
    }
}
