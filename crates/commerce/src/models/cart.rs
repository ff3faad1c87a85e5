//! Cart and cart line models.

use serde::{Deserialize, Serialize};

use pomelo_core::{CartId, CartLineId, Email, Money, ProductId};

/// A buyer's cart.
///
/// Exactly one cart exists per buyer, created lazily on the first add and
/// never deleted by normal flow. `total_price` is stored, not derived on
/// read: every mutation that changes a line's price, quantity, or presence
/// updates it in the same unit of work, so it always equals the sum of
/// `line.price * line.quantity` once an operation settles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub owner_email: Email,
    pub total_price: Money,
}

/// One product entry within a cart.
///
/// `price` is a snapshot of the product price taken at add/update time,
/// deliberately decoupled from the live product price until explicitly
/// reconciled. A line never exists with `quantity <= 0`; a line that would
/// reach zero is deleted instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Money,
}

impl CartLine {
    /// The amount this line contributes to the cart total.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// Input for inserting a new cart line.
#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Money,
}
