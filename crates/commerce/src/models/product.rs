//! Product model.

use serde::{Deserialize, Serialize};

use pomelo_core::{Money, ProductId};

/// A purchasable product with live price and stock.
///
/// The catalog (categories, sellers, images, search) is managed by a
/// collaborator outside this engine; the engine only reads the price,
/// checks and decrements stock, and uses the name in caller-facing
/// messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Live unit price. Cart lines snapshot this at add/update time and are
    /// only brought back in sync through explicit reconciliation.
    pub price: Money,
    /// Available stock; never negative.
    pub stock_quantity: i32,
}
