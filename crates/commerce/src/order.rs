//! Order placement transaction.
//!
//! Converts a cart into an order + payment + frozen line snapshots, adjusts
//! inventory, and empties the cart, as one atomic unit of work. Stock is
//! re-validated here with a conditional decrement even though add/update
//! already checked it: those checks ran in earlier, now-stale transactions,
//! and two checkouts racing on the last unit must have exactly one winner.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use pomelo_core::{AddressId, Email, OrderStatus, PaymentMethod};

use crate::cart::remove_line_in_tx;
use crate::error::CommerceError;
use crate::models::{NewOrder, NewOrderLine, NewPayment};
use crate::store::CommerceStore;
use crate::views::OrderView;

/// Checkout operations for the API layer.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn CommerceStore>,
}

impl OrderService {
    /// Create a new order service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>) -> Self {
        Self { store }
    }

    /// Place an order from the buyer's cart.
    ///
    /// Within one transaction: resolves the cart and address, snapshots the
    /// cart total into an accepted order with its payment record, freezes
    /// each cart line into an order line, decrements stock per line, and
    /// clears the cart through the same accounting as a user-initiated
    /// removal. Either all of it commits or none of it does.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::InvalidPaymentMethod`] if the method string is
    ///   shorter than four characters
    /// - [`CommerceError::CartNotFound`] if the buyer has no cart
    /// - [`CommerceError::AddressNotFound`] if the address does not exist
    /// - [`CommerceError::EmptyCart`] if the cart has zero lines
    /// - [`CommerceError::InsufficientStock`] if any line's quantity no
    ///   longer fits the product's stock at commit time
    #[instrument(skip(self), fields(buyer = %email))]
    pub async fn place_order(
        &self,
        email: &Email,
        address_id: AddressId,
        payment_method: &str,
    ) -> Result<OrderView, CommerceError> {
        let method = PaymentMethod::parse(payment_method)?;

        let mut tx = self.store.begin().await?;

        let cart = tx
            .cart_for_email(email)
            .await?
            .ok_or_else(|| CommerceError::CartNotFound(email.to_string()))?;

        let address = tx
            .address(address_id)
            .await?
            .ok_or(CommerceError::AddressNotFound(address_id))?;

        let cart_lines = tx.cart_lines(cart.id).await?;
        if cart_lines.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let order = tx
            .insert_order(&NewOrder {
                email: email.clone(),
                order_date: Utc::now().date_naive(),
                total_amount: cart.total_price,
                status: OrderStatus::Accepted,
                address_id,
            })
            .await?;

        let payment = tx
            .insert_payment(&NewPayment {
                order_id: order.id,
                method,
            })
            .await?;

        // Freeze quantity and price from the cart lines, not the products:
        // later catalog changes must never be observable through this order.
        let new_lines: Vec<NewOrderLine> = cart_lines
            .iter()
            .map(|line| NewOrderLine {
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                ordered_product_price: line.price,
            })
            .collect();
        let order_lines = tx.insert_order_lines(&new_lines).await?;

        for line in &cart_lines {
            let decremented = tx.decrement_stock(line.product_id, line.quantity).await?;
            if !decremented {
                // Returning drops the transaction: the order, payment, and
                // line rows above are rolled back with it.
                let product = tx
                    .product(line.product_id)
                    .await?
                    .ok_or(CommerceError::ProductNotFound(line.product_id))?;
                return Err(CommerceError::InsufficientStock {
                    product: product.name,
                    requested: line.quantity,
                    available: product.stock_quantity,
                });
            }
        }

        // Clear the cart with the same accounting as a standalone removal.
        let mut current = cart;
        for line in &cart_lines {
            let (_, total) = remove_line_in_tx(tx.as_mut(), &current, line.product_id).await?;
            current.total_price = total;
        }

        let view = OrderView::compose(order, &payment, address, &order_lines);
        tx.commit().await?;

        tracing::info!(
            order_id = %view.id,
            total = %view.total_amount,
            lines = view.lines.len(),
            "order placed"
        );
        Ok(view)
    }
}
