//! Cart aggregate manager.
//!
//! Owns one cart per buyer, its lines, and the stored running total, and
//! enforces the add/update/remove invariants:
//!
//! - at most one line per product (a second add must go through an update)
//! - no line ever exists with quantity <= 0
//! - the stored total always equals the sum of `price * quantity` over the
//!   lines once an operation settles
//! - stock is validated before any write in the unit of work
//!
//! Line prices are snapshots taken at add time. Every surviving quantity
//! update re-snapshots the line to the current product price - that resync
//! is load-bearing, not incidental - and price changes are otherwise only
//! propagated through [`reconcile_product_change`](CartService::reconcile_product_change).

use std::sync::Arc;

use tracing::instrument;

use pomelo_core::{CartId, Email, Money, ProductId};

use crate::error::CommerceError;
use crate::models::{Cart, CartLine, NewCartLine, Product};
use crate::store::{CommerceStore, StoreTx};
use crate::views::{CartLineView, CartView};

/// Cart operations for the API layer.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CommerceStore>,
}

impl CartService {
    /// Create a new cart service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>) -> Self {
        Self { store }
    }

    /// Add a product to the buyer's cart, creating the cart on first use.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::NegativeQuantity`] if `quantity < 1`
    /// - [`CommerceError::ProductNotFound`] if the product does not exist
    /// - [`CommerceError::DuplicateLine`] if the cart already holds a line
    ///   for this product
    /// - [`CommerceError::OutOfStock`] if the product has zero stock
    /// - [`CommerceError::InsufficientStock`] if `quantity` exceeds stock
    #[instrument(skip(self), fields(buyer = %email))]
    pub async fn add_to_cart(
        &self,
        email: &Email,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CommerceError> {
        if quantity < 1 {
            return Err(CommerceError::NegativeQuantity);
        }

        let mut tx = self.store.begin().await?;

        let cart = match tx.cart_for_email(email).await? {
            Some(cart) => cart,
            None => tx.create_cart(email).await?,
        };

        let product = tx
            .product(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        if tx.cart_line(cart.id, product_id).await?.is_some() {
            return Err(CommerceError::DuplicateLine {
                product: product.name,
            });
        }

        check_stock(&product, quantity)?;

        let line = tx
            .insert_cart_line(&NewCartLine {
                cart_id: cart.id,
                product_id,
                quantity,
                price: product.price,
            })
            .await?;

        let total = cart.total_price + line.line_total();
        tx.set_cart_total(cart.id, total).await?;

        let view = load_cart_view(
            tx.as_mut(),
            &Cart {
                total_price: total,
                ..cart
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(cart_id = %view.id, product_id = %product_id, quantity, "added product to cart");
        Ok(view)
    }

    /// Adjust the quantity of an existing line by a signed delta.
    ///
    /// A delta that brings the quantity to exactly zero removes the line.
    /// A surviving line is re-snapshotted to the current product price and
    /// the cart total is recomputed from its lines.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::CartNotFound`] if the buyer has no cart
    /// - [`CommerceError::ProductNotFound`] if the product does not exist
    /// - [`CommerceError::OutOfStock`] if the product has zero stock
    /// - [`CommerceError::LineNotFound`] if the cart holds no line for the
    ///   product
    /// - [`CommerceError::NegativeQuantity`] if the resulting quantity would
    ///   be negative
    /// - [`CommerceError::InsufficientStock`] if the resulting quantity
    ///   exceeds stock
    #[instrument(skip(self), fields(buyer = %email))]
    pub async fn update_line_quantity(
        &self,
        email: &Email,
        product_id: ProductId,
        delta: i32,
    ) -> Result<CartView, CommerceError> {
        let mut tx = self.store.begin().await?;

        let cart = tx
            .cart_for_email(email)
            .await?
            .ok_or_else(|| CommerceError::CartNotFound(email.to_string()))?;

        let product = tx
            .product(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        let line = tx
            .cart_line(cart.id, product_id)
            .await?
            .ok_or(CommerceError::LineNotFound { product_id })?;

        let new_quantity = line.quantity + delta;
        if new_quantity < 0 {
            return Err(CommerceError::NegativeQuantity);
        }

        let total = if new_quantity == 0 {
            // Equivalent to a removal; no stock check on the way out.
            let (_, total) = remove_line_in_tx(tx.as_mut(), &cart, product_id).await?;
            total
        } else {
            // Stock is checked against the new absolute quantity, not the
            // raw delta.
            check_stock(&product, new_quantity)?;

            tx.update_cart_line(line.id, new_quantity, product.price)
                .await?;

            // Full recompute rather than incremental adjustment, so the
            // stored total cannot drift from the lines.
            let total = recompute_total(tx.as_mut(), cart.id).await?;
            tx.set_cart_total(cart.id, total).await?;
            total
        };

        let view = load_cart_view(
            tx.as_mut(),
            &Cart {
                total_price: total,
                ..cart
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(cart_id = %view.id, product_id = %product_id, delta, new_quantity, "updated cart line");
        Ok(view)
    }

    /// Remove a product's line from a cart.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::CartNotFound`] if the cart does not exist
    /// - [`CommerceError::LineNotFound`] if the cart holds no line for the
    ///   product
    #[instrument(skip(self))]
    pub async fn remove_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<CartView, CommerceError> {
        let mut tx = self.store.begin().await?;

        let cart = tx
            .cart(cart_id)
            .await?
            .ok_or_else(|| CommerceError::CartNotFound(cart_id.to_string()))?;

        let (_, total) = remove_line_in_tx(tx.as_mut(), &cart, product_id).await?;

        let view = load_cart_view(
            tx.as_mut(),
            &Cart {
                total_price: total,
                ..cart
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(%cart_id, %product_id, "removed product from cart");
        Ok(view)
    }

    /// Re-price one cart's line for a product to the product's current
    /// price, adjusting the cart total accordingly.
    ///
    /// Invoked by the catalog propagation when a product price changes.
    /// Callers iterating over many carts should skip
    /// [`CommerceError::LineNotFound`] rather than treat it as a failure.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::CartNotFound`] if the cart does not exist
    /// - [`CommerceError::ProductNotFound`] if the product does not exist
    /// - [`CommerceError::LineNotFound`] if the cart holds no line for the
    ///   product
    #[instrument(skip(self))]
    pub async fn reconcile_product_change(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<CartView, CommerceError> {
        let mut tx = self.store.begin().await?;

        let cart = tx
            .cart(cart_id)
            .await?
            .ok_or_else(|| CommerceError::CartNotFound(cart_id.to_string()))?;

        let product = tx
            .product(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        let total = reprice_line_in_tx(tx.as_mut(), &cart, &product).await?;

        let view = load_cart_view(
            tx.as_mut(),
            &Cart {
                total_price: total,
                ..cart
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(%cart_id, %product_id, "reconciled cart line price");
        Ok(view)
    }

    /// Fetch a buyer's cart projection.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::CartNotFound`] unless a cart with this id
    /// exists *and* belongs to the given buyer.
    #[instrument(skip(self), fields(buyer = %email))]
    pub async fn get_cart(&self, email: &Email, cart_id: CartId) -> Result<CartView, CommerceError> {
        let mut tx = self.store.begin().await?;

        let cart = tx
            .cart_for_email_and_id(email, cart_id)
            .await?
            .ok_or_else(|| CommerceError::CartNotFound(cart_id.to_string()))?;

        let view = load_cart_view(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// List every cart in the system as a projection.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::NoCarts`] if zero carts exist - an
    /// informational condition for the caller, not a server fault.
    #[instrument(skip(self))]
    pub async fn list_carts(&self) -> Result<Vec<CartView>, CommerceError> {
        let mut tx = self.store.begin().await?;

        let carts = tx.all_carts().await?;
        if carts.is_empty() {
            return Err(CommerceError::NoCarts);
        }

        let mut views = Vec::with_capacity(carts.len());
        for cart in &carts {
            views.push(load_cart_view(tx.as_mut(), cart).await?);
        }
        tx.commit().await?;
        Ok(views)
    }
}

/// Reject an add/update whose target quantity the product cannot cover.
fn check_stock(product: &Product, quantity: i32) -> Result<(), CommerceError> {
    if product.stock_quantity == 0 {
        return Err(CommerceError::OutOfStock {
            product: product.name.clone(),
        });
    }
    if quantity > product.stock_quantity {
        return Err(CommerceError::InsufficientStock {
            product: product.name.clone(),
            requested: quantity,
            available: product.stock_quantity,
        });
    }
    Ok(())
}

/// Delete a cart's line for a product and subtract its contribution from the
/// cart total, returning the removed line and the new total.
///
/// The single accounting path for user-initiated removal, checkout clearing,
/// and product deletion.
pub(crate) async fn remove_line_in_tx(
    tx: &mut dyn StoreTx,
    cart: &Cart,
    product_id: ProductId,
) -> Result<(CartLine, Money), CommerceError> {
    let line = tx
        .cart_line(cart.id, product_id)
        .await?
        .ok_or(CommerceError::LineNotFound { product_id })?;

    let total = cart.total_price - line.line_total();
    tx.delete_cart_line(cart.id, product_id).await?;
    tx.set_cart_total(cart.id, total).await?;
    Ok((line, total))
}

/// Re-snapshot a cart's line for a product to the product's current price
/// and adjust the cart total for that line only, returning the new total.
pub(crate) async fn reprice_line_in_tx(
    tx: &mut dyn StoreTx,
    cart: &Cart,
    product: &Product,
) -> Result<Money, CommerceError> {
    let line = tx
        .cart_line(cart.id, product.id)
        .await?
        .ok_or(CommerceError::LineNotFound {
            product_id: product.id,
        })?;

    let total = cart.total_price - line.line_total() + product.price.times(line.quantity);
    tx.update_cart_line(line.id, line.quantity, product.price)
        .await?;
    tx.set_cart_total(cart.id, total).await?;
    Ok(total)
}

/// Sum of `price * quantity` over a cart's current lines.
async fn recompute_total(tx: &mut dyn StoreTx, cart_id: CartId) -> Result<Money, CommerceError> {
    let lines = tx.cart_lines(cart_id).await?;
    Ok(lines.iter().map(CartLine::line_total).sum())
}

/// Expand a cart into its line-level product view.
pub(crate) async fn load_cart_view(
    tx: &mut dyn StoreTx,
    cart: &Cart,
) -> Result<CartView, CommerceError> {
    let lines = tx.cart_lines(cart.id).await?;
    let mut line_views = Vec::with_capacity(lines.len());
    for line in lines {
        let product = tx
            .product(line.product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(line.product_id))?;
        line_views.push(CartLineView {
            product_id: line.product_id,
            name: product.name,
            unit_price: line.price,
            quantity: line.quantity,
            line_total: line.line_total(),
        });
    }

    Ok(CartView {
        id: cart.id,
        owner_email: cart.owner_email.clone(),
        total_price: cart.total_price,
        lines: line_views,
    })
}
