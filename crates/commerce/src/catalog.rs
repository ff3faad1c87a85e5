//! Price/stock propagation into carts.
//!
//! The catalog collaborator owns product CRUD; this service is the hook it
//! calls so existing cart lines stay coherent when a product's price changes
//! or the product disappears. Both operations run the product write and the
//! cart fan-out inside a single transaction.

use std::sync::Arc;

use tracing::instrument;

use pomelo_core::{Money, ProductId};

use crate::cart::{remove_line_in_tx, reprice_line_in_tx};
use crate::error::CommerceError;
use crate::models::Product;
use crate::store::CommerceStore;

/// Catalog-facing propagation hooks.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CommerceStore>,
}

impl CatalogService {
    /// Create a new catalog service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>) -> Self {
        Self { store }
    }

    /// Apply a price/stock change to a product and re-price every cart line
    /// that references it.
    ///
    /// Order lines are deliberately untouched - they are frozen snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::ProductNotFound`] if the product does not
    /// exist.
    #[instrument(skip(self))]
    pub async fn product_updated(
        &self,
        product_id: ProductId,
        new_price: Money,
        new_stock: i32,
    ) -> Result<Product, CommerceError> {
        let mut tx = self.store.begin().await?;

        let product = tx
            .product(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        let updated = Product {
            price: new_price,
            stock_quantity: new_stock,
            ..product
        };
        tx.save_product(&updated).await?;

        let carts = tx.carts_holding_product(product_id).await?;
        let cart_count = carts.len();
        for cart in carts {
            match reprice_line_in_tx(tx.as_mut(), &cart, &updated).await {
                Ok(_) | Err(CommerceError::LineNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        tx.commit().await?;

        tracing::info!(%product_id, carts = cart_count, "propagated product update into carts");
        Ok(updated)
    }

    /// Remove a product from every cart that holds it, then delete the
    /// product row itself.
    ///
    /// Lines are removed first so no cart is left referencing a missing
    /// product and every cart total stays consistent with its lines.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::ProductNotFound`] if the product does not
    /// exist.
    #[instrument(skip(self))]
    pub async fn product_deleted(&self, product_id: ProductId) -> Result<Product, CommerceError> {
        let mut tx = self.store.begin().await?;

        let product = tx
            .product(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        let carts = tx.carts_holding_product(product_id).await?;
        let cart_count = carts.len();
        for cart in carts {
            match remove_line_in_tx(tx.as_mut(), &cart, product_id).await {
                Ok(_) | Err(CommerceError::LineNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        tx.delete_product(product_id).await?;
        tx.commit().await?;

        tracing::info!(%product_id, carts = cart_count, "removed deleted product from carts");
        Ok(product)
    }
}
