//! Unified error handling for the commerce engine.
//!
//! Business-rule and not-found violations are raised at the point of
//! detection, before any write in the surrounding unit of work. Store-level
//! failures abort the whole transaction; [`ErrorClass`] tells a caller
//! (typically a thin API layer) how to surface each failure.

use thiserror::Error;

use pomelo_core::{AddressId, PaymentMethodError, ProductId};

use crate::store::StoreError;

/// Errors surfaced by the cart, order, and catalog services.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// The referenced product does not exist.
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),

    /// No cart exists for the given buyer or cart id.
    #[error("No cart found for {0}")]
    CartNotFound(String),

    /// The referenced address does not exist.
    #[error("Address {0} does not exist")]
    AddressNotFound(AddressId),

    /// The cart holds no line for the given product.
    #[error("Product {product_id} is not in the cart")]
    LineNotFound {
        /// Product the caller referenced.
        product_id: ProductId,
    },

    /// The product has zero stock.
    #[error("{product} is not available")]
    OutOfStock {
        /// Product name for the caller-facing message.
        product: String,
    },

    /// The requested quantity exceeds the available stock.
    #[error(
        "Please order {product} in a quantity less than or equal to {available} (requested {requested})"
    )]
    InsufficientStock {
        /// Product name for the caller-facing message.
        product: String,
        /// Quantity the caller asked for.
        requested: i32,
        /// Stock currently available.
        available: i32,
    },

    /// A line for this product already exists; a second add must go through
    /// a quantity update instead.
    #[error("Product {product} already exists in the cart")]
    DuplicateLine {
        /// Product name for the caller-facing message.
        product: String,
    },

    /// A quantity adjustment would take the line below zero.
    #[error("The resulting quantity cannot be negative")]
    NegativeQuantity,

    /// Checkout was attempted on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A bulk listing found zero carts system-wide (informational).
    #[error("No cart exists")]
    NoCarts,

    /// The payment method string failed validation.
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(#[from] PaymentMethodError),

    /// Underlying store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Response class for a [`CommerceError`].
///
/// The HTTP layer is out of scope here, so instead of an `IntoResponse`
/// impl the engine exposes this classification for whichever surface sits
/// on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller referenced something that does not exist.
    NotFound,
    /// Caller-correctable business-rule violation.
    BadRequest,
    /// Not the caller's fault; safe to retry the whole operation.
    Transient,
    /// Server-side fault.
    Internal,
}

impl CommerceError {
    /// Classify this error for the surface layer.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::ProductNotFound(_)
            | Self::CartNotFound(_)
            | Self::AddressNotFound(_)
            | Self::LineNotFound { .. } => ErrorClass::NotFound,
            Self::OutOfStock { .. }
            | Self::InsufficientStock { .. }
            | Self::DuplicateLine { .. }
            | Self::NegativeQuantity
            | Self::EmptyCart
            | Self::NoCarts
            | Self::InvalidPaymentMethod(_) => ErrorClass::BadRequest,
            Self::Store(e) => {
                if e.is_transient() {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Internal
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_product_context() {
        let err = CommerceError::InsufficientStock {
            product: "Keyboard".to_owned(),
            requested: 5,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Please order Keyboard in a quantity less than or equal to 2 (requested 5)"
        );

        let err = CommerceError::DuplicateLine {
            product: "Keyboard".to_owned(),
        };
        assert_eq!(err.to_string(), "Product Keyboard already exists in the cart");
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(
            CommerceError::ProductNotFound(ProductId::new(1)).class(),
            ErrorClass::NotFound
        );
        assert_eq!(CommerceError::EmptyCart.class(), ErrorClass::BadRequest);
        assert_eq!(CommerceError::NoCarts.class(), ErrorClass::BadRequest);
        assert_eq!(
            CommerceError::Store(StoreError::NotFound).class(),
            ErrorClass::Internal
        );
    }
}
