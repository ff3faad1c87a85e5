//! Core types for Pomelo Commerce.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod payment;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use payment::{PaymentMethod, PaymentMethodError};
pub use status::OrderStatus;
