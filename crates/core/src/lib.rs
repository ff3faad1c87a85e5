//! Pomelo Core - Shared domain types.
//!
//! This crate provides the common types used across all Pomelo components:
//! - `commerce` - The cart-to-order consistency engine
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access. The
//! optional `postgres` feature adds `sqlx` encode/decode support so the
//! newtypes can be bound and read directly in queries.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, money amounts,
//!   payment methods, and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
