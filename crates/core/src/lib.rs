//! Sneakersku Core - Shared domain types.
//!
//! This crate provides the types shared by every Sneakersku component:
//! - `api` - Cart, checkout and order HTTP service
//! - `cli` - Command-line tools for migrations and token management
//! - `integration-tests` - End-to-end tests against in-memory collaborators
//!
//! # Architecture
//!
//! The core crate contains only types and pure cart arithmetic - no I/O, no
//! database access, no cache clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, money, roles, catalog products, carts and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
