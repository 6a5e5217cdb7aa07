//! Core types for Sneakersku.
//!
//! This module provides type-safe wrappers for the cart and checkout domain.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod money;
pub mod order;
pub mod role;

pub use cart::{Cart, CartLine, CartLineMissing, CartSnapshot, NewCartLine, QuantityOverflow};
pub use catalog::{Address, Product, Variant};
pub use id::*;
pub use money::Money;
pub use order::{NewOrder, Order, OrderLineItem};
pub use role::Role;
