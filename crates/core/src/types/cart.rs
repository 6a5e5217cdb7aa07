//! Shopping cart domain type.
//!
//! A [`Cart`] is an ephemeral, per-owner collection of lines. It lives in the
//! cart cache, never in durable storage, and is consumed by checkout.
//!
//! # Invariants
//!
//! - Lines are unique by `(product_id, variant_key)`.
//! - Every stored line has `quantity >= 1`; setting a quantity to zero removes
//!   the line.
//! - `total` is derived from `lines` and is recomputed on every line change.
//!   There is no way to set it directly.
//! - Unit prices are snapshots taken when a line is first added and are never
//!   refreshed from the catalog afterwards.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{ProductId, UserId};
use super::money::Money;

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub variant_key: String,
    pub quantity: u32,
    /// Price per unit at the time the line was added.
    pub unit_price: Money,
    pub display_name: String,
}

impl CartLine {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    fn matches(&self, product_id: ProductId, variant_key: &str) -> bool {
        self.product_id == product_id && self.variant_key == variant_key
    }
}

/// Input for [`Cart::add_line`], priced by the caller from the catalog.
#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub product_id: ProductId,
    pub variant_key: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub display_name: String,
}

/// Returned when a quantity update names a line the cart does not have.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cart has no line for product {product_id} variant {variant_key}")]
pub struct CartLineMissing {
    pub product_id: ProductId,
    pub variant_key: String,
}

/// Returned when adding units would push a line past `u32::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("quantity for product {product_id} variant {variant_key} exceeds the line limit")]
pub struct QuantityOverflow {
    pub product_id: ProductId,
    pub variant_key: String,
}

/// Identifies one exact persisted state of a cart.
///
/// Checkout records this on the order so the same cart contents can never
/// be ordered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub cart_id: Uuid,
    pub version: u64,
}

impl fmt::Display for CartSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.cart_id, self.version)
    }
}

/// A user's shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    owner_id: UserId,
    cart_id: Uuid,
    /// Number of successful writes to the cart store. Zero until first persisted.
    version: u64,
    lines: Vec<CartLine>,
    total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty, not yet persisted cart.
    #[must_use]
    pub fn new(owner_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            cart_id: Uuid::new_v4(),
            version: 0,
            lines: Vec::new(),
            total: Money::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub const fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    #[must_use]
    pub const fn cart_id(&self) -> Uuid {
        self.cart_id
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub const fn total(&self) -> Money {
        self.total
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Find the line for a product variant.
    #[must_use]
    pub fn line(&self, product_id: ProductId, variant_key: &str) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| line.matches(product_id, variant_key))
    }

    #[must_use]
    pub const fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            cart_id: self.cart_id,
            version: self.version,
        }
    }

    /// Add units of a product variant.
    ///
    /// If the variant is already in the cart its quantity is incremented and
    /// the originally snapshotted unit price is kept. A zero quantity is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityOverflow`] if the line quantity would exceed
    /// `u32::MAX`; the cart is left unchanged.
    pub fn add_line(
        &mut self,
        line: NewCartLine,
        now: DateTime<Utc>,
    ) -> Result<(), QuantityOverflow> {
        if line.quantity == 0 {
            return Ok(());
        }

        match self
            .lines
            .iter_mut()
            .find(|existing| existing.matches(line.product_id, &line.variant_key))
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or(
                    QuantityOverflow {
                        product_id: line.product_id,
                        variant_key: line.variant_key,
                    },
                )?;
            }
            None => self.lines.push(CartLine {
                product_id: line.product_id,
                variant_key: line.variant_key,
                quantity: line.quantity,
                unit_price: line.unit_price,
                display_name: line.display_name,
            }),
        }

        self.touch(now);
        Ok(())
    }

    /// Set the quantity of an existing line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartLineMissing`] if the cart has no such line; the cart is
    /// left unchanged.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        variant_key: &str,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), CartLineMissing> {
        let index = self
            .lines
            .iter()
            .position(|line| line.matches(product_id, variant_key))
            .ok_or_else(|| CartLineMissing {
                product_id,
                variant_key: variant_key.to_owned(),
            })?;

        if quantity == 0 {
            self.lines.remove(index);
        } else if let Some(line) = self.lines.get_mut(index) {
            line.quantity = quantity;
        }

        self.touch(now);
        Ok(())
    }

    /// What is left of this cart once `ordered` has been checked out.
    ///
    /// Each ordered quantity is subtracted from the matching line and emptied
    /// lines are dropped. The result keeps the stored version so it can be
    /// written over this cart, but gets a fresh cart id: its snapshot never
    /// matches the order that consumed the rest.
    #[must_use]
    pub fn remainder_after(&self, ordered: &[CartLine], now: DateTime<Utc>) -> Self {
        let mut rest = self.clone();
        rest.cart_id = Uuid::new_v4();
        rest.created_at = now;

        for taken in ordered {
            rest.lines.retain_mut(|line| {
                if line.matches(taken.product_id, &taken.variant_key) {
                    line.quantity = line.quantity.saturating_sub(taken.quantity);
                }
                line.quantity > 0
            });
        }

        rest.touch(now);
        rest
    }

    /// Record that the cart store accepted a write and now holds `version`.
    pub const fn mark_persisted(&mut self, version: u64) {
        self.version = version;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.total = self.lines.iter().map(CartLine::line_total).sum();
        self.updated_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId::new("user-1")
    }

    fn line(product: i32, variant: &str, quantity: u32, price: i64) -> NewCartLine {
        NewCartLine {
            product_id: ProductId::new(product),
            variant_key: variant.to_string(),
            quantity,
            unit_price: Money::from_units(price),
            display_name: format!("Shoe {product} - {variant}"),
        }
    }

    #[test]
    fn test_new_cart_is_empty_and_unpersisted() {
        let cart = Cart::new(owner(), Utc::now());
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::ZERO);
        assert_eq!(cart.version(), 0);
    }

    #[test]
    fn test_repeated_adds_accumulate_quantity() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(1, "42-red", 2, 100), now).unwrap();
        assert_eq!(cart.total(), Money::from_units(200));

        cart.add_line(line(1, "42-red", 1, 100), now).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(ProductId::new(1), "42-red").unwrap().quantity, 3);
        assert_eq!(cart.total(), Money::from_units(300));
    }

    #[test]
    fn test_existing_line_keeps_snapshot_price() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(1, "42-red", 1, 100), now).unwrap();
        // The catalog price changed, but the line keeps its original price.
        cart.add_line(line(1, "42-red", 1, 140), now).unwrap();

        let stored = cart.line(ProductId::new(1), "42-red").unwrap();
        assert_eq!(stored.unit_price, Money::from_units(100));
        assert_eq!(cart.total(), Money::from_units(200));
    }

    #[test]
    fn test_distinct_variants_are_separate_lines() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(1, "42-red", 1, 100), now).unwrap();
        cart.add_line(line(1, "43-red", 2, 110), now).unwrap();
        cart.add_line(line(2, "M", 1, 50), now).unwrap();

        assert_eq!(cart.lines().len(), 3);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.total(), Money::from_units(370));
    }

    #[test]
    fn test_set_quantity_to_zero_removes_line() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(1, "42-red", 3, 100), now).unwrap();

        cart.set_quantity(ProductId::new(1), "42-red", 0, now).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::ZERO);
    }

    #[test]
    fn test_set_quantity_replaces_quantity() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(2, "M", 1, 50), now).unwrap();

        cart.set_quantity(ProductId::new(2), "M", 4, now).unwrap();
        assert_eq!(cart.total(), Money::from_units(200));
    }

    #[test]
    fn test_set_quantity_on_missing_line_leaves_cart_untouched() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(2, "M", 1, 50), now).unwrap();
        let before = cart.clone();

        let err = cart
            .set_quantity(ProductId::new(2), "L", 1, now)
            .unwrap_err();
        assert_eq!(err.variant_key, "L");
        assert_eq!(cart, before);
    }

    #[test]
    fn test_zero_quantity_add_is_noop() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(1, "42-red", 0, 100), now).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_past_line_limit_is_rejected() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(1, "42-red", u32::MAX, 1), now).unwrap();
        let before = cart.clone();

        let err = cart.add_line(line(1, "42-red", 5, 1), now).unwrap_err();
        assert_eq!(err.variant_key, "42-red");
        assert_eq!(cart, before);
    }

    #[test]
    fn test_item_count_does_not_overflow() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(1, "42-red", u32::MAX, 1), now).unwrap();
        cart.add_line(line(2, "M", 1, 1), now).unwrap();

        assert_eq!(cart.item_count(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_remainder_keeps_only_units_added_after_the_order() {
        let now = Utc::now();
        let mut ordered = Cart::new(owner(), now);
        ordered.add_line(line(1, "42-red", 2, 100), now).unwrap();
        ordered.mark_persisted(3);

        // Another writer added one more 42-red and a new line.
        let mut current = ordered.clone();
        current.add_line(line(1, "42-red", 1, 100), now).unwrap();
        current.add_line(line(2, "M", 1, 50), now).unwrap();
        current.mark_persisted(4);

        let rest = current.remainder_after(ordered.lines(), now);
        assert_eq!(rest.line(ProductId::new(1), "42-red").unwrap().quantity, 1);
        assert_eq!(rest.line(ProductId::new(2), "M").unwrap().quantity, 1);
        assert_eq!(rest.total(), Money::from_units(150));
        assert_eq!(rest.version(), 4);
        assert_ne!(rest.cart_id(), current.cart_id());
    }

    #[test]
    fn test_remainder_of_fully_ordered_cart_is_empty() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        cart.add_line(line(2, "M", 2, 50), now).unwrap();

        assert!(cart.remainder_after(cart.lines(), now).is_empty());
    }

    #[test]
    fn test_snapshot_tracks_version() {
        let now = Utc::now();
        let mut cart = Cart::new(owner(), now);
        let first = cart.snapshot();
        cart.mark_persisted(1);
        let second = cart.snapshot();

        assert_eq!(first.cart_id, second.cart_id);
        assert_ne!(first, second);
        assert_eq!(second.to_string(), format!("{}:1", cart.cart_id()));
    }
}
