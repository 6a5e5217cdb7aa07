//! Catalog and address records as seen by the cart.
//!
//! The catalog and the address book are owned by other parts of the system;
//! the cart only ever reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::{AddressId, ProductId, UserId};
use super::money::Money;

/// A purchasable configuration of a product (e.g., size 42 in red).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Amount added to the product's base price. Missing means no adjustment.
    #[serde(default)]
    pub price_adjustment: Money,
    /// Units currently in stock. Informational only; carts do not reserve stock.
    #[serde(default)]
    pub quantity: i32,
    /// Image for this variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A catalog product (a shoe) with its variants keyed by variant key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub base_price: Money,
    pub variants: BTreeMap<String, Variant>,
}

impl Product {
    /// Price of one unit of the given variant, or `None` if the variant does not exist.
    #[must_use]
    pub fn unit_price(&self, variant_key: &str) -> Option<Money> {
        self.variants
            .get(variant_key)
            .map(|variant| self.base_price + variant.price_adjustment)
    }

    /// Line label shown in the cart, e.g. "Air Runner - 42-red".
    #[must_use]
    pub fn display_name(&self, variant_key: &str) -> String {
        format!("{} - {variant_key}", self.name)
    }
}

/// A shipping address belonging to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub street: String,
    pub phone: String,
    pub label: String,
    pub is_primary: bool,
}
