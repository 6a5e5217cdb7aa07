//! Cart store port and its in-memory `moka` adapter.
//!
//! The store holds one whole [`Cart`] record per owner. Writes are
//! conditional: the caller passes the cart it read, and the write only lands
//! if the stored version still matches that cart's version.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use thiserror::Error;

use sneakersku_core::{Cart, UserId};

/// Errors raised by cart store adapters.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// The cache backend could not be reached or refused the write.
    #[error("cart store unavailable: {0}")]
    Unavailable(String),

    /// The stored cart changed since it was read.
    #[error("cart version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },
}

/// Port for the key-value cache that holds carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Read the owner's cart, if one is stored.
    async fn get(&self, owner: &UserId) -> Result<Option<Cart>, CartStoreError>;

    /// Write `cart` if the stored version equals `cart.version()` (absent counts
    /// as version 0). Returns the new stored version.
    async fn set(&self, owner: &UserId, cart: &Cart) -> Result<u64, CartStoreError>;

    /// Remove the owner's cart. Removing an absent cart succeeds.
    async fn delete(&self, owner: &UserId) -> Result<(), CartStoreError>;

    /// Remove the owner's cart only if it is still at `version`. Removing an
    /// absent cart succeeds.
    async fn delete_if(&self, owner: &UserId, version: u64) -> Result<(), CartStoreError>;
}

/// In-process cart store backed by a `moka` cache.
///
/// Carts that are neither read nor written for `idle_ttl` expire. The cache
/// itself never evicts for size: once roughly `max_carts` carts are live,
/// writes that would create a new cart fail with
/// [`CartStoreError::Unavailable`] and existing carts keep working.
#[derive(Clone)]
pub struct MokaCartStore {
    cache: Cache<UserId, Cart>,
    max_carts: u64,
}

impl MokaCartStore {
    #[must_use]
    pub fn new(max_carts: u64, idle_ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_idle(idle_ttl).build();

        Self { cache, max_carts }
    }
}

#[async_trait]
impl CartStore for MokaCartStore {
    async fn get(&self, owner: &UserId) -> Result<Option<Cart>, CartStoreError> {
        Ok(self.cache.get(owner).await)
    }

    async fn set(&self, owner: &UserId, cart: &Cart) -> Result<u64, CartStoreError> {
        let expected = cart.version();
        let next = expected + 1;
        let mut stored = cart.clone();
        stored.mark_persisted(next);
        let full = self.cache.entry_count() >= self.max_carts;

        // and_compute_with holds the per-key lock for the whole compare-and-swap.
        let result = self
            .cache
            .entry(owner.clone())
            .and_compute_with(|current| {
                let op = match current {
                    None if full => Op::Nop,
                    None if expected == 0 => Op::Put(stored),
                    Some(entry) if entry.value().version() == expected => Op::Put(stored),
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Inserted(_) | CompResult::ReplacedWith(_) => Ok(next),
            CompResult::Unchanged(entry) => Err(CartStoreError::VersionConflict {
                expected,
                found: entry.value().version(),
            }),
            CompResult::StillNone(_) if expected == 0 => Err(CartStoreError::Unavailable(
                format!("cart capacity of {} reached", self.max_carts),
            )),
            _ => Err(CartStoreError::VersionConflict { expected, found: 0 }),
        }
    }

    async fn delete(&self, owner: &UserId) -> Result<(), CartStoreError> {
        self.cache.invalidate(owner).await;
        Ok(())
    }

    async fn delete_if(&self, owner: &UserId, version: u64) -> Result<(), CartStoreError> {
        let result = self
            .cache
            .entry(owner.clone())
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().version() == version => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Unchanged(entry) => Err(CartStoreError::VersionConflict {
                expected: version,
                found: entry.value().version(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use sneakersku_core::{Money, NewCartLine, ProductId};

    use super::*;

    fn store() -> MokaCartStore {
        MokaCartStore::new(100, Duration::from_secs(60))
    }

    fn cart_with_item(owner: &UserId) -> Cart {
        let now = Utc::now();
        let mut cart = Cart::new(owner.clone(), now);
        cart.add_line(
            NewCartLine {
                product_id: ProductId::new(1),
                variant_key: "42-red".to_string(),
                quantity: 1,
                unit_price: Money::from_units(100),
                display_name: "Air Runner - 42-red".to_string(),
            },
            now,
        )
        .unwrap();
        cart
    }

    #[tokio::test]
    async fn test_get_absent_cart() {
        let store = store();
        assert!(store.get(&UserId::new("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_write_creates_version_one() {
        let store = store();
        let owner = UserId::new("user-1");
        let cart = cart_with_item(&owner);

        assert_eq!(store.set(&owner, &cart).await.unwrap(), 1);
        let stored = store.get(&owner).await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.total(), Money::from_units(100));
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let store = store();
        let owner = UserId::new("user-1");
        let cart = cart_with_item(&owner);
        store.set(&owner, &cart).await.unwrap();

        // Second writer still holds the version-0 copy.
        let err = store.set(&owner, &cart).await.unwrap_err();
        assert!(matches!(
            err,
            CartStoreError::VersionConflict {
                expected: 0,
                found: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_write_after_delete_with_old_version_conflicts() {
        let store = store();
        let owner = UserId::new("user-1");
        let mut cart = cart_with_item(&owner);
        let version = store.set(&owner, &cart).await.unwrap();
        cart.mark_persisted(version);

        store.delete(&owner).await.unwrap();
        let err = store.set(&owner, &cart).await.unwrap_err();
        assert!(matches!(err, CartStoreError::VersionConflict { found: 0, .. }));
    }

    #[tokio::test]
    async fn test_conditional_delete_keeps_a_changed_cart() {
        let store = store();
        let owner = UserId::new("user-1");
        let mut cart = cart_with_item(&owner);
        let read_version = store.set(&owner, &cart).await.unwrap();
        cart.mark_persisted(read_version);
        store.set(&owner, &cart).await.unwrap();

        let err = store.delete_if(&owner, read_version).await.unwrap_err();
        assert!(matches!(
            err,
            CartStoreError::VersionConflict {
                expected: 1,
                found: 2
            }
        ));
        assert!(store.get(&owner).await.unwrap().is_some());

        store.delete_if(&owner, 2).await.unwrap();
        assert!(store.get(&owner).await.unwrap().is_none());
        store.delete_if(&owner, 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_acknowledged_writes_are_kept_past_capacity() {
        let store = MokaCartStore::new(4, Duration::from_secs(60));
        let mut accepted = Vec::new();
        for n in 0..50 {
            let owner = UserId::new(format!("user-{n}"));
            let result = store.set(&owner, &cart_with_item(&owner)).await;
            store.cache.run_pending_tasks().await;
            match result {
                Ok(_) => accepted.push(owner),
                Err(err) => assert!(matches!(err, CartStoreError::Unavailable(_))),
            }
        }

        assert!(accepted.len() >= 4);
        assert!(accepted.len() < 50, "capacity was never enforced");
        for owner in &accepted {
            assert!(
                store.get(owner).await.unwrap().is_some(),
                "acknowledged cart for {owner} is gone"
            );
        }
    }

    #[tokio::test]
    async fn test_full_store_still_updates_existing_carts() {
        let store = MokaCartStore::new(1, Duration::from_secs(60));
        let owner = UserId::new("user-1");
        let mut cart = cart_with_item(&owner);
        let version = store.set(&owner, &cart).await.unwrap();
        cart.mark_persisted(version);
        store.cache.run_pending_tasks().await;

        assert_eq!(store.set(&owner, &cart).await.unwrap(), 2);
        let other = UserId::new("user-2");
        assert!(matches!(
            store.set(&other, &cart_with_item(&other)).await,
            Err(CartStoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store();
        let owner = UserId::new("user-1");
        store.delete(&owner).await.unwrap();
        store.delete(&owner).await.unwrap();
        assert!(store.get(&owner).await.unwrap().is_none());
    }
}
