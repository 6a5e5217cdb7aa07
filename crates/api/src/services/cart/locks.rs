//! Per-owner mutual exclusion for cart read-modify-write cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use sneakersku_core::UserId;

/// Table size below which dead entries are not swept.
const MIN_SWEEP_LEN: usize = 64;

/// Hands out one async mutex per owner.
///
/// The table only holds weak references. A lock stays reachable while any
/// request holds or waits for it, so a second request for the same owner
/// always finds the same mutex; once nobody does, the entry is dead and is
/// swept the next time the table doubles in size.
#[derive(Clone, Default)]
pub struct OwnerLocks {
    table: Arc<Mutex<LockTable>>,
}

#[derive(Default)]
struct LockTable {
    locks: HashMap<UserId, Weak<AsyncMutex<()>>>,
    sweep_at: usize,
}

impl LockTable {
    fn lock_for(&mut self, owner: &UserId) -> Arc<AsyncMutex<()>> {
        if let Some(lock) = self.locks.get(owner).and_then(Weak::upgrade) {
            return lock;
        }

        if self.locks.len() >= self.sweep_at.max(MIN_SWEEP_LEN) {
            self.locks.retain(|_, lock| lock.strong_count() > 0);
            self.sweep_at = self.locks.len() * 2;
        }

        let lock = Arc::new(AsyncMutex::new(()));
        self.locks.insert(owner.clone(), Arc::downgrade(&lock));
        lock
    }
}

impl OwnerLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the owner's cart.
    pub async fn acquire(&self, owner: &UserId) -> OwnedMutexGuard<()> {
        let lock = self
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lock_for(owner);
        lock.lock_owned().await
    }

    /// Number of entries in the table, live or not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .locks
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_owner_is_serialized() {
        let locks = OwnerLocks::new();
        let owner = UserId::new("user-1");

        let guard = locks.acquire(&owner).await;
        let contended =
            tokio::time::timeout(Duration::from_millis(20), locks.acquire(&owner)).await;
        assert!(contended.is_err(), "second acquire should wait");

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(200), locks.acquire(&owner)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_owners_do_not_block() {
        let locks = OwnerLocks::new();
        let _first = locks.acquire(&UserId::new("user-1")).await;
        let second = tokio::time::timeout(
            Duration::from_millis(200),
            locks.acquire(&UserId::new("user-2")),
        )
        .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_held_locks_survive_table_growth() {
        let locks = OwnerLocks::new();
        let mut guards = Vec::new();
        for n in 0..200 {
            guards.push(locks.acquire(&UserId::new(format!("user-{n}"))).await);
        }

        for n in 0..200 {
            let owner = UserId::new(format!("user-{n}"));
            let second =
                tokio::time::timeout(Duration::from_millis(5), locks.acquire(&owner)).await;
            assert!(second.is_err(), "{owner} was acquired twice");
        }
    }

    #[tokio::test]
    async fn test_released_locks_are_swept() {
        let locks = OwnerLocks::new();
        for n in 0..1_000 {
            drop(locks.acquire(&UserId::new(format!("user-{n}"))).await);
        }

        assert!(locks.len() <= MIN_SWEEP_LEN, "table kept {} entries", locks.len());
    }
}
