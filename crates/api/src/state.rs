//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{ApiConfig, CartConfig};
use crate::db::PgStores;
use crate::services::{
    AuthGate, CartService, CartStore, CatalogReader, CheckoutService, MokaCartStore, OrderStore,
    OwnerLocks, RetryPolicy,
};

/// The backends the services are wired to.
///
/// Production uses [`PgStores`] and [`MokaCartStore`]; tests substitute
/// in-memory implementations.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogReader>,
    pub orders: Arc<dyn OrderStore>,
    pub cart_store: Arc<dyn CartStore>,
    pub auth: Arc<dyn AuthGate>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    carts: CartService,
    checkout: CheckoutService,
    orders: Arc<dyn OrderStore>,
    auth: Arc<dyn AuthGate>,
    retry: RetryPolicy,
}

impl AppState {
    /// Create the production state: `PostgreSQL` for catalog, orders and
    /// tokens, an in-process cache for carts.
    #[must_use]
    pub fn new(config: &ApiConfig, pool: PgPool) -> Self {
        let pg = Arc::new(PgStores::new(pool));
        let cart_store = Arc::new(MokaCartStore::new(
            config.cart.max_entries,
            config.cart.idle_ttl,
        ));

        Self::from_parts(
            &config.cart,
            Collaborators {
                catalog: pg.clone(),
                orders: pg.clone(),
                cart_store,
                auth: pg,
            },
        )
    }

    /// Wire the services to the given collaborators.
    #[must_use]
    pub fn from_parts(config: &CartConfig, collaborators: Collaborators) -> Self {
        let retry = RetryPolicy::from(config);
        let locks = OwnerLocks::new();
        let carts = CartService::new(
            collaborators.cart_store,
            collaborators.catalog,
            locks,
            config.io_timeout,
        );
        let checkout = CheckoutService::new(carts.clone(), collaborators.orders.clone(), retry);

        Self {
            inner: Arc::new(AppStateInner {
                carts,
                checkout,
                orders: collaborators.orders,
                auth: collaborators.auth,
                retry,
            }),
        }
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &dyn AuthGate {
        self.inner.auth.as_ref()
    }

    /// Retry policy for transient cart failures at the HTTP boundary.
    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        self.inner.retry
    }
}
