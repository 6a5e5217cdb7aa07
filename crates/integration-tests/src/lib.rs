//! Integration test harness for Sneakersku.
//!
//! Drives the real axum router end-to-end with in-memory collaborators in
//! place of `PostgreSQL`, so the suite runs without any external services.
//!
//! ```bash
//! cargo test -p sneakersku-integration-tests
//! ```
//!
//! Seeded data:
//!
//! | Product | Name       | Base | Variants                         |
//! |---------|------------|------|----------------------------------|
//! | 1       | Air Runner | 100  | `42-red` (+0), `44-blue` (+20)   |
//! | 2       | Court Low  | 40   | `M` (+10)                        |
//!
//! Addresses 1 and 2 belong to `user-1` and `user-2`. Tokens are
//! [`USER_1_TOKEN`], [`USER_2_TOKEN`] and [`ADMIN_TOKEN`].

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use sneakersku_api::config::CartConfig;
use sneakersku_api::services::{
    AuthError, AuthGate, CartStore, CartStoreError, CatalogError, CatalogReader, Identity,
    MokaCartStore, OrderStore, OrderStoreError,
};
use sneakersku_api::state::{AppState, Collaborators};
use sneakersku_core::{
    Address, AddressId, Cart, CartSnapshot, Money, NewOrder, Order, OrderId, Product, ProductId,
    Role, UserId, Variant,
};

pub const USER_1_TOKEN: &str = "token-user-1";
pub const USER_2_TOKEN: &str = "token-user-2";
pub const ADMIN_TOKEN: &str = "token-admin";

// =============================================================================
// Catalog
// =============================================================================

/// Catalog backed by a map. Prices can be changed mid-test.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: Mutex<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn insert(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }

    pub fn set_base_price(&self, id: ProductId, price: Money) {
        if let Some(product) = self.products.lock().unwrap().get_mut(&id) {
            product.base_price = price;
        }
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }
}

// =============================================================================
// Orders and addresses
// =============================================================================

/// Order store enforcing one order per cart snapshot, like the unique column.
#[derive(Default)]
pub struct InMemoryOrders {
    addresses: Mutex<Vec<Address>>,
    orders: Mutex<Vec<(CartSnapshot, Order)>>,
    next_id: AtomicI32,
    creates: AtomicU32,
}

impl InMemoryOrders {
    pub fn add_address(&self, id: i32, user_id: &str) {
        self.addresses.lock().unwrap().push(Address {
            id: AddressId::new(id),
            user_id: UserId::new(user_id),
            street: format!("Jl. Sudirman {id}"),
            phone: "+62 812 0000 0000".to_string(),
            label: "Home".to_string(),
            is_primary: true,
        });
    }

    /// All stored orders, oldest first.
    pub fn orders(&self) -> Vec<Order> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .map(|(_, order)| order.clone())
            .collect()
    }

    /// Number of `create_order` calls that inserted a new order.
    pub fn creates(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrders {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderId, OrderStoreError> {
        let mut orders = self.orders.lock().unwrap();
        if let Some((_, existing)) = orders.iter().find(|(s, _)| *s == order.snapshot) {
            return Ok(existing.id);
        }

        let id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        orders.push((
            order.snapshot,
            Order {
                id,
                user_id: order.user_id.clone(),
                address_id: order.address_id,
                total_amount: order.total_amount,
                line_items: order.line_items.clone(),
                created_at: Utc::now(),
            },
        ));
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn find_order_by_snapshot(
        &self,
        snapshot: &CartSnapshot,
    ) -> Result<Option<OrderId>, OrderStoreError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| s == snapshot)
            .map(|(_, order)| order.id))
    }

    async fn find_address(
        &self,
        id: AddressId,
        user_id: &UserId,
    ) -> Result<Option<Address>, OrderStoreError> {
        Ok(self
            .addresses
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id && &a.user_id == user_id)
            .cloned())
    }

    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<Order>, OrderStoreError> {
        let mut orders: Vec<Order> = self
            .orders()
            .into_iter()
            .filter(|order| &order.user_id == user_id)
            .collect();
        orders.reverse();
        Ok(orders)
    }

    async fn ping(&self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}

// =============================================================================
// Auth
// =============================================================================

/// Auth gate with a fixed token table.
pub struct StaticAuthGate {
    tokens: HashMap<String, Identity>,
}

impl Default for StaticAuthGate {
    fn default() -> Self {
        let identity = |user: &str, role| Identity {
            user_id: UserId::new(user),
            role,
        };
        let tokens = HashMap::from([
            (USER_1_TOKEN.to_string(), identity("user-1", Role::User)),
            (USER_2_TOKEN.to_string(), identity("user-2", Role::User)),
            (ADMIN_TOKEN.to_string(), identity("admin-1", Role::Admin)),
        ]);
        Self { tokens }
    }
}

#[async_trait]
impl AuthGate for StaticAuthGate {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

// =============================================================================
// Cart store with injectable faults
// =============================================================================

/// `MokaCartStore` that can be told to fail upcoming deletes or writes, or
/// to let another writer overwrite the cart just before a checkout delete.
pub struct FlakyCartStore {
    inner: MokaCartStore,
    failing_deletes: AtomicU32,
    failing_sets: AtomicU32,
    intruder: Mutex<Option<Cart>>,
}

impl Default for FlakyCartStore {
    fn default() -> Self {
        Self {
            inner: MokaCartStore::new(1_000, Duration::from_secs(3_600)),
            failing_deletes: AtomicU32::new(0),
            failing_sets: AtomicU32::new(0),
            intruder: Mutex::new(None),
        }
    }
}

impl FlakyCartStore {
    pub fn fail_next_deletes(&self, n: u32) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_sets(&self, n: u32) {
        self.failing_sets.store(n, Ordering::SeqCst);
    }

    /// Write `cart` over the stored one right before the next conditional
    /// delete, as a writer outside this process would.
    pub fn write_before_next_delete(&self, cart: Cart) {
        *self.intruder.lock().unwrap() = Some(cart);
    }

    /// The stored cart, bypassing the service.
    pub async fn stored(&self, owner: &str) -> Option<Cart> {
        self.inner.get(&UserId::new(owner)).await.unwrap()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl CartStore for FlakyCartStore {
    async fn get(&self, owner: &UserId) -> Result<Option<Cart>, CartStoreError> {
        self.inner.get(owner).await
    }

    async fn set(&self, owner: &UserId, cart: &Cart) -> Result<u64, CartStoreError> {
        if Self::take_failure(&self.failing_sets) {
            return Err(CartStoreError::Unavailable("injected set failure".to_string()));
        }
        self.inner.set(owner, cart).await
    }

    async fn delete(&self, owner: &UserId) -> Result<(), CartStoreError> {
        if Self::take_failure(&self.failing_deletes) {
            return Err(CartStoreError::Unavailable(
                "injected delete failure".to_string(),
            ));
        }
        self.inner.delete(owner).await
    }

    async fn delete_if(&self, owner: &UserId, version: u64) -> Result<(), CartStoreError> {
        if Self::take_failure(&self.failing_deletes) {
            return Err(CartStoreError::Unavailable(
                "injected delete failure".to_string(),
            ));
        }
        let intruder = self.intruder.lock().unwrap().take();
        if let Some(cart) = intruder {
            self.inner.set(owner, &cart).await?;
        }
        self.inner.delete_if(owner, version).await
    }
}

// =============================================================================
// Test context
// =============================================================================

/// A fully wired router plus handles on its collaborators.
pub struct TestContext {
    pub router: Router,
    pub state: AppState,
    pub catalog: Arc<InMemoryCatalog>,
    pub orders: Arc<InMemoryOrders>,
    pub carts: Arc<FlakyCartStore>,
}

impl TestContext {
    /// Seeded context with fast retries.
    pub fn new() -> Self {
        Self::with_config(&CartConfig {
            retry_base_delay: Duration::from_millis(1),
            io_timeout: Duration::from_secs(2),
            ..CartConfig::default()
        })
    }

    pub fn with_config(config: &CartConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::default());
        catalog.insert(product(1, "Air Runner", 100, &[("42-red", 0), ("44-blue", 20)]));
        catalog.insert(product(2, "Court Low", 40, &[("M", 10)]));

        let orders = Arc::new(InMemoryOrders::default());
        orders.add_address(1, "user-1");
        orders.add_address(2, "user-2");

        let carts = Arc::new(FlakyCartStore::default());

        let state = AppState::from_parts(
            config,
            Collaborators {
                catalog: catalog.clone(),
                orders: orders.clone(),
                cart_store: carts.clone(),
                auth: Arc::new(StaticAuthGate::default()),
            },
        );

        Self {
            router: sneakersku_api::app(state.clone()),
            state,
            catalog,
            orders,
            carts,
        }
    }

    /// Send a request and return the status and JSON body (`Null` if empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn add_item(
        &self,
        token: &str,
        shoe_id: i32,
        variant_key: &str,
        quantity: u32,
    ) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/cart/items",
            Some(token),
            Some(serde_json::json!({
                "shoe_id": shoe_id,
                "variant_key": variant_key,
                "quantity": quantity,
            })),
        )
        .await
    }

    pub async fn set_quantity(
        &self,
        token: &str,
        shoe_id: i32,
        variant_key: &str,
        quantity: u32,
    ) -> (StatusCode, Value) {
        self.request(
            Method::PUT,
            &format!("/cart/items/{shoe_id}/{variant_key}"),
            Some(token),
            Some(serde_json::json!({ "quantity": quantity })),
        )
        .await
    }

    pub async fn get_cart(&self, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, "/cart", Some(token), None).await
    }

    pub async fn checkout(&self, token: &str, address_id: i32) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/cart/checkout",
            Some(token),
            Some(serde_json::json!({ "address_id": address_id })),
        )
        .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a product with `(variant key, price adjustment)` pairs.
pub fn product(id: i32, name: &str, base_price: i64, variants: &[(&str, i64)]) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        base_price: Money::from_units(base_price),
        variants: variants
            .iter()
            .map(|(key, adjustment)| {
                (
                    (*key).to_string(),
                    Variant {
                        price_adjustment: Money::from_units(*adjustment),
                        quantity: 10,
                        image_url: None,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Read a money amount from JSON, whether encoded as a string or a number.
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a money value: {other}"),
    }
}

/// The stable error code of an error response.
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
