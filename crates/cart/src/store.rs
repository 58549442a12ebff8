//! Session-scoped cart store.
//!
//! The store owns the session's [`Cart`], hydrates it from storage once on
//! creation, persists a snapshot after every change to the lines, and forwards
//! notices to the sink. Persistence failures are logged and contained here;
//! only [`CartError`] reaches callers.

use std::sync::Arc;

use chrono::Utc;

use lavka_catalog::{Product, ProductId};
use lavka_core::Aggregate;
use lavka_events::{Event, NotificationSink};

use crate::cart::{
    AddItem, Cart, CartCommand, CartError, CartEvent, CartLine, ClearCart, LoadCart, RemoveItem,
    UpdateQuantity,
};
use crate::snapshot::{self, DEFAULT_CART_KEY};
use crate::storage::SnapshotStorage;

pub struct CartStore<S> {
    cart: Cart,
    storage: S,
    key: String,
    sink: Arc<dyn NotificationSink>,
}

impl<S> core::fmt::Debug for CartStore<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CartStore")
            .field("cart", &self.cart)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<S: SnapshotStorage> CartStore<S> {
    /// Create the store and hydrate it from [`DEFAULT_CART_KEY`].
    pub fn open(storage: S, sink: Arc<dyn NotificationSink>) -> Self {
        Self::open_with_key(storage, DEFAULT_CART_KEY, sink)
    }

    /// Create the store and hydrate it from `key`.
    ///
    /// Never fails: an unreadable or incompatible snapshot leaves the cart
    /// empty.
    pub fn open_with_key(storage: S, key: impl Into<String>, sink: Arc<dyn NotificationSink>) -> Self {
        let mut store = Self {
            cart: Cart::empty(),
            storage,
            key: key.into(),
            sink,
        };
        store.hydrate();
        store
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn total(&self) -> u64 {
        self.cart.total()
    }

    pub fn count(&self) -> u64 {
        self.cart.count()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<Vec<CartEvent>, CartError> {
        self.dispatch(CartCommand::AddItem(AddItem {
            product: product.clone(),
            quantity,
            occurred_at: Utc::now(),
        }))
    }

    /// Removing an id that is not in the cart is not an error.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<Vec<CartEvent>, CartError> {
        self.dispatch(CartCommand::RemoveItem(RemoveItem {
            product_id: product_id.clone(),
            occurred_at: Utc::now(),
        }))
    }

    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) -> Result<Vec<CartEvent>, CartError> {
        self.dispatch(CartCommand::UpdateQuantity(UpdateQuantity {
            product_id: product_id.clone(),
            quantity,
            occurred_at: Utc::now(),
        }))
    }

    pub fn clear_cart(&mut self) -> Result<Vec<CartEvent>, CartError> {
        self.dispatch(CartCommand::ClearCart(ClearCart { occurred_at: Utc::now() }))
    }

    /// Replace the lines wholesale, without stock validation.
    pub fn load_cart(&mut self, lines: Vec<CartLine>) -> Result<Vec<CartEvent>, CartError> {
        self.dispatch(CartCommand::LoadCart(LoadCart {
            lines,
            occurred_at: Utc::now(),
        }))
    }

    /// Run a command against the cart, then persist and notify.
    ///
    /// On error the cart is untouched and nothing is written.
    pub fn dispatch(&mut self, command: CartCommand) -> Result<Vec<CartEvent>, CartError> {
        let before = self.cart.lines().to_vec();

        let events = match self.cart.execute(&command) {
            Ok(events) => events,
            Err(err) => {
                tracing::info!(error = %err, "cart command rejected");
                self.sink.notify(err.notice());
                return Err(err);
            }
        };

        if self.cart.lines() != before.as_slice() {
            self.persist();
        }

        for event in &events {
            tracing::debug!(
                namespace = event.namespace(),
                event_type = event.event_type(),
                total = self.cart.total(),
                count = self.cart.count(),
                "cart event applied"
            );
            if let Some(notice) = event.notice() {
                self.sink.notify(notice);
            }
        }

        Ok(events)
    }

    fn hydrate(&mut self) {
        let bytes = match self.storage.read(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to read cart snapshot; starting empty");
                return;
            }
        };

        let lines = match snapshot::decode(&bytes) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "discarding unreadable cart snapshot");
                return;
            }
        };

        let command = CartCommand::LoadCart(LoadCart {
            lines,
            occurred_at: Utc::now(),
        });
        match self.cart.execute(&command) {
            Ok(_) => tracing::debug!(
                key = %self.key,
                lines = self.cart.lines().len(),
                "hydrated cart from snapshot"
            ),
            Err(err) => tracing::warn!(key = %self.key, error = %err, "failed to load cart snapshot"),
        }
    }

    fn persist(&self) {
        let bytes = match snapshot::encode(self.cart.lines()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(key = %self.key, error = %err, "failed to encode cart snapshot");
                return;
            }
        };

        if let Err(err) = self.storage.write(&self.key, &bytes) {
            tracing::error!(
                key = %self.key,
                error = %err,
                "failed to persist cart snapshot; continuing in memory"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use lavka_catalog::Category;
    use lavka_events::{ChannelSink, NullSink, Severity, Subscription};

    fn product(id: &str, price: u64, stock: u32) -> Product {
        Product::new(id, format!("Product {id}"), Category::Consoles, price, stock)
    }

    fn open(storage: &Arc<InMemoryStorage>) -> (CartStore<Arc<InMemoryStorage>>, Subscription) {
        let sink = Arc::new(ChannelSink::new());
        let subscription = sink.subscribe();
        (CartStore::open(Arc::clone(storage), sink), subscription)
    }

    fn persisted(storage: &InMemoryStorage) -> Vec<CartLine> {
        snapshot::decode(&storage.get(DEFAULT_CART_KEY).unwrap()).unwrap()
    }

    #[test]
    fn add_then_overflow_scenario() {
        let storage = Arc::new(InMemoryStorage::new());
        let (mut store, notices) = open(&storage);
        let p1 = product("p1", 100, 2);

        store.add_item(&p1, 1).unwrap();
        assert_eq!((store.total(), store.count()), (100, 1));

        let err = store.add_item(&p1, 2).unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 2, .. }));
        assert_eq!((store.total(), store.count()), (100, 1));

        let notices = notices.drain();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].title, "Added to cart");
        assert_eq!(notices[1].severity, Severity::Destructive);
        assert_eq!(notices[1].description.as_deref(), Some("Only 2 units available"));
    }

    #[test]
    fn update_to_zero_empties_the_cart() {
        let storage = Arc::new(InMemoryStorage::new());
        let (mut store, _notices) = open(&storage);
        store.add_item(&product("p1", 100, 5), 2).unwrap();

        store.update_quantity(&ProductId::from("p1"), 0).unwrap();
        assert!(store.is_empty());
        assert_eq!((store.total(), store.count()), (0, 0));
        assert!(persisted(&storage).is_empty());
    }

    #[test]
    fn clear_after_two_products() {
        let storage = Arc::new(InMemoryStorage::new());
        let (mut store, notices) = open(&storage);
        store.add_item(&product("p1", 100, 5), 1).unwrap();
        store.add_item(&product("p2", 40, 5), 3).unwrap();

        store.clear_cart().unwrap();
        assert!(store.lines().is_empty());
        assert_eq!((store.total(), store.count()), (0, 0));
        assert_eq!(notices.drain().last().unwrap().title, "Cart cleared");
    }

    #[test]
    fn every_change_is_persisted() {
        let storage = Arc::new(InMemoryStorage::new());
        let (mut store, _notices) = open(&storage);

        store.add_item(&product("p1", 100, 5), 2).unwrap();
        assert_eq!(persisted(&storage), store.lines());

        store.update_quantity(&ProductId::from("p1"), 4).unwrap();
        assert_eq!(persisted(&storage)[0].quantity, 4);
        assert_eq!(storage.write_count(), 2);
    }

    #[test]
    fn noops_and_rejections_do_not_write() {
        let storage = Arc::new(InMemoryStorage::new());
        let (mut store, notices) = open(&storage);
        store.add_item(&product("p1", 100, 1), 1).unwrap();
        assert_eq!(storage.write_count(), 1);

        store.remove_item(&ProductId::from("ghost")).unwrap();
        store.update_quantity(&ProductId::from("ghost"), 3).unwrap();
        assert!(store.add_item(&product("p1", 100, 1), 1).is_err());

        assert_eq!(storage.write_count(), 1);
        // Removing a missing id still confirms to the shopper.
        assert!(notices.drain().iter().any(|n| n.title == "Removed from cart"));
    }

    #[test]
    fn hydrates_from_previous_session_without_writing_back() {
        let storage = Arc::new(InMemoryStorage::new());
        {
            let (mut store, _notices) = open(&storage);
            store.add_item(&product("p1", 100, 5), 2).unwrap();
            store.add_item(&product("p2", 10, 5), 1).unwrap();
        }
        let writes = storage.write_count();

        let (store, notices) = open(&storage);
        assert_eq!(store.lines().len(), 2);
        assert_eq!((store.total(), store.count()), (210, 3));
        assert_eq!(storage.write_count(), writes);
        assert!(notices.drain().is_empty());
    }

    #[test]
    fn hydration_trusts_stale_stock() {
        let storage = Arc::new(InMemoryStorage::new());
        let stale = vec![CartLine::new(product("p1", 100, 1), 3)];
        storage.insert(DEFAULT_CART_KEY, snapshot::encode(&stale).unwrap());

        let (store, _notices) = open(&storage);
        assert_eq!(store.lines(), stale.as_slice());
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_empty() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.insert(DEFAULT_CART_KEY, "{definitely not a cart");

        let (store, _notices) = open(&storage);
        assert!(store.is_empty());
        assert_eq!(store.cart().version(), 0);
    }

    #[test]
    fn unavailable_storage_never_breaks_the_cart() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.insert(DEFAULT_CART_KEY, "[]");
        storage.set_unavailable(true);

        let (mut store, _notices) = open(&storage);
        assert!(store.is_empty());

        store.add_item(&product("p1", 100, 5), 2).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn load_cart_round_trips_through_snapshot() {
        let storage = Arc::new(InMemoryStorage::new());
        let (mut store, _notices) = open(&storage);
        store.add_item(&product("p1", 100, 5), 2).unwrap();
        store.add_item(&product("p2", 15, 9), 7).unwrap();

        let restored = snapshot::decode(&snapshot::encode(store.lines()).unwrap()).unwrap();
        let mut other = CartStore::open_with_key(InMemoryStorage::new(), "other", Arc::new(NullSink));
        other.load_cart(restored).unwrap();

        assert_eq!(other.lines(), store.lines());
        assert_eq!(other.total(), store.total());
        assert_eq!(other.count(), store.count());
        assert_eq!(other.key(), "other");
        assert!(other.storage().get("other").is_some());
    }
}
