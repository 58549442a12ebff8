//! Shopping cart domain module.
//!
//! - [`Cart`]: the cart aggregate, implemented purely as deterministic domain
//!   logic (no IO).
//! - [`CartStore`]: owns one cart for a session, persists a snapshot after each
//!   change and forwards notices to a sink.
//! - [`SnapshotStorage`]: the durable key/value port behind the store, with
//!   in-memory and SQLite implementations.

pub mod cart;
pub mod config;
pub mod notice;
pub mod snapshot;
pub mod sqlite;
pub mod storage;
pub mod store;

pub use cart::{
    AddItem, Cart, CartCleared, CartCommand, CartError, CartEvent, CartLine, CartLoaded, ClearCart,
    ItemAdded, ItemRemoved, LoadCart, QuantityUpdated, RemoveItem, UpdateQuantity,
};
pub use config::{CartConfig, StorageBackend};
pub use snapshot::{DEFAULT_CART_KEY, SnapshotError};
pub use sqlite::SqliteStorage;
pub use storage::{InMemoryStorage, SnapshotStorage, StorageError};
pub use store::CartStore;
