//! Product catalog (read-only from the storefront's point of view).
//!
//! Products are owned by an external backend. This crate defines the record
//! shape, the [`CatalogProvider`] port used to query it, an in-memory provider
//! for tests/dev, and the pure browse helpers used by category pages.

pub mod browse;
pub mod in_memory;
pub mod product;
pub mod provider;

pub use browse::{BrowseQuery, FEATURED_LIMIT, PriceRange, SortOrder, browse, featured};
pub use in_memory::InMemoryCatalog;
pub use product::{Category, Product, ProductId};
pub use provider::{CatalogError, CatalogProvider};
