//! Catalog query port.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::product::{Category, Product, ProductId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The backend could not be reached or refused the query.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the product catalog.
///
/// Listing and search results are ordered newest `created_at` first.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All products, optionally restricted to one category.
    async fn list(&self, category: Option<Category>) -> Result<Vec<Product>, CatalogError>;

    async fn get(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    /// Products whose name or description contains `term` (case-insensitive).
    ///
    /// A blank term yields no results.
    async fn search(&self, term: &str) -> Result<Vec<Product>, CatalogError>;
}

#[async_trait]
impl<P> CatalogProvider for Arc<P>
where
    P: CatalogProvider + ?Sized,
{
    async fn list(&self, category: Option<Category>) -> Result<Vec<Product>, CatalogError> {
        (**self).list(category).await
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        (**self).get(id).await
    }

    async fn search(&self, term: &str) -> Result<Vec<Product>, CatalogError> {
        (**self).search(term).await
    }
}

/// Newest first; ties broken by id so results are deterministic.
pub(crate) fn newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
