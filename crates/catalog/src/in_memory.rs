//! In-memory catalog for tests/dev.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use lavka_core::DomainResult;

use crate::product::{Category, Product, ProductId};
use crate::provider::{CatalogError, CatalogProvider, newest_first};

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from records, rejecting invalid ones.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> DomainResult<Self> {
        let catalog = Self::new();
        for product in products {
            catalog.upsert(product)?;
        }
        Ok(catalog)
    }

    /// Insert or replace a product (e.g. after a stock change upstream).
    pub fn upsert(&self, product: Product) -> DomainResult<()> {
        product.validate()?;
        if let Ok(mut map) = self.inner.write() {
            map.insert(product.id.clone(), product);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect(&self, keep: impl Fn(&Product) -> bool) -> Result<Vec<Product>, CatalogError> {
        let map = self
            .inner
            .read()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        let mut products: Vec<Product> = map.values().filter(|p| keep(*p)).cloned().collect();
        newest_first(&mut products);
        Ok(products)
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn list(&self, category: Option<Category>) -> Result<Vec<Product>, CatalogError> {
        self.collect(|p| category.is_none_or(|c| p.category == c))
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let map = self
            .inner
            .read()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        Ok(map.get(id).cloned())
    }

    async fn search(&self, term: &str) -> Result<Vec<Product>, CatalogError> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let results = self.collect(|p| p.matches(&needle))?;
        tracing::debug!(term = %needle, hits = results.len(), "catalog search");
        Ok(results)
    }
}
