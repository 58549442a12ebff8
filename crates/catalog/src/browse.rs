//! Category-page browsing: price filter, sort, featured slice.
//!
//! Pure functions over already-fetched products; no provider calls.

use serde::{Deserialize, Serialize};

use lavka_core::DomainError;

use crate::product::Product;

/// How many products the home page features.
pub const FEATURED_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Name,
    PriceAsc,
    PriceDesc,
}

impl core::str::FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortOrder::Name),
            "price_asc" => Ok(SortOrder::PriceAsc),
            "price_desc" => Ok(SortOrder::PriceDesc),
            other => Err(DomainError::validation(format!("unknown sort order: {other}"))),
        }
    }
}

/// Inclusive price bounds, in smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u64,
    pub max: u64,
}

impl PriceRange {
    pub const ANY: PriceRange = PriceRange { min: 0, max: u64::MAX };

    pub fn new(min: u64, max: u64) -> Result<Self, DomainError> {
        if min > max {
            return Err(DomainError::validation(format!(
                "price range minimum {min} exceeds maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, price: u64) -> bool {
        (self.min..=self.max).contains(&price)
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::ANY
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseQuery {
    pub sort: SortOrder,
    pub price: PriceRange,
}

/// Filter by price, then sort. Sorting is stable, so equal keys keep the
/// provider's order.
pub fn browse(products: &[Product], query: &BrowseQuery) -> Vec<Product> {
    let mut selected: Vec<Product> = products
        .iter()
        .filter(|p| query.price.contains(p.price))
        .cloned()
        .collect();

    match query.sort {
        SortOrder::PriceAsc => selected.sort_by_key(|p| p.price),
        SortOrder::PriceDesc => selected.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOrder::Name => selected.sort_by_cached_key(|p| p.name.to_lowercase()),
    }

    selected
}

pub fn featured(products: &[Product]) -> &[Product] {
    &products[..products.len().min(FEATURED_LIMIT)]
}
