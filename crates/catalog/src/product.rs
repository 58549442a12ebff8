use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lavka_core::{DomainError, DomainResult};

/// Product identifier.
///
/// Opaque to the storefront: whatever string the catalog backend assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh time-ordered identifier, for seeding catalogs in dev/tests.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Fixed set of storefront categories.
///
/// The wire form is the backend's category slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "смартфоны")]
    Smartphones,
    #[serde(rename = "телевизоры")]
    Televisions,
    #[serde(rename = "приставки")]
    Consoles,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Smartphones, Category::Televisions, Category::Consoles];

    /// Backend slug, as used in URLs and in the `category` column.
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Smartphones => "смартфоны",
            Category::Televisions => "телевизоры",
            Category::Consoles => "приставки",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Smartphones => "Smartphones",
            Category::Televisions => "Televisions",
            Category::Consoles => "Consoles",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.slug())
    }
}

impl core::str::FromStr for Category {
    type Err = DomainError;

    /// Accepts the backend slug or the English name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.slug() == needle || c.display_name().to_lowercase() == needle)
            .ok_or_else(|| DomainError::validation(format!("unknown category: {s}")))
    }
}

/// Product record as supplied by the catalog backend.
///
/// Read-only from the cart's perspective: the cart keeps a snapshot of the
/// record taken when the product was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Price in smallest currency unit (e.g., kopecks).
    pub price: u64,
    pub category: Category,
    pub image_url: String,
    /// Units available for purchase.
    pub stock: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        category: Category,
        price: u64,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            category,
            image_url: String::new(),
            stock,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Reject records the storefront cannot display or sell.
    pub fn validate(&self) -> DomainResult<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(DomainError::invalid_id("ProductId: empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(())
    }

    /// Case-insensitive substring match over name and description.
    ///
    /// `needle` must already be lowercased.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}
