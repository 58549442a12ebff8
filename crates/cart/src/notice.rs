//! What the shopper gets told about cart operations.

use lavka_events::Notice;

use crate::cart::{CartError, CartEvent};

impl CartEvent {
    /// Confirmation notice for this event, if it warrants one.
    ///
    /// Quantity edits and hydration are silent.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            CartEvent::ItemAdded(e) => Some(
                Notice::info("Added to cart").with_description(format!("{} ({} pcs.)", e.product.name, e.added)),
            ),
            CartEvent::ItemRemoved(_) => Some(Notice::info("Removed from cart")),
            CartEvent::CartCleared(_) => Some(Notice::info("Cart cleared")),
            CartEvent::QuantityUpdated(_) | CartEvent::CartLoaded(_) => None,
        }
    }
}

impl CartError {
    pub fn notice(&self) -> Notice {
        match self {
            CartError::InsufficientStock { available, .. } => Notice::destructive("Not enough stock")
                .with_description(format!("Only {available} units available")),
            CartError::InvalidQuantity(_) => {
                Notice::destructive("Invalid quantity").with_description("Choose at least one unit")
            }
        }
    }
}
