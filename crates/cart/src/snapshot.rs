//! Cart snapshot codec.
//!
//! The snapshot is a bare JSON array of `{ "product": .., "quantity": .. }`
//! objects. There is no version field: anything that does not decode is
//! discarded by the caller.

use thiserror::Error;

use crate::cart::CartLine;

/// Storage key the cart snapshot lives under.
pub const DEFAULT_CART_KEY: &str = "tech-lavka-cart";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed cart snapshot: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode cart snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

pub fn encode(lines: &[CartLine]) -> Result<Vec<u8>, SnapshotError> {
    serde_json::to_vec(lines).map_err(SnapshotError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<CartLine>, SnapshotError> {
    serde_json::from_slice(bytes).map_err(SnapshotError::Decode)
}
