//! `lavka-core`: storefront domain building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no storage, no UI).

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::Aggregate;
pub use error::{DomainError, DomainResult};
pub use id::OrderId;
