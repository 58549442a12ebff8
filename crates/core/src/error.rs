//! Errors for malformed storefront input.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejected input: a shopper-supplied field, a query parameter or a catalog
/// record that does not hold together.
///
/// Storage and transport failures live next to the ports that produce them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    /// Ids that are blank or fail to parse.
    #[error("bad id: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
