//! Order backend port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use lavka_core::OrderId;

use crate::order::OrderData;

/// The backend did not accept the order. Always safe to retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderSubmissionError {
    #[error("order backend unavailable: {0}")]
    Unavailable(String),

    #[error("order rejected by backend: {0}")]
    Rejected(String),
}

/// Inserts orders into the backend's `orders` resource.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit_order(&self, order: &OrderData) -> Result<OrderId, OrderSubmissionError>;
}

#[async_trait]
impl<G> OrderGateway for Arc<G>
where
    G: OrderGateway + ?Sized,
{
    async fn submit_order(&self, order: &OrderData) -> Result<OrderId, OrderSubmissionError> {
        (**self).submit_order(order).await
    }
}

/// In-memory order backend for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderGateway {
    orders: Mutex<Vec<(OrderId, OrderData)>>,
    failing: AtomicBool,
}

impl InMemoryOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent submissions fail with [`OrderSubmissionError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Accepted orders, in submission order.
    pub fn orders(&self) -> Vec<(OrderId, OrderData)> {
        self.orders.lock().map(|orders| orders.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl OrderGateway for InMemoryOrderGateway {
    async fn submit_order(&self, order: &OrderData) -> Result<OrderId, OrderSubmissionError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(OrderSubmissionError::Unavailable("backend offline".to_string()));
        }

        let mut orders = self
            .orders
            .lock()
            .map_err(|_| OrderSubmissionError::Unavailable("order log lock poisoned".to_string()))?;
        let id = OrderId::new();
        orders.push((id, order.clone()));
        Ok(id)
    }
}
