//! Checkout: cart → order payload → backend, then clear.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lavka_cart::{CartStore, SnapshotStorage};
use lavka_core::{DomainError, OrderId};
use lavka_events::{NotificationSink, Notice};

use crate::gateway::{OrderGateway, OrderSubmissionError};
use crate::order::{CustomerDetails, OrderData};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cannot check out an empty cart")]
    EmptyCart,

    #[error(transparent)]
    Validation(#[from] DomainError),

    /// The backend refused or could not be reached; the cart is intact.
    #[error("order submission failed: {0}")]
    Submission(#[from] OrderSubmissionError),
}

impl CheckoutError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Submission(_))
    }
}

/// What the shopper sees after a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub total_price: u64,
    pub item_count: u64,
}

pub struct Checkout<G> {
    gateway: G,
    sink: Arc<dyn NotificationSink>,
}

impl<G: OrderGateway> Checkout<G> {
    pub fn new(gateway: G, sink: Arc<dyn NotificationSink>) -> Self {
        Self { gateway, sink }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Submit the cart as an order.
    ///
    /// The cart is cleared only after the gateway accepted the order. Any
    /// failure leaves it exactly as it was so the shopper can retry.
    pub async fn submit<S: SnapshotStorage>(
        &self,
        store: &mut CartStore<S>,
        customer: &CustomerDetails,
    ) -> Result<OrderReceipt, CheckoutError> {
        if store.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        customer.validate()?;

        let order = OrderData::from_cart(customer, store.cart());

        let order_id = match self.gateway.submit_order(&order).await {
            Ok(order_id) => order_id,
            Err(err) => {
                tracing::warn!(error = %err, total_price = order.total_price, "order submission failed; cart preserved");
                self.sink
                    .notify(Notice::destructive("Order failed").with_description("Please try again"));
                return Err(err.into());
            }
        };

        tracing::info!(%order_id, total_price = order.total_price, lines = order.products.len(), "order submitted");

        if let Err(err) = store.clear_cart() {
            tracing::error!(%order_id, error = %err, "failed to clear cart after order");
        }
        self.sink
            .notify(Notice::info("Order placed").with_description("We will contact you shortly"));

        Ok(OrderReceipt {
            order_id,
            total_price: order.total_price,
            item_count: order.item_count(),
        })
    }
}
