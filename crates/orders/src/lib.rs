//! Order submission.
//!
//! Turns the cart into an [`OrderData`] payload, hands it to the external
//! [`OrderGateway`], and clears the cart only once the backend accepted it.

pub mod checkout;
pub mod gateway;
pub mod order;

pub use checkout::{Checkout, CheckoutError, OrderReceipt};
pub use gateway::{InMemoryOrderGateway, OrderGateway, OrderSubmissionError};
pub use order::{CustomerDetails, OrderData, OrderLineRequest};
