use serde::{Deserialize, Serialize};

use lavka_cart::Cart;
use lavka_catalog::ProductId;
use lavka_core::{DomainError, DomainResult};

/// Recipient details collected on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl CustomerDetails {
    pub fn new(name: impl Into<String>, email: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            address: address.into(),
        }
    }

    /// Every field is required; the email needs a local part and a domain.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if self.address.trim().is_empty() {
            return Err(DomainError::validation("customer address is required"));
        }

        let email = self.email.trim();
        if email.is_empty() {
            return Err(DomainError::validation("customer email is required"));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
            _ => Err(DomainError::validation(format!("invalid email address: {email}"))),
        }
    }
}

/// One `{ product_id, quantity }` entry of an order payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Payload inserted into the backend's `orders` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderData {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_address: String,
    pub products: Vec<OrderLineRequest>,
    /// Cart total, in smallest currency unit.
    pub total_price: u64,
}

impl OrderData {
    /// Build the payload from the cart as it stands, in line order.
    pub fn from_cart(customer: &CustomerDetails, cart: &Cart) -> Self {
        Self {
            customer_name: customer.name.trim().to_string(),
            customer_email: customer.email.trim().to_string(),
            customer_address: customer.address.trim().to_string(),
            products: cart
                .lines()
                .iter()
                .map(|line| OrderLineRequest {
                    product_id: line.product.id.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            total_price: cart.total(),
        }
    }

    pub fn item_count(&self) -> u64 {
        self.products.iter().map(|p| u64::from(p.quantity)).sum()
    }
}
