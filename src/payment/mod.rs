//! Payment collaborator - hosted checkout sessions and signed notifications.
//!
//! The booking orchestrator only needs one call, [`PaymentProvider::create_checkout_session`];
//! confirmation arrives later as a signed webhook handled by [`webhook`].

pub mod sandbox;
pub mod webhook;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use sandbox::SandboxPaymentProvider;

/// Metadata key carrying the booking identifier through the provider.
pub const BOOKING_ID_METADATA_KEY: &str = "booking_id";

/// What to charge and where to send the payer afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    /// Amount in minor units
    pub amount_cents: i64,
    /// Lowercase ISO currency code
    pub currency: String,
    /// Line-item description shown to the payer
    pub description: String,
    /// Redirect after a completed payment
    pub success_url: String,
    /// Redirect after an abandoned payment
    pub cancel_url: String,
    /// Reconciliation metadata echoed back in notifications
    pub metadata: BTreeMap<String, String>,
}

/// A checkout session opened by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session identifier
    pub id: String,
    /// Where to redirect the payer
    pub url: String,
}

/// Opens checkout sessions with an external payment service.
///
/// Implementations must not retry internally; a session may already exist when a
/// call fails.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a checkout session.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::Upstream`] when the provider is unavailable.
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;
}
