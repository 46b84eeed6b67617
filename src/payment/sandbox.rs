//! Sandbox payment provider for development and testing.
//!
//! Issues `cs_sandbox_<uuid>` sessions pointing at a configured checkout page. No
//! money moves; confirmation is simulated by posting a signed webhook.

use super::{CheckoutRequest, CheckoutSession, PaymentProvider};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Local stand-in for a hosted checkout service.
#[derive(Debug)]
pub struct SandboxPaymentProvider {
    checkout_base_url: String,
    failing: AtomicBool,
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl SandboxPaymentProvider {
    /// Creates a provider whose sessions live under `checkout_base_url`.
    pub fn new(checkout_base_url: impl Into<String>) -> Self {
        Self {
            checkout_base_url: checkout_base_url.into(),
            failing: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Makes every following call fail as if the provider were down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProvider for SandboxPaymentProvider {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        if self.failing.load(Ordering::SeqCst) {
            warn!(amount_cents = request.amount_cents, "Sandbox provider refusing checkout");
            return Err(Error::Upstream {
                service: "payment provider".to_string(),
                message: "sandbox is in failing mode".to_string(),
            });
        }

        let id = format!("cs_sandbox_{}", uuid::Uuid::new_v4().simple());
        let url = format!("{}/{id}", self.checkout_base_url.trim_end_matches('/'));
        info!(
            session_id = %id,
            amount_cents = request.amount_cents,
            currency = %request.currency,
            "Sandbox checkout session created"
        );
        self.requests.lock().await.push(request);
        Ok(CheckoutSession { id, url })
    }
}
