//! `POST /api/webhooks/payments` - signed notifications from the payment provider.
//!
//! The raw body is verified before it is parsed. Verified notifications are always
//! acknowledged with 200, even when they change nothing, so the provider stops
//! redelivering them.

use super::{AppError, AppState};
use crate::{
    core::booking::{ConfirmOutcome, confirm_payment},
    payment::webhook::{SIGNATURE_HEADER, WebhookAction, parse_event, verify_signature},
};
use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

/// Handles one payment notification.
#[instrument(skip_all)]
pub async fn payment_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::bad_request("missing payment signature"))?;

    if let Err(e) = verify_signature(&state.webhook_secret, signature, &body, chrono::Utc::now().timestamp()) {
        warn!(error = %e, "Rejected payment notification");
        return Err(e.into());
    }

    match parse_event(&body)? {
        WebhookAction::ConfirmBooking {
            event_id,
            session_id,
            booking_id,
        } => {
            let outcome = confirm_payment(&state.db, &session_id, booking_id).await?;
            match outcome {
                ConfirmOutcome::Confirmed => info!(%event_id, booking_id, "Payment confirmed booking"),
                ConfirmOutcome::AlreadyConfirmed => info!(%event_id, booking_id, "Duplicate payment notification"),
                ConfirmOutcome::Ignored { reason } => warn!(%event_id, booking_id, %reason, "Payment notification ignored"),
            }
        }
        WebhookAction::Ignore { event_id, reason } => {
            info!(%event_id, %reason, "Payment notification acknowledged");
        }
    }

    Ok(Json(json!({ "received": true })))
}
