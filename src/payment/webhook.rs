//! Signed payment notifications.
//!
//! The provider signs each notification with a shared secret. The signature header
//! has the form `t=<unix seconds>,v1=<hex>`, where the hex value is
//! HMAC-SHA256 over `"{t}.{raw body}"`. Notifications older or newer than
//! [`SIGNATURE_TOLERANCE_SECS`] are rejected to limit replay.

use super::BOOKING_ID_METADATA_KEY;
use crate::errors::{Error, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the notification signature.
pub const SIGNATURE_HEADER: &str = "payment-signature";

/// Maximum clock skew accepted between signing and receipt.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// The only event type that changes a booking.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidSignature {
        message: message.into(),
    }
}

fn mac_for(secret: &str, timestamp: i64, body: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Config {
            message: format!("unusable webhook secret: {e}"),
        })?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Builds the signature header value for `body` signed at `timestamp`.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> Result<String> {
    let signature = mac_for(secret, timestamp, body)?.finalize().into_bytes();
    Ok(format!("t={timestamp},v1={}", hex::encode(signature)))
}

/// Verifies a signature header against the raw body.
///
/// Any `v1` entry may match, which lets the provider roll secrets. Comparison is
/// constant time.
pub fn verify_signature(secret: &str, header: &str, body: &[u8], now: i64) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| invalid("timestamp is not a number"))?,
                );
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(invalid("missing v1 signature"));
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(invalid("timestamp outside tolerance"));
    }

    let expected = mac_for(secret, timestamp, body)?;
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| expected.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(invalid("no signature matched"))
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawSession {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

/// What the service should do with a verified notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// A checkout finished; the booking can be confirmed
    ConfirmBooking {
        /// Provider event ID, for logs
        event_id: String,
        /// Checkout session that completed
        session_id: String,
        /// Booking from the session metadata
        booking_id: i64,
    },
    /// Acknowledge and do nothing
    Ignore {
        /// Provider event ID, for logs
        event_id: String,
        /// Why nothing happens
        reason: String,
    },
}

/// Parses a verified notification body.
///
/// Unknown event types and completed checkouts without booking metadata are
/// ignored, never errors, so the provider does not keep redelivering them.
pub fn parse_event(body: &[u8]) -> Result<WebhookAction> {
    let event: RawEvent = serde_json::from_slice(body)
        .map_err(|e| Error::validation(format!("malformed payment event: {e}")))?;

    if event.event_type != CHECKOUT_COMPLETED {
        return Ok(WebhookAction::Ignore {
            reason: format!("event type {} is not handled", event.event_type),
            event_id: event.id,
        });
    }

    // Only a completed checkout's object is decoded; other shapes are never inspected
    let Some(object) = event.data.get("object").filter(|o| !o.is_null()).cloned() else {
        return Ok(WebhookAction::Ignore {
            event_id: event.id,
            reason: "checkout event carries no session".to_string(),
        });
    };
    let session: RawSession = serde_json::from_value(object)
        .map_err(|e| Error::validation(format!("malformed checkout session: {e}")))?;
    let Some(session_id) = session.id else {
        return Ok(WebhookAction::Ignore {
            event_id: event.id,
            reason: "checkout session has no id".to_string(),
        });
    };
    let metadata = session.metadata.unwrap_or_default();
    let Some(raw_booking_id) = metadata.get(BOOKING_ID_METADATA_KEY) else {
        return Ok(WebhookAction::Ignore {
            event_id: event.id,
            reason: format!("session {session_id} carries no booking id"),
        });
    };
    let booking_id = raw_booking_id.parse::<i64>().map_err(|_| {
        Error::validation(format!("booking id '{raw_booking_id}' is not numeric"))
    })?;

    Ok(WebhookAction::ConfirmBooking {
        event_id: event.id,
        session_id,
        booking_id,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_741_953_600;

    fn completed_body(booking_id: &str) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "metadata": { "booking_id": booking_id } } }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_signed_payload_verifies() {
        let body = completed_body("7");
        let header = sign_payload(SECRET, NOW, &body).unwrap();
        assert!(verify_signature(SECRET, &header, &body, NOW + 10).is_ok());
    }

    #[test]
    fn test_tampered_body_or_wrong_secret_fails() {
        let body = completed_body("7");
        let header = sign_payload(SECRET, NOW, &body).unwrap();

        let tampered = completed_body("8");
        assert!(matches!(
            verify_signature(SECRET, &header, &tampered, NOW),
            Err(Error::InvalidSignature { .. })
        ));
        assert!(verify_signature("whsec_other", &header, &body, NOW).is_err());
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let body = completed_body("7");
        let header = sign_payload(SECRET, NOW, &body).unwrap();
        assert!(verify_signature(SECRET, &header, &body, NOW + SIGNATURE_TOLERANCE_SECS + 1).is_err());
        assert!(verify_signature(SECRET, &header, &body, NOW + SIGNATURE_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_malformed_headers_fail() {
        let body = completed_body("7");
        assert!(verify_signature(SECRET, "", &body, NOW).is_err());
        assert!(verify_signature(SECRET, "t=abc,v1=00", &body, NOW).is_err());
        assert!(verify_signature(SECRET, &format!("t={NOW}"), &body, NOW).is_err());
        assert!(verify_signature(SECRET, &format!("t={NOW},v1=zz"), &body, NOW).is_err());
    }

    #[test]
    fn test_any_v1_entry_may_match() {
        let body = completed_body("7");
        let good = sign_payload(SECRET, NOW, &body).unwrap();
        let good_sig = good.split_once(",v1=").unwrap().1;
        let header = format!("t={NOW},v1=deadbeef,v1={good_sig}");
        assert!(verify_signature(SECRET, &header, &body, NOW).is_ok());
    }

    #[test]
    fn test_parse_completed_event() {
        let action = parse_event(&completed_body("42")).unwrap();
        assert_eq!(
            action,
            WebhookAction::ConfirmBooking {
                event_id: "evt_1".to_string(),
                session_id: "cs_1".to_string(),
                booking_id: 42,
            }
        );
    }

    #[test]
    fn test_other_events_are_ignored() {
        let body = serde_json::json!({
            "id": "evt_2",
            "type": "checkout.session.expired",
            "data": { "object": { "id": "cs_1" } }
        })
        .to_string();
        assert!(matches!(
            parse_event(body.as_bytes()).unwrap(),
            WebhookAction::Ignore { .. }
        ));

        let no_metadata = serde_json::json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1" } }
        })
        .to_string();
        assert!(matches!(
            parse_event(no_metadata.as_bytes()).unwrap(),
            WebhookAction::Ignore { .. }
        ));
    }

    #[test]
    fn test_unhandled_events_are_ignored_whatever_their_object() {
        let bodies = [
            serde_json::json!({
                "type": "invoice.paid",
                "data": { "object": { "id": "in_1", "metadata": null } }
            }),
            serde_json::json!({
                "id": "evt_4",
                "type": "customer.created",
                "data": { "object": { "id": "cus_1", "metadata": { "n": 1 } } }
            }),
            serde_json::json!({
                "id": "evt_5",
                "type": "account.updated",
                "data": { "object": { "id": 42 } }
            }),
            serde_json::json!({ "id": "evt_6", "type": "ping" }),
        ];

        for body in bodies {
            let action = parse_event(body.to_string().as_bytes()).unwrap();
            assert!(matches!(action, WebhookAction::Ignore { .. }), "{body}");
        }
    }

    #[test]
    fn test_completed_event_with_null_metadata_is_ignored() {
        let body = serde_json::json!({
            "id": "evt_7",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "metadata": null } }
        })
        .to_string();
        assert!(matches!(
            parse_event(body.as_bytes()).unwrap(),
            WebhookAction::Ignore { .. }
        ));
    }

    #[test]
    fn test_malformed_event_is_validation_error() {
        assert!(matches!(parse_event(b"not json"), Err(Error::Validation { .. })));
        assert!(matches!(
            parse_event(&completed_body("abc")),
            Err(Error::Validation { .. })
        ));
    }
}
