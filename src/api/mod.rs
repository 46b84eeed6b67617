//! HTTP surface of the booking service.
//!
//! Handlers are thin: they extract the caller and the payload, call into
//! [`crate::core`], and shape the response. Request spans come from
//! `tower-http`'s `TraceLayer`.

pub mod bookings;
pub mod error;
pub mod extract;
pub mod venues;
pub mod webhooks;

use crate::{
    auth::{AuthUser, SessionProvider},
    config::settings::BookingSettings,
    payment::PaymentProvider,
};
use axum::{
    Json, Router, async_trait,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

pub use error::AppError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Checkout provider
    pub payment: Arc<dyn PaymentProvider>,
    /// Bearer-token resolver
    pub sessions: Arc<dyn SessionProvider>,
    /// Currency, redirect URLs and timeouts
    pub settings: Arc<BookingSettings>,
    /// Shared secret for payment notifications
    pub webhook_secret: Arc<str>,
}

/// The caller, if the request carried a known bearer token.
///
/// Missing, malformed and unknown tokens all yield `None`; handlers decide whether
/// a user is required.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<AuthUser>);

impl CurrentUser {
    /// The user, or [`crate::errors::Error::Unauthenticated`].
    pub fn require(&self) -> Result<&AuthUser, AppError> {
        crate::auth::require_user(self.0.as_ref()).map_err(AppError::from)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
        else {
            return Ok(Self(None));
        };

        let user = state.sessions.resolve(token).await?;
        match &user {
            Some(user) => debug!(user_id = %user.user_id, "Session resolved"),
            None => warn!("Unknown bearer token"),
        }
        Ok(Self(user))
    }
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/venues/:venue_id/quote", post(venues::quote))
        .route("/api/venues/:venue_id/availability", get(venues::availability))
        .route("/api/venues/:venue_id/packages", get(venues::packages))
        .route("/api/bookings", post(bookings::submit).get(bookings::list_mine))
        .route("/api/bookings/:booking_id", get(bookings::get_one))
        .route("/api/bookings/:booking_id/cancel", post(bookings::cancel))
        .route("/api/bookings/:booking_id/complete", post(bookings::complete))
        .route("/api/webhooks/payments", post(webhooks::payment_notification))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let (state, _payment, _venue) = setup_app_state().await.unwrap();
        let response = router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_token_is_anonymous() {
        let (state, _payment, _venue) = setup_app_state().await.unwrap();
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/bookings")
                    .header(AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
