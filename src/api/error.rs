//! HTTP error responses.
//!
//! Every handler returns `Result<_, AppError>`. Domain errors convert through
//! [`From<Error>`], which picks the status code and hides the detail of server-side
//! faults behind a generic message.

use crate::errors::{Error, ErrorKind};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    /// Logged for 5xx responses, never sent
    detail: Option<String>,
}

impl AppError {
    /// Creates an error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            detail: None,
        }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 500 with a generic message; `detail` is only logged.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "An internal error occurred",
            )
        }
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        if let Error::InvalidSignature { .. } = err {
            return Self::bad_request(err.to_string());
        }
        match err.kind() {
            ErrorKind::Validation => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", err.to_string())
            }
            ErrorKind::Conflict => Self::new(StatusCode::CONFLICT, "CONFLICT", err.to_string()),
            ErrorKind::Authorization if matches!(err, Error::Unauthenticated) => {
                Self::unauthorized(err.to_string())
            }
            ErrorKind::Authorization => Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
            ErrorKind::NotFound => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
            ErrorKind::Upstream => Self {
                detail: Some(err.to_string()),
                ..Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "A required service is unavailable, please try again",
                )
            },
            ErrorKind::Integrity => Self::internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                detail = self.detail.as_deref().unwrap_or_default(),
                "Request failed"
            );
        }

        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                Error::BookingConflict {
                    venue_id: 1,
                    event_date: NaiveDate::default(),
                    start_time: "09:00".to_string(),
                    end_time: "11:00".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (Error::Unauthenticated, StatusCode::UNAUTHORIZED),
            (Error::forbidden("no"), StatusCode::FORBIDDEN),
            (Error::not_found("Booking", 3), StatusCode::NOT_FOUND),
            (
                Error::InvalidSignature {
                    message: "bad".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Upstream {
                    service: "payment provider".to_string(),
                    message: "down".to_string(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (Error::integrity("broken"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::NoPricingRule {
                    venue_id: 1,
                    day_of_week: 0,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = AppError::from(Error::integrity("package 4 has price type 'per_hour'"));
        assert_eq!(err.to_string(), "[INTERNAL_SERVER_ERROR] An internal error occurred");
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
    }
}
