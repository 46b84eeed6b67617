//! Unified error type for the booking service.
//!
//! Every fallible operation in the crate returns [`Result`]. Variants carry the
//! context needed for a user-facing message; [`Error::kind`] folds them into the
//! coarse categories the HTTP layer maps to status codes.

use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;

/// Message raised by the storage-level overlap guard on `bookings`.
pub const BOOKING_OVERLAP_MARKER: &str = "booking_overlap";

/// All errors produced by the booking service.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input
    #[error("Invalid input: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// The requested time range overlaps an existing non-cancelled booking
    #[error("Venue {venue_id} is already booked on {event_date} between {start_time} and {end_time}")]
    BookingConflict {
        /// Venue the booking was requested for
        venue_id: i64,
        /// Event date of the requested booking
        event_date: NaiveDate,
        /// Requested start time (`HH:mm`)
        start_time: String,
        /// Requested end time (`HH:mm`)
        end_time: String,
    },

    /// No authenticated user was attached to the request
    #[error("Authentication required")]
    Unauthenticated,

    /// The authenticated user may not perform this operation
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why the operation was refused
        message: String,
    },

    /// A collaborator (payment provider, storage) was unavailable
    #[error("{service} unavailable: {message}")]
    Upstream {
        /// Name of the collaborator
        service: String,
        /// Underlying failure
        message: String,
    },

    /// Stored or supplied data violates an invariant the engine relies on
    #[error("Integrity error: {message}")]
    Integrity {
        /// Description of the broken invariant
        message: String,
    },

    /// The venue has no pricing rule for the requested day of week
    #[error("Venue {venue_id} has no pricing rule for day {day_of_week}")]
    NoPricingRule {
        /// Venue that was looked up
        venue_id: i64,
        /// Day of week, 0 = Sunday
        day_of_week: u32,
    },

    /// A record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A booking status change that the state machine forbids
    #[error("Booking {booking_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Booking being changed
        booking_id: i64,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// A payment notification failed signature verification
    #[error("Invalid webhook signature: {message}")]
    InvalidSignature {
        /// Why verification failed
        message: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Database error from sea-orm
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Coarse error categories used for propagation and HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; user can correct and resubmit
    Validation,
    /// Calendar overlap, including a lost race at insert time
    Conflict,
    /// Not authenticated or not permitted
    Authorization,
    /// Collaborator unavailable
    Upstream,
    /// Defect; fail with a generic message
    Integrity,
    /// Missing record
    NotFound,
}

impl Error {
    /// Shorthand for a [`Error::Validation`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for an [`Error::Integrity`] error.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Shorthand for an [`Error::Forbidden`] error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Shorthand for an [`Error::NotFound`] error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classifies the error into the propagation taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::BookingConflict { .. } => ErrorKind::Conflict,
            Self::Unauthenticated | Self::Forbidden { .. } | Self::InvalidSignature { .. } => {
                ErrorKind::Authorization
            }
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::Validation,
            Self::Database(err) if is_connection_error(err) => ErrorKind::Upstream,
            Self::Integrity { .. }
            | Self::NoPricingRule { .. }
            | Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_) => ErrorKind::Integrity,
        }
    }

    /// True when the error is a transient collaborator failure.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        self.kind() == ErrorKind::Upstream
    }
}

fn is_connection_error(err: &DbErr) -> bool {
    matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
}

/// True when the database rejected a booking insert through the overlap guard.
#[must_use]
pub fn is_overlap_rejection(err: &DbErr) -> bool {
    err.to_string().contains(BOOKING_OVERLAP_MARKER)
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnAcquireErr, RuntimeErr};

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(Error::Unauthenticated.kind(), ErrorKind::Authorization);
        assert_eq!(Error::forbidden("no").kind(), ErrorKind::Authorization);
        assert_eq!(Error::integrity("bad").kind(), ErrorKind::Integrity);
        assert_eq!(
            Error::NoPricingRule {
                venue_id: 1,
                day_of_week: 0
            }
            .kind(),
            ErrorKind::Integrity
        );
        assert_eq!(Error::not_found("Booking", 7).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_connection_errors_are_upstream() {
        let err = Error::from(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout));
        assert!(err.is_upstream());

        let err = Error::from(DbErr::Custom("boom".to_string()));
        assert!(!err.is_upstream());
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_overlap_rejection_detected_from_message() {
        let err = DbErr::Exec(RuntimeErr::Internal(format!(
            "error returned from database: {BOOKING_OVERLAP_MARKER}"
        )));
        assert!(is_overlap_rejection(&err));
        assert!(!is_overlap_rejection(&DbErr::Custom("other".to_string())));
    }
}
