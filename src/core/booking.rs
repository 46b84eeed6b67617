//! Booking orchestrator - submission, payment confirmation and status changes.
//!
//! A submission runs in a fixed order: availability check, authentication, pending
//! insert with frozen amounts, checkout session, session linkage. The availability
//! check and the insert are not atomic; the storage overlap guard rejects the losing
//! insert of a race and that rejection is reported as a [`Error::BookingConflict`].
//!
//! Status moves only along the state machine in [`BookingStatus::can_transition_to`].
//! Stored amounts and the package snapshot never change after insert.

use crate::{
    auth::{AuthUser, require_user},
    config::settings::BookingSettings,
    core::{
        availability::has_conflict,
        money::{round_to_minor, to_minor_units},
        package::snapshot_packages_for_venue,
        pricing::{BookingConfiguration, CalculationResult, PackageSnapshot, PricingTerms, calculate_budget},
        schedule::{TimeWindow, day_of_week},
        venue::{require_active_venue, resolve_pricing_rule},
    },
    entities::{Booking, Venue, booking, venue},
    errors::{Error, Result, is_overlap_rejection},
    payment::{BOOKING_ID_METADATA_KEY, CheckoutRequest, PaymentProvider},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, waiting for the payment provider
    PendingPayment,
    /// Paid
    Confirmed,
    /// Cancelled explicitly or by the reconciliation sweep
    Cancelled,
    /// The event took place
    Completed,
}

impl BookingStatus {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Cancelled and completed bookings never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Confirmed)
                | (Self::PendingPayment | Self::Confirmed, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
        )
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending_payment" => Ok(Self::PendingPayment),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(Error::integrity(format!("unknown booking status '{other}'"))),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking configuration as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    /// Venue to book
    pub venue_id: i64,
    /// Event date
    pub event_date: NaiveDate,
    /// Start time, `HH:mm`
    pub start_time: String,
    /// End time, `HH:mm`
    pub end_time: String,
    /// Set for windows that end on the following day
    #[serde(default)]
    pub spans_midnight: bool,
    /// Number of guests
    pub guest_count: i64,
    /// Selected package IDs
    #[serde(default)]
    pub package_ids: Vec<i64>,
    /// Total the client displayed; compared, never charged
    #[serde(default)]
    pub expected_total: Option<Decimal>,
}

impl BookingRequest {
    /// Validates the time fields.
    pub fn window(&self) -> Result<TimeWindow> {
        TimeWindow::parse(&self.start_time, &self.end_time, self.spans_midnight)
    }
}

/// A priced configuration, ready to be persisted or shown as a quote.
#[derive(Debug, Clone)]
pub struct PreparedBooking {
    /// Venue being booked
    pub venue: venue::Model,
    /// Validated window
    pub window: TimeWindow,
    /// Validated guest count
    pub guest_count: u32,
    /// Packages as priced now
    pub packages: Vec<PackageSnapshot>,
    /// Engine output
    pub calculation: CalculationResult,
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmittedBooking {
    /// The pending booking, linked to its checkout session
    pub booking: booking::Model,
    /// Where to send the payer
    pub checkout_url: String,
}

/// What a payment confirmation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The booking moved to confirmed
    Confirmed,
    /// The booking was already confirmed; nothing changed
    AlreadyConfirmed,
    /// The notification did not apply; nothing changed
    Ignored {
        /// Why it was ignored
        reason: String,
    },
}

fn validate_guest_count(guest_count: i64, venue: &venue::Model) -> Result<u32> {
    if guest_count <= 0 {
        return Err(Error::validation("guest count must be at least 1"));
    }
    if guest_count > i64::from(venue.max_capacity_standing) {
        return Err(Error::validation(format!(
            "guest count {guest_count} exceeds the venue capacity of {}",
            venue.max_capacity_standing
        )));
    }
    u32::try_from(guest_count).map_err(|_| Error::validation("guest count is out of range"))
}

/// Validates a request against the catalog and prices it.
///
/// # Errors
/// * [`Error::Validation`] for bad times, guest counts, inactive venues or packages
/// * [`Error::NoPricingRule`] when the venue does not open on that day of week
pub async fn prepare_booking<C>(db: &C, request: &BookingRequest) -> Result<PreparedBooking>
where
    C: ConnectionTrait,
{
    let window = request.window()?;
    let venue = require_active_venue(db, request.venue_id).await?;
    let guest_count = validate_guest_count(request.guest_count, &venue)?;

    let rule = resolve_pricing_rule(db, venue.id, request.event_date)
        .await?
        .ok_or_else(|| Error::NoPricingRule {
            venue_id: venue.id,
            day_of_week: day_of_week(request.event_date),
        })?;
    let terms = PricingTerms::try_from(&rule)?;
    let packages = snapshot_packages_for_venue(db, venue.id, &request.package_ids).await?;

    let calculation = calculate_budget(&BookingConfiguration {
        window,
        guest_count,
        packages: packages.clone(),
        terms,
    });
    debug!(venue_id = venue.id, total = %calculation.total_amount, "Booking priced");

    Ok(PreparedBooking {
        venue,
        window,
        guest_count,
        packages,
        calculation,
    })
}

/// Availability reads are idempotent, so one transient failure is retried.
async fn check_availability(
    db: &DatabaseConnection,
    venue_id: i64,
    event_date: NaiveDate,
    window: &TimeWindow,
) -> Result<bool> {
    match has_conflict(db, venue_id, event_date, window).await {
        Err(e) if e.is_upstream() => {
            warn!(venue_id, error = %e, "Availability check failed, retrying once");
            has_conflict(db, venue_id, event_date, window).await
        }
        other => other,
    }
}

fn conflict_error(request: &BookingRequest, window: &TimeWindow) -> Error {
    Error::BookingConflict {
        venue_id: request.venue_id,
        event_date: request.event_date,
        start_time: window.start().to_string(),
        end_time: window.end().to_string(),
    }
}

/// Submits a booking and opens a checkout session for it.
///
/// The client's `expected_total` is compared against the server's own price at the
/// charge boundary; any difference is rejected so the payer never sees one amount
/// and pays another.
///
/// If the checkout session cannot be opened or linked, the booking stays in
/// `pending_payment` without a session and the error is returned; the
/// reconciliation sweep cancels it later. Session creation is never retried.
#[instrument(
    skip(db, payment, settings, user, request),
    fields(venue_id = request.venue_id, event_date = %request.event_date)
)]
pub async fn submit_booking(
    db: &DatabaseConnection,
    payment: &dyn PaymentProvider,
    settings: &BookingSettings,
    user: Option<&AuthUser>,
    request: BookingRequest,
) -> Result<SubmittedBooking> {
    let window = request.window()?;

    if check_availability(db, request.venue_id, request.event_date, &window).await? {
        info!("Submission rejected: slot already taken");
        return Err(conflict_error(&request, &window));
    }

    let user = require_user(user)?;
    let prepared = prepare_booking(db, &request).await?;
    let charge = prepared.calculation.charge_amounts();

    if let Some(expected) = request.expected_total {
        if round_to_minor(expected) != charge.total_amount {
            warn!(%expected, current = %charge.total_amount, "Client total is stale");
            return Err(Error::validation(format!(
                "price changed: expected {}, current total is {}",
                round_to_minor(expected),
                charge.total_amount
            )));
        }
    }

    let slot = window.slot_on(request.event_date);
    let now = Utc::now();
    let pending = booking::ActiveModel {
        venue_id: Set(prepared.venue.id),
        user_id: Set(user.user_id.clone()),
        event_date: Set(request.event_date),
        start_time: Set(window.start().to_string()),
        end_time: Set(window.end().to_string()),
        spans_midnight: Set(window.spans_midnight()),
        slot_start: Set(slot.start),
        slot_end: Set(slot.end),
        guest_count: Set(i32::try_from(prepared.guest_count)
            .map_err(|_| Error::validation("guest count is out of range"))?),
        selected_packages: Set(serde_json::to_value(&prepared.packages)
            .map_err(|e| Error::integrity(format!("cannot snapshot packages: {e}")))?),
        calculated_venue_cost_cents: Set(to_minor_units(charge.rental_fee)?),
        calculated_min_spend_gap_cents: Set(to_minor_units(charge.min_spend_gap)?),
        calculated_extras_cost_cents: Set(to_minor_units(charge.extras)?),
        calculated_platform_fee_cents: Set(to_minor_units(charge.platform_fee)?),
        total_amount_cents: Set(to_minor_units(charge.total_amount)?),
        currency: Set(settings.currency.clone()),
        status: Set(BookingStatus::PendingPayment.as_str().to_string()),
        payment_session_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let booking = pending.insert(db).await.map_err(|e| {
        if is_overlap_rejection(&e) {
            info!("Submission lost the race for the slot");
            conflict_error(&request, &window)
        } else {
            e.into()
        }
    })?;
    info!(booking_id = booking.id, total_cents = booking.total_amount_cents, "Pending booking created");

    let checkout = CheckoutRequest {
        amount_cents: booking.total_amount_cents,
        currency: settings.currency.clone(),
        description: format!(
            "{} on {} from {} to {}",
            prepared.venue.title, booking.event_date, booking.start_time, booking.end_time
        ),
        success_url: format!(
            "{}/checkout/success?booking_id={}",
            settings.public_base_url.trim_end_matches('/'),
            booking.id
        ),
        cancel_url: format!(
            "{}/venues/{}",
            settings.public_base_url.trim_end_matches('/'),
            booking.venue_id
        ),
        metadata: BTreeMap::from([(BOOKING_ID_METADATA_KEY.to_string(), booking.id.to_string())]),
    };

    let session = match payment.create_checkout_session(checkout).await {
        Ok(session) => session,
        Err(e) => {
            error!(booking_id = booking.id, error = %e, "Orphaned booking: checkout session failed");
            return Err(into_upstream(e));
        }
    };

    let booking_id = booking.id;
    let mut linked: booking::ActiveModel = booking.into();
    linked.payment_session_id = Set(Some(session.id.clone()));
    linked.updated_at = Set(Utc::now());
    let booking = match linked.update(db).await {
        Ok(booking) => booking,
        Err(e) => {
            error!(
                booking_id,
                session_id = %session.id,
                error = %e,
                "Orphaned booking: checkout session could not be linked"
            );
            return Err(into_upstream(e.into()));
        }
    };

    info!(booking_id, session_id = %session.id, "Checkout session linked");
    Ok(SubmittedBooking {
        booking,
        checkout_url: session.url,
    })
}

fn into_upstream(err: Error) -> Error {
    if err.is_upstream() {
        err
    } else {
        Error::Upstream {
            service: "checkout".to_string(),
            message: err.to_string(),
        }
    }
}

/// Confirms a booking after the provider reports a completed checkout.
///
/// Safe to call any number of times with the same notification. Only a
/// `pending_payment` booking is changed; a booking already linked to a different
/// session, or already cancelled or completed, is left alone and logged.
#[instrument(skip(db))]
pub async fn confirm_payment(
    db: &DatabaseConnection,
    session_id: &str,
    booking_id: i64,
) -> Result<ConfirmOutcome> {
    let Some(booking) = Booking::find_by_id(booking_id).one(db).await? else {
        warn!("Payment confirmation for unknown booking");
        return Ok(ConfirmOutcome::Ignored {
            reason: format!("booking {booking_id} does not exist"),
        });
    };

    if let Some(linked) = booking.payment_session_id.as_deref() {
        if linked != session_id {
            warn!(linked_session = linked, "Payment confirmation for a different session");
            return Ok(ConfirmOutcome::Ignored {
                reason: format!("booking {booking_id} is linked to another session"),
            });
        }
    }

    match booking.status.parse::<BookingStatus>()? {
        BookingStatus::Confirmed => {
            debug!("Booking already confirmed");
            Ok(ConfirmOutcome::AlreadyConfirmed)
        }
        status @ (BookingStatus::Cancelled | BookingStatus::Completed) => {
            warn!(%status, "Payment received for a closed booking; needs manual refund review");
            Ok(ConfirmOutcome::Ignored {
                reason: format!("booking {booking_id} is {status}"),
            })
        }
        BookingStatus::PendingPayment => {
            // Guarded on status so a concurrent sweep or duplicate delivery cannot double-apply
            let result = Booking::update_many()
                .col_expr(booking::Column::Status, Expr::value(BookingStatus::Confirmed.as_str()))
                .col_expr(booking::Column::PaymentSessionId, Expr::value(session_id))
                .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(booking::Column::Id.eq(booking_id))
                .filter(booking::Column::Status.eq(BookingStatus::PendingPayment.as_str()))
                .exec(db)
                .await?;
            if result.rows_affected == 1 {
                info!("Booking confirmed");
                Ok(ConfirmOutcome::Confirmed)
            } else {
                let current = get_booking_model(db, booking_id).await?;
                if current.status == BookingStatus::Confirmed.as_str() {
                    Ok(ConfirmOutcome::AlreadyConfirmed)
                } else {
                    warn!(status = %current.status, "Booking changed before it could be confirmed");
                    Ok(ConfirmOutcome::Ignored {
                        reason: format!("booking {booking_id} is {}", current.status),
                    })
                }
            }
        }
    }
}

async fn get_booking_model(db: &DatabaseConnection, booking_id: i64) -> Result<booking::Model> {
    Booking::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Booking", booking_id))
}

async fn venue_host(db: &DatabaseConnection, venue_id: i64) -> Result<String> {
    Venue::find_by_id(venue_id)
        .one(db)
        .await?
        .map(|v| v.host_id)
        .ok_or_else(|| Error::integrity(format!("booking references missing venue {venue_id}")))
}

async fn transition(
    db: &DatabaseConnection,
    booking: booking::Model,
    next: BookingStatus,
) -> Result<booking::Model> {
    let current: BookingStatus = booking.status.parse()?;
    if !current.can_transition_to(next) {
        return Err(Error::InvalidTransition {
            booking_id: booking.id,
            from: current.to_string(),
            to: next.to_string(),
        });
    }

    let booking_id = booking.id;
    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!(booking_id, from = %current, to = %next, "Booking status changed");
    Ok(updated)
}

/// Cancels a booking that is not yet cancelled or completed.
///
/// Allowed for the guest who booked, the venue's host, and admins.
#[instrument(skip(db, actor), fields(user_id = %actor.user_id))]
pub async fn cancel_booking(
    db: &DatabaseConnection,
    actor: &AuthUser,
    booking_id: i64,
) -> Result<booking::Model> {
    let booking = get_booking_model(db, booking_id).await?;
    if booking.user_id != actor.user_id && !actor.owns_or_admin(&venue_host(db, booking.venue_id).await?) {
        return Err(Error::forbidden(format!("user {} cannot cancel booking {booking_id}", actor.user_id)));
    }
    transition(db, booking, BookingStatus::Cancelled).await
}

/// Marks a confirmed booking as completed. Venue host or admin only.
#[instrument(skip(db, actor), fields(user_id = %actor.user_id))]
pub async fn complete_booking(
    db: &DatabaseConnection,
    actor: &AuthUser,
    booking_id: i64,
) -> Result<booking::Model> {
    let booking = get_booking_model(db, booking_id).await?;
    if !actor.owns_or_admin(&venue_host(db, booking.venue_id).await?) {
        return Err(Error::forbidden(format!(
            "user {} cannot complete booking {booking_id}",
            actor.user_id
        )));
    }
    transition(db, booking, BookingStatus::Completed).await
}

/// Cancels `pending_payment` bookings created before `now - timeout`.
///
/// Returns how many bookings were cancelled. Cancelled slots free up immediately.
pub async fn sweep_stale_pending(
    db: &DatabaseConnection,
    timeout: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<u64> {
    let cutoff = now - timeout;
    let result = Booking::update_many()
        .col_expr(booking::Column::Status, Expr::value(BookingStatus::Cancelled.as_str()))
        .col_expr(booking::Column::UpdatedAt, Expr::value(now))
        .filter(booking::Column::Status.eq(BookingStatus::PendingPayment.as_str()))
        .filter(booking::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!(cancelled = result.rows_affected, %cutoff, "Stale pending bookings cancelled");
    }
    Ok(result.rows_affected)
}

/// Loads a booking visible to `actor`: the guest, the venue's host, or an admin.
pub async fn get_booking(
    db: &DatabaseConnection,
    actor: &AuthUser,
    booking_id: i64,
) -> Result<booking::Model> {
    let booking = get_booking_model(db, booking_id).await?;
    if booking.user_id == actor.user_id || actor.owns_or_admin(&venue_host(db, booking.venue_id).await?) {
        Ok(booking)
    } else {
        Err(Error::not_found("Booking", booking_id))
    }
}

/// Lists a user's bookings, most recent event first.
pub async fn list_bookings_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<booking::Model>> {
    Booking::find()
        .filter(booking::Column::UserId.eq(user_id))
        .order_by_desc(booking::Column::EventDate)
        .order_by_desc(booking::Column::SlotStart)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The package snapshot stored with a booking.
pub fn booked_packages(booking: &booking::Model) -> Result<Vec<PackageSnapshot>> {
    serde_json::from_value(booking.selected_packages.clone()).map_err(|e| {
        Error::integrity(format!("booking {} has an unreadable package snapshot: {e}", booking.id))
    })
}
