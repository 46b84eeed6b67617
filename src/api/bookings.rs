//! Booking endpoints.
//!
//! - `POST /api/bookings` - submit a configuration, returns the checkout URL
//! - `GET /api/bookings` - the caller's bookings
//! - `GET /api/bookings/:booking_id` - one booking
//! - `POST /api/bookings/:booking_id/cancel` - guest, venue host or admin
//! - `POST /api/bookings/:booking_id/complete` - venue host or admin

use super::{
    AppError, AppState, CurrentUser,
    extract::{JsonBody, PathParam},
};
use crate::{
    core::{
        booking::{self, BookingRequest, booked_packages},
        money::from_minor_units,
        pricing::PackageSnapshot,
    },
    entities::BookingModel,
    errors::Error,
};
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

/// A booking as shown to its guest or host.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Booking ID
    pub id: i64,
    /// Booked venue
    pub venue_id: i64,
    /// Event date
    pub event_date: NaiveDate,
    /// Start time
    pub start_time: String,
    /// End time
    pub end_time: String,
    /// Whether the window ends the next day
    pub spans_midnight: bool,
    /// Number of guests
    pub guest_count: i32,
    /// Current status
    pub status: String,
    /// Venue rental fee
    pub venue_cost: Decimal,
    /// Minimum-spend top-up
    pub min_spend_gap: Decimal,
    /// Global extras
    pub extras_cost: Decimal,
    /// Platform fee
    pub platform_fee: Decimal,
    /// Amount charged
    pub total_amount: Decimal,
    /// Currency code
    pub currency: String,
    /// Packages as priced at submission
    pub packages: Vec<PackageSnapshot>,
    /// Created at
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingModel> for BookingResponse {
    type Error = Error;

    fn try_from(model: BookingModel) -> Result<Self, Error> {
        let packages = booked_packages(&model)?;
        Ok(Self {
            id: model.id,
            venue_id: model.venue_id,
            event_date: model.event_date,
            start_time: model.start_time,
            end_time: model.end_time,
            spans_midnight: model.spans_midnight,
            guest_count: model.guest_count,
            status: model.status,
            venue_cost: from_minor_units(model.calculated_venue_cost_cents),
            min_spend_gap: from_minor_units(model.calculated_min_spend_gap_cents),
            extras_cost: from_minor_units(model.calculated_extras_cost_cents),
            platform_fee: from_minor_units(model.calculated_platform_fee_cents),
            total_amount: from_minor_units(model.total_amount_cents),
            currency: model.currency,
            packages,
            created_at: model.created_at,
        })
    }
}

/// Result of a submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// The pending booking
    pub booking: BookingResponse,
    /// Where to send the payer
    pub checkout_url: String,
}

/// Submits a booking.
///
/// Authentication is checked after availability, so a taken slot reports 409 even
/// to anonymous callers.
#[instrument(skip(state, user, request))]
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(request): JsonBody<BookingRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let submitted = booking::submit_booking(
        &state.db,
        state.payment.as_ref(),
        &state.settings,
        user.as_ref(),
        request,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            booking: submitted.booking.try_into()?,
            checkout_url: submitted.checkout_url,
        }),
    ))
}

/// Lists the caller's bookings.
pub async fn list_mine(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let user = user.require()?;
    let bookings = booking::list_bookings_for_user(&state.db, &user.user_id)
        .await?
        .into_iter()
        .map(BookingResponse::try_from)
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(Json(bookings))
}

/// Loads one booking.
pub async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(booking_id): PathParam<i64>,
) -> Result<Json<BookingResponse>, AppError> {
    let user = user.require()?;
    let booking = booking::get_booking(&state.db, user, booking_id).await?;
    Ok(Json(booking.try_into()?))
}

/// Cancels a booking.
#[instrument(skip(state, user))]
pub async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(booking_id): PathParam<i64>,
) -> Result<Json<BookingResponse>, AppError> {
    let user = user.require()?;
    let booking = booking::cancel_booking(&state.db, user, booking_id).await?;
    Ok(Json(booking.try_into()?))
}

/// Marks a booking completed.
#[instrument(skip(state, user))]
pub async fn complete(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(booking_id): PathParam<i64>,
) -> Result<Json<BookingResponse>, AppError> {
    let user = user.require()?;
    let booking = booking::complete_booking(&state.db, user, booking_id).await?;
    Ok(Json(booking.try_into()?))
}
